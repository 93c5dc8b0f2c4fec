//! Splitting payloads into sub-chunks and joining them back.
//!
//! Asset payloads are stored as a run of `SHOC`/`SDAT` chunks of at most
//! [`SUB_CHUNK_SIZE`] bytes; the music track as a run of `MSIC` chunks of
//! at most [`MUSIC_CHUNK_SIZE`] bytes. Only the last chunk of a run is short.

use log::debug;

use crate::cursor::{slice_at, Writer};
use crate::error::{Error, Result};
use crate::header::{ChunkHeader, FILLER_SIZE, GENERIC_HEADER_SIZE, MSIC_HEADER_SIZE};
use crate::reader::ChunkIndex;
use crate::tag::ChunkTag;
use crate::writer::{write_generic_header, DEFAULT_FILLER};

/// Full size of an `SDAT` sub-chunk, header included.
pub const SUB_CHUNK_SIZE: usize = 4096;
/// Payload bytes carried by one full `SDAT` sub-chunk.
pub const SUB_CHUNK_CAPACITY: usize = SUB_CHUNK_SIZE - GENERIC_HEADER_SIZE;
/// Full size of an `MSIC` chunk, header included.
pub const MUSIC_CHUNK_SIZE: usize = 24540;
/// Audio bytes carried by one full `MSIC` chunk.
pub const MUSIC_CHUNK_CAPACITY: usize = MUSIC_CHUNK_SIZE - MSIC_HEADER_SIZE;
/// Increment of the loop number between consecutive `MSIC` chunks.
pub const LOOP_NUMBER_STEP: u32 = 65536;
/// Value written after every loop number.
pub const UNKNOWN_MUSIC_NUMBER: u32 = 12256;

/// Number of sub-chunks needed for `size` bytes at `capacity` bytes each.
pub fn sub_chunk_count(size: usize, capacity: usize) -> usize {
    size.div_ceil(capacity)
}

/// Split an asset payload into `SDAT` sub-chunks with a zero filler.
pub fn split_data(payload: &[u8]) -> Result<Vec<u8>> {
    split_data_with(DEFAULT_FILLER, payload)
}

pub fn split_data_with(filler: [u8; FILLER_SIZE], payload: &[u8]) -> Result<Vec<u8>> {
    if payload.starts_with(&ChunkTag::Shoc.signature()) {
        return Err(Error::AlreadyChunked);
    }
    let count = sub_chunk_count(payload.len(), SUB_CHUNK_CAPACITY);
    let mut w = Writer::with_capacity(payload.len() + count * GENERIC_HEADER_SIZE);
    for piece in payload.chunks(SUB_CHUNK_CAPACITY) {
        write_generic_header(
            &mut w,
            ChunkTag::Shoc,
            GENERIC_HEADER_SIZE + piece.len(),
            filler,
            ChunkTag::Sdat,
        );
        w.write_bytes(piece);
    }
    Ok(w.into_bytes())
}

/// Split the music track into `MSIC` chunks with a zero filler.
pub fn split_music(payload: &[u8]) -> Result<Vec<u8>> {
    split_music_with(DEFAULT_FILLER, payload)
}

/// Split the music track into `MSIC` chunks.
///
/// Loop numbers start at the chunk count and grow by [`LOOP_NUMBER_STEP`].
pub fn split_music_with(filler: [u8; FILLER_SIZE], payload: &[u8]) -> Result<Vec<u8>> {
    if payload.starts_with(&ChunkTag::Msic.signature()) {
        return Err(Error::AlreadyChunked);
    }
    let count = sub_chunk_count(payload.len(), MUSIC_CHUNK_CAPACITY);
    let mut w = Writer::with_capacity(payload.len() + count * MSIC_HEADER_SIZE);
    let mut loop_number = count as u32;
    for piece in payload.chunks(MUSIC_CHUNK_CAPACITY) {
        write_generic_header(
            &mut w,
            ChunkTag::Msic,
            MSIC_HEADER_SIZE + piece.len(),
            filler,
            ChunkTag::Msic,
        );
        w.write_u32(loop_number);
        w.write_u32(UNKNOWN_MUSIC_NUMBER);
        w.write_bytes(piece);
        loop_number = loop_number.wrapping_add(LOOP_NUMBER_STEP);
    }
    debug!("split {} music bytes into {count} chunks", payload.len());
    Ok(w.into_bytes())
}

/// Reassemble the payload declared by the `SHDR` chunk `owner`.
///
/// The run of `SDAT` chunks after `owner` must hold exactly as many
/// sub-chunks and bytes as the declared size implies.
pub fn join_data(index: &ChunkIndex, data: &[u8], owner: &ChunkHeader) -> Result<Vec<u8>> {
    let decl = owner.declaration().ok_or_else(|| Error::UnexpectedChunk {
        offset: owner.offset,
        expected: ChunkTag::Shdr,
        found: owner.secondary().map_or_else(|| owner.primary().to_string(), |t| t.to_string()),
    })?;
    let expected = sub_chunk_count(decl.data_size as usize, SUB_CHUNK_CAPACITY);
    let run = index.data_run(owner.chunk_index);
    if run.len() != expected {
        return Err(Error::SubChunkCount {
            tag: decl.tag,
            id: decl.id,
            expected,
            found: run.len(),
        });
    }

    let payload = concat_payloads(data, &run, GENERIC_HEADER_SIZE)?;
    if payload.len() != decl.data_size as usize {
        return Err(Error::SizeMismatch {
            context: "joined payload",
            expected: decl.data_size as usize,
            found: payload.len(),
        });
    }
    Ok(payload)
}

/// Reassemble the music track from the `MSIC` run after the music SWVR.
pub fn join_music(index: &ChunkIndex, data: &[u8]) -> Result<Vec<u8>> {
    if index.music_start().is_none() {
        return Err(Error::MusicNotFound);
    }
    let run = index.music_run();
    concat_payloads(data, &run, MSIC_HEADER_SIZE)
}

fn concat_payloads(data: &[u8], run: &[&ChunkHeader], header_size: usize) -> Result<Vec<u8>> {
    let total: usize = run.iter().map(|c| c.size - header_size).sum();
    let mut out = Vec::with_capacity(total);
    for chunk in run {
        let body = slice_at(data, chunk.offset + header_size, chunk.size - header_size)?;
        out.extend_from_slice(body);
    }
    Ok(out)
}
