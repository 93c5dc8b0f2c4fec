#![allow(dead_code)]

use iff::codec;
use iff::header::FILLER_SIZE;
use iff::writer::{assemble, control_chunk, file_chunk, fresh_data_header};
use iff::{ChunkTag, ControlSizes, DataDeclaration};

pub const FILLER: [u8; FILLER_SIZE] = [0x11, 0x22, 0x33, 0x44, 0, 0, 0, 0];

/// Builds unpadded synthetic mission files chunk by chunk.
#[derive(Default)]
pub struct MissionBuilder {
    chunks: Vec<Vec<u8>>,
}

impl MissionBuilder {
    pub fn new() -> Self {
        Self {
            chunks: vec![control_chunk(&ControlSizes::default())],
        }
    }

    /// Without the leading CTRL chunk.
    pub fn headless() -> Self {
        Self::default()
    }

    pub fn asset(mut self, tag: ChunkTag, id: u32, payload: &[u8]) -> Self {
        let decl = DataDeclaration {
            header_type: 1,
            tag,
            id,
            data_size: payload.len() as u32,
        };
        self.chunks.push(fresh_data_header(FILLER, &decl));
        self.chunks
            .push(codec::split_data_with(FILLER, payload).expect("payload is not chunked"));
        self
    }

    pub fn sound(mut self, name: &str, id: u32, pcm: &[u8]) -> Self {
        self.chunks.push(file_chunk(FILLER, name));
        self.asset(ChunkTag::Snds, id, pcm)
    }

    pub fn music(mut self, name: &str, pcm: &[u8]) -> Self {
        self.chunks.push(file_chunk(FILLER, name));
        self.chunks
            .push(codec::split_music_with(FILLER, pcm).expect("music is not chunked"));
        self
    }

    pub fn raw(mut self, bytes: Vec<u8>) -> Self {
        self.chunks.push(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        assemble(self.chunks)
    }
}

/// A payload whose bytes differ from offset to offset.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
