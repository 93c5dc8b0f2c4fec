use crate::codec;
use crate::cursor::slice_at;
use crate::error::{Error, Result};
use crate::header::{ChunkHeader, FILLER_OFFSET, FILLER_SIZE};
use crate::reader::ChunkIndex;
use crate::tag::ChunkTag;
use crate::writer::DEFAULT_FILLER;

/// An indexed mission file.
///
/// The buffer and its index are built together and never change; every
/// edit returns a new `IffFile` and leaves the receiver as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IffFile {
    data: Vec<u8>,
    index: ChunkIndex,
}

impl IffFile {
    /// Index `data`. Fails if any byte is not covered by a chunk.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let index = ChunkIndex::parse(&data)?;
        Ok(Self { data, index })
    }

    /// The raw file bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// All bytes of one chunk, header included.
    pub fn chunk_bytes(&self, chunk: &ChunkHeader) -> Result<&[u8]> {
        slice_at(&self.data, chunk.offset, chunk.size)
    }

    /// The filler field of the first `SDAT` chunk, reused when building
    /// new chunks so they match the rest of the file.
    pub fn filler(&self) -> [u8; FILLER_SIZE] {
        self.index
            .chunks()
            .iter()
            .find(|c| c.is_sub_chunk())
            .and_then(|c| slice_at(&self.data, c.offset + FILLER_OFFSET, FILLER_SIZE).ok())
            .and_then(|b| b.try_into().ok())
            .unwrap_or(DEFAULT_FILLER)
    }

    /// The de-chunked payload of asset `tag`/`id`.
    pub fn export_data(&self, tag: ChunkTag, id: u32) -> Result<Vec<u8>> {
        let owner = self
            .index
            .find_data(tag, id)
            .ok_or(Error::DataNotFound { tag, id })?;
        codec::join_data(&self.index, &self.data, owner)
    }

    /// Names of every sound effect, in file order.
    pub fn sound_names(&self) -> Vec<&str> {
        self.index
            .sound_headers()
            .filter_map(ChunkHeader::file_name)
            .collect()
    }

    /// The `SHDR` chunk carrying the audio of the sound named `name`.
    pub fn sound_declaration(&self, name: &str) -> Result<&ChunkHeader> {
        let swvr = self
            .index
            .find_sound(name)
            .ok_or_else(|| Error::SoundNotFound {
                name: name.to_string(),
            })?;
        self.index
            .next_non_fill(swvr.chunk_index)
            .filter(|c| c.declaration().is_some())
            .ok_or(Error::SubChunkNotFound {
                tag: ChunkTag::Shdr,
                context: "sound effect",
            })
    }

    /// The raw 8-bit PCM of the sound named `name`.
    pub fn export_sound(&self, name: &str) -> Result<Vec<u8>> {
        let owner = self.sound_declaration(name)?;
        codec::join_data(&self.index, &self.data, owner)
    }

    /// Name of the music track, if the file has a music region.
    pub fn music_name(&self) -> Option<&str> {
        self.index.music_start().and_then(ChunkHeader::file_name)
    }

    /// The raw 8-bit PCM of the music track.
    pub fn export_music(&self) -> Result<Vec<u8>> {
        codec::join_music(&self.index, &self.data)
    }
}
