//! Typed views over individual asset payloads.
//!
//! Each view parses the de-chunked payload of one asset and can write an
//! edited copy back. Bytes a view does not understand are carried through
//! unchanged.

pub mod cact;
pub mod cbmp;
pub mod cnet;
pub mod cptc;

pub use cact::{ActorRecord, ObjectReference};
pub use cbmp::Bitmap;
pub use cnet::{PathGraph, PathNode};
pub use cptc::TileLayout;

use crate::cursor::{read_signature_at, read_u32_at, write_u32_at};
use crate::error::Result;
use crate::tag::ChunkTag;

/// Offset of the total-size field that leads most asset payloads.
pub(crate) const PAYLOAD_SIZE_OFFSET: usize = 4;

/// A `tag + size` record nested inside an asset payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubChunk {
    pub tag: ChunkTag,
    pub offset: usize,
    /// Record size, tag and size fields included.
    pub size: usize,
}

impl SubChunk {
    pub fn end(&self) -> usize {
        self.offset + self.size
    }
}

/// Locate the adjacent run of `tags` records in `data`.
///
/// The run starts at the first occurrence of any of `tags` and continues
/// while each record begins where the previous one ended.
pub(crate) fn sub_chunks(data: &[u8], tags: &[ChunkTag]) -> Vec<SubChunk> {
    let signatures: Vec<[u8; 4]> = tags.iter().map(|t| t.signature()).collect();
    let tag_at = |offset: usize| -> Option<ChunkTag> {
        let signature = read_signature_at(data, offset).ok()?;
        signatures
            .iter()
            .position(|s| *s == signature)
            .map(|i| tags[i])
    };

    let Some(mut offset) = (0..data.len()).find(|&o| tag_at(o).is_some()) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    while let Some(tag) = tag_at(offset) {
        let Ok(size) = read_u32_at(data, offset + 4) else {
            break;
        };
        let size = size as usize;
        if size < 8 || offset + size > data.len() {
            break;
        }
        found.push(SubChunk { tag, offset, size });
        offset += size;
    }
    found
}

/// Rewrite the total-size field at offset 4 to match `data`.
pub(crate) fn patch_total_size(data: &mut [u8]) -> Result<()> {
    let len = data.len() as u32;
    write_u32_at(data, PAYLOAD_SIZE_OFFSET, len)
}
