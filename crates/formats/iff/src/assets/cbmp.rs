use crate::error::{Error, Result};
use crate::tag::ChunkTag;
use crate::wrap::{unwrap_bmp, wrap_bmp, BITMAP_IMAGE_SIZE};

use super::{sub_chunks, SubChunk};

const RECORD_HEADER_SIZE: usize = 8;

/// A texture page (`Cbmp`).
///
/// Holds `LCCB`, `LkUp`, `PX16` and `PLUT` records; only the `PX16` pixels
/// are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    records: Vec<SubChunk>,
    pixels: SubChunk,
}

impl Bitmap {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let records = sub_chunks(
            data,
            &[ChunkTag::Lccb, ChunkTag::LkUp, ChunkTag::Px16, ChunkTag::Plut],
        );
        let pixels = records
            .iter()
            .copied()
            .find(|c| c.tag == ChunkTag::Px16)
            .ok_or(Error::SubChunkNotFound {
                tag: ChunkTag::Px16,
                context: "Cbmp",
            })?;
        Ok(Self {
            bytes: data.to_vec(),
            records,
            pixels,
        })
    }

    /// The nested records, in payload order.
    pub fn records(&self) -> &[SubChunk] {
        &self.records
    }

    /// Raw 16-bit pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.bytes[self.pixels.offset + RECORD_HEADER_SIZE..self.pixels.end()]
    }

    /// The pixels as a BMP file.
    pub fn to_bmp(&self) -> Result<Vec<u8>> {
        wrap_bmp(self.pixels())
    }

    /// Replace the pixels with those of a 256x256 16-bit BMP file and
    /// return the new payload. Every other record is kept.
    pub fn replace_pixels(&self, bmp: &[u8]) -> Result<Vec<u8>> {
        let new_pixels = unwrap_bmp(bmp)?;
        let old_len = self.pixels.size - RECORD_HEADER_SIZE;
        if old_len != BITMAP_IMAGE_SIZE {
            return Err(Error::SizeMismatch {
                context: "Cbmp pixels",
                expected: BITMAP_IMAGE_SIZE,
                found: old_len,
            });
        }
        let mut out = self.bytes.clone();
        let start = self.pixels.offset + RECORD_HEADER_SIZE;
        out[start..start + BITMAP_IMAGE_SIZE].copy_from_slice(new_pixels);
        Ok(out)
    }
}
