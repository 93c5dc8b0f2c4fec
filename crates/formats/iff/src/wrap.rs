//! Standard file wrappers for exported audio and bitmaps.
//!
//! Sound effects and music are stored as bare 8-bit PCM; bitmaps as bare
//! 16-bit pixels. These helpers add or strip a RIFF/WAVE or BMP header so
//! the data can be opened by ordinary tools.

use bitflags::bitflags;
use log::warn;

use crate::cursor::{read_u16_at, read_u32_at, slice_at, Writer};
use crate::error::{Error, Result};

bitflags! {
    /// Which wrappers to apply when exporting.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Wrap: u8 {
        /// Sound effects and music as RIFF/WAVE.
        const AUDIO = 1 << 0;
        /// Bitmaps as BMP.
        const BITMAP = 1 << 1;
    }
}

impl Default for Wrap {
    fn default() -> Self {
        Wrap::all()
    }
}

/// Sample layout of a PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Sound effects: mono, 8-bit, 22050 Hz.
    pub const SOUND: AudioFormat = AudioFormat {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 8,
    };

    /// Music: stereo, 8-bit, 14212 Hz.
    pub const MUSIC: AudioFormat = AudioFormat {
        channels: 2,
        sample_rate: 14212,
        bits_per_sample: 8,
    };

    fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample.div_ceil(8)
    }
}

pub const WAV_HEADER_SIZE: usize = 44;
pub const BMP_HEADER_SIZE: usize = 54;
const BMP_INFO_SIZE: u32 = 40;
/// Width and height of every mission bitmap.
pub const BITMAP_DIMENSION: u32 = 256;
/// Pixel bytes of a 256x256 16-bit image.
pub const BITMAP_IMAGE_SIZE: usize = 131072;
const BMP_PIXEL_OFFSET_FIELD: usize = 10;
const BMP_IMAGE_SIZE_FIELD: usize = 34;

fn is_riff(bytes: &[u8]) -> bool {
    bytes.starts_with(b"RIFF")
}

fn is_bmp(bytes: &[u8]) -> bool {
    bytes.starts_with(b"BM")
        && read_u32_at(bytes, 14).is_ok_and(|info| info == BMP_INFO_SIZE)
        && bytes.len() >= BMP_HEADER_SIZE
}

/// Prefix `pcm` with a 44-byte RIFF/WAVE header.
pub fn wrap_wav(format: AudioFormat, pcm: &[u8]) -> Result<Vec<u8>> {
    if is_riff(pcm) {
        return Err(Error::AlreadyWrapped { format: "RIFF" });
    }
    let byte_rate = format.sample_rate * u32::from(format.block_align());
    let mut w = Writer::with_capacity(WAV_HEADER_SIZE + pcm.len());
    w.write_bytes(b"RIFF");
    w.write_u32((WAV_HEADER_SIZE - 8 + pcm.len()) as u32);
    w.write_bytes(b"WAVE");
    w.write_bytes(b"fmt ");
    w.write_u32(16);
    w.write_u16(1); // PCM
    w.write_u16(format.channels);
    w.write_u32(format.sample_rate);
    w.write_u32(byte_rate);
    w.write_u16(format.block_align());
    w.write_u16(format.bits_per_sample);
    w.write_bytes(b"data");
    w.write_u32(pcm.len() as u32);
    w.write_bytes(pcm);
    Ok(w.into_bytes())
}

/// Split a RIFF/WAVE file into its sample format and `data` chunk.
pub fn unwrap_wav(bytes: &[u8]) -> Result<(AudioFormat, &[u8])> {
    if !is_riff(bytes) || slice_at(bytes, 8, 4)? != b"WAVE" {
        return Err(Error::NotWrapped { format: "RIFF" });
    }
    let mut format = None;
    let mut pos = 12;
    while pos + 8 <= bytes.len() {
        let id = slice_at(bytes, pos, 4)?;
        let size = read_u32_at(bytes, pos + 4)? as usize;
        let body = pos + 8;
        match id {
            b"fmt " => {
                format = Some(AudioFormat {
                    channels: read_u16_at(bytes, body + 2)?,
                    sample_rate: read_u32_at(bytes, body + 4)?,
                    bits_per_sample: read_u16_at(bytes, body + 14)?,
                });
            }
            b"data" => {
                let format = format.ok_or(Error::Parse {
                    context: "wav",
                    message: "data chunk before fmt chunk".into(),
                })?;
                // Some writers leave the size unset; take what is there.
                let len = size.min(bytes.len() - body);
                return Ok((format, &bytes[body..body + len]));
            }
            _ => {}
        }
        // RIFF chunks are padded to even sizes.
        pos = body + size + (size & 1);
    }
    Err(Error::Parse {
        context: "wav",
        message: "no data chunk".into(),
    })
}

/// [`wrap_wav`], passing through data that is already wrapped.
pub fn wrap_wav_lenient(format: AudioFormat, pcm: &[u8]) -> Vec<u8> {
    match wrap_wav(format, pcm) {
        Ok(wrapped) => wrapped,
        Err(_) => pcm.to_vec(),
    }
}

/// [`unwrap_wav`], returning `bytes` unchanged when they are not a WAV
/// file. Warns when the samples are not in the `expected` format.
pub fn unwrap_wav_lenient(expected: AudioFormat, bytes: &[u8]) -> Vec<u8> {
    match unwrap_wav(bytes) {
        Ok((format, pcm)) => {
            if format != expected {
                warn!(
                    "audio is {} ch {} Hz {}-bit, expected {} ch {} Hz {}-bit",
                    format.channels,
                    format.sample_rate,
                    format.bits_per_sample,
                    expected.channels,
                    expected.sample_rate,
                    expected.bits_per_sample
                );
            }
            pcm.to_vec()
        }
        Err(Error::NotWrapped { .. }) => bytes.to_vec(),
        Err(e) => {
            warn!("importing audio as raw bytes: {e}");
            bytes.to_vec()
        }
    }
}

/// Prefix 16-bit pixels with a 54-byte BMP header for a 256x256 image.
pub fn wrap_bmp(pixels: &[u8]) -> Result<Vec<u8>> {
    if is_bmp(pixels) {
        return Err(Error::AlreadyWrapped { format: "BMP" });
    }
    let mut w = Writer::with_capacity(BMP_HEADER_SIZE + pixels.len());
    w.write_bytes(b"BM");
    w.write_u32((BMP_HEADER_SIZE + pixels.len()) as u32);
    w.write_u32(0);
    w.write_u32(BMP_HEADER_SIZE as u32);
    w.write_u32(BMP_INFO_SIZE);
    w.write_u32(BITMAP_DIMENSION);
    w.write_u32(BITMAP_DIMENSION);
    w.write_u16(1);
    w.write_u16(16);
    w.write_u32(0);
    w.write_u32(pixels.len() as u32);
    w.write_zeros(16);
    w.write_bytes(pixels);
    Ok(w.into_bytes())
}

/// The 131072 pixel bytes of a BMP file.
///
/// The header's image size must be 131072, or 131074 for writers that pad
/// the pixel array.
pub fn unwrap_bmp(bytes: &[u8]) -> Result<&[u8]> {
    if !is_bmp(bytes) {
        return Err(Error::NotWrapped { format: "BMP" });
    }
    let image_size = read_u32_at(bytes, BMP_IMAGE_SIZE_FIELD)? as usize;
    if image_size != BITMAP_IMAGE_SIZE && image_size != BITMAP_IMAGE_SIZE + 2 {
        return Err(Error::SizeMismatch {
            context: "bitmap image",
            expected: BITMAP_IMAGE_SIZE,
            found: image_size,
        });
    }
    let offset = read_u32_at(bytes, BMP_PIXEL_OFFSET_FIELD)? as usize;
    slice_at(bytes, offset, BITMAP_IMAGE_SIZE)
}

/// [`wrap_bmp`], passing through data that is already a BMP file.
pub fn wrap_bmp_lenient(pixels: &[u8]) -> Vec<u8> {
    match wrap_bmp(pixels) {
        Ok(wrapped) => wrapped,
        Err(_) => pixels.to_vec(),
    }
}

/// [`unwrap_bmp`], returning `bytes` unchanged when they are not a BMP file.
pub fn unwrap_bmp_lenient(bytes: &[u8]) -> Result<Vec<u8>> {
    match unwrap_bmp(bytes) {
        Ok(pixels) => Ok(pixels.to_vec()),
        Err(Error::NotWrapped { .. }) => Ok(bytes.to_vec()),
        Err(e) => Err(e),
    }
}
