use crate::error::{Error, Result};

/// Bounds-checked little-endian reader over a byte slice.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the read position. Seeking past the end is allowed; the next
    /// read fails.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Advance the read position by `n` bytes.
    pub fn skip(&mut self, n: usize) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let bytes = slice_at(self.data, self.pos, n)?;
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a raw 4-byte signature exactly as stored (byte-reversed).
    pub fn read_signature(&mut self) -> Result<[u8; 4]> {
        let b = self.read_bytes(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }
}

/// Sequential little-endian writer.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Write a signature as stored on disk.
    pub fn write_signature(&mut self, signature: [u8; 4]) {
        self.buf.extend_from_slice(&signature);
    }

    /// Append `n` zero bytes.
    pub fn write_zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    /// Overwrite a previously written u32.
    ///
    /// Panics if `pos + 4` is past the written length; callers only patch
    /// fields they wrote themselves.
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Borrow `n` bytes at `offset`, failing instead of panicking at the end.
pub fn slice_at(data: &[u8], offset: usize, n: usize) -> Result<&[u8]> {
    match offset.checked_add(n) {
        Some(end) if end <= data.len() => Ok(&data[offset..end]),
        _ => Err(Error::UnexpectedEof {
            offset,
            need: n,
            have: data.len().saturating_sub(offset),
        }),
    }
}

pub fn read_u16_at(data: &[u8], offset: usize) -> Result<u16> {
    let b = slice_at(data, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

pub fn read_i16_at(data: &[u8], offset: usize) -> Result<i16> {
    Ok(read_u16_at(data, offset)? as i16)
}

pub fn read_u32_at(data: &[u8], offset: usize) -> Result<u32> {
    let b = slice_at(data, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub fn read_i32_at(data: &[u8], offset: usize) -> Result<i32> {
    Ok(read_u32_at(data, offset)? as i32)
}

pub fn read_signature_at(data: &[u8], offset: usize) -> Result<[u8; 4]> {
    let b = slice_at(data, offset, 4)?;
    Ok([b[0], b[1], b[2], b[3]])
}

pub fn write_u16_at(data: &mut [u8], offset: usize, v: u16) -> Result<()> {
    let have = data.len().saturating_sub(offset);
    let dst = data.get_mut(offset..offset.saturating_add(2)).filter(|d| d.len() == 2);
    match dst {
        Some(dst) => {
            dst.copy_from_slice(&v.to_le_bytes());
            Ok(())
        }
        None => Err(Error::UnexpectedEof { offset, need: 2, have }),
    }
}

pub fn write_u32_at(data: &mut [u8], offset: usize, v: u32) -> Result<()> {
    let have = data.len().saturating_sub(offset);
    let dst = data.get_mut(offset..offset.saturating_add(4)).filter(|d| d.len() == 4);
    match dst {
        Some(dst) => {
            dst.copy_from_slice(&v.to_le_bytes());
            Ok(())
        }
        None => Err(Error::UnexpectedEof { offset, need: 4, have }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFE, 0xFF];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(c.read_i16().unwrap(), -2);
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn read_past_end_is_an_error() {
        let data = [0u8; 3];
        let err = read_u32_at(&data, 0).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { offset: 0, need: 4, have: 3 }));
        assert!(read_u16_at(&data, usize::MAX).is_err());
    }

    #[test]
    fn writes_at_offset() {
        let mut data = vec![0u8; 8];
        write_u32_at(&mut data, 4, 24).unwrap();
        write_u16_at(&mut data, 0, 0xBEEF).unwrap();
        assert_eq!(data, [0xEF, 0xBE, 0, 0, 24, 0, 0, 0]);
        assert!(write_u32_at(&mut data, 6, 1).is_err());
    }

    #[test]
    fn writer_patches() {
        let mut w = Writer::with_capacity(8);
        w.write_u32(0);
        w.write_u16(7);
        w.patch_u32(0, 6);
        assert_eq!(w.position(), 6);
        assert_eq!(w.into_bytes(), [6, 0, 0, 0, 7, 0]);
    }
}
