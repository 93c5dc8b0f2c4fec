use crate::cursor::{write_u32_at, Writer};
use crate::error::{Error, Result};
use crate::header::*;
use crate::tag::ChunkTag;

/// Filler used when a file offers none to copy.
pub const DEFAULT_FILLER: [u8; FILLER_SIZE] = [0; FILLER_SIZE];

/// Size of a freshly built `SHOC`/`SHDR` chunk.
pub const FRESH_HEADER_SIZE: usize = 60;

/// Size of a freshly built `SWVR`/`FILE` chunk.
pub const FILE_CHUNK_SIZE: usize = FILE_NAME_OFFSET + FILE_NAME_LEN;

/// Trailer of a fresh `SHDR` after its three reference fields.
const FRESH_HEADER_TRAILER: [u8; 12] = [1, 0, 0, 0, 1, 0, 0, 0, 0x00, 0x00, 0x43, 0x4F];

/// Write the 20-byte header shared by SHOC, SWVR and MSIC chunks.
pub fn write_generic_header(
    w: &mut Writer,
    primary: ChunkTag,
    size: usize,
    filler: [u8; FILLER_SIZE],
    secondary: ChunkTag,
) {
    w.write_signature(primary.signature());
    w.write_u32(size as u32);
    w.write_bytes(&filler);
    w.write_signature(secondary.signature());
}

/// The 24-byte CTRL chunk.
pub fn control_chunk(sizes: &ControlSizes) -> Vec<u8> {
    let mut w = Writer::with_capacity(CTRL_SIZE);
    w.write_signature(ChunkTag::Ctrl.signature());
    w.write_u32(CTRL_SIZE as u32);
    w.write_u32(sizes.reserved);
    w.write_u32(sizes.music);
    w.write_u32(sizes.sound);
    w.write_u32(sizes.game_data);
    w.into_bytes()
}

/// Padding that covers exactly `slack` bytes ending at a section boundary.
///
/// No slack needs no chunk and four bytes take a bare FILL tag. Anything
/// else below the eight-byte FILL header cannot be padded. `offset` is
/// where the padding would start and only feeds the error.
pub fn fill_chunk(offset: usize, slack: usize) -> Result<Vec<u8>> {
    match slack {
        0 => Ok(Vec::new()),
        BARE_FILL_SIZE => Ok(ChunkTag::Fill.signature().to_vec()),
        n if n >= FILL_HEADER_SIZE => {
            let mut w = Writer::with_capacity(n);
            w.write_signature(ChunkTag::Fill.signature());
            w.write_u32(n as u32);
            w.write_zeros(n - FILL_HEADER_SIZE);
            Ok(w.into_bytes())
        }
        _ => Err(Error::UnfillableSlack { offset, slack }),
    }
}

/// A fresh 60-byte `SHDR` chunk for an asset with no original header.
///
/// The three reference fields are written as zero.
pub fn fresh_data_header(filler: [u8; FILLER_SIZE], decl: &DataDeclaration) -> Vec<u8> {
    data_header_with_refs(filler, decl, [0; 3])
}

pub fn data_header_with_refs(
    filler: [u8; FILLER_SIZE],
    decl: &DataDeclaration,
    refs: [u32; 3],
) -> Vec<u8> {
    let mut w = Writer::with_capacity(FRESH_HEADER_SIZE);
    write_generic_header(&mut w, ChunkTag::Shoc, FRESH_HEADER_SIZE, filler, ChunkTag::Shdr);
    w.write_u32(decl.header_type);
    w.write_signature(decl.tag.signature());
    w.write_u32(decl.id);
    w.write_u32(decl.data_size);
    for r in refs {
        w.write_u32(r);
    }
    w.write_bytes(&FRESH_HEADER_TRAILER);
    w.into_bytes()
}

/// A fresh `SWVR`/`FILE` chunk naming a sound or the music track.
///
/// Names longer than the 16-byte field are truncated.
pub fn file_chunk(filler: [u8; FILLER_SIZE], name: &str) -> Vec<u8> {
    let mut w = Writer::with_capacity(FILE_CHUNK_SIZE);
    write_generic_header(&mut w, ChunkTag::Swvr, FILE_CHUNK_SIZE, filler, ChunkTag::File);
    let mut field = [0u8; FILE_NAME_LEN];
    let bytes = name.as_bytes();
    let n = bytes.len().min(FILE_NAME_LEN);
    field[..n].copy_from_slice(&bytes[..n]);
    w.write_bytes(&field);
    w.into_bytes()
}

/// Copy of an existing `SHDR` chunk with its declared data size replaced.
pub fn with_data_size(header: &[u8], data_size: usize) -> Result<Vec<u8>> {
    let mut out = header.to_vec();
    write_u32_at(&mut out, SHDR_DATA_SIZE_OFFSET, data_size as u32)?;
    Ok(out)
}

/// Concatenate chunk byte strings into one buffer.
pub fn assemble<I, B>(chunks: I) -> Vec<u8>
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut w = Writer::new();
    for chunk in chunks {
        w.write_bytes(chunk.as_ref());
    }
    w.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ChunkIndex;

    #[test]
    fn fill_sizes() {
        assert!(fill_chunk(0, 0).unwrap().is_empty());
        assert_eq!(fill_chunk(0, 4).unwrap(), ChunkTag::Fill.signature());
        let fill = fill_chunk(0, 16).unwrap();
        assert_eq!(fill.len(), 16);
        assert_eq!(&fill[4..8], &[16, 0, 0, 0]);
        assert!(matches!(
            fill_chunk(100, 6),
            Err(Error::UnfillableSlack { offset: 100, slack: 6 })
        ));
    }

    #[test]
    fn fresh_chunks_index_cleanly() {
        let decl = DataDeclaration {
            header_type: 1,
            tag: ChunkTag::Cdcs,
            id: 9,
            data_size: 0,
        };
        let data = assemble([
            control_chunk(&ControlSizes::default()),
            fresh_data_header(DEFAULT_FILLER, &decl),
            file_chunk(DEFAULT_FILLER, "ENGINE"),
        ]);
        let index = ChunkIndex::parse(&data).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.chunks()[1].size, FRESH_HEADER_SIZE);
        assert_eq!(index.chunks()[1].declaration(), Some(&decl));
        assert_eq!(index.chunks()[2].file_name(), Some("ENGINE"));
        assert_eq!(&data[data.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn data_size_patch() {
        let decl = DataDeclaration {
            header_type: 2,
            tag: ChunkTag::Csac,
            id: 1,
            data_size: 144,
        };
        let header = data_header_with_refs(DEFAULT_FILLER, &decl, [1807, 1775, 107]);
        let patched = with_data_size(&header, 200).unwrap();
        assert_eq!(&patched[32..36], &[200, 0, 0, 0]);
        assert_eq!(&patched[36..40], &1807u32.to_le_bytes());
        assert_eq!(patched.len(), FRESH_HEADER_SIZE);
    }
}
