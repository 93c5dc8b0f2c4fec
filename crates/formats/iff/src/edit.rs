//! Edits over an [`IffFile`].
//!
//! Every edit writes a complete new buffer and re-indexes it, so a failure
//! part way through leaves the original file untouched.

use std::collections::HashSet;

use log::debug;

use crate::codec;
use crate::cursor::{slice_at, Writer};
use crate::error::{Error, Result};
use crate::file::IffFile;
use crate::header::{ChunkHeader, ChunkKind, ControlSizes, Region, CTRL_SIZE, GENERIC_HEADER_SIZE};
use crate::tag::ChunkTag;
use crate::writer::{control_chunk, fill_chunk, with_data_size};

/// Alignment unit of the game's streaming reader.
pub const SECTION_SIZE: usize = 24576;

/// What to do with one chunk while rebuilding a buffer.
enum Splice {
    Keep,
    Drop,
    Replace(Vec<u8>),
}

impl IffFile {
    /// Rebuild the file chunk by chunk and index the result.
    fn splice(&self, mut decide: impl FnMut(&ChunkHeader) -> Result<Splice>) -> Result<IffFile> {
        let mut w = Writer::with_capacity(self.len());
        for chunk in self.index().chunks() {
            match decide(chunk)? {
                Splice::Keep => w.write_bytes(self.chunk_bytes(chunk)?),
                Splice::Drop => {}
                Splice::Replace(bytes) => w.write_bytes(&bytes),
            }
        }
        IffFile::parse(w.into_bytes())
    }

    fn require_no_fills(&self) -> Result<()> {
        if self.index().has_fills() {
            return Err(Error::FillsPresent);
        }
        Ok(())
    }

    /// Overwrite the payload of asset `tag`/`id` with bytes of the same
    /// length. Offsets do not move, so FILL padding may stay in place.
    pub fn replace_payload(&self, tag: ChunkTag, id: u32, bytes: &[u8]) -> Result<IffFile> {
        let owner = self
            .index()
            .find_data(tag, id)
            .ok_or(Error::DataNotFound { tag, id })?;
        // Declared by `find_data`.
        let data_size = owner.declaration().map_or(0, |d| d.data_size as usize);
        if bytes.len() != data_size {
            return Err(Error::SizeMismatch {
                context: "replacement payload",
                expected: data_size,
                found: bytes.len(),
            });
        }
        let run = self.index().data_run(owner.chunk_index);
        let expected = codec::sub_chunk_count(data_size, codec::SUB_CHUNK_CAPACITY);
        if run.len() != expected {
            return Err(Error::SubChunkCount {
                tag,
                id,
                expected,
                found: run.len(),
            });
        }

        let mut out = self.data().to_vec();
        let mut consumed = 0;
        for chunk in run {
            let start = chunk.offset + GENERIC_HEADER_SIZE;
            let len = chunk.size - GENERIC_HEADER_SIZE;
            let src = slice_at(bytes, consumed, len)?;
            out[start..start + len].copy_from_slice(src);
            consumed += len;
        }
        if consumed != bytes.len() {
            return Err(Error::SizeMismatch {
                context: "sub-chunk payload",
                expected: bytes.len(),
                found: consumed,
            });
        }
        IffFile::parse(out)
    }

    /// Remove asset `tag`/`id` with all of its sub-chunks, or every asset
    /// of `tag` when `id` is `None`.
    pub fn remove_asset(&self, tag: ChunkTag, id: Option<u32>) -> Result<IffFile> {
        self.require_no_fills()?;
        let mut doomed = HashSet::new();
        for owner in self.index().declarations_of(tag) {
            if id.is_some_and(|id| !owner.declares(tag, id)) {
                continue;
            }
            doomed.insert(owner.chunk_index);
            doomed.extend(self.index().data_run(owner.chunk_index).iter().map(|c| c.chunk_index));
        }
        match id {
            Some(id) if doomed.is_empty() => return Err(Error::DataNotFound { tag, id }),
            _ => {}
        }
        debug!("removing {} chunks of {tag}", doomed.len());
        self.splice(|c| {
            Ok(if doomed.contains(&c.chunk_index) {
                Splice::Drop
            } else {
                Splice::Keep
            })
        })
    }

    /// Insert raw bytes at `offset`. The result must still index cleanly,
    /// so `offset` has to be a chunk boundary and `bytes` whole chunks.
    pub fn insert_raw(&self, offset: usize, bytes: &[u8]) -> Result<IffFile> {
        if offset > self.len() {
            return Err(Error::UnexpectedEof {
                offset,
                need: offset,
                have: self.len(),
            });
        }
        let mut out = Vec::with_capacity(self.len() + bytes.len());
        out.extend_from_slice(&self.data()[..offset]);
        out.extend_from_slice(bytes);
        out.extend_from_slice(&self.data()[offset..]);
        IffFile::parse(out)
    }

    pub fn remove_all_fills(&self) -> Result<IffFile> {
        self.splice(|c| Ok(if c.is_fill() { Splice::Drop } else { Splice::Keep }))
    }

    /// Pad the file so every section of [`SECTION_SIZE`] bytes ends on a
    /// chunk boundary.
    ///
    /// A chunk that would cross a boundary is pushed to the next section
    /// behind a FILL, every SWVR chunk starts a new section, and the last
    /// section is padded to full size.
    pub fn add_fills(&self) -> Result<IffFile> {
        self.require_no_fills()?;
        let mut w = Writer::with_capacity(self.len() + SECTION_SIZE);
        let mut section = 0usize;
        let mut fills = 0usize;
        for chunk in self.index().chunks() {
            if chunk.size > SECTION_SIZE {
                return Err(Error::ChunkExceedsSection {
                    offset: chunk.offset,
                    size: chunk.size,
                });
            }
            let bytes = self.chunk_bytes(chunk)?;
            if section + chunk.size == SECTION_SIZE {
                w.write_bytes(bytes);
                section = 0;
            } else if section + chunk.size > SECTION_SIZE || chunk.primary() == ChunkTag::Swvr {
                let fill = fill_chunk(w.position(), slack(section))?;
                fills += usize::from(!fill.is_empty());
                w.write_bytes(&fill);
                w.write_bytes(bytes);
                section = chunk.size;
            } else {
                w.write_bytes(bytes);
                section += chunk.size;
            }
        }
        let trailing = fill_chunk(w.position(), slack(section))?;
        fills += usize::from(!trailing.is_empty());
        w.write_bytes(&trailing);
        debug!("added {fills} FILL chunks");
        IffFile::parse(w.into_bytes())
    }

    /// Recompute the CTRL chunk's region sizes.
    ///
    /// The three sizes cover every chunk after CTRL, FILL padding included,
    /// so they add up to the file length minus 24. The reserved field is
    /// kept.
    pub fn recreate_ctrl(&self) -> Result<IffFile> {
        let ctrl = match self.index().get(0) {
            Some(ChunkHeader {
                kind: ChunkKind::Ctrl(sizes),
                size: CTRL_SIZE,
                ..
            }) => *sizes,
            _ => return Err(Error::ControlNotFound),
        };
        let mut sizes = ControlSizes {
            reserved: ctrl.reserved,
            ..ControlSizes::default()
        };
        for chunk in self.index().chunks().iter().skip(1) {
            let total = match self.index().region_of(chunk.chunk_index) {
                Region::GameData => &mut sizes.game_data,
                Region::Sound => &mut sizes.sound,
                Region::Music => &mut sizes.music,
            };
            *total += chunk.size as u32;
        }
        debug!(
            "CTRL: game {} sound {} music {}",
            sizes.game_data, sizes.sound, sizes.music
        );

        let mut out = self.data().to_vec();
        out[..CTRL_SIZE].copy_from_slice(&control_chunk(&sizes));
        IffFile::parse(out)
    }

    /// Replace asset `tag`/`id` with a payload of any length, keeping its
    /// header bytes apart from the declared size.
    pub fn replace_asset(&self, tag: ChunkTag, id: u32, bytes: &[u8]) -> Result<IffFile> {
        self.require_no_fills()?;
        let owner = self
            .index()
            .find_data(tag, id)
            .ok_or(Error::DataNotFound { tag, id })?;
        self.replace_run(owner, bytes)
    }

    /// Replace the audio of the sound effect `name`.
    pub fn replace_sound(&self, name: &str, bytes: &[u8]) -> Result<IffFile> {
        self.require_no_fills()?;
        let owner = self.sound_declaration(name)?;
        self.replace_run(owner, bytes)
    }

    /// Replace the music track. The SWVR chunk that opens the music region
    /// is kept; its MSIC run is rebuilt.
    pub fn replace_music(&self, bytes: &[u8]) -> Result<IffFile> {
        self.require_no_fills()?;
        let start = self.index().music_start().ok_or(Error::MusicNotFound)?;
        let run: HashSet<usize> = self.index().music_run().iter().map(|c| c.chunk_index).collect();
        let mut music = Some(codec::split_music_with(self.filler(), bytes)?);
        let start = start.chunk_index;
        self.splice(|c| {
            Ok(if c.chunk_index == start {
                let mut out = self.chunk_bytes(c)?.to_vec();
                out.extend(music.take().unwrap_or_default());
                Splice::Replace(out)
            } else if run.contains(&c.chunk_index) {
                Splice::Drop
            } else {
                Splice::Keep
            })
        })
    }

    /// Swap the `SDAT` run owned by `owner` for a fresh split of `bytes`
    /// and patch the declared size.
    fn replace_run(&self, owner: &ChunkHeader, bytes: &[u8]) -> Result<IffFile> {
        let run: HashSet<usize> = self
            .index()
            .data_run(owner.chunk_index)
            .iter()
            .map(|c| c.chunk_index)
            .collect();
        let mut replacement = with_data_size(self.chunk_bytes(owner)?, bytes.len())?;
        replacement.extend(codec::split_data_with(self.filler(), bytes)?);
        let mut replacement = Some(replacement);
        let owner = owner.chunk_index;
        self.splice(|c| {
            Ok(if c.chunk_index == owner {
                Splice::Replace(replacement.take().unwrap_or_default())
            } else if run.contains(&c.chunk_index) {
                Splice::Drop
            } else {
                Splice::Keep
            })
        })
    }
}

/// Bytes left before the next section boundary.
fn slack(section: usize) -> usize {
    (SECTION_SIZE - section % SECTION_SIZE) % SECTION_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::read_u32_at;
    use crate::header::DataDeclaration;
    use crate::writer::{assemble, file_chunk, fresh_data_header, DEFAULT_FILLER};

    fn decl(tag: ChunkTag, id: u32, data_size: usize) -> DataDeclaration {
        DataDeclaration {
            header_type: 1,
            tag,
            id,
            data_size: data_size as u32,
        }
    }

    fn asset(tag: ChunkTag, id: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = fresh_data_header(DEFAULT_FILLER, &decl(tag, id, payload.len()));
        out.extend(codec::split_data(payload).unwrap());
        out
    }

    fn file(parts: &[Vec<u8>]) -> IffFile {
        let mut chunks = vec![control_chunk(&ControlSizes::default())];
        chunks.extend_from_slice(parts);
        IffFile::parse(assemble(chunks)).unwrap()
    }

    #[test]
    fn replace_payload_keeps_layout() {
        let f = file(&[asset(ChunkTag::Cnet, 1, b"0123456789")]);
        let g = f.replace_payload(ChunkTag::Cnet, 1, b"abcdefghij").unwrap();
        assert_eq!(g.export_data(ChunkTag::Cnet, 1).unwrap(), b"abcdefghij");
        assert_eq!(g.len(), f.len());
        // The receiver is unchanged.
        assert_eq!(f.export_data(ChunkTag::Cnet, 1).unwrap(), b"0123456789");

        let err = f.replace_payload(ChunkTag::Cnet, 1, b"short").unwrap_err();
        assert!(matches!(err, Error::SizeMismatch { expected: 10, found: 5, .. }));
        let err = f.replace_payload(ChunkTag::Cnet, 2, b"0123456789").unwrap_err();
        assert!(matches!(err, Error::DataNotFound { .. }));
    }

    #[test]
    fn remove_by_id_and_by_tag() {
        let f = file(&[
            asset(ChunkTag::Cdcs, 1, &[1; 5000]),
            asset(ChunkTag::Cdcs, 2, &[2; 10]),
            asset(ChunkTag::Cnet, 1, &[3; 10]),
        ]);
        let g = f.remove_asset(ChunkTag::Cdcs, Some(1)).unwrap();
        assert!(g.index().find_data(ChunkTag::Cdcs, 1).is_none());
        assert_eq!(g.export_data(ChunkTag::Cdcs, 2).unwrap(), [2; 10]);

        let h = f.remove_asset(ChunkTag::Cdcs, None).unwrap();
        assert_eq!(h.index().declarations_of(ChunkTag::Cdcs).count(), 0);
        assert_eq!(h.export_data(ChunkTag::Cnet, 1).unwrap(), [3; 10]);
        assert_eq!(h.index().len(), 3);

        assert!(f.remove_asset(ChunkTag::Cdcs, Some(7)).is_err());
    }

    #[test]
    fn size_changing_edits_refuse_fills() {
        let f = file(&[asset(ChunkTag::Cnet, 1, &[3; 10])]).add_fills().unwrap();
        assert!(matches!(f.remove_asset(ChunkTag::Cnet, Some(1)), Err(Error::FillsPresent)));
        assert!(matches!(f.add_fills(), Err(Error::FillsPresent)));
        assert!(matches!(f.replace_asset(ChunkTag::Cnet, 1, &[1]), Err(Error::FillsPresent)));
    }

    #[test]
    fn fills_pad_to_sections_and_strip_back() {
        let f = file(&[
            asset(ChunkTag::Cdcs, 1, &[1; 30000]),
            file_chunk(DEFAULT_FILLER, "ENGINE"),
            asset(ChunkTag::Snds, 1, &[0x80; 100]),
        ]);
        let padded = f.add_fills().unwrap();
        assert_eq!(padded.len() % SECTION_SIZE, 0);
        for chunk in padded.index().chunks() {
            let start = chunk.offset % SECTION_SIZE;
            assert!(start + chunk.size <= SECTION_SIZE, "{chunk} crosses a section");
            if chunk.primary() == ChunkTag::Swvr {
                assert_eq!(start, 0);
            }
        }
        let stripped = padded.remove_all_fills().unwrap();
        assert_eq!(stripped.data(), f.data());
        assert_eq!(stripped.add_fills().unwrap().data(), padded.data());
    }

    #[test]
    fn exact_fit_needs_no_fill() {
        // CTRL + 60-byte header + SDAT runs filling the section exactly.
        let payload = SECTION_SIZE - CTRL_SIZE - 60 - 6 * GENERIC_HEADER_SIZE;
        let f = file(&[asset(ChunkTag::Cdcs, 1, &vec![1; payload])]);
        assert_eq!(f.len(), SECTION_SIZE);
        let padded = f.add_fills().unwrap();
        assert_eq!(padded.data(), f.data());
        assert!(!padded.index().has_fills());
    }

    #[test]
    fn four_byte_slack_uses_bare_fill() {
        let payload = SECTION_SIZE - CTRL_SIZE - 60 - 6 * GENERIC_HEADER_SIZE - 4;
        let f = file(&[asset(ChunkTag::Cdcs, 1, &vec![1; payload])]);
        let padded = f.add_fills().unwrap();
        assert_eq!(padded.len(), SECTION_SIZE);
        let last = padded.index().chunks().last().unwrap();
        assert_eq!(last.kind, ChunkKind::Fill { bare: true });
        assert_eq!(last.size, 4);
    }

    #[test]
    fn ctrl_sums_exclude_itself() {
        let mut music = file_chunk(DEFAULT_FILLER, "THEME");
        music.extend(codec::split_music(&[0x7F; 40000]).unwrap());
        let f = file(&[
            asset(ChunkTag::Cnet, 1, &[3; 10]),
            file_chunk(DEFAULT_FILLER, "ENGINE"),
            asset(ChunkTag::Snds, 1, &[0x80; 100]),
            music,
        ]);
        for g in [f.recreate_ctrl().unwrap(), f.add_fills().unwrap().recreate_ctrl().unwrap()] {
            let sizes = *g.index().get(0).unwrap().control().unwrap();
            assert_eq!(
                (sizes.game_data + sizes.sound + sizes.music) as usize,
                g.len() - CTRL_SIZE
            );
            assert!(sizes.sound > 0 && sizes.music > 0);
            assert_eq!(read_u32_at(g.data(), 4).unwrap(), 24);
        }
    }

    #[test]
    fn size_changing_replacements() {
        let mut music = file_chunk(DEFAULT_FILLER, "THEME");
        music.extend(codec::split_music(&[0x7F; 10]).unwrap());
        let f = file(&[
            asset(ChunkTag::Cnet, 1, &[3; 10]),
            file_chunk(DEFAULT_FILLER, "ENGINE"),
            asset(ChunkTag::Snds, 1, &[0x80; 100]),
            music,
        ]);

        let g = f.replace_asset(ChunkTag::Cnet, 1, &[4; 5000]).unwrap();
        assert_eq!(g.export_data(ChunkTag::Cnet, 1).unwrap(), vec![4; 5000]);

        let g = g.replace_sound("ENGINE", &[0x81; 3]).unwrap();
        assert_eq!(g.export_sound("ENGINE").unwrap(), [0x81; 3]);

        let g = g.replace_music(&[0x10; 30000]).unwrap();
        assert_eq!(g.export_music().unwrap(), vec![0x10; 30000]);
        assert_eq!(g.music_name(), Some("THEME"));
        assert_eq!(g.index().music_run().len(), 2);
    }

    #[test]
    fn insert_raw_must_stay_indexable() {
        let f = file(&[]);
        let g = f.insert_raw(CTRL_SIZE, &asset(ChunkTag::Cfun, 1, &[5; 4])).unwrap();
        assert_eq!(g.export_data(ChunkTag::Cfun, 1).unwrap(), [5; 4]);
        assert!(f.insert_raw(CTRL_SIZE, &[1, 2, 3]).is_err());
        assert!(matches!(
            f.insert_raw(100, &[]),
            Err(Error::UnexpectedEof {
                offset: 100,
                need: 100,
                have: CTRL_SIZE
            })
        ));
    }
}
