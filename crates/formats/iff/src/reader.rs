use log::debug;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::header::*;
use crate::tag::{ChunkTag, PRIMARY_TAGS};

/// Ordered index of every top-level chunk in a mission file.
///
/// Built in two passes: the first walks adjacent chunks from offset 0 and
/// extracts per-tag fields, the second decides whether each SWVR chunk opens
/// a sound effect or the music region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkIndex {
    chunks: Vec<ChunkHeader>,
}

impl ChunkIndex {
    /// Index a complete mission file.
    ///
    /// Every byte of `data` must belong to exactly one chunk; a region that
    /// no chunk covers is reported as [`Error::Gap`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let candidates = primary_offsets(data);

        let mut chunks: Vec<ChunkHeader> = Vec::new();
        let mut expected = 0usize;
        for &offset in &candidates {
            // Signature bytes inside a payload land before the expected offset.
            if offset < expected {
                continue;
            }
            if offset > expected {
                return Err(Error::Gap { offset: expected });
            }
            let header = read_chunk(data, chunks.len(), offset)?;
            expected = header.end();
            chunks.push(header);
        }
        if expected != data.len() {
            return Err(Error::Gap { offset: expected });
        }

        classify_swvr(&mut chunks);

        debug!(
            "indexed {} chunks over {} bytes",
            chunks.len(),
            data.len()
        );
        Ok(Self { chunks })
    }

    /// All chunks in file order.
    pub fn chunks(&self) -> &[ChunkHeader] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, chunk_index: usize) -> Option<&ChunkHeader> {
        self.chunks.get(chunk_index)
    }

    /// First chunk with the given primary tag.
    pub fn find(&self, primary: ChunkTag) -> Option<&ChunkHeader> {
        self.chunks.iter().find(|c| c.primary() == primary)
    }

    /// The `SHDR` chunk declaring asset `tag`/`id`.
    pub fn find_data(&self, tag: ChunkTag, id: u32) -> Option<&ChunkHeader> {
        self.chunks.iter().find(|c| c.declares(tag, id))
    }

    /// Every `SHDR` chunk declaring an asset of `tag`, in file order.
    pub fn declarations_of(&self, tag: ChunkTag) -> impl Iterator<Item = &ChunkHeader> {
        self.chunks
            .iter()
            .filter(move |c| c.declaration().is_some_and(|d| d.tag == tag))
    }

    pub fn has_fills(&self) -> bool {
        self.chunks.iter().any(ChunkHeader::is_fill)
    }

    /// SWVR chunks that open a sound effect, in file order.
    pub fn sound_headers(&self) -> impl Iterator<Item = &ChunkHeader> {
        self.chunks
            .iter()
            .filter(|c| c.swvr_role() == Some(SwvrRole::Sound))
    }

    /// The SWVR sound effect chunk named `name`.
    pub fn find_sound(&self, name: &str) -> Option<&ChunkHeader> {
        self.sound_headers().find(|c| c.file_name() == Some(name))
    }

    /// The SWVR chunk that opens the music region.
    pub fn music_start(&self) -> Option<&ChunkHeader> {
        self.chunks
            .iter()
            .find(|c| c.swvr_role() == Some(SwvrRole::MusicStart))
    }

    /// Which region chunk `chunk_index` belongs to.
    ///
    /// The sound region opens at the first sound SWVR and the music region
    /// at the music SWVR; everything before them is game data.
    pub fn region_of(&self, chunk_index: usize) -> Region {
        let music = self.music_start().map(|c| c.chunk_index);
        let sound = self.sound_headers().next().map(|c| c.chunk_index);
        if music.is_some_and(|m| chunk_index >= m) {
            Region::Music
        } else if sound.is_some_and(|s| chunk_index >= s) {
            Region::Sound
        } else {
            Region::GameData
        }
    }

    /// Sub-chunks following the chunk at `owner`, skipping interleaved
    /// FILL padding and stopping at the first chunk of any other kind.
    pub fn run_after(
        &self,
        owner: usize,
        mut is_member: impl FnMut(&ChunkHeader) -> bool,
    ) -> Vec<&ChunkHeader> {
        let mut run = Vec::new();
        for chunk in self.chunks.iter().skip(owner + 1) {
            if chunk.is_fill() {
                continue;
            }
            if !is_member(chunk) {
                break;
            }
            run.push(chunk);
        }
        run
    }

    /// `SDAT` chunks owned by the `SHDR` at `owner`.
    pub fn data_run(&self, owner: usize) -> Vec<&ChunkHeader> {
        self.run_after(owner, ChunkHeader::is_sub_chunk)
    }

    /// MSIC chunks of the music region.
    pub fn music_run(&self) -> Vec<&ChunkHeader> {
        match self.music_start() {
            Some(start) => self.run_after(start.chunk_index, |c| c.music().is_some()),
            None => Vec::new(),
        }
    }

    /// The next chunk after `chunk_index` that is not FILL padding.
    pub fn next_non_fill(&self, chunk_index: usize) -> Option<&ChunkHeader> {
        self.chunks
            .iter()
            .skip(chunk_index + 1)
            .find(|c| !c.is_fill())
    }
}

/// Offsets of every primary-tag signature in `data`, ascending.
fn primary_offsets(data: &[u8]) -> Vec<usize> {
    let signatures = PRIMARY_TAGS.map(ChunkTag::signature);
    data.windows(4)
        .enumerate()
        .filter(|(_, w)| signatures.iter().any(|s| s[..] == **w))
        .map(|(offset, _)| offset)
        .collect()
}

fn is_primary_signature(signature: &[u8; 4]) -> bool {
    ChunkTag::from_signature(signature).is_some_and(ChunkTag::is_primary)
}

/// Read one chunk at `offset` and extract its tag-specific fields.
fn read_chunk(data: &[u8], chunk_index: usize, offset: usize) -> Result<ChunkHeader> {
    let mut c = Cursor::new(data);
    c.seek(offset);
    let signature = c.read_signature()?;
    let tag = ChunkTag::from_signature(&signature)
        .filter(|t| t.is_primary())
        .ok_or(Error::UnknownTag { offset, signature })?;

    // A FILL with no size field is followed directly by the next chunk.
    if tag == ChunkTag::Fill && is_bare_fill(data, offset) {
        return Ok(ChunkHeader {
            chunk_index,
            offset,
            size: BARE_FILL_SIZE,
            kind: ChunkKind::Fill { bare: true },
        });
    }

    let size = c.read_u32()? as usize;
    let min = match tag {
        ChunkTag::Ctrl => CTRL_SIZE,
        ChunkTag::Fill => FILL_HEADER_SIZE,
        ChunkTag::Msic => MSIC_HEADER_SIZE,
        _ => GENERIC_HEADER_SIZE,
    };
    if size < min {
        return Err(Error::ChunkTooSmall { offset, tag, size });
    }
    if offset + size > data.len() {
        return Err(Error::ChunkOverrun {
            offset,
            size,
            len: data.len(),
        });
    }
    // Field reads below never leave the chunk.
    let chunk = &data[offset..offset + size];

    let kind = match tag {
        ChunkTag::Ctrl => ChunkKind::Ctrl(read_control(chunk)?),
        ChunkTag::Shoc => ChunkKind::Shoc(read_shoc(chunk, offset)?),
        ChunkTag::Fill => ChunkKind::Fill { bare: false },
        ChunkTag::Swvr => ChunkKind::Swvr(read_swvr(chunk, offset)?),
        ChunkTag::Msic => ChunkKind::Msic(read_music(chunk)?),
        // Filtered by `is_primary` above.
        _ => return Err(Error::UnknownTag { offset, signature }),
    };

    Ok(ChunkHeader {
        chunk_index,
        offset,
        size,
        kind,
    })
}

fn is_bare_fill(data: &[u8], offset: usize) -> bool {
    let after = offset + BARE_FILL_SIZE;
    if after == data.len() {
        return true;
    }
    match data.get(after..after + 4) {
        Some(next) => {
            let next = [next[0], next[1], next[2], next[3]];
            is_primary_signature(&next)
        }
        None => false,
    }
}

fn read_control(chunk: &[u8]) -> Result<ControlSizes> {
    let mut c = Cursor::new(chunk);
    c.seek(CTRL_RESERVED_OFFSET);
    Ok(ControlSizes {
        reserved: c.read_u32()?,
        music: c.read_u32()?,
        sound: c.read_u32()?,
        game_data: c.read_u32()?,
    })
}

fn read_shoc(chunk: &[u8], offset: usize) -> Result<Shoc> {
    let mut c = Cursor::new(chunk);
    c.seek(SECONDARY_OFFSET);
    let secondary = Secondary::from_signature(c.read_signature()?);
    match secondary {
        Secondary::Known(ChunkTag::Sdat) => Ok(Shoc::Data),
        Secondary::Known(ChunkTag::Shdr) => {
            if chunk.len() < SHDR_MIN_SIZE {
                return Err(Error::ChunkTooSmall {
                    offset,
                    tag: ChunkTag::Shdr,
                    size: chunk.len(),
                });
            }
            let header_type = c.read_u32()?;
            let signature = c.read_signature()?;
            let tag = ChunkTag::from_signature(&signature).ok_or(Error::UnknownTag {
                offset: offset + SHDR_DECLARATION_OFFSET,
                signature,
            })?;
            Ok(Shoc::Header(DataDeclaration {
                header_type,
                tag,
                id: c.read_u32()?,
                data_size: c.read_u32()?,
            }))
        }
        other => Ok(Shoc::Other(other)),
    }
}

fn read_swvr(chunk: &[u8], offset: usize) -> Result<Swvr> {
    let mut c = Cursor::new(chunk);
    c.seek(SECONDARY_OFFSET);
    let secondary = Secondary::from_signature(c.read_signature()?);
    let file_name = if secondary == Secondary::Known(ChunkTag::File) {
        let raw = c.read_bytes(FILE_NAME_LEN).map_err(|_| Error::ChunkTooSmall {
            offset,
            tag: ChunkTag::File,
            size: chunk.len(),
        })?;
        Some(decode_file_name(raw))
    } else {
        None
    };
    Ok(Swvr {
        secondary,
        file_name,
        // Settled once the following chunk is known.
        role: SwvrRole::Sound,
    })
}

fn read_music(chunk: &[u8]) -> Result<MusicChunk> {
    let mut c = Cursor::new(chunk);
    c.seek(MSIC_LOOP_OFFSET);
    Ok(MusicChunk {
        loop_number: c.read_u32()?,
        unknown_music_number: c.read_u32()?,
    })
}

/// Text up to the first NUL of a fixed-width name field.
pub(crate) fn decode_file_name(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// An SWVR followed (past any FILL) by an MSIC chunk opens the music region.
fn classify_swvr(chunks: &mut [ChunkHeader]) {
    for i in 0..chunks.len() {
        if !matches!(chunks[i].kind, ChunkKind::Swvr(_)) {
            continue;
        }
        let opens_music = chunks[i + 1..]
            .iter()
            .find(|c| !c.is_fill())
            .is_some_and(|c| c.music().is_some());
        if let ChunkKind::Swvr(swvr) = &mut chunks[i].kind {
            swvr.role = if opens_music {
                SwvrRole::MusicStart
            } else {
                SwvrRole::Sound
            };
        }
    }
}
