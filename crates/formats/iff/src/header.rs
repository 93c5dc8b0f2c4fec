use std::fmt;

use crate::tag::{display_signature, ChunkTag};

/// Size of the CTRL chunk, which is always the first chunk of a file.
pub const CTRL_SIZE: usize = 24;
/// Bytes before a SHOC, SWVR or MSIC chunk's body: tag, size, filler, secondary tag.
pub const GENERIC_HEADER_SIZE: usize = 20;
/// Bytes before an MSIC chunk's audio: the generic header, loop number, trailer.
pub const MSIC_HEADER_SIZE: usize = 28;
/// Opaque field between the size and the secondary tag.
pub const FILLER_SIZE: usize = 8;
/// Size of a FILL chunk that is only its tag.
pub const BARE_FILL_SIZE: usize = 4;
/// Size of a FILL chunk's tag and size fields.
pub const FILL_HEADER_SIZE: usize = 8;

pub(crate) const SIZE_OFFSET: usize = 4;
pub(crate) const FILLER_OFFSET: usize = 8;
pub(crate) const SECONDARY_OFFSET: usize = 16;
pub(crate) const SHDR_TYPE_OFFSET: usize = 20;
pub(crate) const SHDR_DECLARATION_OFFSET: usize = 24;
pub(crate) const SHDR_ID_OFFSET: usize = 28;
pub(crate) const SHDR_DATA_SIZE_OFFSET: usize = 32;
/// Smallest SHDR chunk: everything through the data size field.
pub(crate) const SHDR_MIN_SIZE: usize = 36;
pub(crate) const FILE_NAME_OFFSET: usize = 20;
pub(crate) const FILE_NAME_LEN: usize = 16;
pub(crate) const MSIC_LOOP_OFFSET: usize = 20;
pub(crate) const MSIC_UNKNOWN_OFFSET: usize = 24;
pub(crate) const CTRL_RESERVED_OFFSET: usize = 8;
pub(crate) const CTRL_MUSIC_OFFSET: usize = 12;
pub(crate) const CTRL_SOUND_OFFSET: usize = 16;
pub(crate) const CTRL_GAME_OFFSET: usize = 20;

/// One top-level chunk located in a mission file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Position in the chunk index (not a file offset).
    pub chunk_index: usize,
    /// Absolute byte offset of the chunk's tag.
    pub offset: usize,
    /// Total chunk size, header included.
    pub size: usize,
    /// Primary-tag specific fields.
    pub kind: ChunkKind,
}

/// Fields defined by each primary tag's layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkKind {
    Ctrl(ControlSizes),
    Shoc(Shoc),
    /// Alignment padding. `bare` marks the 4-byte tag-only form.
    Fill { bare: bool },
    Swvr(Swvr),
    Msic(MusicChunk),
}

/// A SHOC chunk, split on its secondary tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shoc {
    /// `SDAT`: one slice of an asset's payload.
    Data,
    /// `SHDR`: the header that owns the `SDAT` run after it.
    Header(DataDeclaration),
    /// Any other secondary tag; kept verbatim.
    Other(Secondary),
}

/// A secondary tag that may not be one this crate knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secondary {
    Known(ChunkTag),
    /// Raw on-disk bytes of an unrecognised tag.
    Unknown([u8; 4]),
}

impl Secondary {
    pub fn from_signature(signature: [u8; 4]) -> Self {
        match ChunkTag::from_signature(&signature) {
            Some(tag) => Secondary::Known(tag),
            None => Secondary::Unknown(signature),
        }
    }

    pub fn tag(self) -> Option<ChunkTag> {
        match self {
            Secondary::Known(tag) => Some(tag),
            Secondary::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Secondary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Secondary::Known(tag) => write!(f, "{tag}"),
            Secondary::Unknown(raw) => write!(f, "?{}", display_signature(raw)),
        }
    }
}

/// The asset declaration carried by a `SHOC`/`SHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDeclaration {
    /// Number stored right after the `SHDR` tag. Meaning unknown.
    pub header_type: u32,
    /// Which asset kind the header describes.
    pub tag: ChunkTag,
    /// Asset id, unique within `tag`.
    pub id: u32,
    /// Logical payload size before sub-chunking.
    pub data_size: u32,
}

/// Whether an SWVR chunk opens a sound effect or the music region.
///
/// Only decidable from the chunk that follows it, so the index builder
/// assigns it in a second pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwvrRole {
    Sound,
    MusicStart,
}

/// An SWVR chunk, shared by sound effects and music.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swvr {
    pub secondary: Secondary,
    /// Present when the secondary tag is `FILE`.
    pub file_name: Option<String>,
    pub role: SwvrRole,
}

/// Sequencing fields of one MSIC chunk. Stored opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicChunk {
    pub loop_number: u32,
    pub unknown_music_number: u32,
}

/// Aggregate byte counts held by the CTRL chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlSizes {
    pub reserved: u32,
    pub music: u32,
    pub sound: u32,
    pub game_data: u32,
}

/// The three regions a mission file is divided into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    GameData,
    Sound,
    Music,
}

impl ChunkHeader {
    pub fn primary(&self) -> ChunkTag {
        match self.kind {
            ChunkKind::Ctrl(_) => ChunkTag::Ctrl,
            ChunkKind::Shoc(_) => ChunkTag::Shoc,
            ChunkKind::Fill { .. } => ChunkTag::Fill,
            ChunkKind::Swvr(_) => ChunkTag::Swvr,
            ChunkKind::Msic(_) => ChunkTag::Msic,
        }
    }

    /// Offset of the first byte after this chunk.
    pub fn end(&self) -> usize {
        self.offset + self.size
    }

    pub fn secondary(&self) -> Option<ChunkTag> {
        match &self.kind {
            ChunkKind::Shoc(Shoc::Data) => Some(ChunkTag::Sdat),
            ChunkKind::Shoc(Shoc::Header(_)) => Some(ChunkTag::Shdr),
            ChunkKind::Shoc(Shoc::Other(secondary)) => secondary.tag(),
            ChunkKind::Swvr(swvr) => swvr.secondary.tag(),
            ChunkKind::Msic(_) => Some(ChunkTag::Msic),
            ChunkKind::Ctrl(_) | ChunkKind::Fill { .. } => None,
        }
    }

    pub fn declaration(&self) -> Option<&DataDeclaration> {
        match &self.kind {
            ChunkKind::Shoc(Shoc::Header(decl)) => Some(decl),
            _ => None,
        }
    }

    /// Whether this is the `SHDR` header of asset `tag`/`id`.
    pub fn declares(&self, tag: ChunkTag, id: u32) -> bool {
        self.declaration()
            .is_some_and(|decl| decl.tag == tag && decl.id == id)
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.kind {
            ChunkKind::Swvr(swvr) => swvr.file_name.as_deref(),
            _ => None,
        }
    }

    pub fn swvr_role(&self) -> Option<SwvrRole> {
        match &self.kind {
            ChunkKind::Swvr(swvr) => Some(swvr.role),
            _ => None,
        }
    }

    pub fn music(&self) -> Option<&MusicChunk> {
        match &self.kind {
            ChunkKind::Msic(music) => Some(music),
            _ => None,
        }
    }

    pub fn control(&self) -> Option<&ControlSizes> {
        match &self.kind {
            ChunkKind::Ctrl(sizes) => Some(sizes),
            _ => None,
        }
    }

    pub fn is_fill(&self) -> bool {
        matches!(self.kind, ChunkKind::Fill { .. })
    }

    pub fn is_sub_chunk(&self) -> bool {
        matches!(self.kind, ChunkKind::Shoc(Shoc::Data))
    }
}

impl fmt::Display for ChunkHeader {
    /// One-line dump: `index offset PRIMARY size` followed by whichever
    /// optional fields the chunk carries.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.chunk_index,
            self.offset,
            self.primary(),
            self.size
        )?;
        match &self.kind {
            ChunkKind::Ctrl(sizes) => write!(
                f,
                " music={} sound={} game={}",
                sizes.music, sizes.sound, sizes.game_data
            ),
            ChunkKind::Shoc(Shoc::Data) => write!(f, " SDAT"),
            ChunkKind::Shoc(Shoc::Header(decl)) => write!(
                f,
                " SHDR {} {} {}",
                decl.tag, decl.id, decl.data_size
            ),
            ChunkKind::Shoc(Shoc::Other(secondary)) => write!(f, " {secondary}"),
            ChunkKind::Fill { bare: true } => write!(f, " bare"),
            ChunkKind::Fill { bare: false } => Ok(()),
            ChunkKind::Swvr(swvr) => {
                write!(f, " {}", swvr.secondary)?;
                if let Some(name) = &swvr.file_name {
                    write!(f, " {name}")?;
                }
                if swvr.role == SwvrRole::MusicStart {
                    write!(f, " music")?;
                }
                Ok(())
            }
            ChunkKind::Msic(music) => write!(
                f,
                " MSIC {} {}",
                music.loop_number, music.unknown_music_number
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: ChunkKind) -> ChunkHeader {
        ChunkHeader {
            chunk_index: 3,
            offset: 120,
            size: 60,
            kind,
        }
    }

    #[test]
    fn accessors_follow_the_variant() {
        let shdr = header(ChunkKind::Shoc(Shoc::Header(DataDeclaration {
            header_type: 1,
            tag: ChunkTag::Cnet,
            id: 4,
            data_size: 10,
        })));
        assert_eq!(shdr.primary(), ChunkTag::Shoc);
        assert_eq!(shdr.secondary(), Some(ChunkTag::Shdr));
        assert!(shdr.declares(ChunkTag::Cnet, 4));
        assert!(!shdr.declares(ChunkTag::Cnet, 5));
        assert_eq!(shdr.end(), 180);
        assert_eq!(shdr.file_name(), None);

        let fill = header(ChunkKind::Fill { bare: true });
        assert!(fill.is_fill());
        assert_eq!(fill.secondary(), None);
    }

    #[test]
    fn display_line() {
        let swvr = header(ChunkKind::Swvr(Swvr {
            secondary: Secondary::Known(ChunkTag::File),
            file_name: Some("ENGINE".into()),
            role: SwvrRole::Sound,
        }));
        assert_eq!(swvr.to_string(), "3 120 SWVR 60 FILE ENGINE");

        let other = header(ChunkKind::Shoc(Shoc::Other(Secondary::Unknown(*b"ZYXW"))));
        assert_eq!(other.to_string(), "3 120 SHOC 60 ?WXYZ");
    }
}
