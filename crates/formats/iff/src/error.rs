use crate::tag::{display_signature, ChunkTag};

/// Broad failure category, for callers that only care which class of
/// problem occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The requested tag, id, or file name has no matching chunk.
    NotFound,
    /// A payload or image does not have the length the file declares.
    SizeMismatch,
    /// The buffer violates the container's structure.
    Corrupt,
    /// FILL padding is present when it must be absent, or cannot be laid out.
    PaddingState,
    /// The payload already carries the wrapper or chunking being applied.
    AlreadyFormatted,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no {tag} data with id {id}")]
    DataNotFound { tag: ChunkTag, id: u32 },

    #[error("no sound named {name:?}")]
    SoundNotFound { name: String },

    #[error("file has no music region")]
    MusicNotFound,

    #[error("file has no CTRL chunk at offset 0")]
    ControlNotFound,

    #[error("{context}: no {tag} sub-chunk")]
    SubChunkNotFound { tag: ChunkTag, context: &'static str },

    #[error("{context}: expected {expected} bytes, found {found}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("unexpected end of data at offset {offset} (need {need} bytes, have {have})")]
    UnexpectedEof {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("chunk at offset {offset} declares {size} bytes but the buffer ends at {len}")]
    ChunkOverrun {
        offset: usize,
        size: usize,
        len: usize,
    },

    #[error("{tag} chunk at offset {offset} is too small ({size} bytes)")]
    ChunkTooSmall {
        offset: usize,
        tag: ChunkTag,
        size: usize,
    },

    #[error("no chunk starts at offset {offset}")]
    Gap { offset: usize },

    #[error("unknown chunk tag {:?} at offset {offset}", display_signature(.signature))]
    UnknownTag { offset: usize, signature: [u8; 4] },

    #[error("{tag} {id}: declared size needs {expected} sub-chunks, found {found}")]
    SubChunkCount {
        tag: ChunkTag,
        id: u32,
        expected: usize,
        found: usize,
    },

    #[error("expected {expected} chunk at offset {offset}, found {found}")]
    UnexpectedChunk {
        offset: usize,
        expected: ChunkTag,
        found: String,
    },

    #[error("{tag} {id} has no place in a mission file")]
    UnsupportedAsset { tag: ChunkTag, id: u32 },

    #[error("{context}: {message}")]
    Parse {
        context: &'static str,
        message: String,
    },

    #[error("FILL chunks must be removed first")]
    FillsPresent,

    #[error("cannot pad {slack} bytes before offset {offset}")]
    UnfillableSlack { offset: usize, slack: usize },

    #[error("chunk at offset {offset} ({size} bytes) is larger than a section")]
    ChunkExceedsSection { offset: usize, size: usize },

    #[error("data already has chunks inside")]
    AlreadyChunked,

    #[error("data is already {format} formatted")]
    AlreadyWrapped { format: &'static str },

    #[error("data is not {format} formatted")]
    NotWrapped { format: &'static str },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DataNotFound { .. }
            | Error::SoundNotFound { .. }
            | Error::MusicNotFound
            | Error::ControlNotFound
            | Error::SubChunkNotFound { .. } => ErrorKind::NotFound,
            Error::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Error::UnexpectedEof { .. }
            | Error::ChunkOverrun { .. }
            | Error::ChunkTooSmall { .. }
            | Error::Gap { .. }
            | Error::UnknownTag { .. }
            | Error::SubChunkCount { .. }
            | Error::UnexpectedChunk { .. }
            | Error::UnsupportedAsset { .. }
            | Error::Parse { .. } => ErrorKind::Corrupt,
            Error::FillsPresent
            | Error::UnfillableSlack { .. }
            | Error::ChunkExceedsSection { .. } => ErrorKind::PaddingState,
            Error::AlreadyChunked | Error::AlreadyWrapped { .. } | Error::NotWrapped { .. } => {
                ErrorKind::AlreadyFormatted
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
