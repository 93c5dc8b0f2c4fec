//! Reader and writer for Future Cop mission files.
//!
//! A mission file is an IFF variant: a flat run of `CTRL`, `SHOC`, `FILL`,
//! `SWVR` and `MSIC` chunks with byte-reversed tags. Assets are stored as a
//! `SHOC`/`SHDR` header followed by `SDAT` sub-chunks, sound effects behind
//! a named `SWVR` chunk, and the music track as a run of `MSIC` chunks.
//! The file is padded with `FILL` chunks so that no chunk crosses a
//! 24576-byte section.
//!
//! [`IffFile`] is an indexed snapshot of the raw bytes; its edits return a
//! new snapshot. [`MissionFile`] decodes every asset into its own buffer and
//! compiles them back into a complete file.

pub mod assets;
pub mod codec;
pub mod cursor;
pub mod edit;
pub mod error;
pub mod file;
pub mod header;
pub mod mission;
pub mod reader;
pub mod tag;
pub mod wrap;
pub mod writer;

pub use edit::SECTION_SIZE;
pub use error::{Error, ErrorKind, Result};
pub use file::IffFile;
pub use header::{
    ChunkHeader, ChunkKind, ControlSizes, DataDeclaration, MusicChunk, Region, Secondary, Shoc,
    Swvr, SwvrRole,
};
pub use mission::{Asset, ExportedFile, MissionFile, Music, Sound};
pub use reader::ChunkIndex;
pub use tag::{ChunkTag, PRIMARY_TAGS};
pub use wrap::{AudioFormat, Wrap};
