use std::fmt;
use std::str::FromStr;

/// A recognised 4-byte chunk tag.
///
/// Tags are named by their mnemonic (`CTRL`, `Cbmp`, `4DGI`, ...). On disk
/// every tag is stored byte-reversed, so `CTRL` appears as `LRTC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChunkTag {
    // Primary (top-level container) tags.
    Ctrl,
    Shoc,
    Fill,
    Msic,
    Swvr,

    // Secondary tags.
    Sdat,
    Shdr,
    File,

    // Data declarations (asset kinds).
    Null,
    Rpns,
    Cwav,
    Cobj,
    Snds,
    Cctr,
    Cact,
    Csac,
    Cbmp,
    Cnet,
    Cfun,
    Ctil,
    Cptc,
    Ctos,
    Cshd,
    Cfnt,
    Cdcs,
    Canm,

    // Nested chunks.
    Ptnf,

    // Cobj sub-chunks.
    FourDgi,
    ThreeDtl,
    ThreeDql,
    ThreeDrf,
    FourDvl,
    FourDnl,
    ThreeDrl,
    ThreeDbb,
    ThreeDhy,
    ThreeDmi,
    ThreeDhs,
    AnmD,

    // Cfun sub-chunks.
    TFun,
    TExt,

    // Cbmp sub-chunks.
    Lccb,
    LkUp,
    Px16,
    Plut,

    // Cact / Csac sub-chunks.
    TAct,
    ARsl,
    TSac,
}

/// The five tags that start a top-level chunk.
pub const PRIMARY_TAGS: [ChunkTag; 5] = [
    ChunkTag::Ctrl,
    ChunkTag::Shoc,
    ChunkTag::Fill,
    ChunkTag::Swvr,
    ChunkTag::Msic,
];

const MNEMONICS: &[(ChunkTag, &[u8; 4])] = &[
    (ChunkTag::Ctrl, b"CTRL"),
    (ChunkTag::Shoc, b"SHOC"),
    (ChunkTag::Fill, b"FILL"),
    (ChunkTag::Msic, b"MSIC"),
    (ChunkTag::Swvr, b"SWVR"),
    (ChunkTag::Sdat, b"SDAT"),
    (ChunkTag::Shdr, b"SHDR"),
    (ChunkTag::File, b"FILE"),
    (ChunkTag::Null, b"NULL"),
    (ChunkTag::Rpns, b"RPNS"),
    (ChunkTag::Cwav, b"Cwav"),
    (ChunkTag::Cobj, b"Cobj"),
    (ChunkTag::Snds, b"snds"),
    (ChunkTag::Cctr, b"Cctr"),
    (ChunkTag::Cact, b"Cact"),
    (ChunkTag::Csac, b"Csac"),
    (ChunkTag::Cbmp, b"Cbmp"),
    (ChunkTag::Cnet, b"Cnet"),
    (ChunkTag::Cfun, b"Cfun"),
    (ChunkTag::Ctil, b"Ctil"),
    (ChunkTag::Cptc, b"Cptc"),
    (ChunkTag::Ctos, b"Ctos"),
    (ChunkTag::Cshd, b"Cshd"),
    (ChunkTag::Cfnt, b"Cfnt"),
    (ChunkTag::Cdcs, b"Cdcs"),
    (ChunkTag::Canm, b"canm"),
    (ChunkTag::Ptnf, b"PTNF"),
    (ChunkTag::FourDgi, b"4DGI"),
    (ChunkTag::ThreeDtl, b"3DTL"),
    (ChunkTag::ThreeDql, b"3DQL"),
    (ChunkTag::ThreeDrf, b"3DRF"),
    (ChunkTag::FourDvl, b"4DVL"),
    (ChunkTag::FourDnl, b"4DNL"),
    (ChunkTag::ThreeDrl, b"3DRL"),
    (ChunkTag::ThreeDbb, b"3DBB"),
    (ChunkTag::ThreeDhy, b"3DHY"),
    (ChunkTag::ThreeDmi, b"3DMI"),
    (ChunkTag::ThreeDhs, b"3DHS"),
    (ChunkTag::AnmD, b"AnmD"),
    (ChunkTag::TFun, b"tFUN"),
    (ChunkTag::TExt, b"tEXT"),
    (ChunkTag::Lccb, b"LCCB"),
    (ChunkTag::LkUp, b"LkUp"),
    (ChunkTag::Px16, b"PX16"),
    (ChunkTag::Plut, b"PLUT"),
    (ChunkTag::TAct, b"tACT"),
    (ChunkTag::ARsl, b"aRSL"),
    (ChunkTag::TSac, b"tSAC"),
];

impl ChunkTag {
    /// The tag's mnemonic bytes, in reading order.
    pub fn mnemonic_bytes(self) -> [u8; 4] {
        // Every variant has a table row.
        MNEMONICS
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, m)| **m)
            .unwrap_or(*b"????")
    }

    /// The tag's mnemonic as text (e.g. `"Cbmp"`).
    pub fn mnemonic(self) -> &'static str {
        MNEMONICS
            .iter()
            .find(|(tag, _)| *tag == self)
            .and_then(|(_, m)| std::str::from_utf8(&m[..]).ok())
            .unwrap_or("????")
    }

    /// The bytes as they appear in the file: the mnemonic reversed.
    pub fn signature(self) -> [u8; 4] {
        let [a, b, c, d] = self.mnemonic_bytes();
        [d, c, b, a]
    }

    /// Look up a tag from its on-disk (reversed) bytes.
    pub fn from_signature(signature: &[u8; 4]) -> Option<Self> {
        let [a, b, c, d] = *signature;
        Self::from_mnemonic_bytes(&[d, c, b, a])
    }

    pub fn from_mnemonic_bytes(mnemonic: &[u8; 4]) -> Option<Self> {
        MNEMONICS
            .iter()
            .find(|(_, m)| *m == mnemonic)
            .map(|(tag, _)| *tag)
    }

    pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
        let bytes: &[u8; 4] = mnemonic.as_bytes().try_into().ok()?;
        Self::from_mnemonic_bytes(bytes)
    }

    /// Whether this tag starts a top-level chunk.
    pub fn is_primary(self) -> bool {
        PRIMARY_TAGS.contains(&self)
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Error returned when parsing an unrecognised mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMnemonic(pub String);

impl fmt::Display for UnknownMnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown chunk tag {:?}", self.0)
    }
}

impl std::error::Error for UnknownMnemonic {}

impl FromStr for ChunkTag {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_mnemonic(s).ok_or_else(|| UnknownMnemonic(s.to_string()))
    }
}

/// Render raw on-disk signature bytes in reading order, for diagnostics.
pub fn display_signature(signature: &[u8; 4]) -> String {
    let [a, b, c, d] = *signature;
    String::from_utf8_lossy(&[d, c, b, a]).into_owned()
}
