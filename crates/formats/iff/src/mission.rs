//! A mission file decoded into its assets, and compiled back to bytes.
//!
//! [`MissionFile`] owns one de-chunked payload per asset, keyed by tag and
//! id, plus the named sound effects and the music track. [`MissionFile::compile`]
//! lays them out in the order the game expects and regenerates the FILL
//! padding and CTRL sizes.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};

use crate::assets::Bitmap;
use crate::codec;
use crate::cursor::{read_u32_at, Writer};
use crate::error::{Error, Result};
use crate::file::IffFile;
use crate::header::{
    ControlSizes, DataDeclaration, SwvrRole, FILE_NAME_LEN, FILLER_SIZE, SHDR_TYPE_OFFSET,
};
use crate::tag::ChunkTag;
use crate::wrap::{wrap_wav, AudioFormat, Wrap};
use crate::writer::{control_chunk, file_chunk, fresh_data_header, with_data_size};

/// Header type written into fresh headers when no asset of the same kind
/// exists to copy it from.
const DEFAULT_HEADER_TYPE: u32 = 1;

/// Position of an asset kind in the game data region. Kinds sharing a rank
/// are interleaved by id.
fn category_rank(tag: ChunkTag) -> Option<u8> {
    Some(match tag {
        ChunkTag::Rpns => 0,
        ChunkTag::Cshd => 1,
        ChunkTag::Cwav => 2,
        ChunkTag::Ctos => 3,
        ChunkTag::Cptc => 4,
        ChunkTag::Ctil => 5,
        ChunkTag::Cfun => 6,
        ChunkTag::Cnet => 7,
        ChunkTag::Cbmp => 8,
        ChunkTag::Cdcs => 9,
        ChunkTag::Cfnt | ChunkTag::Canm => 10,
        ChunkTag::Cobj => 11,
        ChunkTag::Cact | ChunkTag::Csac => 12,
        ChunkTag::Cctr => 13,
        _ => return None,
    })
}

/// One game data asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub tag: ChunkTag,
    pub id: u32,
    /// De-chunked payload.
    pub bytes: Vec<u8>,
    /// The `SHOC`/`SHDR` chunk as read, reused on compile with only the
    /// declared size updated.
    header: Vec<u8>,
}

impl Asset {
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    fn header_type(&self) -> Option<u32> {
        read_u32_at(&self.header, SHDR_TYPE_OFFSET).ok()
    }
}

/// A named sound effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sound {
    pub name: String,
    /// Id of the `snds` declaration.
    pub id: u32,
    /// 8-bit mono PCM.
    pub bytes: Vec<u8>,
    file_chunk: Vec<u8>,
    header: Vec<u8>,
}

/// The music track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Music {
    pub name: String,
    /// 8-bit stereo PCM.
    pub bytes: Vec<u8>,
    file_chunk: Vec<u8>,
}

/// A file produced by [`MissionFile::export`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionFile {
    reserved: u32,
    filler: [u8; FILLER_SIZE],
    assets: BTreeMap<(ChunkTag, u32), Asset>,
    sounds: Vec<Sound>,
    music: Option<Music>,
}

impl MissionFile {
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        Self::from_iff(&IffFile::parse(data)?)
    }

    /// Decode every asset, sound and the music track of `file`.
    ///
    /// Fails on a declaration whose kind has no slot in the game data
    /// region.
    pub fn from_iff(file: &IffFile) -> Result<Self> {
        let index = file.index();
        let reserved = index
            .get(0)
            .and_then(|c| c.control())
            .ok_or(Error::ControlNotFound)?
            .reserved;

        let mut assets = BTreeMap::new();
        let mut sounds = Vec::new();
        let mut music = None;
        let mut sound_headers = HashSet::new();

        for chunk in index.chunks() {
            match chunk.swvr_role() {
                Some(SwvrRole::MusicStart) => {
                    music = Some(Music {
                        name: chunk.file_name().unwrap_or_default().to_string(),
                        bytes: file.export_music()?,
                        file_chunk: file.chunk_bytes(chunk)?.to_vec(),
                    });
                    continue;
                }
                Some(SwvrRole::Sound) => {
                    let header = index
                        .next_non_fill(chunk.chunk_index)
                        .filter(|c| c.declaration().is_some())
                        .ok_or(Error::SubChunkNotFound {
                            tag: ChunkTag::Shdr,
                            context: "sound effect",
                        })?;
                    sound_headers.insert(header.chunk_index);
                    sounds.push(Sound {
                        name: chunk.file_name().unwrap_or_default().to_string(),
                        id: header.declaration().map_or(0, |d| d.id),
                        bytes: codec::join_data(index, file.data(), header)?,
                        file_chunk: file.chunk_bytes(chunk)?.to_vec(),
                        header: file.chunk_bytes(header)?.to_vec(),
                    });
                    continue;
                }
                None => {}
            }

            let Some(decl) = chunk.declaration() else {
                continue;
            };
            if decl.tag == ChunkTag::Snds {
                if !sound_headers.contains(&chunk.chunk_index) {
                    warn!("dropping snds {} with no sound name before it", decl.id);
                }
                continue;
            }
            if category_rank(decl.tag).is_none() {
                return Err(Error::UnsupportedAsset {
                    tag: decl.tag,
                    id: decl.id,
                });
            }
            match assets.entry((decl.tag, decl.id)) {
                Entry::Vacant(slot) => {
                    slot.insert(Asset {
                        tag: decl.tag,
                        id: decl.id,
                        bytes: codec::join_data(index, file.data(), chunk)?,
                        header: file.chunk_bytes(chunk)?.to_vec(),
                    });
                }
                Entry::Occupied(_) => {
                    warn!("ignoring second {} {} at offset {}", decl.tag, decl.id, chunk.offset)
                }
            }
        }

        debug!(
            "decoded {} assets, {} sounds, music: {}",
            assets.len(),
            sounds.len(),
            music.is_some()
        );
        Ok(Self {
            reserved,
            filler: file.filler(),
            assets,
            sounds,
            music,
        })
    }

    pub fn asset(&self, tag: ChunkTag, id: u32) -> Option<&Asset> {
        self.assets.get(&(tag, id))
    }

    /// Every asset, in compile order.
    pub fn assets(&self) -> Vec<&Asset> {
        let mut ordered: Vec<&Asset> = self.assets.values().collect();
        ordered.sort_by_key(|a| (category_rank(a.tag), a.id, a.tag));
        ordered
    }

    /// Assets of one kind, by ascending id.
    pub fn assets_of(&self, tag: ChunkTag) -> impl Iterator<Item = &Asset> {
        self.assets.range((tag, 0)..=(tag, u32::MAX)).map(|(_, a)| a)
    }

    pub fn sound(&self, name: &str) -> Option<&Sound> {
        self.sounds.iter().find(|s| s.name == name)
    }

    pub fn sounds(&self) -> &[Sound] {
        &self.sounds
    }

    pub fn music(&self) -> Option<&Music> {
        self.music.as_ref()
    }

    /// Replace the payload of an existing asset. Any length is accepted.
    pub fn set_asset_bytes(&mut self, tag: ChunkTag, id: u32, bytes: Vec<u8>) -> Result<()> {
        let asset = self
            .assets
            .get_mut(&(tag, id))
            .ok_or(Error::DataNotFound { tag, id })?;
        asset.bytes = bytes;
        Ok(())
    }

    /// Add an asset, or replace the payload of the existing one. Returns
    /// the previous payload.
    ///
    /// New assets get a fresh header whose type is copied from another
    /// asset of the same kind.
    pub fn insert_asset(
        &mut self,
        tag: ChunkTag,
        id: u32,
        bytes: Vec<u8>,
    ) -> Result<Option<Vec<u8>>> {
        if category_rank(tag).is_none() {
            return Err(Error::UnsupportedAsset { tag, id });
        }
        if let Some(asset) = self.assets.get_mut(&(tag, id)) {
            return Ok(Some(std::mem::replace(&mut asset.bytes, bytes)));
        }
        let header_type = self
            .assets_of(tag)
            .find_map(Asset::header_type)
            .unwrap_or(DEFAULT_HEADER_TYPE);
        let header = fresh_data_header(
            self.filler,
            &DataDeclaration {
                header_type,
                tag,
                id,
                data_size: bytes.len() as u32,
            },
        );
        self.assets.insert(
            (tag, id),
            Asset {
                tag,
                id,
                bytes,
                header,
            },
        );
        Ok(None)
    }

    pub fn remove_asset(&mut self, tag: ChunkTag, id: u32) -> Result<Asset> {
        self.assets
            .remove(&(tag, id))
            .ok_or(Error::DataNotFound { tag, id })
    }

    /// Replace the pixels of bitmap `id` with those of a BMP file.
    pub fn set_bitmap(&mut self, id: u32, bmp: &[u8]) -> Result<()> {
        let tag = ChunkTag::Cbmp;
        let asset = self
            .assets
            .get_mut(&(tag, id))
            .ok_or(Error::DataNotFound { tag, id })?;
        asset.bytes = Bitmap::parse(&asset.bytes)?.replace_pixels(bmp)?;
        Ok(())
    }

    pub fn set_sound_bytes(&mut self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let sound = self
            .sounds
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SoundNotFound {
                name: name.to_string(),
            })?;
        sound.bytes = bytes;
        Ok(())
    }

    /// Add a sound effect at the end of the sound region, or replace the
    /// audio of the one already named `name`. Returns the previous audio.
    pub fn insert_sound(&mut self, name: &str, id: u32, bytes: Vec<u8>) -> Result<Option<Vec<u8>>> {
        if name.len() > FILE_NAME_LEN {
            return Err(Error::SizeMismatch {
                context: "sound name",
                expected: FILE_NAME_LEN,
                found: name.len(),
            });
        }
        if let Some(sound) = self.sounds.iter_mut().find(|s| s.name == name) {
            return Ok(Some(std::mem::replace(&mut sound.bytes, bytes)));
        }
        let header_type = self
            .sounds
            .first()
            .and_then(|s| read_u32_at(&s.header, SHDR_TYPE_OFFSET).ok())
            .unwrap_or(DEFAULT_HEADER_TYPE);
        let header = fresh_data_header(
            self.filler,
            &DataDeclaration {
                header_type,
                tag: ChunkTag::Snds,
                id,
                data_size: bytes.len() as u32,
            },
        );
        self.sounds.push(Sound {
            name: name.to_string(),
            id,
            bytes,
            file_chunk: file_chunk(self.filler, name),
            header,
        });
        Ok(None)
    }

    pub fn remove_sound(&mut self, name: &str) -> Result<Sound> {
        let at = self
            .sounds
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::SoundNotFound {
                name: name.to_string(),
            })?;
        Ok(self.sounds.remove(at))
    }

    /// Replace the music track. An empty track is rejected: without any
    /// `MSIC` chunk the music SWVR would read back as a sound.
    pub fn set_music_bytes(&mut self, bytes: Vec<u8>) -> Result<()> {
        let music = self.music.as_mut().ok_or(Error::MusicNotFound)?;
        check_music_len(bytes.len())?;
        music.bytes = bytes;
        Ok(())
    }

    /// Build the complete file.
    ///
    /// The game data region comes first in category order, then the sound
    /// effects, then the music track. The buffer is assembled behind a
    /// CTRL placeholder, padded, and the CTRL sizes are recomputed last.
    pub fn compile(&self) -> Result<IffFile> {
        let mut w = Writer::new();
        w.write_bytes(&control_chunk(&ControlSizes {
            reserved: self.reserved,
            ..ControlSizes::default()
        }));
        for asset in self.assets() {
            w.write_bytes(&with_data_size(&asset.header, asset.bytes.len())?);
            w.write_bytes(&codec::split_data_with(self.filler, &asset.bytes)?);
        }
        for sound in &self.sounds {
            w.write_bytes(&sound.file_chunk);
            w.write_bytes(&with_data_size(&sound.header, sound.bytes.len())?);
            w.write_bytes(&codec::split_data_with(self.filler, &sound.bytes)?);
        }
        if let Some(music) = &self.music {
            check_music_len(music.bytes.len())?;
            w.write_bytes(&music.file_chunk);
            w.write_bytes(&codec::split_music_with(self.filler, &music.bytes)?);
        }

        let draft = IffFile::parse(w.into_bytes())?;
        debug!("compiled {} chunks before padding", draft.index().len());
        draft.add_fills()?.recreate_ctrl()
    }

    /// Export one asset. Bitmaps are written as BMP files when `wrap`
    /// includes [`Wrap::BITMAP`]; everything else is written raw.
    pub fn export(&self, tag: ChunkTag, id: u32, wrap: Wrap) -> Result<ExportedFile> {
        let asset = self.asset(tag, id).ok_or(Error::DataNotFound { tag, id })?;
        if tag == ChunkTag::Cbmp && wrap.contains(Wrap::BITMAP) {
            return Ok(ExportedFile {
                name: format!("{tag}{id}.bmp"),
                bytes: Bitmap::parse(&asset.bytes)?.to_bmp()?,
            });
        }
        Ok(ExportedFile {
            name: format!("{tag}{id}.bin"),
            bytes: asset.bytes.clone(),
        })
    }

    pub fn export_sound(&self, name: &str, wrap: Wrap) -> Result<ExportedFile> {
        let sound = self.sound(name).ok_or_else(|| Error::SoundNotFound {
            name: name.to_string(),
        })?;
        let stem = match sound.name.as_str() {
            "" => format!("{}{}", ChunkTag::Snds, sound.id),
            name => name.to_string(),
        };
        audio_file(stem, AudioFormat::SOUND, &sound.bytes, wrap)
    }

    pub fn export_music(&self, wrap: Wrap) -> Result<ExportedFile> {
        let music = self.music.as_ref().ok_or(Error::MusicNotFound)?;
        let stem = match music.name.as_str() {
            "" => "music".to_string(),
            name => name.to_string(),
        };
        audio_file(stem, AudioFormat::MUSIC, &music.bytes, wrap)
    }

    /// Export every asset, sound and the music track.
    pub fn export_all(&self, wrap: Wrap) -> Result<Vec<ExportedFile>> {
        let mut files = Vec::with_capacity(self.assets.len() + self.sounds.len() + 1);
        for asset in self.assets() {
            files.push(self.export(asset.tag, asset.id, wrap)?);
        }
        for sound in &self.sounds {
            files.push(self.export_sound(&sound.name, wrap)?);
        }
        if self.music.is_some() {
            files.push(self.export_music(wrap)?);
        }
        Ok(files)
    }
}

fn check_music_len(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::SizeMismatch {
            context: "music",
            expected: 1,
            found: 0,
        });
    }
    Ok(())
}

fn audio_file(stem: String, format: AudioFormat, pcm: &[u8], wrap: Wrap) -> Result<ExportedFile> {
    if wrap.contains(Wrap::AUDIO) {
        Ok(ExportedFile {
            name: format!("{stem}.wav"),
            bytes: wrap_wav(format, pcm)?,
        })
    } else {
        Ok(ExportedFile {
            name: format!("{stem}.pcm"),
            bytes: pcm.to_vec(),
        })
    }
}
