use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use iff::wrap::unwrap_wav_lenient;
use iff::{AudioFormat, ChunkTag, MissionFile};
use log::info;
use serde::{Deserialize, Serialize};

/// Files to import into a mission file (`import -m manifest.json`).
///
/// Source paths are relative to the manifest's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportManifest {
    #[serde(default)]
    pub data: Vec<DataEntry>,
    #[serde(default)]
    pub sounds: Vec<SoundEntry>,
    /// Replacement music track.
    #[serde(default)]
    pub music: Option<PathBuf>,
    /// Applied before any import.
    #[serde(default)]
    pub remove: Vec<RemoveEntry>,
}

/// Replace or add asset `tag`/`id` with the contents of `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntry {
    #[serde(with = "mnemonic")]
    pub tag: ChunkTag,
    pub id: u32,
    pub src: PathBuf,
}

/// Replace or add the sound effect `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub name: String,
    /// Id for a new sound; defaults to one past the highest in use.
    #[serde(default)]
    pub id: Option<u32>,
    pub src: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoveEntry {
    Sound {
        sound: String,
    },
    /// Every asset of `tag` when `id` is absent.
    Data {
        #[serde(with = "mnemonic")]
        tag: ChunkTag,
        #[serde(default)]
        id: Option<u32>,
    },
}

/// Tags are written by mnemonic (`"Cbmp"`) in manifests.
mod mnemonic {
    use iff::ChunkTag;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tag: &ChunkTag, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(tag.mnemonic())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ChunkTag, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl ImportManifest {
    /// Read a manifest and resolve its paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let mut manifest: ImportManifest = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        manifest.resolve(path.parent().unwrap_or(Path::new(".")));
        Ok(manifest)
    }

    fn resolve(&mut self, base: &Path) {
        for entry in &mut self.data {
            entry.src = base.join(&entry.src);
        }
        for entry in &mut self.sounds {
            entry.src = base.join(&entry.src);
        }
        if let Some(music) = &mut self.music {
            *music = base.join(&*music);
        }
    }

    /// Apply every entry to `mission`. Removals run first.
    pub fn apply(&self, mission: &mut MissionFile) -> Result<()> {
        for entry in &self.remove {
            match entry {
                RemoveEntry::Sound { sound } => {
                    mission.remove_sound(sound)?;
                    info!("removed sound {sound}");
                }
                RemoveEntry::Data { tag, id: Some(id) } => {
                    mission.remove_asset(*tag, *id)?;
                    info!("removed {tag} {id}");
                }
                RemoveEntry::Data { tag, id: None } => {
                    let ids: Vec<u32> = mission.assets_of(*tag).map(|a| a.id).collect();
                    for id in &ids {
                        mission.remove_asset(*tag, *id)?;
                    }
                    info!("removed {} {tag} assets", ids.len());
                }
            }
        }

        for entry in &self.data {
            let bytes = read_source(&entry.src)?;
            if entry.tag == ChunkTag::Cbmp && bytes.starts_with(b"BM") {
                mission
                    .set_bitmap(entry.id, &bytes)
                    .with_context(|| format!("failed to import {}", entry.src.display()))?;
            } else {
                mission.insert_asset(entry.tag, entry.id, bytes)?;
            }
            info!("imported {} {} from {}", entry.tag, entry.id, entry.src.display());
        }

        for entry in &self.sounds {
            let pcm = unwrap_wav_lenient(AudioFormat::SOUND, &read_source(&entry.src)?);
            let id = match entry.id {
                Some(id) => id,
                None => mission.sounds().iter().map(|s| s.id + 1).max().unwrap_or(1),
            };
            mission.insert_sound(&entry.name, id, pcm)?;
            info!("imported sound {} from {}", entry.name, entry.src.display());
        }

        if let Some(path) = &self.music {
            let pcm = unwrap_wav_lenient(AudioFormat::MUSIC, &read_source(path)?);
            mission.set_music_bytes(pcm)?;
            info!("imported music from {}", path.display());
        }
        Ok(())
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use iff::codec;
    use iff::wrap::wrap_wav;
    use iff::writer::{assemble, control_chunk, file_chunk, fresh_data_header, DEFAULT_FILLER};
    use iff::{ControlSizes, DataDeclaration};

    fn asset(tag: ChunkTag, id: u32, payload: &[u8]) -> Vec<u8> {
        let decl = DataDeclaration {
            header_type: 1,
            tag,
            id,
            data_size: payload.len() as u32,
        };
        let mut out = fresh_data_header(DEFAULT_FILLER, &decl);
        out.extend(codec::split_data(payload).unwrap());
        out
    }

    fn mission() -> MissionFile {
        let mut music = file_chunk(DEFAULT_FILLER, "THEME");
        music.extend(codec::split_music(&[0x7F; 100]).unwrap());
        let mut sound = file_chunk(DEFAULT_FILLER, "ENGINE");
        sound.extend(asset(ChunkTag::Snds, 4, &[0x80; 10]));
        let data = assemble([
            control_chunk(&ControlSizes::default()),
            asset(ChunkTag::Cnet, 1, &[1; 10]),
            asset(ChunkTag::Cdcs, 1, &[2; 10]),
            asset(ChunkTag::Cdcs, 2, &[3; 10]),
            sound,
            music,
        ]);
        MissionFile::parse(data).unwrap()
    }

    #[test]
    fn parses_every_section() {
        let json = r#"{
            "data": [ { "tag": "Cnet", "id": 1, "src": "net1.bin" } ],
            "sounds": [ { "name": "HORN", "id": 9, "src": "horn.wav" } ],
            "music": "music.wav",
            "remove": [ { "tag": "Cdcs" }, { "tag": "Cobj", "id": 12 }, { "sound": "ENGINE" } ]
        }"#;
        let mut manifest: ImportManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.data[0].tag, ChunkTag::Cnet);
        assert_eq!(manifest.sounds[0].id, Some(9));
        assert_eq!(
            manifest.remove,
            [
                RemoveEntry::Data {
                    tag: ChunkTag::Cdcs,
                    id: None
                },
                RemoveEntry::Data {
                    tag: ChunkTag::Cobj,
                    id: Some(12)
                },
                RemoveEntry::Sound {
                    sound: "ENGINE".into()
                },
            ]
        );

        manifest.resolve(Path::new("/mods/level1"));
        assert_eq!(manifest.data[0].src, Path::new("/mods/level1/net1.bin"));
        assert_eq!(manifest.music.as_deref(), Some(Path::new("/mods/level1/music.wav")));

        assert!(serde_json::from_str::<ImportManifest>(r#"{ "remove": [ { "tag": "Cxyz" } ] }"#).is_err());
        assert_eq!(serde_json::from_str::<ImportManifest>("{}").unwrap(), ImportManifest::default());
    }

    #[test]
    fn applies_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("net1.bin"), [7u8; 5000]).unwrap();
        fs::write(
            dir.path().join("horn.wav"),
            wrap_wav(AudioFormat::SOUND, &[0x81; 6]).unwrap(),
        )
        .unwrap();
        fs::write(dir.path().join("music.raw"), [0x10; 40]).unwrap();
        let manifest_path = dir.path().join("manifest.json");
        fs::write(
            &manifest_path,
            r#"{
                "data": [ { "tag": "Cnet", "id": 1, "src": "net1.bin" } ],
                "sounds": [ { "name": "HORN", "src": "horn.wav" } ],
                "music": "music.raw",
                "remove": [ { "tag": "Cdcs" } ]
            }"#,
        )
        .unwrap();

        let manifest = ImportManifest::load(&manifest_path).unwrap();
        let mut m = mission();
        manifest.apply(&mut m).unwrap();

        let out = MissionFile::from_iff(&m.compile().unwrap()).unwrap();
        assert_eq!(out.asset(ChunkTag::Cnet, 1).unwrap().bytes, vec![7; 5000]);
        assert_eq!(out.assets_of(ChunkTag::Cdcs).count(), 0);
        let horn = out.sound("HORN").unwrap();
        assert_eq!(horn.bytes, [0x81; 6]);
        assert_eq!(horn.id, 5);
        assert_eq!(out.music().unwrap().bytes, [0x10; 40]);
    }

    #[test]
    fn missing_sources_name_the_path() {
        let manifest = ImportManifest {
            music: Some(PathBuf::from("/nonexistent/music.wav")),
            ..ImportManifest::default()
        };
        let err = manifest.apply(&mut mission()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/music.wav"));
    }
}
