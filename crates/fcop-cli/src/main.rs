mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use iff::{ChunkHeader, ChunkTag, ExportedFile, IffFile, MissionFile, Wrap};
use log::info;
use serde::Serialize;

use crate::manifest::ImportManifest;

#[derive(Parser)]
#[command(name = "fcop", version, about = "Inspect, export and rebuild Future Cop mission files")]
struct Cli {
    /// Log more (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the chunk index.
    Chunks {
        file: PathBuf,
        /// Print a JSON array instead of one line per chunk.
        #[arg(long)]
        json: bool,
    },
    /// Write assets, sounds and music to a directory.
    Export {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Only assets of this kind (e.g. Cbmp).
        #[arg(long)]
        tag: Option<ChunkTag>,
        /// Only the asset with this id. Requires --tag.
        #[arg(long, requires = "tag")]
        id: Option<u32>,
        /// Skip the WAV and BMP wrappers.
        #[arg(long)]
        raw: bool,
    },
    /// Apply an import manifest and write the compiled file.
    Import {
        file: PathBuf,
        #[arg(short, long)]
        manifest: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Decode and recompile without changes.
    Repack {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Strip or regenerate FILL padding.
    #[command(group(ArgGroup::new("mode").required(true).args(["strip", "add"])))]
    Fills {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        strip: bool,
        /// Pad, then recompute the CTRL sizes.
        #[arg(long)]
        add: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Chunks { file, json } => cmd_chunks(&file, json),
        Command::Export {
            file,
            output,
            tag,
            id,
            raw,
        } => cmd_export(&file, &output, tag, id, raw),
        Command::Import {
            file,
            manifest,
            output,
        } => cmd_import(&file, &manifest, &output),
        Command::Repack { file, output } => {
            let mission = MissionFile::from_iff(&read_mission(&file)?)?;
            write_output(&output, mission.compile()?)
        }
        Command::Fills {
            file,
            output,
            strip,
            add,
        } => {
            let indexed = read_mission(&file)?;
            let out = if add {
                indexed.add_fills()?.recreate_ctrl()?
            } else if strip {
                indexed.remove_all_fills()?
            } else {
                bail!("pass --strip or --add");
            };
            write_output(&output, out)
        }
    }
}

fn read_mission(path: &Path) -> Result<IffFile> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    IffFile::parse(data).with_context(|| format!("failed to index {}", path.display()))
}

fn write_output(path: &Path, file: IffFile) -> Result<()> {
    let len = file.len();
    fs::write(path, file.into_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} ({len} bytes)", path.display());
    Ok(())
}

/// JSON form of one [`ChunkHeader`].
#[derive(Serialize)]
struct ChunkRow {
    index: usize,
    offset: usize,
    size: usize,
    primary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    secondary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declaration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loop_number: Option<u32>,
}

impl From<&ChunkHeader> for ChunkRow {
    fn from(c: &ChunkHeader) -> Self {
        let decl = c.declaration();
        ChunkRow {
            index: c.chunk_index,
            offset: c.offset,
            size: c.size,
            primary: c.primary().to_string(),
            secondary: c.secondary().map(|t| t.to_string()),
            declaration: decl.map(|d| d.tag.to_string()),
            id: decl.map(|d| d.id),
            data_size: decl.map(|d| d.data_size),
            file_name: c.file_name().map(str::to_string),
            loop_number: c.music().map(|m| m.loop_number),
        }
    }
}

fn cmd_chunks(path: &Path, json: bool) -> Result<()> {
    let file = read_mission(path)?;
    let chunks = file.index().chunks();
    if json {
        let rows: Vec<ChunkRow> = chunks.iter().map(ChunkRow::from).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for chunk in chunks {
            println!("{chunk}");
        }
    }
    Ok(())
}

fn cmd_export(
    path: &Path,
    output: &Path,
    tag: Option<ChunkTag>,
    id: Option<u32>,
    raw: bool,
) -> Result<()> {
    let mission = MissionFile::from_iff(&read_mission(path)?)?;
    let wrap = if raw { Wrap::empty() } else { Wrap::all() };

    let files: Vec<ExportedFile> = match (tag, id) {
        (Some(tag), Some(id)) => vec![mission.export(tag, id, wrap)?],
        (Some(tag), None) => {
            let files = mission
                .assets_of(tag)
                .map(|a| mission.export(a.tag, a.id, wrap))
                .collect::<iff::Result<Vec<_>>>()?;
            if files.is_empty() {
                bail!("no {tag} assets in {}", path.display());
            }
            files
        }
        _ => mission.export_all(wrap)?,
    };

    fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    for file in &files {
        let dest = output.join(&file.name);
        fs::write(&dest, &file.bytes)
            .with_context(|| format!("failed to write {}", dest.display()))?;
    }
    info!("exported {} files to {}", files.len(), output.display());
    Ok(())
}

fn cmd_import(path: &Path, manifest: &Path, output: &Path) -> Result<()> {
    let manifest = ImportManifest::load(manifest)?;
    let mut mission = MissionFile::from_iff(&read_mission(path)?)?;
    manifest.apply(&mut mission)?;
    write_output(output, mission.compile()?)
}
