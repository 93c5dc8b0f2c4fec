mod common;

use common::{pattern, MissionBuilder, FILLER};
use iff::codec::{SUB_CHUNK_CAPACITY, SUB_CHUNK_SIZE};
use iff::header::{CTRL_SIZE, GENERIC_HEADER_SIZE};
use iff::writer::FRESH_HEADER_SIZE;
use iff::{ChunkKind, ChunkTag, Error, ErrorKind, IffFile, MissionFile, SECTION_SIZE};

fn gapless(file: &IffFile) {
    let chunks = file.index().chunks();
    assert_eq!(chunks[0].offset, 0);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end(), pair[1].offset, "gap after {}", pair[0]);
    }
    assert_eq!(chunks.last().map(|c| c.end()), Some(file.len()));
}

fn control_sum(file: &IffFile) -> usize {
    let ctrl = file.index().get(0).and_then(|c| c.control()).copied().unwrap();
    (ctrl.game_data + ctrl.sound + ctrl.music) as usize
}

// ── Payload round trips ─────────────────────────────────────────────

#[test]
fn payloads_round_trip() {
    let small = pattern(100, 1);
    let large = pattern(3 * SUB_CHUNK_CAPACITY + 17, 2);
    let data = MissionBuilder::new()
        .asset(ChunkTag::Cnet, 1, &small)
        .asset(ChunkTag::Cdcs, 2, &large)
        .sound("ENGINE", 1, &pattern(5000, 3))
        .music("THEME", &pattern(60000, 4))
        .build();
    let file = IffFile::parse(data).unwrap();
    gapless(&file);

    assert_eq!(file.export_data(ChunkTag::Cnet, 1).unwrap(), small);
    assert_eq!(file.export_data(ChunkTag::Cdcs, 2).unwrap(), large);
    let owner = file.index().find_data(ChunkTag::Cdcs, 2).unwrap();
    assert_eq!(file.index().data_run(owner.chunk_index).len(), 4);
    assert_eq!(file.export_sound("ENGINE").unwrap(), pattern(5000, 3));
    assert_eq!(file.export_music().unwrap(), pattern(60000, 4));
    assert_eq!(file.index().music_run().len(), 3);

    let mission = MissionFile::from_iff(&file).unwrap();
    let compiled = mission.compile().unwrap();
    gapless(&compiled);
    let decoded = MissionFile::from_iff(&compiled).unwrap();
    assert_eq!(decoded, mission);
}

#[test]
fn sub_chunk_boundaries() {
    let exact = IffFile::parse(
        MissionBuilder::new()
            .asset(ChunkTag::Cfun, 1, &pattern(SUB_CHUNK_CAPACITY, 0))
            .build(),
    )
    .unwrap();
    let owner = exact.index().find_data(ChunkTag::Cfun, 1).unwrap();
    let run = exact.index().data_run(owner.chunk_index);
    assert_eq!(run.len(), 1);
    assert_eq!(run[0].size, SUB_CHUNK_SIZE);

    let over = IffFile::parse(
        MissionBuilder::new()
            .asset(ChunkTag::Cfun, 1, &pattern(SUB_CHUNK_CAPACITY + 1, 0))
            .build(),
    )
    .unwrap();
    let owner = over.index().find_data(ChunkTag::Cfun, 1).unwrap();
    let sizes: Vec<_> = over
        .index()
        .data_run(owner.chunk_index)
        .iter()
        .map(|c| c.size)
        .collect();
    assert_eq!(sizes, [SUB_CHUNK_SIZE, GENERIC_HEADER_SIZE + 1]);
}

#[test]
fn signatures_inside_payloads_are_ignored() {
    let mut payload = pattern(200, 5);
    payload[50..54].copy_from_slice(&ChunkTag::Shoc.signature());
    payload[120..124].copy_from_slice(&ChunkTag::Swvr.signature());
    let file = IffFile::parse(MissionBuilder::new().asset(ChunkTag::Cobj, 9, &payload).build())
        .unwrap();
    assert_eq!(file.index().len(), 3);
    assert_eq!(file.export_data(ChunkTag::Cobj, 9).unwrap(), payload);
}

// ── Padding and CTRL ────────────────────────────────────────────────

#[test]
fn fills_are_idempotent() {
    let data = MissionBuilder::new()
        .asset(ChunkTag::Cptc, 1, &pattern(30000, 1))
        .asset(ChunkTag::Cbmp, 1, &pattern(131088, 2))
        .sound("ENGINE", 1, &pattern(700, 3))
        .sound("SIREN", 2, &pattern(9000, 4))
        .music("THEME", &pattern(50000, 5))
        .build();
    let padded = IffFile::parse(data).unwrap().add_fills().unwrap();
    gapless(&padded);
    assert_eq!(padded.len() % SECTION_SIZE, 0);

    let again = padded.remove_all_fills().unwrap().add_fills().unwrap();
    assert_eq!(again.data(), padded.data());
    assert!(matches!(padded.add_fills(), Err(Error::FillsPresent)));
}

#[test]
fn control_sizes_cover_the_file() {
    let data = MissionBuilder::new()
        .asset(ChunkTag::Rpns, 1, &pattern(64, 1))
        .sound("ENGINE", 1, &pattern(700, 3))
        .music("THEME", &pattern(30000, 5))
        .build();
    let file = IffFile::parse(data).unwrap();
    for f in [
        file.recreate_ctrl().unwrap(),
        file.add_fills().unwrap().recreate_ctrl().unwrap(),
    ] {
        assert_eq!(control_sum(&f), f.len() - CTRL_SIZE);
    }

    let headless = IffFile::parse(MissionBuilder::headless().asset(ChunkTag::Rpns, 1, &[1]).build())
        .unwrap();
    assert!(matches!(headless.recreate_ctrl(), Err(Error::ControlNotFound)));
}

/// Payload that makes CTRL, one header and six full-ish sub-chunks end
/// `slack` bytes before the first section boundary.
fn section_filler(slack: usize) -> Vec<u8> {
    let len = SECTION_SIZE - CTRL_SIZE - FRESH_HEADER_SIZE - 6 * GENERIC_HEADER_SIZE - slack;
    pattern(len, 7)
}

#[test]
fn exactly_filled_section_gets_no_fill() {
    let file = IffFile::parse(
        MissionBuilder::new()
            .asset(ChunkTag::Cdcs, 1, &section_filler(0))
            .asset(ChunkTag::Cdcs, 2, &pattern(10, 1))
            .build(),
    )
    .unwrap();
    let padded = file.add_fills().unwrap();
    let second = padded.index().find_data(ChunkTag::Cdcs, 2).unwrap();
    assert_eq!(second.offset, SECTION_SIZE);
    assert_eq!(padded.index().chunks().iter().filter(|c| c.is_fill()).count(), 1);
}

#[test]
fn four_bytes_of_slack_get_a_bare_fill() {
    let file = IffFile::parse(
        MissionBuilder::new()
            .asset(ChunkTag::Cdcs, 1, &section_filler(4))
            .asset(ChunkTag::Cdcs, 2, &pattern(10, 1))
            .build(),
    )
    .unwrap();
    let padded = file.add_fills().unwrap();
    let second = padded.index().find_data(ChunkTag::Cdcs, 2).unwrap();
    assert_eq!(second.offset, SECTION_SIZE);
    let fill = padded.index().get(second.chunk_index - 1).unwrap();
    assert_eq!(fill.kind, ChunkKind::Fill { bare: true });
    assert_eq!((fill.offset, fill.size), (SECTION_SIZE - 4, 4));
    assert_eq!(padded.export_data(ChunkTag::Cdcs, 2).unwrap(), pattern(10, 1));
}

// ── Minimal scenarios ───────────────────────────────────────────────

#[test]
fn ten_byte_asset() {
    let payload = *b"0123456789";
    let file = IffFile::parse(MissionBuilder::new().asset(ChunkTag::Cnet, 1, &payload).build())
        .unwrap();
    let owner = file.index().find_data(ChunkTag::Cnet, 1).unwrap();
    let run = file.index().data_run(owner.chunk_index);
    assert_eq!(run.len(), 1);
    assert_eq!(run[0].size, 30);
    assert_eq!(file.export_data(ChunkTag::Cnet, 1).unwrap(), payload);

    let replaced = file.replace_payload(ChunkTag::Cnet, 1, b"abcdefghij").unwrap();
    assert_eq!(replaced.export_data(ChunkTag::Cnet, 1).unwrap(), b"abcdefghij");

    let removed = file.remove_asset(ChunkTag::Cnet, Some(1)).unwrap();
    assert_eq!(removed.index().declarations_of(ChunkTag::Cnet).count(), 0);
    assert_eq!(removed.index().len(), 1);
    assert!(matches!(
        removed.export_data(ChunkTag::Cnet, 1),
        Err(Error::DataNotFound { .. })
    ));
}

#[test]
fn sound_name_field() {
    let mut swvr = ChunkTag::Swvr.signature().to_vec();
    swvr.extend(36u32.to_le_bytes());
    swvr.extend(FILLER);
    swvr.extend(ChunkTag::File.signature());
    swvr.extend(b"ENGINE\0\0\0\0\0\0\0\0\0\0");
    let file = IffFile::parse(
        MissionBuilder::new()
            .raw(swvr)
            .asset(ChunkTag::Snds, 1, &[0x80; 8])
            .build(),
    )
    .unwrap();
    assert_eq!(file.sound_names(), ["ENGINE"]);
    assert_eq!(file.index().get(1).and_then(|c| c.file_name()), Some("ENGINE"));
    assert_eq!(file.export_sound("ENGINE").unwrap(), [0x80; 8]);
}

#[test]
fn corruption_is_reported() {
    let mut data = MissionBuilder::new().asset(ChunkTag::Cnet, 1, &[1; 10]).build();
    data.truncate(data.len() - 3);
    let err = IffFile::parse(data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Corrupt);

    let mut data = MissionBuilder::new().build();
    data.extend([0; 8]);
    assert!(matches!(
        IffFile::parse(data),
        Err(Error::Gap { offset: CTRL_SIZE })
    ));
}

// ── Real mission files ──────────────────────────────────────────────

#[test]
fn real_mission_file() {
    let Some(path) = std::env::var_os("FCOP_MISSION") else {
        eprintln!("skipping: FCOP_MISSION not set");
        return;
    };
    let data = std::fs::read(&path).expect("failed to read FCOP_MISSION");
    let file = IffFile::parse(data).expect("failed to index mission file");
    gapless(&file);

    if file.index().has_fills() {
        let repadded = file.remove_all_fills().unwrap().add_fills().unwrap();
        assert_eq!(repadded.data(), file.data());
    }

    let mission = MissionFile::from_iff(&file).expect("failed to decode mission file");
    let compiled = mission.compile().expect("failed to compile mission file");
    gapless(&compiled);
    assert_eq!(control_sum(&compiled), compiled.len() - CTRL_SIZE);
    assert_eq!(MissionFile::from_iff(&compiled).unwrap(), mission);
}
