//! Scan, correlate, match and patch a synthetic project file.

use artmap_core::catalog::{CatalogSource, DirectoryCatalog, ResourceRecord};
use artmap_core::matcher::{MatchTier, Matcher};
use artmap_core::{analyze_container, apply_slots, scan, Config, ScanProfile};

fn name_field(label: &str) -> Vec<u8> {
    let mut out = b"Name\x00\x00\x08".to_vec();
    out.extend_from_slice(&((label.len() + 4) as u32).to_be_bytes());
    out.extend_from_slice(label.as_bytes());
    out.extend_from_slice(&[0, 0xfe, 0xff, 0]);
    out
}

fn reference_record(label: &str) -> Vec<u8> {
    let mut out = b"All MIDI Inputs\x00".to_vec();
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(b"All MIDI Inputs\x00");
    out.extend_from_slice(&[0u8; 4]);
    out.extend_from_slice(&[1, 0, 0, 0]);
    out.push((label.len() + 4) as u8);
    out.extend_from_slice(label.as_bytes());
    out.push(0);
    out
}

fn filler(len: usize) -> Vec<u8> {
    vec![0x55u8; len]
}

/// Three tracks; two of them have an expression map assigned nearby.
fn three_track_project() -> Vec<u8> {
    let mut buf = filler(1_024);
    buf.extend(name_field("Stradivari Violin"));
    buf.extend(filler(20_000));
    buf.extend(reference_record("NICRQ Stradivari Violin Multi Mic Attribute"));
    buf.extend(filler(600_000));
    buf.extend(name_field("Guarneri Violin"));
    buf.extend(filler(30_000));
    buf.extend(reference_record("NICRQ Guarneri Violin Multi Mic Attribute"));
    buf.extend(filler(600_000));
    buf.extend(name_field("Solo Cello"));
    buf.extend(filler(1_024));
    buf
}

#[test]
fn test_three_track_project_correlates() {
    let project = three_track_project();
    let report = analyze_container(&project, &Config::default());

    assert_eq!(report.tracks.len(), 3);
    assert_eq!(report.references.len(), 2);
    assert_eq!(report.slots.len(), 2);
    assert!(report.unmatched_references.is_empty());

    assert_eq!(report.slots[0].track.label, "Stradivari Violin");
    assert_eq!(report.slots[0].reference.label, "NICRQ Stradivari Violin Multi Mic Attribute");
    assert_eq!(report.slots[1].track.label, "Guarneri Violin");
    assert_eq!(report.slots[1].reference.label, "NICRQ Guarneri Violin Multi Mic Attribute");

    let unmatched: Vec<&str> = report.unmatched_tracks.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(unmatched, vec!["Solo Cello"]);
}

#[test]
fn test_strict_profile_needs_bus_trailer() {
    let mut project = three_track_project();
    project.extend(name_field("Contrabass"));
    project.extend(b"Bus UID");

    let strict = scan(&project, &ScanProfile::strict());
    let labels: Vec<&str> = strict.names.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["Contrabass"]);
    assert_eq!(strict.references.len(), 2);
}

#[test]
fn test_rename_keeps_file_size() {
    let project = three_track_project();
    let mut report = analyze_container(&project, &Config::default());
    report.slots[1].new_track_label = Some("Violin 2".to_string());
    report.slots[1].new_reference_label = Some("Violin 2 Map".to_string());

    let patched = apply_slots(&project, &report.slots);
    assert_eq!(patched.buffer.len(), project.len());
    assert_eq!(patched.applied.len(), 2);

    let rescanned = analyze_container(&patched.buffer, &Config::default());
    let tracks: Vec<&str> = rescanned.tracks.iter().map(|t| t.label.as_str()).collect();
    assert!(tracks.contains(&"Violin 2       "));
    assert!(rescanned
        .references
        .iter()
        .any(|r| r.label.starts_with("Violin 2 Map ")));
}

fn record(folder: &str, name: &str) -> ResourceRecord {
    ResourceRecord {
        display_name: name.to_string(),
        storage_path: format!("{}/{}.expressionmap", folder, name),
        folder_path: folder.to_string(),
    }
}

#[test]
fn test_catalog_query_selects_vsl_piccolo() {
    let catalog = vec![
        record("Spitfire Audio/SSO", "SFSSOP Harp A"),
        record("Spitfire Audio/SSO", "SFSSOP Violins 1 A"),
        record("8Dio/Agitato", "8DAGE1 Piano Main Mics A"),
        record("VSL/Prime/Wood", "VSPME 01 Piccolo Flute A"),
        record("Orchestral Tools/Berlin Strings", "OTBS Viola Legato"),
        record("Native Instruments/Cremona", "NICRQS Stradivari Violin A"),
    ];

    let outcome = Matcher::default().resolve("Vsl Pr Piccolo", &catalog).unwrap();
    assert_eq!(outcome.tier, MatchTier::Keyword);
    assert_eq!(outcome.candidate.resource.folder_path, "VSL/Prime/Wood");
    assert!(outcome.candidate.score >= 10);
    assert_eq!(outcome.candidate.matched_terms, vec!["vsl", "pr", "piccolo"]);
}

#[test]
fn test_directory_catalog_feeds_matcher() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("Spitfire Audio/SSO")).unwrap();
    for name in ["SFSSOP Oboe 2 A", "SFSSOP Oboe 1 A"] {
        std::fs::write(
            dir.path().join(format!("Spitfire Audio/SSO/{}.expressionmap", name)),
            name.as_bytes(),
        )
        .unwrap();
    }

    let source = DirectoryCatalog::new(dir.path(), "expressionmap");
    let records = source.list().unwrap();
    let outcome = Matcher::default().resolve("Sso Oboe 1", &records).unwrap();
    assert_eq!(outcome.candidate.resource.display_name, "SFSSOP Oboe 1 A");
    assert_eq!(
        source.read(&outcome.candidate.resource.storage_path).unwrap(),
        b"SFSSOP Oboe 1 A".to_vec()
    );
}
