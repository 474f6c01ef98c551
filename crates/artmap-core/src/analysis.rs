//! Whole-container analysis and the map copy side command.

use crate::config::Config;
use crate::correlate::{correlate, Correlation, Slot};
use crate::descriptor::{NameDescriptor, ReferenceDescriptor};
use crate::error::{Error, Result};
use crate::naming::reference_file_stem;
use crate::scanner::{scan, ScanResult};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything `analyze` reports about one container.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub file_size: usize,
    pub tracks: Vec<NameDescriptor>,
    pub references: Vec<ReferenceDescriptor>,
    pub slots: Vec<Slot>,
    pub unmatched_tracks: Vec<NameDescriptor>,
    pub unmatched_references: Vec<ReferenceDescriptor>,
}

impl AnalysisReport {
    fn new(file_size: usize, scan: ScanResult, correlation: Correlation) -> Self {
        Self {
            file_size,
            tracks: scan.names,
            references: scan.references,
            slots: correlation.slots,
            unmatched_tracks: correlation.unmatched_tracks,
            unmatched_references: correlation.unmatched_references,
        }
    }

    /// Neither extractor found anything; probably not a project file.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.references.is_empty()
    }
}

/// Scan and correlate an in-memory container.
pub fn analyze_container(buffer: &[u8], config: &Config) -> AnalysisReport {
    let scanned = scan(buffer, &config.scan);
    let correlation = correlate(&scanned, &config.correlate);
    AnalysisReport::new(buffer.len(), scanned, correlation)
}

/// Read a container from disk and analyze it.
pub fn analyze_file(path: &Path, config: &Config) -> Result<(Vec<u8>, AnalysisReport)> {
    let buffer = fs::read(path).map_err(|e| Error::storage(path, e))?;
    let report = analyze_container(&buffer, config);
    Ok((buffer, report))
}

/// A map file copied under its track's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedMap {
    pub track: String,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// A slot whose map file could not be located.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingMap {
    pub track: String,
    pub expected: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub copied: Vec<CopiedMap>,
    pub not_found: Vec<MissingMap>,
}

/// File name under which a slot's map is stored in the library.
pub fn source_file_name(slot: &Slot, extension: &str) -> String {
    format!("{}.{}", reference_file_stem(&slot.reference.label), extension)
}

/// File name the copied map gets, matching the track.
pub fn destination_file_name(slot: &Slot, extension: &str) -> String {
    let track: String = slot
        .track
        .label
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.{}", track, extension)
}

/// Copy each slot's map from `source_dir` into `dest_dir`, renamed after
/// the track.
///
/// The map is looked up at the top level first, then anywhere below it
/// (first hit in file-name order). Missing maps are reported, not fatal;
/// I/O failures are.
pub fn copy_maps(slots: &[Slot], source_dir: &Path, dest_dir: &Path, extension: &str) -> Result<CopyReport> {
    fs::create_dir_all(dest_dir).map_err(|e| Error::storage(dest_dir, e))?;

    let mut report = CopyReport::default();
    for slot in slots {
        let expected = source_file_name(slot, extension);
        let Some(from) = find_map_file(source_dir, &expected) else {
            log::debug!("No {:?} below {:?}", expected, source_dir);
            report.not_found.push(MissingMap {
                track: slot.track.label.clone(),
                expected,
            });
            continue;
        };

        let to = dest_dir.join(destination_file_name(slot, extension));
        fs::copy(&from, &to).map_err(|e| Error::storage(&from, e))?;
        log::info!("Copied {:?} -> {:?}", from, to);
        report.copied.push(CopiedMap {
            track: slot.track.label.clone(),
            from,
            to,
        });
    }

    Ok(report)
}

fn find_map_file(source_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let direct = source_dir.join(file_name);
    if direct.is_file() {
        return Some(direct);
    }

    WalkDir::new(source_dir)
        .min_depth(2)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_str() == Some(file_name))
        .map(|entry| entry.into_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fixtures::{name_field, padding, reference_record};

    fn container() -> Vec<u8> {
        let mut buf = padding(32);
        buf.extend(name_field("Amati Viola"));
        buf.extend(padding(200));
        buf.extend(reference_record("NICRQ Amati Viola Multi Mic Attribute"));
        buf.extend(padding(200));
        buf.extend(name_field("Stereo Out"));
        buf.extend(padding(64));
        buf
    }

    #[test]
    fn test_analyze_container() {
        let report = analyze_container(&container(), &Config::default());
        assert_eq!(report.tracks.len(), 1);
        assert_eq!(report.references.len(), 1);
        assert_eq!(report.slots.len(), 1);
        assert_eq!(report.slots[0].track.label, "Amati Viola");
        assert!(report.unmatched_tracks.is_empty());
        assert!(report.unmatched_references.is_empty());
        assert!(!report.is_empty());
    }

    #[test]
    fn test_analyze_garbage_is_empty() {
        let report = analyze_container(&padding(4096), &Config::default());
        assert!(report.is_empty());
        assert_eq!(report.file_size, 4096);
    }

    #[test]
    fn test_analyze_missing_file() {
        let err = analyze_file(Path::new("/nonexistent/project.cpr"), &Config::default()).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }

    #[test]
    fn test_copy_maps_top_level_and_nested() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("NI/Cremona")).unwrap();
        fs::write(
            source.path().join("NI/Cremona/NICRQ Amati Viola Multi Mic A.expressionmap"),
            b"viola",
        )
        .unwrap();

        let mut buf = container();
        buf.extend(name_field("Ghost Track"));
        buf.extend(padding(200));
        buf.extend(reference_record("NICRQ Ghost Track Attribute"));
        buf.extend(padding(64));

        let report = analyze_container(&buf, &Config::default());
        assert_eq!(report.slots.len(), 2);

        let copied = copy_maps(&report.slots, source.path(), &dest.path().join("out"), "expressionmap").unwrap();
        assert_eq!(copied.copied.len(), 1);
        assert_eq!(copied.copied[0].track, "Amati Viola");
        assert_eq!(
            fs::read(dest.path().join("out/Amati Viola.expressionmap")).unwrap(),
            b"viola".to_vec()
        );
        assert_eq!(
            copied.not_found,
            vec![MissingMap {
                track: "Ghost Track".to_string(),
                expected: "NICRQ Ghost Track A.expressionmap".to_string(),
            }]
        );
    }

    #[test]
    fn test_top_level_wins() {
        let source = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("sub")).unwrap();
        fs::write(source.path().join("Map A.expressionmap"), b"top").unwrap();
        fs::write(source.path().join("sub/Map A.expressionmap"), b"nested").unwrap();

        let found = find_map_file(source.path(), "Map A.expressionmap").unwrap();
        assert_eq!(fs::read(found).unwrap(), b"top".to_vec());
    }
}
