//! Pairing expression-map references with the tracks they belong to.
//!
//! The container gives no explicit link between a track and its map, so
//! every reference is scored against every scanned track name using how
//! close the two records sit and whether the map's name contains the
//! track's name.

use crate::catalog::ResourceRecord;
use crate::descriptor::{NameDescriptor, ReferenceDescriptor};
use crate::matcher::Matcher;
use crate::naming::{suggest_track_label, truncate_to_bytes};
use crate::scanner::ScanResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scoring weights for the correlator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelateSettings {
    /// Records closer than this get `near_score`.
    pub near_distance: usize,
    pub near_score: u32,
    /// Records closer than this (but not near) get `far_score`.
    pub far_distance: usize,
    pub far_score: u32,
    /// Points per character of a track name contained in the map name.
    pub name_weight: u32,
}

impl Default for CorrelateSettings {
    fn default() -> Self {
        Self {
            near_distance: 100_000,
            near_score: 100,
            far_distance: 500_000,
            far_score: 50,
            name_weight: 10,
        }
    }
}

impl CorrelateSettings {
    /// Bucketed distance score between two record offsets.
    pub fn proximity_score(&self, a: usize, b: usize) -> u32 {
        let distance = a.abs_diff(b);
        if distance < self.near_distance {
            self.near_score
        } else if distance < self.far_distance {
            self.far_score
        } else {
            0
        }
    }

    /// Lexical score: non-zero only when the reference contains the name.
    pub fn name_score(&self, name: &str, reference: &str) -> u32 {
        let name = name.to_lowercase();
        if !name.is_empty() && reference.to_lowercase().contains(&name) {
            name.chars().count() as u32 * self.name_weight
        } else {
            0
        }
    }

    /// Combined score for one track/reference pair.
    pub fn score(&self, name: &NameDescriptor, reference: &ReferenceDescriptor) -> u32 {
        self.proximity_score(name.record_offset, reference.record_offset)
            + self.name_score(&name.label, &reference.label)
    }
}

/// One track bound to one expression-map reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub index: usize,
    pub track: NameDescriptor,
    pub reference: ReferenceDescriptor,
    /// Replacement for the track name, if it should change.
    pub new_track_label: Option<String>,
    /// Replacement for the reference label, if it should change.
    pub new_reference_label: Option<String>,
}

impl Slot {
    /// Cleaned-up track name derived from the reference, cut to fit the
    /// bytes the current track name occupies.
    pub fn suggested_track_label(&self) -> String {
        let suggestion = suggest_track_label(&self.reference.label);
        truncate_to_bytes(&suggestion, self.track.len).to_string()
    }

    /// Whether applying this slot would change anything.
    pub fn has_changes(&self) -> bool {
        self.new_track_label
            .as_deref()
            .is_some_and(|l| l != self.track.label)
            || self
                .new_reference_label
                .as_deref()
                .is_some_and(|l| l != self.reference.label)
    }
}

/// Result of a correlation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Correlation {
    pub slots: Vec<Slot>,
    pub unmatched_references: Vec<ReferenceDescriptor>,
    pub unmatched_tracks: Vec<NameDescriptor>,
}

/// Pair every reference with its best-scoring track.
///
/// References are visited in scan order and slots are numbered in the
/// order they are emitted. A track already claimed by an earlier slot
/// cannot be claimed again; the later reference is reported unmatched.
pub fn correlate(scan: &ScanResult, settings: &CorrelateSettings) -> Correlation {
    let mut claimed = HashSet::new();
    let mut result = Correlation::default();

    for reference in &scan.references {
        let Some(best) = best_track(&scan.names, reference, settings) else {
            log::debug!("No plausible track for reference {:?}", reference.label);
            result.unmatched_references.push(reference.clone());
            continue;
        };

        if !claimed.insert(best) {
            log::debug!(
                "Track {:?} already claimed, leaving {:?} unmatched",
                scan.names[best].label,
                reference.label
            );
            result.unmatched_references.push(reference.clone());
            continue;
        }

        let mut slot = Slot {
            index: result.slots.len(),
            track: scan.names[best].clone(),
            reference: reference.clone(),
            new_track_label: None,
            new_reference_label: None,
        };
        slot.new_track_label = Some(slot.suggested_track_label());
        result.slots.push(slot);
    }

    result.unmatched_tracks = scan
        .names
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed.contains(i))
        .map(|(_, n)| n.clone())
        .collect();

    log::info!(
        "Matched {} of {} references ({} tracks unmatched)",
        result.slots.len(),
        scan.references.len(),
        result.unmatched_tracks.len()
    );

    result
}

/// Relabel slots after the library maps their tracks resolve to.
///
/// Both the track name and the reference label take the map's display
/// name, cut to the bytes each currently occupies. Slots whose track
/// resolves to nothing keep their labels. Returns how many were assigned.
pub fn assign_from_catalog(slots: &mut [Slot], matcher: &Matcher, catalog: &[ResourceRecord]) -> usize {
    let mut assigned = 0;
    for slot in slots.iter_mut() {
        let Some(outcome) = matcher.resolve(&slot.track.label, catalog) else {
            log::debug!("No library map for track {:?}", slot.track.label);
            continue;
        };
        let name = &outcome.candidate.resource.display_name;
        log::debug!(
            "Slot {}: {:?} -> {:?} ({} match)",
            slot.index,
            slot.track.label,
            name,
            outcome.tier
        );
        slot.new_track_label = Some(truncate_to_bytes(name, slot.track.len).to_string());
        slot.new_reference_label = Some(truncate_to_bytes(name, slot.reference.len).to_string());
        assigned += 1;
    }
    assigned
}

/// Index of the strictly best-scoring name, or `None` if every score is 0.
fn best_track(
    names: &[NameDescriptor],
    reference: &ReferenceDescriptor,
    settings: &CorrelateSettings,
) -> Option<usize> {
    let mut best = None;
    let mut best_score = 0;
    for (i, name) in names.iter().enumerate() {
        let score = settings.score(name, reference);
        if score > best_score {
            best_score = score;
            best = Some(i);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(label: &str, at: usize) -> NameDescriptor {
        NameDescriptor {
            label: label.to_string(),
            offset: at + 11,
            len: label.len(),
            record_offset: at,
        }
    }

    fn reference(label: &str, at: usize) -> ReferenceDescriptor {
        ReferenceDescriptor {
            label: label.to_string(),
            offset: at + 45,
            len: label.len(),
            record_offset: at,
        }
    }

    #[test]
    fn test_proximity_buckets() {
        let s = CorrelateSettings::default();
        assert_eq!(s.proximity_score(0, 99_999), 100);
        assert_eq!(s.proximity_score(100_000, 0), 50);
        assert_eq!(s.proximity_score(0, 499_999), 50);
        assert_eq!(s.proximity_score(0, 500_000), 0);
    }

    #[test]
    fn test_name_score_case_insensitive() {
        let s = CorrelateSettings::default();
        assert_eq!(s.name_score("amati viola", "NICRQ Amati Viola Multi Mic Attribute"), 110);
        assert_eq!(s.name_score("Cello", "NICRQ Amati Viola Multi Mic Attribute"), 0);
    }

    #[test]
    fn test_longer_contained_name_wins() {
        let scan = ScanResult {
            names: vec![name("Violin", 1_000_000), name("Guarneri Violin", 2_000_000)],
            references: vec![reference("NICRQ Guarneri Violin Multi Mic Attribute", 0)],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        assert_eq!(c.slots.len(), 1);
        assert_eq!(c.slots[0].track.label, "Guarneri Violin");
        assert_eq!(c.unmatched_tracks.len(), 1);
    }

    #[test]
    fn test_proximity_alone_can_match() {
        let scan = ScanResult {
            names: vec![name("Track 7", 40_000)],
            references: vec![reference("VSL Synchron Strings Pro", 10_000)],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        assert_eq!(c.slots.len(), 1);
        assert_eq!(c.slots[0].index, 0);
    }

    #[test]
    fn test_zero_score_is_unmatched() {
        let scan = ScanResult {
            names: vec![name("Harp", 5_000_000)],
            references: vec![reference("NICRQ Amati Viola Multi Mic Attribute", 0)],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        assert!(c.slots.is_empty());
        assert_eq!(c.unmatched_references.len(), 1);
        assert_eq!(c.unmatched_tracks.len(), 1);
    }

    #[test]
    fn test_tie_goes_to_first_name() {
        let scan = ScanResult {
            names: vec![name("Flute 1", 1_000), name("Flute 2", 2_000)],
            references: vec![reference("Generic Woodwind Map", 0)],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        assert_eq!(c.slots[0].track.label, "Flute 1");
    }

    #[test]
    fn test_track_claimed_once() {
        let scan = ScanResult {
            names: vec![name("Amati Viola", 0)],
            references: vec![
                reference("NICRQ Amati Viola Multi Mic Attribute", 100),
                reference("NICRQ Amati Viola Multi Mic Direction", 200),
            ],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        assert_eq!(c.slots.len(), 1);
        assert_eq!(c.slots[0].reference.label, "NICRQ Amati Viola Multi Mic Attribute");
        assert_eq!(c.unmatched_references.len(), 1);
        assert!(c.unmatched_tracks.is_empty());
    }

    fn map(folder: &str, name: &str) -> ResourceRecord {
        ResourceRecord {
            display_name: name.to_string(),
            storage_path: format!("{}/{}.expressionmap", folder, name),
            folder_path: folder.to_string(),
        }
    }

    #[test]
    fn test_assign_from_catalog() {
        let scan = ScanResult {
            names: vec![name("Flute 1", 0), name("Theremin", 2_000_000)],
            references: vec![
                reference("Generic Woodwind Map 1", 100),
                reference("Generic Electronic Map", 2_000_100),
            ],
        };
        let mut c = correlate(&scan, &CorrelateSettings::default());
        assert_eq!(c.slots.len(), 2);
        let theremin_before = c.slots[1].new_track_label.clone();

        let library = vec![
            map("VSL/Prime/Wood", "VSPME 01 Piccolo Flute A"),
            map("VSL/Prime/Wood", "VSPME 02 Flute 1 A"),
        ];
        let assigned = assign_from_catalog(&mut c.slots, &Matcher::default(), &library);
        assert_eq!(assigned, 1);

        // Track name holds 7 bytes, the reference 22.
        let flute = &c.slots[0];
        assert_eq!(flute.new_track_label.as_deref(), Some("VSPME 0"));
        assert_eq!(flute.new_reference_label.as_deref(), Some("VSPME 02 Flute 1 A"));

        let theremin = &c.slots[1];
        assert_eq!(theremin.new_reference_label, None);
        assert_eq!(theremin.new_track_label, theremin_before);
    }

    #[test]
    fn test_slot_suggestion_fits_track() {
        let scan = ScanResult {
            names: vec![name("Amati Viola", 0)],
            references: vec![reference("NICRQ Amati Viola Multi Mic Attribute", 100)],
        };
        let c = correlate(&scan, &CorrelateSettings::default());
        let slot = &c.slots[0];
        assert_eq!(slot.new_track_label.as_deref(), Some("Amati Viola"));
        assert!(!slot.has_changes());
        // Stored originals are never cleaned.
        assert_eq!(slot.reference.label, "NICRQ Amati Viola Multi Mic Attribute");
    }
}
