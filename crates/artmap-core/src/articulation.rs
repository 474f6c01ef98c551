//! Articulation maps as consumed after a track has been resolved.
//!
//! Nothing here reads map files; callers build [`ArticulationMap`] values
//! from whatever source they have. The helpers are pure and return new
//! values instead of editing in place.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

/// Note-on status byte used for remote triggers.
pub const NOTE_ON_STATUS: u8 = 144;

/// Highest MIDI note number.
pub const MAX_NOTE: u8 = 127;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

static MERGED_NAME_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(Part|Attribute|Direction|\d+)\s*$").expect("static merged-name pattern")
});

/// Whether an articulation is a persistent attribute or a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticulationType {
    #[default]
    Attribute,
    Direction,
}

/// The note a control surface sends to select an articulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrigger {
    pub status: u8,
    pub note: u8,
    /// Assigned by [`auto_assign_remote_triggers`], not present in the source map.
    #[serde(default)]
    pub auto_assigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Articulation {
    pub name: String,
    pub short_name: String,
    pub group: u8,
    pub color: u8,
    pub articulation_type: ArticulationType,
    pub remote_trigger: Option<RemoteTrigger>,
    /// Output channel in a merged map
    pub midi_channel: Option<u8>,
    /// Name of the map this came from, in a merged map
    pub source_map: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArticulationMap {
    pub name: String,
    pub file_name: String,
    pub articulations: Vec<Articulation>,
    /// Set on merged maps only
    pub source_map_names: Vec<String>,
}

impl ArticulationMap {
    pub fn is_merged(&self) -> bool {
        !self.source_map_names.is_empty()
    }

    pub fn has_unassigned_remotes(&self) -> bool {
        self.articulations.iter().any(|a| a.remote_trigger.is_none())
    }

    pub fn auto_assigned_count(&self) -> usize {
        self.articulations
            .iter()
            .filter(|a| a.remote_trigger.is_some_and(|t| t.auto_assigned))
            .count()
    }

    /// Articulations keyed by group number.
    pub fn groups(&self) -> BTreeMap<u8, Vec<&Articulation>> {
        let mut groups: BTreeMap<u8, Vec<&Articulation>> = BTreeMap::new();
        for art in &self.articulations {
            groups.entry(art.group).or_default().push(art);
        }
        groups
    }
}

/// Note name with C-2 = 0 (Cubase convention).
pub fn midi_note_to_name(note: u8) -> String {
    let octave = i32::from(note / 12) - 2;
    format!("{}{}", NOTE_NAMES[usize::from(note % 12)], octave)
}

/// Give every articulation without a remote trigger the next free note.
///
/// Notes held by explicit (not auto-assigned) triggers are skipped. The
/// input map is never modified; on exhaustion the error is returned and
/// nothing is assigned.
pub fn auto_assign_remote_triggers(map: &ArticulationMap, start_note: u8) -> Result<ArticulationMap> {
    let mut used: HashSet<u8> = map
        .articulations
        .iter()
        .filter_map(|a| a.remote_trigger)
        .filter(|t| !t.auto_assigned)
        .map(|t| t.note)
        .collect();

    let mut next = u16::from(start_note);
    let mut result = map.clone();

    for art in result.articulations.iter_mut().filter(|a| a.remote_trigger.is_none()) {
        while next <= u16::from(MAX_NOTE) && used.contains(&(next as u8)) {
            next += 1;
        }
        if next > u16::from(MAX_NOTE) {
            return Err(Error::NoMidiNotesAvailable { start: start_note });
        }
        let note = next as u8;
        used.insert(note);
        next += 1;

        art.remote_trigger = Some(RemoteTrigger {
            status: NOTE_ON_STATUS,
            note,
            auto_assigned: true,
        });
    }

    log::debug!("Assigned {} remote triggers in {:?}", result.auto_assigned_count(), result.name);
    Ok(result)
}

/// Merge maps into one, one output channel per source map.
///
/// Every articulation of `maps[i]` gets channel and group `i`. Without an
/// explicit name the merged map is named after the common prefix of the
/// source names.
pub fn merge_maps(maps: &[ArticulationMap], name: Option<&str>) -> ArticulationMap {
    let articulations = maps
        .iter()
        .enumerate()
        .flat_map(|(index, map)| {
            let index = index.min(u8::MAX as usize) as u8;
            map.articulations.iter().map(move |art| Articulation {
                midi_channel: Some(index),
                source_map: Some(map.name.clone()),
                group: index,
                ..art.clone()
            })
        })
        .collect();

    let names: Vec<&str> = maps.iter().map(|m| m.name.as_str()).collect();
    let merged_name = match name.filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => common_name(&names).unwrap_or_else(|| "Merged Map".to_string()),
    };

    ArticulationMap {
        name: merged_name,
        file_name: "merged".to_string(),
        articulations,
        source_map_names: names.iter().map(|n| n.to_string()).collect(),
    }
}

/// `"Amati Viola"` from `"Amati Viola Part 1"` and `"Amati Viola Part 2"`.
fn common_name(names: &[&str]) -> Option<String> {
    let (first, rest) = names.split_first()?;
    if rest.is_empty() {
        return Some(first.to_string()).filter(|n| !n.is_empty());
    }

    let mut common: &str = first;
    for name in rest {
        while !name.starts_with(common) {
            let mut chars = common.chars();
            chars.next_back();
            common = chars.as_str();
        }
    }

    let trimmed = MERGED_NAME_TAIL.replace(common, "");
    let trimmed = trimmed.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// CSV of every articulation's remote note, for printing or import elsewhere.
pub fn remote_assignments_csv(map: &ArticulationMap) -> String {
    let quote = |s: &str| format!("\"{}\"", s.replace('"', "\"\""));

    let mut lines = vec!["Articulation Name,Short Name,Remote Note,MIDI Note Number,Auto-Assigned".to_string()];
    for art in &map.articulations {
        let (note_name, note_number, auto) = match art.remote_trigger {
            Some(t) => (midi_note_to_name(t.note), i32::from(t.note), t.auto_assigned),
            None => ("N/A".to_string(), -1, false),
        };
        lines.push(format!(
            "{},{},{},{},{}",
            quote(&art.name),
            quote(&art.short_name),
            note_name,
            note_number,
            if auto { "Yes" } else { "No" }
        ));
    }
    lines.join("\n")
}
