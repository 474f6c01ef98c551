//! Descriptor extraction from Cubase project containers.
//!
//! The `.cpr` format is undocumented. Both extractors are byte-shape
//! heuristics: they miss some real fields and occasionally report noise
//! that happens to look like one. Every constant they rely on lives in
//! [`ScanProfile`] so it can be revised as more project files are studied.
//!
//! Name fields look like this:
//!
//! ```text
//! "Name" 00 00 08 | u32 BE length | label bytes ... (length - 4 bytes)
//! ```
//!
//! Expression-map references follow a pair of `All MIDI Inputs` markers:
//!
//! ```text
//! "All MIDI Inputs" 00 .. "All MIDI Inputs" 00 .. 01 00 00 00 | u8 length | label 00
//! ```

use crate::descriptor::{Descriptor, NameDescriptor, ReferenceDescriptor};
use crate::locator::Locator;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Track names that belong to the mixer rather than to instruments.
pub const SYSTEM_TRACK_PREFIXES: &[&str] = &[
    "KT Out",
    "Stereo In",
    "Right",
    "Stereo Out",
    "Left",
    "Input",
    "Output",
];

/// Container constants used by the extractors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanProfile {
    /// Byte tag introducing a name field.
    pub name_tag: Vec<u8>,
    /// Stored name length must be strictly greater than this.
    pub name_length_min: u32,
    /// Stored name length must be strictly less than this.
    pub name_length_max: u32,
    /// Bytes counted by the stored name length that are not label text.
    pub name_framing_bytes: usize,
    /// Marker that must follow a name for it to count as a track (optional).
    pub name_trailer: Option<String>,
    /// How far past the label the trailer may start.
    pub name_trailer_window: usize,
    /// Names starting with any of these are skipped.
    pub ignored_track_prefixes: Vec<String>,
    /// Shortest accepted track name, in characters.
    pub min_name_chars: usize,

    /// Marker appearing twice before every reference record.
    pub marker: String,
    /// Smallest accepted distance between the two markers.
    pub marker_distance_min: usize,
    /// Largest accepted distance between the two markers.
    pub marker_distance_max: usize,
    /// Bytes between the end of the second marker and the flag search start.
    pub marker_terminator_bytes: usize,
    /// How many offsets after the second marker are probed for the flag.
    pub flag_search_window: usize,
    /// Flag value announcing a reference label.
    pub flag_value: u32,
    /// Whether the flag is stored big-endian.
    pub flag_big_endian: bool,
    /// Probing stops once fewer than this many bytes remain past the probe.
    pub flag_tail_guard: usize,
    /// Length byte must be strictly greater than this.
    pub reference_length_min: u8,
    /// Length byte must be strictly less than this.
    pub reference_length_max: u8,
    /// Bytes counted by the length byte that are not label text.
    pub reference_framing_bytes: usize,
    /// Extra bytes read past the declared length while looking for a NUL.
    pub reference_read_slack: usize,
    /// Shortest accepted reference label, in characters.
    pub min_reference_chars: usize,
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self::template()
    }
}

impl ScanProfile {
    /// Profile accepting every named track, skipping mixer tracks.
    ///
    /// This is the variant used when building templates: it finds tracks
    /// whether or not they carry a bus record.
    pub fn template() -> Self {
        Self {
            name_tag: b"Name\x00\x00\x08".to_vec(),
            name_length_min: 8,
            name_length_max: 100,
            name_framing_bytes: 4,
            name_trailer: None,
            name_trailer_window: 30,
            ignored_track_prefixes: SYSTEM_TRACK_PREFIXES.iter().map(|s| s.to_string()).collect(),
            min_name_chars: 2,
            marker: "All MIDI Inputs".to_string(),
            marker_distance_min: 20,
            marker_distance_max: 35,
            marker_terminator_bytes: 1,
            flag_search_window: 20,
            flag_value: 1,
            flag_big_endian: false,
            flag_tail_guard: 10,
            reference_length_min: 10,
            reference_length_max: 100,
            reference_framing_bytes: 4,
            reference_read_slack: 10,
            min_reference_chars: 6,
        }
    }

    /// Profile accepting only main tracks, i.e. names followed by `Bus UID`.
    pub fn strict() -> Self {
        Self {
            name_trailer: Some("Bus UID".to_string()),
            ignored_track_prefixes: vec![
                "KT Out 1".to_string(),
                "Stereo In".to_string(),
                "Right".to_string(),
                "Stereo Out".to_string(),
                "Left".to_string(),
            ],
            min_name_chars: 1,
            ..Self::template()
        }
    }

    /// Look up a preset by name (`template` or `strict`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "template" => Some(Self::template()),
            "strict" => Some(Self::strict()),
            _ => None,
        }
    }

    fn is_ignored_track(&self, name: &str) -> bool {
        self.ignored_track_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }

    fn read_flag(&self, bytes: &[u8]) -> u32 {
        if self.flag_big_endian {
            BigEndian::read_u32(bytes)
        } else {
            LittleEndian::read_u32(bytes)
        }
    }
}

/// Everything one scan pass recovered from a container.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    pub names: Vec<NameDescriptor>,
    pub references: Vec<ReferenceDescriptor>,
}

impl ScanResult {
    /// True when neither extractor found anything.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.references.is_empty()
    }

    /// Both descriptor kinds merged in container order.
    pub fn descriptors(&self) -> Vec<Descriptor> {
        let mut all: Vec<Descriptor> = self
            .names
            .iter()
            .cloned()
            .map(Descriptor::from)
            .chain(self.references.iter().cloned().map(Descriptor::from))
            .collect();
        all.sort_by_key(|d| d.offset());
        all
    }
}

/// Run both extractors over a container.
pub fn scan(buffer: &[u8], profile: &ScanProfile) -> ScanResult {
    let names = scan_names(buffer, profile);
    let references = scan_references(buffer, profile);
    log::info!(
        "Scanned {} bytes: {} track names, {} expression map references",
        buffer.len(),
        names.len(),
        references.len()
    );
    ScanResult { names, references }
}

/// Find track names. Later duplicates of a label are dropped.
pub fn scan_names(buffer: &[u8], profile: &ScanProfile) -> Vec<NameDescriptor> {
    let tag_len = profile.name_tag.len();
    let locator = Locator::new(&profile.name_tag);
    let trailer = profile.name_trailer.as_deref().map(str::as_bytes);

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for tag_pos in locator.find_all(buffer) {
        let len_pos = tag_pos + tag_len;
        let Some(len_bytes) = buffer.get(len_pos..len_pos + 4) else {
            log::debug!("Name tag at {:#x} truncated before its length field", tag_pos);
            continue;
        };
        let stored_len = BigEndian::read_u32(len_bytes);
        if stored_len <= profile.name_length_min || stored_len >= profile.name_length_max {
            log::debug!("Name tag at {:#x}: length {} out of bounds", tag_pos, stored_len);
            continue;
        }

        let field_len = (stored_len as usize).saturating_sub(profile.name_framing_bytes);
        let start = len_pos + 4;
        let Some(field) = buffer.get(start..start + field_len) else {
            log::debug!("Name tag at {:#x}: label runs past end of container", tag_pos);
            continue;
        };
        let raw = until_nul(field);
        let label = String::from_utf8_lossy(raw).into_owned();

        if label.chars().count() < profile.min_name_chars || profile.is_ignored_track(&label) {
            continue;
        }

        if let Some(trailer) = trailer {
            let search_end = (start + stored_len as usize + profile.name_trailer_window).min(buffer.len());
            if !has_trailer(buffer, start + field_len, search_end, trailer) {
                continue;
            }
        }

        if !seen.insert(label.clone()) {
            continue;
        }

        names.push(NameDescriptor {
            label,
            offset: start,
            len: raw.len(),
            record_offset: tag_pos,
        });
    }

    names
}

/// Find expression-map references.
pub fn scan_references(buffer: &[u8], profile: &ScanProfile) -> Vec<ReferenceDescriptor> {
    let marker_len = profile.marker.len();
    let positions = Locator::new(profile.marker.as_bytes()).find_all(buffer);
    let mut references = Vec::new();

    let mut i = 0;
    while i + 1 < positions.len() {
        let first = positions[i];
        let second = positions[i + 1];
        let distance = second - first;

        if (profile.marker_distance_min..=profile.marker_distance_max).contains(&distance) {
            if let Some(reference) = read_reference(buffer, profile, first, second + marker_len) {
                references.push(reference);
                // The second marker closes this pair and cannot open the next.
                i += 2;
                continue;
            }
        }
        i += 1;
    }

    references
}

/// Probe for the flag/length block after a marker pair.
fn read_reference(
    buffer: &[u8],
    profile: &ScanProfile,
    record_offset: usize,
    marker_end: usize,
) -> Option<ReferenceDescriptor> {
    let search_start = marker_end + profile.marker_terminator_bytes;

    for probe in search_start..search_start + profile.flag_search_window {
        if probe + profile.flag_tail_guard >= buffer.len() {
            break;
        }
        let Some(block) = buffer.get(probe..probe + 5) else {
            log::debug!("Reference at {:#x} truncated before its length byte", record_offset);
            break;
        };
        if profile.read_flag(&block[..4]) != profile.flag_value {
            continue;
        }

        let len_byte = block[4];
        if len_byte <= profile.reference_length_min || len_byte >= profile.reference_length_max {
            continue;
        }

        let declared = (len_byte as usize).saturating_sub(profile.reference_framing_bytes);
        let start = probe + 5;
        let end = (start + declared + profile.reference_read_slack).min(buffer.len());
        let raw = until_nul(&buffer[start..end]);
        if raw.is_empty() {
            continue;
        }

        let label = String::from_utf8_lossy(raw).into_owned();
        if label.chars().count() < profile.min_reference_chars {
            log::debug!("Reference at {:#x}: label {:?} too short", start, label);
            continue;
        }

        return Some(ReferenceDescriptor {
            label,
            offset: start,
            len: raw.len(),
            record_offset,
        });
    }

    None
}

/// True when `trailer` starts somewhere in `from..search_end`.
fn has_trailer(buffer: &[u8], from: usize, search_end: usize, trailer: &[u8]) -> bool {
    if from >= search_end {
        return false;
    }
    let window_end = (search_end + trailer.len() - 1).min(buffer.len());
    Locator::new(trailer)
        .find_from(&buffer[..window_end], from)
        .is_some_and(|pos| pos < search_end)
}

fn until_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}
