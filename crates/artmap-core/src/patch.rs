//! Same-length label rewriting inside a project container.
//!
//! The container is never resized: every replacement is padded with
//! spaces or truncated to the byte length of the label it replaces, so
//! every offset and length field around it stays valid.

use crate::correlate::Slot;
use crate::descriptor::DescriptorKind;
use crate::locator::Locator;
use crate::naming::truncate_to_bytes;
use serde::Serialize;

/// Encode `label` into exactly `len` bytes, space padded or truncated.
///
/// Truncation never splits a UTF-8 sequence; the remainder is padded.
pub fn fit_label(label: &str, len: usize) -> Vec<u8> {
    let mut bytes = truncate_to_bytes(label, len).as_bytes().to_vec();
    bytes.resize(len, b' ');
    bytes
}

/// Copy `buffer` and replace every occurrence of `old` with `new`.
///
/// Returns the new buffer and how many occurrences were replaced. The
/// input is left untouched and the output has the same length.
pub fn rewrite(buffer: &[u8], old: &str, new: &str) -> (Vec<u8>, usize) {
    let mut patcher = Patcher::new(buffer.to_vec());
    let count = patcher.rewrite(old, new);
    (patcher.into_inner(), count)
}

/// Owns a working copy of a container and applies rewrites to it in order.
///
/// Each rewrite sees the result of the previous one. Taking `&mut self`
/// keeps chained rewrites serialized.
pub struct Patcher {
    buffer: Vec<u8>,
}

impl Patcher {
    pub fn new(buffer: Vec<u8>) -> Self {
        Self { buffer }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Replace every non-overlapping occurrence of `old`, left to right.
    pub fn rewrite(&mut self, old: &str, new: &str) -> usize {
        let old_bytes = old.as_bytes();
        if old_bytes.is_empty() {
            return 0;
        }
        let replacement = fit_label(new, old_bytes.len());

        // Offsets are taken before writing, so freshly written bytes are
        // never matched again.
        let positions = Locator::new(old_bytes).find_all(&self.buffer);
        for &pos in &positions {
            self.buffer[pos..pos + replacement.len()].copy_from_slice(&replacement);
        }

        log::debug!("Rewrote {:?} -> {:?} ({} occurrences)", old, new, positions.len());
        positions.len()
    }
}

/// One rewrite performed while applying slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedRewrite {
    pub slot: usize,
    pub kind: DescriptorKind,
    pub old_label: String,
    pub new_label: String,
    pub occurrences: usize,
}

/// Result of applying a set of slots to a container.
#[derive(Debug, Clone)]
pub struct PatchReport {
    pub buffer: Vec<u8>,
    pub applied: Vec<AppliedRewrite>,
}

impl PatchReport {
    /// Total regions touched across all rewrites.
    pub fn total_occurrences(&self) -> usize {
        self.applied.iter().map(|a| a.occurrences).sum()
    }
}

/// Apply every pending label change in `slots` to a copy of `buffer`.
///
/// All reference labels are rewritten before any track label, since a
/// reference label can embed the track name it belongs to.
pub fn apply_slots(buffer: &[u8], slots: &[Slot]) -> PatchReport {
    let mut patcher = Patcher::new(buffer.to_vec());
    let mut applied = Vec::new();

    for slot in slots {
        if let Some(new) = changed(&slot.reference.label, slot.new_reference_label.as_deref()) {
            let occurrences = patcher.rewrite(&slot.reference.label, new);
            applied.push(AppliedRewrite {
                slot: slot.index,
                kind: DescriptorKind::Reference,
                old_label: slot.reference.label.clone(),
                new_label: new.to_string(),
                occurrences,
            });
        }
    }

    for slot in slots {
        if let Some(new) = changed(&slot.track.label, slot.new_track_label.as_deref()) {
            let occurrences = patcher.rewrite(&slot.track.label, new);
            applied.push(AppliedRewrite {
                slot: slot.index,
                kind: DescriptorKind::Name,
                old_label: slot.track.label.clone(),
                new_label: new.to_string(),
                occurrences,
            });
        }
    }

    log::info!(
        "Applied {} label rewrites ({} regions)",
        applied.len(),
        applied.iter().map(|a| a.occurrences).sum::<usize>()
    );

    PatchReport {
        buffer: patcher.into_inner(),
        applied,
    }
}

fn changed<'a>(old: &str, new: Option<&'a str>) -> Option<&'a str> {
    new.filter(|n| !n.is_empty() && *n != old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{NameDescriptor, ReferenceDescriptor};

    #[test]
    fn test_fit_label() {
        assert_eq!(fit_label("Oboe", 6), b"Oboe  ".to_vec());
        assert_eq!(fit_label("Clarinet", 4), b"Clar".to_vec());
        assert_eq!(fit_label("", 3), b"   ".to_vec());
    }

    #[test]
    fn test_rewrite_pads_and_preserves_length() {
        let buf = b"\x00\x08Amati Viola\x00\xffAmati Viola\x00".to_vec();
        let (out, count) = rewrite(&buf, "Amati Viola", "Cello");
        assert_eq!(count, 2);
        assert_eq!(out.len(), buf.len());
        assert_eq!(&out[2..13], b"Cello      ");
        assert_eq!(&out[15..26], b"Cello      ");
        // Source buffer untouched.
        assert_eq!(&buf[2..13], b"Amati Viola");
    }

    #[test]
    fn test_rewrite_truncates_longer_label() {
        let buf = b"xxHornxx".to_vec();
        let (out, count) = rewrite(&buf, "Horn", "Trombone");
        assert_eq!(count, 1);
        assert_eq!(out, b"xxTromxx".to_vec());
    }

    #[test]
    fn test_rewrite_identity_is_noop() {
        let buf = b"Name\x00Flute 1\x00Flute 1".to_vec();
        let (out, count) = rewrite(&buf, "Flute 1", "Flute 1");
        assert_eq!(count, 2);
        assert_eq!(out, buf);
    }

    #[test]
    fn test_rewrite_no_self_match() {
        // The replacement contains the old label; it must not be matched again.
        let buf = b"aaXaa".to_vec();
        let (out, count) = rewrite(&buf, "aa", "aa");
        assert_eq!(count, 2);
        assert_eq!(out, buf);

        let (out, count) = rewrite(b"abab", "ab", "ba");
        assert_eq!(count, 2);
        assert_eq!(out, b"baba".to_vec());
    }

    #[test]
    fn test_empty_old_label() {
        let (out, count) = rewrite(b"abc", "", "x");
        assert_eq!(count, 0);
        assert_eq!(out, b"abc".to_vec());
    }

    fn slot(track: &str, reference: &str, new_track: Option<&str>, new_ref: Option<&str>) -> Slot {
        Slot {
            index: 0,
            track: NameDescriptor {
                label: track.to_string(),
                offset: 0,
                len: track.len(),
                record_offset: 0,
            },
            reference: ReferenceDescriptor {
                label: reference.to_string(),
                offset: 0,
                len: reference.len(),
                record_offset: 0,
            },
            new_track_label: new_track.map(str::to_string),
            new_reference_label: new_ref.map(str::to_string),
        }
    }

    #[test]
    fn test_apply_slots_rewrites_references_first() {
        let buf = b"[Violin]..[Violin Legato Map]".to_vec();
        let s = slot("Violin", "Violin Legato Map", Some("Viola"), Some("Cello Legato Map"));

        let report = apply_slots(&buf, &[s]);
        assert_eq!(report.buffer.len(), buf.len());
        assert_eq!(report.buffer, b"[Viola ]..[Cello Legato Map ]".to_vec());
        assert_eq!(report.applied.len(), 2);
        assert_eq!(report.applied[0].kind, DescriptorKind::Reference);
        assert_eq!(report.applied[0].occurrences, 1);
        assert_eq!(report.applied[1].kind, DescriptorKind::Name);
        assert_eq!(report.applied[1].occurrences, 1);
        assert_eq!(report.total_occurrences(), 2);
    }

    #[test]
    fn test_apply_slots_skips_unchanged() {
        let buf = b"Harp".to_vec();
        let s = slot("Harp", "Harp Map", Some("Harp"), None);
        let report = apply_slots(&buf, &[s]);
        assert!(report.applied.is_empty());
        assert_eq!(report.buffer, buf);
    }
}
