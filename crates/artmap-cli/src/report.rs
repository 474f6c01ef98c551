//! Human-readable output for the artmap commands.

use artmap_core::analysis::{source_file_name, AnalysisReport, CopyReport};
use artmap_core::matcher::{MatchCandidate, MatchOutcome};
use artmap_core::naming::Rename;
use artmap_core::patch::PatchReport;
use artmap_core::transport::ControlMessage;
use std::path::Path;

pub fn print_analysis(path: &Path, report: &AnalysisReport, extension: &str) {
    println!("File: {}", path.display());
    println!("Size: {:.2} MB\n", report.file_size as f64 / 1024.0 / 1024.0);
    println!(
        "Found {} tracks, {} expression map references",
        report.tracks.len(),
        report.references.len()
    );
    println!("Matched {} track -> expression map pairs\n", report.slots.len());

    if report.slots.is_empty() && !report.tracks.is_empty() {
        println!("No expression maps assigned. Tracks found:");
        for track in &report.tracks {
            println!("  - {}", track.label);
        }
        println!();
    }

    for slot in &report.slots {
        println!("{:>3}. \"{}\"", slot.index + 1, slot.track.label);
        println!("     Exp Map: {}", slot.reference.label);
        println!("     File:    {}", source_file_name(slot, extension));
        if let Some(suggested) = slot.new_track_label.as_deref().filter(|s| *s != slot.track.label) {
            println!("     Suggest: \"{}\"", suggested);
        }
    }

    if !report.unmatched_references.is_empty() {
        println!("\nExpression maps with no matching track:");
        for reference in &report.unmatched_references {
            println!("  - {}", reference.label);
        }
    }
    if !report.unmatched_tracks.is_empty() {
        println!("\nTracks with no expression map:");
        for track in &report.unmatched_tracks {
            println!("  - {}", track.label);
        }
    }
}

pub fn print_copy(report: &CopyReport) {
    for copied in &report.copied {
        println!("✓ Copied: \"{}\" <- {}", copied.to.display(), copied.from.display());
    }
    for missing in &report.not_found {
        println!("✗ Not found: \"{}\" (track \"{}\")", missing.expected, missing.track);
    }
    println!(
        "\n{} files copied, {} not found",
        report.copied.len(),
        report.not_found.len()
    );
}

pub fn print_patch(report: &PatchReport, output: &Path) {
    if report.applied.is_empty() {
        println!("Nothing to rename");
    }
    for rewrite in &report.applied {
        println!(
            "{:>3}. {:<9} \"{}\" -> \"{}\" ({} occurrences)",
            rewrite.slot + 1,
            rewrite.kind.to_string(),
            rewrite.old_label,
            rewrite.new_label,
            rewrite.occurrences
        );
    }
    println!(
        "\nWrote {} ({} bytes, {} regions rewritten)",
        output.display(),
        report.buffer.len(),
        report.total_occurrences()
    );
}

pub fn print_match(query: &str, outcome: Option<&MatchOutcome>, ranked: &[MatchCandidate]) {
    match outcome {
        Some(outcome) => println!(
            "\"{}\" -> {} ({} match, score {})",
            query, outcome.candidate.resource.storage_path, outcome.tier, outcome.candidate.score
        ),
        None => println!("\"{}\" -> no confident match", query),
    }

    if !ranked.is_empty() {
        println!("\nCandidates:");
        for candidate in ranked {
            println!(
                "  {:>4}  {}  [{}]",
                candidate.score,
                candidate.resource.storage_path,
                candidate.matched_terms.join(", ")
            );
        }
    }
}

pub fn print_frame(label: &str, frame: &[ControlMessage], character_controller: u8) {
    println!("\"{}\" ({} messages)", label, frame.len());
    for msg in frame {
        let [status, controller, value] = msg.to_bytes();
        let shown = if controller == character_controller && value.is_ascii_graphic() {
            format!(" '{}'", value as char)
        } else {
            String::new()
        };
        println!("  {:02X} {:3} {:3}{}", status, controller, value, shown);
    }
}

pub fn print_renames(renames: &[Rename]) {
    let changes: Vec<&Rename> = renames.iter().filter(|r| r.is_change()).collect();
    if changes.is_empty() {
        println!("All {} files already have clean names", renames.len());
        return;
    }
    for rename in &changes {
        println!("  {}\n    -> {}", rename.old_name, rename.new_name);
    }
    println!("\n{} of {} files would be renamed", changes.len(), renames.len());
}
