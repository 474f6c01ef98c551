//! artmap-core - Track and expression map analysis for Cubase projects
//!
//! Cubase stores track names and the expression maps assigned to them in
//! an undocumented binary project file (`.cpr`). This crate recovers both
//! with byte-shape heuristics and works with the result:
//!
//! - Byte pattern search and typed descriptor extraction
//! - Pairing each expression map reference with its track
//! - Same-length label rewriting that never resizes the file
//! - Fuzzy matching of track names against an expression map library
//! - A MIDI control-change transport for sending track names to a surface
//! - Configurable via TOML file
//!
//! # Usage as a Library
//!
//! ```no_run
//! use artmap_core::{analyze_file, Config};
//! use std::path::Path;
//!
//! let config = Config::load_or_default();
//! let (_bytes, report) = analyze_file(Path::new("Template.cpr"), &config)?;
//!
//! for slot in &report.slots {
//!     println!("{} -> {}", slot.track.label, slot.reference.label);
//! }
//! # Ok::<(), artmap_core::Error>(())
//! ```

pub mod analysis;
pub mod articulation;
pub mod catalog;
pub mod config;
pub mod correlate;
pub mod descriptor;
pub mod error;
pub mod locator;
pub mod matcher;
#[cfg(feature = "midi")]
pub mod midi;
pub mod naming;
pub mod patch;
pub mod scanner;
pub mod transport;

// Re-export main types
pub use analysis::{analyze_container, analyze_file, copy_maps, AnalysisReport, CopyReport};
pub use articulation::{
    auto_assign_remote_triggers, merge_maps, midi_note_to_name, remote_assignments_csv, Articulation,
    ArticulationMap, RemoteTrigger,
};
pub use catalog::{Catalog, CatalogHandle, CatalogSettings, CatalogSource, DirectoryCatalog, ResourceRecord};
pub use config::Config;
pub use correlate::{assign_from_catalog, correlate, CorrelateSettings, Correlation, Slot};
pub use descriptor::{Descriptor, DescriptorKind, NameDescriptor, ReferenceDescriptor};
pub use error::{Error, Result};
pub use locator::{find_all, Locator};
pub use matcher::{MatchCandidate, MatchOutcome, MatchTier, Matcher, MatcherSettings};
pub use patch::{apply_slots, rewrite, PatchReport, Patcher};
pub use scanner::{scan, ScanProfile, ScanResult};
pub use transport::{encode_frame, ControlMessage, LabelDecoder, LabelEncoder, LabelStream, TransportSettings};
