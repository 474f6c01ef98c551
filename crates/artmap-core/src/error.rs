//! Error types for artmap-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for artmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in artmap-core
///
/// Malformed container candidates and stray transport messages are not
/// errors: the scanner and decoder skip them. An unmatched track or query
/// is reported as data, never through this type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Container or catalog entry could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A catalog path tried to leave the catalog root
    #[error("Invalid catalog path: {0}")]
    InvalidPath(String),

    /// Auto-assignment ran past the last MIDI note
    #[error("No more available MIDI notes for remote triggers (started at {start})")]
    NoMidiNotesAvailable { start: u8 },

    /// Live MIDI port error
    #[error("MIDI error: {0}")]
    Midi(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Wrap an IO error with the path that produced it.
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Storage {
            path: path.into(),
            source,
        }
    }
}
