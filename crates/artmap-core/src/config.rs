//! Configuration file support for artmap
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/artmap/config.toml`
//! - macOS: `~/Library/Application Support/artmap/config.toml`
//! - Windows: `%APPDATA%\artmap\config.toml`

use crate::catalog::CatalogSettings;
use crate::correlate::CorrelateSettings;
use crate::error::{Error, Result};
use crate::matcher::MatcherSettings;
use crate::scanner::ScanProfile;
use crate::transport::TransportSettings;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Container scan constants
    pub scan: ScanProfile,
    /// Track/reference scoring
    pub correlate: CorrelateSettings,
    /// Catalog name matching
    pub matcher: MatcherSettings,
    /// MIDI label transport
    pub transport: TransportSettings,
    /// Expression map library
    pub catalog: CatalogSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save configuration to the default config file location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "artmap") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }
}

/// Commented default configuration written by `artmap init`.
pub const DEFAULT_CONFIG: &str = r#"# artmap configuration file
# Every key is optional; missing keys fall back to the built-in defaults.

[scan]
# Track name fields: "Name" 00 00 08 followed by a big-endian u32 length.
# Accepted stored lengths are strictly between these bounds.
name_length_min = 8
name_length_max = 100

# Only count names followed by this marker (uncomment for "strict" mode)
# name_trailer = "Bus UID"
# name_trailer_window = 30

# Mixer tracks to skip
ignored_track_prefixes = ["KT Out", "Stereo In", "Right", "Stereo Out", "Left", "Input", "Output"]
min_name_chars = 2

# Expression map references follow two of these markers
marker = "All MIDI Inputs"
marker_distance_min = 20
marker_distance_max = 35

# How many offsets after the second marker to probe for the 01 00 00 00 flag
flag_search_window = 20
reference_length_min = 10
reference_length_max = 100
min_reference_chars = 6

[correlate]
# Byte distance buckets between a track record and a reference record
near_distance = 100000
near_score = 100
far_distance = 500000
far_score = 50

# Points per character of a track name found inside the map name
name_weight = 10

[matcher]
# Lowest keyword score accepted as a match
threshold = 10

# Interchangeable terms (phrases allowed)
aliases = [
    ["cor anglais", "english horn"],
    ["vln", "violin"],
    ["vla", "viola"],
    ["vc", "vlc", "cello", "violoncello"],
    ["cb", "kb", "contrabass", "double bass"],
    ["picc", "piccolo"],
    ["fl", "flute"],
    ["ob", "oboe"],
    ["cl", "clarinet"],
    ["bsn", "bassoon"],
    ["hn", "horn"],
    ["tpt", "trumpet"],
    ["tbn", "trombone"],
    ["tba", "tuba"],
]

[transport]
# MIDI channel, 0-based (15 = channel 16)
channel = 15
start_controller = 119
character_controller = 118
end_controller = 117
end_value = 127
max_label_chars = 64

[catalog]
# Expression map library
# root = "/path/to/Expression Maps"
extension = "expressionmap"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_file_parses_to_defaults() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config: Config = toml::from_str(
            r#"
[scan]
name_trailer = "Bus UID"

[matcher]
threshold = 20

[catalog]
root = "/srv/maps"
"#,
        )
        .unwrap();
        assert_eq!(config.scan.name_trailer.as_deref(), Some("Bus UID"));
        assert_eq!(config.scan.marker, "All MIDI Inputs");
        assert_eq!(config.matcher.threshold, 20);
        assert_eq!(config.matcher.aliases, MatcherSettings::default().aliases);
        assert_eq!(config.catalog.root, Some(PathBuf::from("/srv/maps")));
        assert_eq!(config.transport, TransportSettings::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.scan = ScanProfile::strict();
        config.correlate.name_weight = 7;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/artmap.toml")).unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
