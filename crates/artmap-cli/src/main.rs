//! artmap - Track and expression map tooling for Cubase projects
//!
//! Reads a `.cpr` project, pairs every track with the expression map
//! assigned to it and helps line names up on both sides.

mod report;

use anyhow::{bail, Context, Result};
use artmap_core::analysis::{analyze_file, copy_maps, AnalysisReport, CopyReport};
use artmap_core::catalog::{CatalogSource, DirectoryCatalog};
use artmap_core::config::Config;
use artmap_core::correlate::assign_from_catalog;
use artmap_core::matcher::Matcher;
use artmap_core::naming::{duplicate_targets, plan_renames};
use artmap_core::patch::{apply_slots, PatchReport};
use artmap_core::scanner::ScanProfile;
use artmap_core::transport::encode_frame;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "artmap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Track and expression map tooling for Cubase projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (default: ~/.config/artmap/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List tracks, expression map references and how they pair up
    Analyze {
        /// Cubase project file
        #[arg(value_name = "CPR")]
        container: PathBuf,

        /// Scan profile: "template" (all named tracks) or "strict" (bus tracks only)
        #[arg(long)]
        profile: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy each assigned expression map, renamed after its track
    CopyMaps {
        /// Cubase project file
        #[arg(value_name = "CPR")]
        container: PathBuf,

        /// Expression map library
        #[arg(value_name = "SOURCE_DIR")]
        source_dir: PathBuf,

        /// Where the renamed copies go
        #[arg(value_name = "DEST_DIR")]
        dest_dir: PathBuf,

        #[arg(long)]
        profile: Option<String>,
    },

    /// Write a copy of the project with track and map labels rewritten
    Rename {
        /// Cubase project file
        #[arg(value_name = "CPR")]
        container: PathBuf,

        /// Output project file
        #[arg(short, long)]
        output: PathBuf,

        /// Track label for a slot, as INDEX=LABEL (1-based, repeatable)
        #[arg(long = "set", value_name = "INDEX=LABEL", value_parser = parse_assignment)]
        track_labels: Vec<(usize, String)>,

        /// Expression map label for a slot, as INDEX=LABEL (1-based, repeatable)
        #[arg(long = "reference", value_name = "INDEX=LABEL", value_parser = parse_assignment)]
        reference_labels: Vec<(usize, String)>,

        /// Only apply explicit --set/--reference labels, not suggestions
        #[arg(long)]
        no_suggest: bool,

        /// Relabel every slot after the library map its track resolves to
        #[arg(long)]
        auto: bool,

        /// Expression map library for --auto (default: [catalog] root from config)
        #[arg(long, requires = "auto")]
        catalog: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,

        #[arg(long)]
        profile: Option<String>,
    },

    /// Find the expression map in a library that best fits a track name
    Match {
        /// Track name to look up
        query: String,

        /// Expression map library (default: [catalog] root from config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// How many ranked candidates to show
        #[arg(long, default_value = "5")]
        top: usize,
    },

    /// Show the MIDI messages that send a track name to a control surface
    Encode {
        label: String,
    },

    /// Strip library codes and mic suffixes from expression map file names
    Tidy {
        /// Directory holding the expression maps
        dir: PathBuf,

        /// Rename the files instead of previewing
        #[arg(long)]
        apply: bool,
    },

    /// Receive track names over MIDI and resolve each against the library
    #[cfg(feature = "midi")]
    Listen {
        /// MIDI input port (partial name, case-insensitive)
        #[arg(long)]
        port: Option<String>,

        /// List the available MIDI input ports and exit
        #[arg(long)]
        list: bool,

        /// Expression map library (default: [catalog] root from config)
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Re-read the library this often, in seconds
        #[arg(long, default_value = "30")]
        refresh_secs: u64,
    },

    /// Create a default configuration file
    Init,

    /// Show the configuration file path
    ConfigPath,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path).with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Analyze {
            container,
            profile,
            json,
        } => {
            let config = with_profile(config, profile.as_deref())?;
            analyze(&container, &config, json)?;
            Ok(())
        }
        Commands::CopyMaps {
            container,
            source_dir,
            dest_dir,
            profile,
        } => {
            let config = with_profile(config, profile.as_deref())?;
            let copied = copy_assigned_maps(&container, &source_dir, &dest_dir, &config)?;
            report::print_copy(&copied);
            Ok(())
        }
        Commands::Rename {
            container,
            output,
            track_labels,
            reference_labels,
            no_suggest,
            auto,
            catalog,
            force,
            profile,
        } => {
            let config = with_profile(config, profile.as_deref())?;
            let library = if auto {
                Some(catalog_source(&config, catalog)?)
            } else {
                None
            };
            let options = RenameOptions {
                track_labels,
                reference_labels,
                no_suggest,
                library,
                force,
            };
            let patched = rename(&container, &output, &config, options)?;
            report::print_patch(&patched, &output);
            Ok(())
        }
        Commands::Match { query, catalog, top } => {
            let source = catalog_source(&config, catalog)?;
            let records = source.list().context("Failed to list expression map library")?;

            let matcher = Matcher::new(config.matcher.clone());
            let outcome = matcher.resolve(&query, &records);
            let ranked: Vec<_> = matcher.rank(&query, &records).into_iter().take(top).collect();
            report::print_match(&query, outcome.as_ref(), &ranked);
            Ok(())
        }
        Commands::Encode { label } => {
            let frame = encode_frame(&label, &config.transport);
            report::print_frame(&label, &frame, config.transport.character_controller);
            Ok(())
        }
        Commands::Tidy { dir, apply } => tidy(&dir, apply, &config.catalog.extension),
        #[cfg(feature = "midi")]
        Commands::Listen {
            port,
            list,
            catalog,
            refresh_secs,
        } => {
            if list {
                for (i, name) in artmap_core::midi::list_ports()?.iter().enumerate() {
                    println!("{}: {}", i, name);
                }
                return Ok(());
            }
            listen(&config, port.as_deref(), catalog, refresh_secs)
        }
        Commands::Init => {
            let path = Config::create_default_config_file()?;
            println!("Created default config at: {}", path.display());
            Ok(())
        }
        Commands::ConfigPath => {
            let path = Config::config_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Analyze and print a project. Fails when nothing was found in it.
fn analyze(container: &Path, config: &Config, json: bool) -> Result<AnalysisReport> {
    let (_, report) =
        analyze_file(container, config).with_context(|| format!("Failed to analyze {}", container.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_analysis(container, &report, &config.catalog.extension);
    }

    if report.is_empty() {
        bail!("No tracks or expression map references found in {}", container.display());
    }
    Ok(report)
}

fn copy_assigned_maps(container: &Path, source_dir: &Path, dest_dir: &Path, config: &Config) -> Result<CopyReport> {
    let (_, analysis) =
        analyze_file(container, config).with_context(|| format!("Failed to analyze {}", container.display()))?;
    if analysis.slots.is_empty() {
        bail!("No track/expression map pairs found in {}", container.display());
    }

    copy_maps(&analysis.slots, source_dir, dest_dir, &config.catalog.extension).context("Failed to copy expression maps")
}

/// What `rename` should write into the slots.
#[derive(Debug, Default)]
struct RenameOptions {
    track_labels: Vec<(usize, String)>,
    reference_labels: Vec<(usize, String)>,
    no_suggest: bool,
    /// Library to relabel slots from before explicit labels apply
    library: Option<DirectoryCatalog>,
    force: bool,
}

fn rename(container: &Path, output: &Path, config: &Config, options: RenameOptions) -> Result<PatchReport> {
    if output.exists() && !options.force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let (buffer, mut analysis) =
        analyze_file(container, config).with_context(|| format!("Failed to analyze {}", container.display()))?;

    if options.no_suggest {
        for slot in &mut analysis.slots {
            slot.new_track_label = None;
        }
    }
    if let Some(library) = &options.library {
        let records = library.list().context("Failed to list expression map library")?;
        let matcher = Matcher::new(config.matcher.clone());
        let assigned = assign_from_catalog(&mut analysis.slots, &matcher, &records);
        println!(
            "Assigned library maps to {} of {} slots",
            assigned,
            analysis.slots.len()
        );
    }
    for (index, label) in options.track_labels {
        slot_at(&mut analysis.slots, index)?.new_track_label = Some(label);
    }
    for (index, label) in options.reference_labels {
        slot_at(&mut analysis.slots, index)?.new_reference_label = Some(label);
    }

    let patched = apply_slots(&buffer, &analysis.slots);
    fs::write(output, &patched.buffer).with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(patched)
}

/// Parse `INDEX=LABEL`.
fn parse_assignment(s: &str) -> std::result::Result<(usize, String), String> {
    let (index, label) = s
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=LABEL, got '{}'", s))?;
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid slot index '{}'", index))?;
    if index == 0 {
        return Err("slot indices start at 1".to_string());
    }
    Ok((index, label.to_string()))
}

fn slot_at(slots: &mut [artmap_core::Slot], index: usize) -> Result<&mut artmap_core::Slot> {
    let count = slots.len();
    slots
        .get_mut(index - 1)
        .with_context(|| format!("Slot {} does not exist ({} slots found)", index, count))
}

fn with_profile(mut config: Config, profile: Option<&str>) -> Result<Config> {
    if let Some(name) = profile {
        config.scan = ScanProfile::preset(name)
            .with_context(|| format!("Unknown scan profile '{}' (expected template or strict)", name))?;
    }
    Ok(config)
}

fn catalog_source(config: &Config, root: Option<PathBuf>) -> Result<DirectoryCatalog> {
    let root = root
        .or_else(|| config.catalog.root.clone())
        .context("No expression map library given (use --catalog or set [catalog] root)")?;
    Ok(DirectoryCatalog::from_settings(root, &config.catalog))
}

fn tidy(dir: &Path, apply: bool, extension: &str) -> Result<()> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    let renames = plan_renames(names.iter().map(String::as_str), extension);
    report::print_renames(&renames);

    let duplicates = duplicate_targets(&renames);
    if !duplicates.is_empty() {
        bail!(
            "Several files would be renamed to the same name: {}",
            duplicates.join(", ")
        );
    }
    if !apply {
        return Ok(());
    }

    let mut renamed = 0;
    for rename in renames.iter().filter(|r| r.is_change()) {
        let to = dir.join(&rename.new_name);
        if to.exists() {
            log::warn!("Skipping {}: {} already exists", rename.old_name, rename.new_name);
            continue;
        }
        fs::rename(dir.join(&rename.old_name), &to)
            .with_context(|| format!("Failed to rename {}", rename.old_name))?;
        renamed += 1;
    }
    println!("Renamed {} files", renamed);
    Ok(())
}

#[cfg(feature = "midi")]
fn listen(config: &Config, port: Option<&str>, catalog: Option<PathBuf>, refresh_secs: u64) -> Result<()> {
    use artmap_core::catalog::CatalogHandle;
    use artmap_core::midi::LabelListener;
    use crossbeam_channel::{select, tick};
    use std::time::Duration;

    let source = catalog_source(config, catalog)?;
    let handle = CatalogHandle::default();
    let count = handle.refresh(&source).context("Failed to list expression map library")?;
    println!("Loaded {} expression maps from {}", count, source.root().display());

    let matcher = Matcher::new(config.matcher.clone());
    let (listener, labels) = LabelListener::open(port, config.transport.clone())?;
    println!("Listening on {} (Ctrl+C to stop)", listener.port_name());

    let ticker = tick(Duration::from_secs(refresh_secs.max(1)));
    loop {
        select! {
            recv(labels) -> label => {
                let Ok(label) = label else { break };
                let catalog = handle.snapshot();
                let outcome = matcher.resolve(&label, catalog.records());
                report::print_match(&label, outcome.as_ref(), &[]);
            }
            recv(ticker) -> _ => {
                if let Err(e) = handle.refresh(&source) {
                    log::warn!("Library refresh failed, keeping previous listing: {}", e);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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
        out.extend_from_slice(&[0u8; 16]);
        out
    }

    fn write_project(dir: &Path, parts: &[Vec<u8>]) -> PathBuf {
        let path = dir.join("Project.cpr");
        fs::write(&path, parts.concat()).unwrap();
        path
    }

    #[test]
    fn test_analyze_fails_on_empty_project() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("garbage.cpr");
        fs::write(&garbage, vec![0x5Au8; 4096]).unwrap();

        assert!(analyze(&garbage, &Config::default(), false).is_err());
        assert!(analyze(&dir.path().join("missing.cpr"), &Config::default(), false).is_err());
    }

    #[test]
    fn test_analyze_succeeds_with_tracks_only() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_project(dir.path(), &[name_field("Solo Cello"), vec![0u8; 64]]);

        let report = analyze(&project, &Config::default(), true).unwrap();
        assert_eq!(report.tracks.len(), 1);
        assert!(report.slots.is_empty());
    }

    #[test]
    fn test_copy_maps_needs_slots() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_project(dir.path(), &[name_field("Solo Cello"), vec![0u8; 64]]);

        let err = copy_assigned_maps(&project, dir.path(), &dir.path().join("out"), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("No track/expression map pairs"));
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_rename_auto_from_library() {
        let dir = tempfile::tempdir().unwrap();
        let project = write_project(
            dir.path(),
            &[
                name_field("Amati Viola"),
                vec![0u8; 64],
                reference_record("NICRQ Amati Viola Multi Mic Attribute"),
                vec![0u8; 64],
            ],
        );
        let library = dir.path().join("maps/Cremona");
        fs::create_dir_all(&library).unwrap();
        fs::write(library.join("NICRQS Viola Amati.expressionmap"), b"").unwrap();

        let output = dir.path().join("Renamed.cpr");
        let options = RenameOptions {
            library: Some(DirectoryCatalog::new(dir.path().join("maps"), "expressionmap")),
            ..Default::default()
        };
        let patched = rename(&project, &output, &Config::default(), options).unwrap();
        assert_eq!(patched.buffer.len(), fs::metadata(&project).unwrap().len() as usize);

        let (_, after) = analyze_file(&output, &Config::default()).unwrap();
        // Track name cut to its 11 bytes, reference padded to its 37.
        assert_eq!(after.tracks[0].label, "NICRQS Viol");
        assert!(after.references[0].label.starts_with("NICRQS Viola Amati "));
        assert_eq!(after.references[0].len, 37);

        // The output now exists; a second run without --force refuses.
        assert!(rename(&project, &output, &Config::default(), RenameOptions::default()).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("2=Solo Violin"), Ok((2, "Solo Violin".to_string())));
        assert_eq!(parse_assignment("1=a=b"), Ok((1, "a=b".to_string())));
        assert!(parse_assignment("0=Harp").is_err());
        assert!(parse_assignment("Harp").is_err());
        assert!(parse_assignment("x=Harp").is_err());
    }

    #[test]
    fn test_with_profile() {
        let config = with_profile(Config::default(), Some("strict")).unwrap();
        assert_eq!(config.scan, ScanProfile::strict());
        assert!(with_profile(Config::default(), Some("loose")).is_err());
    }

    #[test]
    fn test_tidy_refuses_collisions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("VSPME 31 Bassoon 1 A.expressionmap"), b"").unwrap();
        fs::write(dir.path().join("VSPME 32 Bassoon 1 B.expressionmap"), b"").unwrap();
        assert!(tidy(dir.path(), true, "expressionmap").is_err());
        assert!(dir.path().join("VSPME 31 Bassoon 1 A.expressionmap").exists());
    }

    #[test]
    fn test_tidy_applies() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("8DAGE1 Piano Main Mics A.expressionmap"), b"").unwrap();
        tidy(dir.path(), true, "expressionmap").unwrap();
        assert!(dir.path().join("Piano.expressionmap").exists());
    }
}
