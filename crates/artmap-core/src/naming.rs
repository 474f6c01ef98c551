//! Label cleanup for expression-map names.
//!
//! Library vendors decorate map names with product codes and mic-position
//! suffixes (`VSPME 31 Bassoon 1 A`, `NICRQ Amati Viola Multi Mic
//! Attribute`). These helpers derive shorter names from them. They only
//! ever produce new strings; labels stored in descriptors stay verbatim.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static SUGGESTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)\s*Multi\s*Mic\s*Attribute$",
        r"(?i)\s*Attribute$",
        r"(?i)^NICRQ\s*",
        r"(?i)^VSL\s*",
    ])
});

// Only the first matching prefix is removed.
static LIBRARY_PREFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^[A-Z0-9]+\s+\d+\s+",
        r"^[A-Z0-9]+\s+",
        r"(?i)^NICRQS\s+",
    ])
});

// Applied in order, most specific first.
static VARIANT_SUFFIXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i) Main Mics [A-D]$",
        r"(?i) Spot Mics [A-D]$",
        r"(?i) Synth [A-D]$",
        r"(?i) CB Multi Mic [A-D]$",
        r"(?i) Multi Mic [A-D]$",
        r"(?i) -MC -SL$",
        r"(?i) Attribute$",
        r" [A-D]$",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static label pattern"))
        .collect()
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
pub fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Suggest a track name from an expression map's internal name.
///
/// `"NICRQ Stradivari Violin Multi Mic Attribute"` becomes
/// `"Stradivari Violin"`.
pub fn suggest_track_label(reference_label: &str) -> String {
    let mut name = reference_label.to_string();
    for pattern in SUGGESTION_PATTERNS.iter() {
        name = pattern.replace(&name, "").into_owned();
    }
    name.trim().to_string()
}

/// File stem under which a referenced map is stored on disk.
///
/// Cubase shows the articulation type in full; the files abbreviate it.
pub fn reference_file_stem(reference_label: &str) -> String {
    if let Some(base) = reference_label.strip_suffix(" Attribute") {
        format!("{} A", base)
    } else if let Some(base) = reference_label.strip_suffix(" Direction") {
        format!("{} D", base)
    } else {
        reference_label.to_string()
    }
}

/// Strip the library code prefix and mic/variant suffixes from a map stem.
///
/// `"VSPME 31 Bassoon 1 A"` becomes `"Bassoon 1"`.
pub fn clean_instrument_name(stem: &str) -> String {
    let mut name = stem.to_string();

    if let Some(prefix) = LIBRARY_PREFIXES.iter().find(|p| p.is_match(&name)) {
        name = prefix.replace(&name, "").into_owned();
    }
    for suffix in VARIANT_SUFFIXES.iter() {
        name = suffix.replace(&name, "").into_owned();
    }

    name.trim().to_string()
}

/// A proposed file rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub old_name: String,
    pub new_name: String,
}

impl Rename {
    pub fn is_change(&self) -> bool {
        self.old_name != self.new_name
    }
}

/// Propose cleaned names for a set of map files sharing one extension.
///
/// Files without the extension are ignored. The extension is matched
/// case-insensitively and written back in the given form.
pub fn plan_renames<'a>(file_names: impl IntoIterator<Item = &'a str>, extension: &str) -> Vec<Rename> {
    let suffix = format!(".{}", extension.to_lowercase());
    file_names
        .into_iter()
        .filter_map(|old| {
            let lower = old.to_lowercase();
            if !lower.ends_with(&suffix) {
                return None;
            }
            let stem = &old[..old.len() - suffix.len()];
            Some(Rename {
                old_name: old.to_string(),
                new_name: format!("{}.{}", clean_instrument_name(stem), extension),
            })
        })
        .collect()
}

/// Target names that more than one changed file would be renamed to.
pub fn duplicate_targets(renames: &[Rename]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rename in renames.iter().filter(|r| r.is_change()) {
        *counts.entry(rename.new_name.as_str()).or_default() += 1;
    }
    let mut dups: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name.to_string())
        .collect();
    dups.sort();
    dups
}
