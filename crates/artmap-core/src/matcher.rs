//! Resolving a track name to a stored expression map.
//!
//! Track names rarely equal map file names. The matcher tries three
//! strategies, cheapest first:
//!
//! 1. exact (case-folded, trimmed) display name
//! 2. whole-word substring in either direction
//! 3. keyword scoring against the map's folder path and file name
//!
//! Keyword scoring understands abbreviations through an alias table and
//! treats numbers specially so that `Oboe 1` never resolves to `Oboe 2`.
//! Everything here is pure: the same query and catalog always give the
//! same answer.

use crate::catalog::ResourceRecord;
use serde::{Deserialize, Serialize};

/// Scoring configuration for the keyword tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    /// Groups of interchangeable terms. Terms may span several words.
    pub aliases: Vec<Vec<String>>,
    /// Lowest keyword score accepted as a match.
    pub threshold: i32,
    /// Keyword found as a whole word (or word sequence).
    pub word_score: i32,
    /// Extra points when that word is in the file name itself.
    pub file_name_bonus: i32,
    /// Keyword only found as the prefix of a word.
    pub prefix_score: i32,
    /// Number found as a standalone word.
    pub number_score: i32,
    /// Penalty when the candidate carries a different single-digit variant.
    pub number_conflict_penalty: i32,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        let groups: &[&[&str]] = &[
            &["cor anglais", "english horn"],
            &["vln", "violin"],
            &["vla", "viola"],
            &["vc", "vlc", "cello", "violoncello"],
            &["cb", "kb", "contrabass", "double bass"],
            &["picc", "piccolo"],
            &["fl", "flute"],
            &["ob", "oboe"],
            &["cl", "clarinet"],
            &["bsn", "bassoon"],
            &["hn", "horn"],
            &["tpt", "trumpet"],
            &["tbn", "trombone"],
            &["tba", "tuba"],
        ];
        Self {
            aliases: groups
                .iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
            threshold: 10,
            word_score: 10,
            file_name_bonus: 3,
            prefix_score: 5,
            number_score: 15,
            number_conflict_penalty: 20,
        }
    }
}

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Substring,
    Keyword,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchTier::Exact => write!(f, "exact"),
            MatchTier::Substring => write!(f, "substring"),
            MatchTier::Keyword => write!(f, "keyword"),
        }
    }
}

/// A scored catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub resource: ResourceRecord,
    pub score: i32,
    /// Query terms that contributed points, in query order.
    pub matched_terms: Vec<String>,
}

/// The resolved entry and how it was found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub tier: MatchTier,
    pub candidate: MatchCandidate,
}

/// Split on whitespace, hyphens, underscores and slashes; lowercase.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '/'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn is_number(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| c.is_ascii_digit())
}

fn contains_sequence(words: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && words.windows(phrase.len()).any(|w| w == phrase)
}

/// Stateless matcher over a catalog snapshot.
#[derive(Debug, Clone)]
pub struct Matcher {
    settings: MatcherSettings,
    /// Alias groups, each term pre-tokenized.
    alias_groups: Vec<Vec<Vec<String>>>,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatcherSettings::default())
    }
}

impl Matcher {
    pub fn new(settings: MatcherSettings) -> Self {
        let alias_groups = settings
            .aliases
            .iter()
            .map(|group| group.iter().map(|term| tokenize(term)).filter(|t| !t.is_empty()).collect())
            .collect();
        Self {
            settings,
            alias_groups,
        }
    }

    pub fn settings(&self) -> &MatcherSettings {
        &self.settings
    }

    /// Resolve `query` to the best catalog entry, if any is confident.
    pub fn resolve(&self, query: &str, catalog: &[ResourceRecord]) -> Option<MatchOutcome> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() || catalog.is_empty() {
            return None;
        }

        if let Some(record) = catalog
            .iter()
            .find(|r| r.display_name.trim().to_lowercase() == normalized)
        {
            log::debug!("Exact match for {:?}: {}", query, record.storage_path);
            return Some(self.outcome(MatchTier::Exact, query, record));
        }

        let query_words = tokenize(query);
        if let Some(record) = catalog.iter().find(|r| {
            let name_words = tokenize(&r.display_name);
            contains_sequence(&name_words, &query_words) || contains_sequence(&query_words, &name_words)
        }) {
            log::debug!("Substring match for {:?}: {}", query, record.storage_path);
            return Some(self.outcome(MatchTier::Substring, query, record));
        }

        let best = self.best_keyword_match(query, catalog)?;
        if best.score < self.settings.threshold {
            log::debug!(
                "Best keyword match for {:?} scored {} (< {}), no confident match",
                query,
                best.score,
                self.settings.threshold
            );
            return None;
        }
        Some(MatchOutcome {
            tier: MatchTier::Keyword,
            candidate: best,
        })
    }

    /// Highest keyword score; ties go to the earlier catalog entry.
    pub fn best_keyword_match(&self, query: &str, catalog: &[ResourceRecord]) -> Option<MatchCandidate> {
        let mut best: Option<MatchCandidate> = None;
        for record in catalog {
            let candidate = self.score(query, record);
            if best.as_ref().map_or(true, |b| candidate.score > b.score) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Every entry with a positive keyword score, best first.
    pub fn rank(&self, query: &str, catalog: &[ResourceRecord]) -> Vec<MatchCandidate> {
        let mut ranked: Vec<MatchCandidate> = catalog
            .iter()
            .map(|record| self.score(query, record))
            .filter(|c| c.score > 0)
            .collect();
        // Stable: equal scores keep catalog order.
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Keyword score of one catalog entry.
    pub fn score(&self, query: &str, record: &ResourceRecord) -> MatchCandidate {
        let all_words = tokenize(&format!("{}/{}", record.folder_path, record.display_name));
        let name_words = tokenize(&record.display_name);
        let s = &self.settings;

        let mut score = 0;
        let mut matched_terms = Vec::new();

        for term in self.query_terms(query) {
            if term.len() == 1 && is_number(&term[0]) {
                let number = &term[0];
                if all_words.iter().any(|w| w == number) {
                    score += s.number_score;
                    matched_terms.push(number.clone());
                } else if number.len() == 1
                    && all_words.iter().any(|w| w.len() == 1 && is_number(w) && w != number)
                {
                    score -= s.number_conflict_penalty;
                }
                continue;
            }

            let variants = self.variants(&term);
            if variants.iter().any(|v| contains_sequence(&all_words, v)) {
                score += s.word_score;
                if variants.iter().any(|v| contains_sequence(&name_words, v)) {
                    score += s.file_name_bonus;
                }
                matched_terms.push(term.join(" "));
            } else if variants
                .iter()
                .filter(|v| v.len() == 1)
                .any(|v| all_words.iter().any(|w| w.starts_with(v[0].as_str())))
            {
                score += s.prefix_score;
                matched_terms.push(term.join(" "));
            }
        }

        MatchCandidate {
            resource: record.clone(),
            score,
            matched_terms,
        }
    }

    fn outcome(&self, tier: MatchTier, query: &str, record: &ResourceRecord) -> MatchOutcome {
        MatchOutcome {
            tier,
            candidate: self.score(query, record),
        }
    }

    /// Split a query into terms, joining words that form a multi-word alias.
    fn query_terms(&self, query: &str) -> Vec<Vec<String>> {
        let tokens = tokenize(query);
        let mut terms = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let phrase = self
                .alias_groups
                .iter()
                .flatten()
                .filter(|t| t.len() > 1 && tokens[i..].starts_with(t))
                .max_by_key(|t| t.len());

            match phrase {
                Some(phrase) => {
                    terms.push(phrase.clone());
                    i += phrase.len();
                }
                None => {
                    let token = &tokens[i];
                    if token.chars().count() > 1 || is_number(token) {
                        terms.push(vec![token.clone()]);
                    }
                    i += 1;
                }
            }
        }

        terms
    }

    /// The term itself followed by every alias of it.
    fn variants(&self, term: &[String]) -> Vec<Vec<String>> {
        let mut variants = vec![term.to_vec()];
        for group in &self.alias_groups {
            if group.iter().any(|t| t == term) {
                variants.extend(group.iter().filter(|t| t.as_slice() != term).cloned());
            }
        }
        variants
    }
}
