//! Cross-corpus detection of repeated structural lines.
//!
//! Headers, footers, and page numbers repeat across pages while real
//! content does not. The corpus is tallied in one full pass before any
//! per-page cleaning decision is made; the resulting profile and the
//! derived boilerplate set are immutable value objects handed forward.

use crate::models::{BoilerplateOptions, RawPage};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

fn page_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:(?:page|p\.?)\s*\d+(?:\s*(?:of|/|sur)\s*\d+)?|\d+)\s*$")
            .expect("page number pattern is valid")
    })
}

fn isolated_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d+\b").expect("isolated number pattern is valid"))
}

/// Normalizes a line for frequency tallying: trims, collapses internal
/// whitespace, and drops isolated digit tokens so "Page 3" and
/// "Page 17" tally as the same structural line.
pub fn normalize_line(line: &str) -> String {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    let without_numbers = isolated_number_pattern().replace_all(&collapsed, "");
    without_numbers
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Returns true for lines that are structurally identifiable as page
/// furniture regardless of how often they occur.
pub fn is_page_number_line(line: &str) -> bool {
    page_number_pattern().is_match(line)
}

/// Frequency tally of normalized lines across a whole corpus.
#[derive(Debug, Clone)]
pub struct CorpusProfile {
    line_frequency: HashMap<String, usize>,
    structural_lines: HashSet<String>,
    total_pages: usize,
}

impl CorpusProfile {
    pub fn scan(pages: &[RawPage]) -> Self {
        let mut line_frequency: HashMap<String, usize> = HashMap::new();
        let mut structural_lines = HashSet::new();

        for page in pages {
            // A line repeated inside one page counts once per page, so
            // the threshold stays corpus-relative.
            let mut seen_on_page = HashSet::new();
            for line in page.raw_text.lines() {
                let normalized = normalize_line(line);
                if normalized.is_empty() {
                    continue;
                }
                if is_page_number_line(line) {
                    structural_lines.insert(normalized.clone());
                }
                if seen_on_page.insert(normalized.clone()) {
                    *line_frequency.entry(normalized).or_default() += 1;
                }
            }
        }

        Self {
            line_frequency,
            structural_lines,
            total_pages: pages.len(),
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn occurrences(&self, line: &str) -> usize {
        self.line_frequency
            .get(&normalize_line(line))
            .copied()
            .unwrap_or(0)
    }

    /// Derives the set of lines the cleaner should drop. A line
    /// qualifies by frequency (seen on at least the threshold fraction
    /// of pages, and short) or structurally (page-number forms, which a
    /// single occurrence suffices for).
    pub fn boilerplate_set(&self, options: &BoilerplateOptions) -> BoilerplateSet {
        let mut lines = HashSet::new();

        if self.total_pages > 0 {
            for (line, count) in &self.line_frequency {
                let ratio = *count as f64 / self.total_pages as f64;
                if ratio >= options.frequency_threshold && line.len() <= options.short_line_cutoff {
                    lines.insert(line.clone());
                }
            }
        }

        for line in &self.structural_lines {
            lines.insert(line.clone());
        }

        BoilerplateSet { lines }
    }
}

/// Normalized lines the cleaner drops when boilerplate removal is on.
#[derive(Debug, Clone, Default)]
pub struct BoilerplateSet {
    lines: HashSet<String>,
}

impl BoilerplateSet {
    pub fn contains_line(&self, line: &str) -> bool {
        if is_page_number_line(line) {
            return true;
        }
        let normalized = normalize_line(line);
        self.lines.contains(&normalized)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|line| line.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{normalize_line, CorpusProfile};
    use crate::models::{BoilerplateOptions, RawPage};

    fn page(number: u32, text: &str) -> RawPage {
        RawPage {
            source_id: "doc.pdf".to_string(),
            page_number: number,
            raw_text: text.to_string(),
        }
    }

    #[test]
    fn normalization_collapses_whitespace_and_digits() {
        assert_eq!(normalize_line("  Page   7  "), "Page");
        assert_eq!(normalize_line("Page 3 of 10"), "Page of");
        assert_eq!(normalize_line("Glucose 7 mmol"), "Glucose mmol");
    }

    #[test]
    fn recurring_short_lines_and_page_numbers_are_detected() {
        let pages: Vec<RawPage> = (1..=10)
            .map(|n| {
                page(
                    n,
                    &format!("Page {n}\nConfidential Draft\nBody text about insulin dose {n}."),
                )
            })
            .collect();

        let profile = CorpusProfile::scan(&pages);
        assert_eq!(profile.total_pages(), 10);

        let set = profile.boilerplate_set(&BoilerplateOptions::default());
        assert!(set.contains_line("Page 4"));
        assert!(set.contains_line("Confidential Draft"));
    }

    #[test]
    fn rare_lines_stay_out() {
        let mut pages: Vec<RawPage> = (1..=9)
            .map(|n| page(n, "Common header\nSome body text."))
            .collect();
        pages.push(page(10, "Common header\nA unique caption"));

        let set = CorpusProfile::scan(&pages).boilerplate_set(&BoilerplateOptions::default());
        assert!(set.contains_line("Common header"));
        assert!(!set.contains_line("A unique caption"));
    }

    #[test]
    fn long_repeated_sentences_are_kept_as_content() {
        let disclaimer = "This document is provided for general informational purposes only and \
                          does not replace the advice of a qualified healthcare professional.";
        let pages: Vec<RawPage> = (1..=10)
            .map(|n| page(n, &format!("{disclaimer}\nBody {n}")))
            .collect();

        let set = CorpusProfile::scan(&pages).boilerplate_set(&BoilerplateOptions::default());
        assert!(!set.contains_line(disclaimer));
    }

    #[test]
    fn numeric_only_line_qualifies_on_a_single_occurrence() {
        let pages = vec![page(1, "42\nReal content here.")];
        let set = CorpusProfile::scan(&pages).boilerplate_set(&BoilerplateOptions::default());
        assert!(set.contains_line("42"));
        assert!(!set.contains_line("Real content here."));
    }

    #[test]
    fn empty_corpus_yields_empty_set() {
        let set = CorpusProfile::scan(&[]).boilerplate_set(&BoilerplateOptions::default());
        assert!(set.is_empty());
    }
}
