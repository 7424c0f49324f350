//! Stateless per-page text repair.
//!
//! Stages run in a fixed order; each one assumes the previous stage's
//! normalization. Everything except the medical-term expansion can only
//! shrink the text, so `chars_removed` is a plain length difference.

use crate::boilerplate::BoilerplateSet;
use crate::models::{CleanedPage, CleaningConfig, CleaningStats, RawPage};
use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"https?://[A-Za-z0-9$\-_@.&+!*(),/%#?=~:;]+").expect("url pattern is valid")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
            .expect("email pattern is valid")
    })
}

/// Abbreviation expansions for the diabetes corpus. Matching is
/// case-insensitive; output follows the canonical form on the right.
const MEDICAL_TERMS: [(&str, &str); 4] = [
    (r"\bDT1\b", "diabète de type 1"),
    (r"\bDT2\b", "diabète de type 2"),
    (r"\bHbA1c\b", "hémoglobine glyquée"),
    (r"\bIMC\b", "indice de masse corporelle"),
];

fn medical_patterns() -> &'static Vec<(Regex, &'static str)> {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        MEDICAL_TERMS
            .iter()
            .map(|(pattern, replacement)| {
                let insensitive = format!("(?i){pattern}");
                (
                    Regex::new(&insensitive).expect("medical term pattern is valid"),
                    *replacement,
                )
            })
            .collect()
    })
}

pub fn clean_page(
    page: &RawPage,
    boilerplate: &BoilerplateSet,
    config: &CleaningConfig,
) -> CleanedPage {
    let raw_len = page.raw_text.len();
    let raw_lines = page.raw_text.lines().count();

    let mut text = page.raw_text.clone();

    if config.fix_hyphenation {
        text = fix_hyphenation(&text);
    }
    if config.remove_boilerplate {
        text = remove_boilerplate_lines(&text, boilerplate);
    }
    text = normalize_whitespace(&text);
    if config.remove_urls {
        text = remove_urls_and_emails(&text);
    }
    if config.normalize_medical {
        text = normalize_medical_terms(&text);
    }

    let stats = CleaningStats {
        chars_removed: raw_len.saturating_sub(text.len()),
        lines_removed: raw_lines.saturating_sub(text.lines().count()),
    };

    CleanedPage {
        source_id: page.source_id.clone(),
        page_number: page.page_number,
        clean_text: text,
        stats,
    }
}

/// Joins words split across a line break by a trailing hyphen. Only
/// fires when the continuation starts lowercase and the rejoined token
/// is free of embedded punctuation; an uppercase continuation is
/// treated as an intentional break and left alone.
fn fix_hyphenation(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(|line| line.to_string()).collect();
    let mut index = 0;

    while index + 1 < lines.len() {
        if should_join(&lines[index], &lines[index + 1]) {
            let trimmed_end = lines[index].trim_end();
            let head = trimmed_end[..trimmed_end.len() - 1].to_string();
            let tail = lines.remove(index + 1);
            lines[index] = format!("{}{}", head, tail.trim_start());
            // Stay on this line: the joined line may itself end in a
            // hyphen.
        } else {
            index += 1;
        }
    }

    lines.join("\n")
}

fn should_join(current: &str, next: &str) -> bool {
    let current = current.trim_end();
    if !current.ends_with('-') || current.len() < 2 {
        return false;
    }

    let next = next.trim_start();
    let Some(first) = next.chars().next() else {
        return false;
    };
    if !first.is_lowercase() {
        return false;
    }

    let head = current[..current.len() - 1]
        .split_whitespace()
        .last()
        .unwrap_or("");
    let tail = next.split_whitespace().next().unwrap_or("");
    let joined = format!("{head}{tail}");

    !joined.is_empty() && joined.chars().all(char::is_alphanumeric)
}

fn remove_boilerplate_lines(text: &str, boilerplate: &BoilerplateSet) -> String {
    text.lines()
        .filter(|line| line.trim().is_empty() || !boilerplate.contains_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapses space runs, maps typographic characters to ASCII, strips
/// control characters, trims line edges, and caps blank runs at one
/// empty line.
fn normalize_whitespace(text: &str) -> String {
    let mut replaced = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{a0}' => replaced.push(' '),
            '\u{2018}' | '\u{2019}' => replaced.push('\''),
            '\u{201c}' | '\u{201d}' => replaced.push('"'),
            '\u{2013}' | '\u{2014}' => replaced.push('-'),
            '\u{2026}' => replaced.push_str("..."),
            '\n' | '\t' => replaced.push(ch),
            ch if ch.is_control() => {}
            ch => replaced.push(ch),
        }
    }

    let mut lines = Vec::new();
    let mut blank_run = 0usize;
    for line in replaced.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run == 1 {
                lines.push(collapsed);
            }
        } else {
            blank_run = 0;
            lines.push(collapsed);
        }
    }

    lines.join("\n").trim().to_string()
}

fn remove_urls_and_emails(text: &str) -> String {
    let without_urls = url_pattern().replace_all(text, "");
    let without_emails = email_pattern().replace_all(&without_urls, "");

    // Removal, not a placeholder: close the gap the match left behind
    // so no doubled spaces survive.
    without_emails
        .lines()
        .map(|line| {
            line.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_medical_terms(text: &str) -> String {
    let mut result = text.to_string();
    for (pattern, replacement) in medical_patterns() {
        result = pattern.replace_all(&result, *replacement).into_owned();
    }
    result
}
