//! Filename relevance scoring.
//!
//! This is the pure heart of the search: given a stored file name and the
//! hint a caller typed, produce a comparable relevance number. No I/O, no
//! state, total over every possible string input.

use std::collections::HashSet;

/// Reduce a file name to its comparable form.
///
/// Takes the part before the first `.` (the base name), lowercases it,
/// turns `_`/`-` runs into spaces, drops everything outside `[a-z0-9 ]`
/// and collapses the remaining whitespace.
pub fn normalize(name: &str) -> String {
    let base = name.split('.').next().unwrap_or_default();

    let mut cleaned = String::with_capacity(base.len());
    for ch in base.to_lowercase().chars() {
        match ch {
            '_' | '-' | ' ' => cleaned.push(' '),
            'a'..='z' | '0'..='9' => cleaned.push(ch),
            _ => {}
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Score how well a stored file name matches a target hint.
///
/// Both names are normalized identically and compared as word sets. The
/// fraction of the hint's words found in the candidate picks a tier
/// (100 / 85 / 65 / 40, else 10 per shared word), and the difference in
/// normalized length is charged at 0.5 per character. Degenerate inputs
/// score 0. The result can go negative; filtering out non-positive
/// scores is the caller's job.
pub fn score(candidate_name: &str, target_hint: &str) -> f64 {
    let base = normalize(candidate_name);
    let target = normalize(target_hint);

    if base.is_empty() || target.is_empty() {
        return 0.0;
    }

    let base_words: HashSet<&str> = base.split(' ').collect();
    let target_words: HashSet<&str> = target.split(' ').collect();

    let shared = target_words
        .iter()
        .filter(|word| base_words.contains(*word))
        .count();

    let coverage = shared as f64 / target_words.len() as f64;

    let tier = if shared == target_words.len() {
        100.0
    } else if coverage >= 0.75 {
        85.0
    } else if coverage >= 0.5 {
        65.0
    } else if coverage >= 0.25 {
        40.0
    } else {
        (shared * 10) as f64
    };

    // Normalized strings are pure ASCII, so byte length is char count.
    tier - 0.5 * (base.len() as f64 - target.len() as f64).abs()
}
