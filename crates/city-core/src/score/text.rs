use std::collections::HashSet;

/// Pluggable text-similarity strategy.
///
/// Implementations return a score in [0,1] and never return zero for a
/// total mismatch: the floor keeps the additive blend totally ordered even
/// when text contributes nothing.
pub trait TextScorer: Send + Sync {
    fn score(&self, candidate: &str, query: &str) -> f64;
}

/// Minimum score for a candidate with no textual relation to the query.
const NO_MATCH_SCORE: f64 = 0.2;

/// Edit-distance budget: 30% of the query length, but at least 2.
fn fuzzy_threshold(query_len: usize) -> usize {
    (query_len * 3 / 10).max(2)
}

/// Tiered matcher: exact, prefix, whole word, substring, then Levenshtein
/// fallbacks at full-string and per-word granularity.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyTextScorer;

impl TextScorer for FuzzyTextScorer {
    fn score(&self, candidate: &str, query: &str) -> f64 {
        let candidate = candidate.to_lowercase();
        let query = query.to_lowercase();

        if candidate == query {
            return 1.0;
        }
        if candidate.starts_with(&query) {
            return 0.95;
        }
        if contains_whole_word(&candidate, &query) {
            return 0.8;
        }
        if candidate.contains(&query) {
            return 0.6;
        }

        let query_len = query.chars().count();
        let distance = levenshtein(&candidate, &query);
        if distance <= fuzzy_threshold(query_len) {
            let longest = candidate.chars().count().max(query_len);
            return 0.4 + 0.2 * (1.0 - distance as f64 / longest as f64);
        }

        // Word-level fallback for multi-word names like "San Luis Potosí".
        let candidate_words: Vec<&str> = candidate.split_whitespace().collect();
        let query_words: Vec<&str> = query.split_whitespace().collect();

        for cw in &candidate_words {
            for qw in &query_words {
                if cw.starts_with(qw) {
                    return 0.5;
                }
            }
        }
        for cw in &candidate_words {
            for qw in &query_words {
                if levenshtein(cw, qw) <= fuzzy_threshold(qw.chars().count()) {
                    return 0.4;
                }
            }
        }

        NO_MATCH_SCORE
    }
}

/// Trigram-overlap similarity, the alternate strategy.
///
/// Same measure the database's trigram filter approximates: shared
/// 3-grams over the union, computed on space-padded lowercase strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrigramTextScorer;

impl TextScorer for TrigramTextScorer {
    fn score(&self, candidate: &str, query: &str) -> f64 {
        let candidate = candidate.to_lowercase();
        let query = query.to_lowercase();

        if candidate == query {
            return 1.0;
        }

        let a = trigram_set(&candidate);
        let b = trigram_set(&query);
        if a.is_empty() || b.is_empty() {
            return NO_MATCH_SCORE;
        }

        let shared = a.intersection(&b).count();
        let union = a.len() + b.len() - shared;
        let similarity = shared as f64 / union as f64;

        similarity.max(NO_MATCH_SCORE)
    }
}

fn trigram_set(text: &str) -> HashSet<String> {
    // Two leading pads and one trailing pad, so short strings still
    // produce boundary-anchored trigrams.
    let padded = format!("  {} ", text);
    let chars: Vec<char> = padded.chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// True when `needle` occurs in `haystack` delimited by non-alphanumeric
/// characters (or the string ends) on both sides.
fn contains_whole_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    let mut search_from = 0;
    while let Some(pos) = haystack[search_from..].find(needle) {
        let begin = search_from + pos;
        let end = begin + needle.len();

        let left_ok = begin == 0
            || haystack[..begin]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric());
        let right_ok = end == haystack.len()
            || haystack[end..]
                .chars()
                .next()
                .is_some_and(|c| !c.is_alphanumeric());

        if left_ok && right_ok {
            return true;
        }
        search_from = begin + 1;
    }
    false
}

/// Classic two-row edit distance with unit insert/delete/substitute costs.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}
