//! The fuzzy-match engine (spec §4.4.3, §4.9): pairs a free-text receipt
//! line item against catalog-variant search text by normalized string
//! similarity.
//!
//! Pure functions, no I/O — the auto-match handler owns paging through
//! candidates and persisting the result.

/// Score how well `a` matches `b`, per spec §4.4.3 step 3:
///
/// 1. If either contains the other as a substring → `0.90`.
/// 2. Otherwise normalize both (replace `.`/`_` with spaces, lowercase);
///    if one normalized string contains the other → `0.85`.
/// 3. Otherwise split into whitespace-separated words and score by
///    fraction of `a`'s words matched in `b` (exact equality, or — for
///    words of length ≥ 3 — a prefix/substring relation in either
///    direction). Zero words in `a` scores `0.0`.
#[must_use]
pub fn calculate_similarity(a: &str, b: &str) -> f64 {
    let a_lower = a.trim().to_lowercase();
    let b_lower = b.trim().to_lowercase();

    if a_lower.is_empty() || b_lower.is_empty() {
        return 0.0;
    }

    if a_lower.contains(&b_lower) || b_lower.contains(&a_lower) {
        return 0.90;
    }

    let a_norm = normalize(&a_lower);
    let b_norm = normalize(&b_lower);
    if a_norm.contains(&b_norm) || b_norm.contains(&a_norm) {
        return 0.85;
    }

    let a_words: Vec<&str> = a_lower.split_whitespace().collect();
    if a_words.is_empty() {
        return 0.0;
    }
    let b_words: Vec<&str> = b_lower.split_whitespace().collect();

    let matching = a_words
        .iter()
        .filter(|word| b_words.iter().any(|other| words_match(word, other)))
        .count();

    #[allow(clippy::cast_precision_loss)]
    let score = matching as f64 / a_words.len() as f64;
    score
}

fn normalize(s: &str) -> String {
    s.replace(['.', '_'], " ")
}

fn words_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    a.len() >= 3 && b.len() >= 3 && (a.starts_with(b) || b.starts_with(a) || a.contains(b) || b.contains(a))
}

/// Select the best-scoring candidate at or above `threshold`, tie-broken by
/// iteration order (spec §4.4.3 step 4: "first-encountered wins"). Returns
/// the winning candidate's index into `candidates`.
#[must_use]
pub fn find_best_match(item_name: &str, candidates: &[(String, String)], threshold: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (idx, (_, text)) in candidates.iter().enumerate() {
        let score = calculate_similarity(item_name, text);
        if score < threshold {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((idx, score)),
        }
    }

    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_substring_case_scores_zero_point_nine() {
        assert!((calculate_similarity("cola", "coca cola") - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn pinned_normalized_substring_case_scores_zero_point_eight_five() {
        assert!((calculate_similarity("coca.cola", "coca cola") - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn pinned_disjoint_case_scores_zero() {
        assert!((calculate_similarity("xyzzy", "abcdef")).abs() < f64::EPSILON);
    }

    #[test]
    fn word_overlap_scores_fraction_of_receipt_words_matched() {
        // "cola" is a substring/prefix match of "cola zero" (len >= 3 rule);
        // "light" has no counterpart.
        let score = calculate_similarity("cola light", "cola zero sugar");
        assert!((score - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(calculate_similarity("", "anything"), 0.0);
        assert_eq!(calculate_similarity("anything", ""), 0.0);
    }

    #[test]
    fn find_best_match_ties_prefer_first_encountered() {
        let candidates = vec![
            ("a".to_string(), "cola zero".to_string()),
            ("b".to_string(), "cola zero".to_string()),
        ];
        assert_eq!(find_best_match("cola zero", &candidates, 0.7), Some(0));
    }

    #[test]
    fn find_best_match_returns_none_below_threshold() {
        let candidates = vec![("a".to_string(), "abcdef".to_string())];
        assert_eq!(find_best_match("xyzzy", &candidates, 0.7), None);
    }

    #[test]
    fn find_best_match_prefers_higher_scoring_candidate_regardless_of_order() {
        let candidates = vec![
            ("weak".to_string(), "cola".to_string()),
            ("strong".to_string(), "coca cola 0.33l".to_string()),
        ];
        let idx = find_best_match("coca cola 0.33l", &candidates, 0.7).unwrap();
        assert_eq!(candidates[idx].0, "strong");
    }
}
