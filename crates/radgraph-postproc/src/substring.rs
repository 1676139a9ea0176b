//! Substring filtering of candidate phrases
//!
//! A phrase is redundant when another phrase in the same list contains it
//! both as a literal substring and word for word ("abdomen" inside "upper
//! abdomen"). A literal match that only lands inside a longer word
//! ("pleura" inside "pleural") is not enough.

use std::collections::HashSet;

/// Positions of the candidates that survive filtering, in input order.
///
/// Identical candidates keep only their first occurrence.
pub fn retain_maximal(candidates: &[String]) -> Vec<usize> {
    let word_sets: Vec<HashSet<&str>> = candidates
        .iter()
        .map(|c| c.split_whitespace().collect())
        .collect();

    (0..candidates.len())
        .filter(|&i| {
            let item = &candidates[i];
            let covered = candidates.iter().enumerate().any(|(j, other)| {
                j != i
                    && (item != other || j < i)
                    && other.contains(item.as_str())
                    && word_sets[i].is_subset(&word_sets[j])
            });
            !covered
        })
        .collect()
}

/// Drop every candidate covered by another candidate
pub fn filter_substrings(candidates: &[String]) -> Vec<String> {
    retain_maximal(candidates)
        .into_iter()
        .map(|i| candidates[i].clone())
        .collect()
}
