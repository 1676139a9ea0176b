//! Reading-order reconstruction for modifier closures
//!
//! A closure comes out of the resolver in traversal order ("wall
//! abdominal"). Sorting by start offset restores the sentence order
//! ("abdominal wall").

use std::collections::HashSet;
use std::hash::Hash;

use radgraph_core::Entity;

/// Characters trimmed from both ends of a normalized phrase
const PHRASE_TRIM: &[char] = &['\n', ' ', '.', '"', '\''];

/// Tokens and offsets of a closure, sorted by start offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedSpans {
    pub tokens: Vec<String>,
    pub start_ix: Vec<usize>,
    pub end_ix: Vec<usize>,
}

impl OrderedSpans {
    /// Sort a closure into reading order.
    ///
    /// Tokens follow ascending start offsets; start and end offsets are
    /// each sorted independently.
    pub fn from_spans(spans: &[&Entity]) -> Self {
        let tokens: Vec<String> = spans.iter().map(|e| e.tokens.clone()).collect();
        let mut start_ix: Vec<usize> = spans.iter().map(|e| e.start_ix).collect();
        let mut end_ix: Vec<usize> = spans.iter().map(|e| e.end_ix).collect();

        let tokens = sort_words_by_index(&tokens, &start_ix);
        start_ix.sort_unstable();
        end_ix.sort_unstable();

        Self {
            tokens,
            start_ix,
            end_ix,
        }
    }

    /// Drop repeated values from each sequence, keeping first occurrences.
    ///
    /// The three sequences are deduplicated independently: two distinct
    /// spans with the same text collapse to one token but keep both
    /// offsets, so positions may no longer line up.
    pub fn deduplicated(self) -> Self {
        Self {
            tokens: dedup_first(self.tokens),
            start_ix: dedup_first(self.start_ix),
            end_ix: dedup_first(self.end_ix),
        }
    }

    /// Space-joined, lowercased, trimmed phrase
    pub fn phrase(&self) -> String {
        normalize_phrase(&self.tokens)
    }
}

/// Reorder `words` by ascending `indices`.
///
/// For each index value in sorted order, the word at the first position
/// holding that value is taken, so a repeated index repeats that word.
pub fn sort_words_by_index<T: Clone>(words: &[T], indices: &[usize]) -> Vec<T> {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();

    sorted
        .iter()
        .filter_map(|ix| {
            indices
                .iter()
                .position(|candidate| candidate == ix)
                .and_then(|pos| words.get(pos).cloned())
        })
        .collect()
}

/// Join tokens with single spaces, lowercase, and trim quotes, periods,
/// spaces and newlines from both ends
pub fn normalize_phrase(tokens: &[String]) -> String {
    tokens
        .join(" ")
        .to_lowercase()
        .trim_matches(PHRASE_TRIM)
        .to_string()
}

fn dedup_first<T: Eq + Hash + Clone>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(tokens: &str, start: usize, end: usize) -> Entity {
        Entity::new(start.to_string(), tokens, "Anatomy::definitely present", start, end)
    }

    #[test]
    fn test_sort_words_by_index() {
        let words = vec!["wall".to_string(), "abdominal".to_string()];
        assert_eq!(sort_words_by_index(&words, &[5, 3]), vec!["abdominal", "wall"]);
    }

    #[test]
    fn test_sort_words_repeated_index_takes_first() {
        let words = vec!["a", "b", "c"];
        assert_eq!(sort_words_by_index(&words, &[2, 1, 2]), vec!["b", "a", "a"]);
    }

    #[test]
    fn test_from_spans_reading_order() {
        let wall = span("wall", 5, 5);
        let abdominal = span("abdominal", 3, 4);
        let ordered = OrderedSpans::from_spans(&[&wall, &abdominal]);

        assert_eq!(ordered.tokens, vec!["abdominal", "wall"]);
        assert_eq!(ordered.start_ix, vec![3, 5]);
        assert_eq!(ordered.end_ix, vec![4, 5]);
        assert_eq!(ordered.phrase(), "abdominal wall");
    }

    #[test]
    fn test_deduplicated_is_asymmetric() {
        let ordered = OrderedSpans {
            tokens: vec!["mild".into(), "opacity".into(), "mild".into()],
            start_ix: vec![0, 1, 4],
            end_ix: vec![0, 1, 4],
        }
        .deduplicated();

        assert_eq!(ordered.tokens, vec!["mild", "opacity"]);
        assert_eq!(ordered.start_ix, vec![0, 1, 4]);
    }

    #[test]
    fn test_normalize_phrase() {
        let tokens = vec!["\"Free".to_string(), "Air.".to_string()];
        assert_eq!(normalize_phrase(&tokens), "free air");
        assert_eq!(normalize_phrase(&["'..'".to_string()]), "");
        assert_eq!(normalize_phrase(&[]), "");
    }
}
