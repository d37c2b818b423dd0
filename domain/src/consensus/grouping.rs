//! Grouping of equivalent outputs.
//!
//! Responses are bucketed before tallying. [`ExactMatchGrouper`] buckets by
//! normalized text; [`SimilarityGrouper`] clusters greedily with any
//! similarity function (token Jaccard by default, or an embedding cosine
//! supplied by the caller).

use std::collections::{HashMap, HashSet};

/// Normalize an output for comparison: trim, collapse whitespace, lowercase.
pub fn normalize_output(output: &str) -> String {
    output
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Assigns every output to a group.
pub trait OutputGrouper: Send + Sync {
    /// Return one group index per output. Indices are dense and numbered in
    /// order of first appearance.
    fn assign(&self, outputs: &[&str]) -> Vec<usize>;
}

/// Groups outputs whose normalized text is identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatchGrouper;

impl OutputGrouper for ExactMatchGrouper {
    fn assign(&self, outputs: &[&str]) -> Vec<usize> {
        let mut keys: HashMap<String, usize> = HashMap::new();
        outputs
            .iter()
            .map(|output| {
                let next = keys.len();
                *keys.entry(normalize_output(output)).or_insert(next)
            })
            .collect()
    }
}

/// Greedy clustering: each output joins the first group whose representative
/// (first member) is at least `threshold` similar, else opens a new group.
pub struct SimilarityGrouper<F> {
    threshold: f64,
    similarity: F,
}

impl<F> SimilarityGrouper<F>
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    pub fn new(threshold: f64, similarity: F) -> Self {
        Self {
            threshold,
            similarity,
        }
    }
}

impl SimilarityGrouper<fn(&str, &str) -> f64> {
    /// Token-set Jaccard similarity over normalized outputs.
    pub fn jaccard(threshold: f64) -> Self {
        Self::new(threshold, jaccard_similarity)
    }
}

impl<F> OutputGrouper for SimilarityGrouper<F>
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn assign(&self, outputs: &[&str]) -> Vec<usize> {
        let normalized: Vec<String> = outputs.iter().map(|o| normalize_output(o)).collect();
        let mut representatives: Vec<usize> = Vec::new();
        let mut assignment = Vec::with_capacity(outputs.len());

        for (i, candidate) in normalized.iter().enumerate() {
            let existing = representatives.iter().position(|&rep| {
                normalized[rep] == *candidate
                    || (self.similarity)(&normalized[rep], candidate) >= self.threshold
            });
            match existing {
                Some(group) => assignment.push(group),
                None => {
                    representatives.push(i);
                    assignment.push(representatives.len() - 1);
                }
            }
        }
        assignment
    }
}

/// Jaccard similarity of the whitespace token sets of two strings.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left: HashSet<&str> = a.split_whitespace().collect();
    let right: HashSet<&str> = b.split_whitespace().collect();
    if left.is_empty() && right.is_empty() {
        return 1.0;
    }
    let intersection = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    intersection / union
}

/// Cosine similarity of two embedding vectors; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        dot += f64::from(*x) * f64::from(*y);
        norm_a += f64::from(*x) * f64::from(*x);
        norm_b += f64::from(*y) * f64::from(*y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_output("  Deploy   NOW\n"), "deploy now");
    }

    #[test]
    fn test_exact_grouping_by_first_appearance() {
        let groups = ExactMatchGrouper.assign(&["B", "a", "b ", "A", "c"]);
        assert_eq!(groups, vec![0, 1, 0, 1, 2]);
    }

    #[test]
    fn test_jaccard_grouping() {
        let grouper = SimilarityGrouper::jaccard(0.6);
        let groups = grouper.assign(&[
            "ship the release today",
            "ship the release today please",
            "roll back immediately",
        ]);
        assert_eq!(groups, vec![0, 0, 1]);
    }

    #[test]
    fn test_custom_similarity() {
        let by_first_char = SimilarityGrouper::new(1.0, |a: &str, b: &str| {
            if a.chars().next() == b.chars().next() { 1.0 } else { 0.0 }
        });
        assert_eq!(by_first_char.assign(&["apple", "avocado", "banana"]), vec![0, 0, 1]);
    }

    #[test]
    fn test_jaccard_similarity_values() {
        assert_eq!(jaccard_similarity("a b", "a b"), 1.0);
        assert_eq!(jaccard_similarity("a b", "c d"), 0.0);
        assert!((jaccard_similarity("a b c", "a b d") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }
}
