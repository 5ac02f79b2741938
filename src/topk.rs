//! Ranking utilities.

use ordered_float::NotNan;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// The `k` highest-scoring `(id, score)` pairs, best first.
///
/// NaN scores are skipped. Ties keep the smaller id first.
pub fn top_k<I>(scored: I, k: usize) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = (usize, f32)>,
{
    if k == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<(NotNan<f32>, Reverse<usize>)>> = BinaryHeap::with_capacity(k + 1);
    for (id, score) in scored {
        let Ok(s) = NotNan::new(score) else { continue };
        let entry = Reverse((s, Reverse(id)));
        if heap.len() < k {
            heap.push(entry);
        } else if let Some(min) = heap.peek() {
            if entry < *min {
                heap.pop();
                heap.push(entry);
            }
        }
    }
    let mut results: Vec<(NotNan<f32>, Reverse<usize>)> = heap.into_iter().map(|Reverse(e)| e).collect();
    results.sort_unstable_by(|a, b| b.cmp(a));
    results.into_iter().map(|(s, Reverse(id))| (id, s.into_inner())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_best_k_in_order() {
        let scores = [(0, 0.1), (1, 0.9), (2, f32::NAN), (3, -0.5), (4, 0.5)];
        let got = top_k(scores, 3);
        assert_eq!(got, vec![(1, 0.9), (4, 0.5), (0, 0.1)]);
    }

    #[test]
    fn negative_scores_are_ranked() {
        let got = top_k([(0, -0.7), (1, -0.2)], 5);
        assert_eq!(got, vec![(1, -0.2), (0, -0.7)]);
    }

    #[test]
    fn ties_prefer_smaller_id() {
        let got = top_k([(4, 1.0), (2, 1.0), (9, 1.0)], 2);
        assert_eq!(got, vec![(2, 1.0), (4, 1.0)]);
    }

    #[test]
    fn zero_k_is_empty() {
        assert!(top_k([(0, 1.0)], 0).is_empty());
    }
}
