//! Corpus vocabulary counts.
//!
//! A node's training weight is how often it occurs across the walks, not its
//! degree in the graph. Counting is a commutative, associative reduction, so
//! shards can be counted independently and merged by addition.

use crate::error::{Error, Result};
use crate::random_walk::Corpus;
use std::collections::HashMap;
use std::ops::{Add, AddAssign};

/// Occurrence count per node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VocabCounts {
    counts: HashMap<usize, u64>,
}

impl VocabCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a sequence of walks in one pass.
    pub fn from_walks<'a, I>(walks: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec<usize>>,
    {
        let mut vocab = Self::new();
        for walk in walks {
            vocab.add_walk(walk);
        }
        vocab
    }

    pub fn add_walk(&mut self, walk: &[usize]) {
        for &node in walk {
            *self.counts.entry(node).or_insert(0) += 1;
        }
    }

    pub fn merge(&mut self, other: &VocabCounts) {
        for (&node, &c) in &other.counts {
            *self.counts.entry(node).or_insert(0) += c;
        }
    }

    pub fn get(&self, node: usize) -> Option<u64> {
        self.counts.get(&node).copied()
    }

    pub fn contains(&self, node: usize) -> bool {
        self.counts.contains_key(&node)
    }

    /// Distinct nodes counted.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of tokens in the counted corpus.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.counts.iter().map(|(&n, &c)| (n, c))
    }

    /// Entries by descending count, ties broken by ascending node.
    ///
    /// This is the vocabulary order trainers index rows by.
    pub fn sorted_by_frequency(&self) -> Vec<(usize, u64)> {
        let mut entries: Vec<(usize, u64)> = self.iter().collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries
    }

    /// Graph nodes in `0..node_count` that were never counted.
    pub fn missing_nodes(&self, node_count: usize) -> Vec<usize> {
        (0..node_count).filter(|n| !self.counts.contains_key(n)).collect()
    }

    /// Every graph node must have been sampled at least once (each node
    /// starts its own walks, so a gap means the corpus did not come from
    /// this graph).
    pub fn ensure_covers(&self, node_count: usize) -> Result<()> {
        match (0..node_count).find(|n| !self.counts.contains_key(n)) {
            Some(node) => Err(Error::UncoveredNode { node }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(usize, u64)> for VocabCounts {
    fn from_iter<I: IntoIterator<Item = (usize, u64)>>(iter: I) -> Self {
        let mut vocab = Self::new();
        for (node, c) in iter {
            *vocab.counts.entry(node).or_insert(0) += c;
        }
        vocab
    }
}

impl AddAssign<&VocabCounts> for VocabCounts {
    fn add_assign(&mut self, rhs: &VocabCounts) {
        self.merge(rhs);
    }
}

impl Add for VocabCounts {
    type Output = VocabCounts;

    fn add(mut self, rhs: VocabCounts) -> VocabCounts {
        // Fold the smaller map into the larger one.
        if self.counts.len() < rhs.counts.len() {
            let mut rhs = rhs;
            rhs.merge(&self);
            return rhs;
        }
        self.merge(&rhs);
        self
    }
}

/// Occurrence counts over the whole corpus.
pub fn count_walks(corpus: &Corpus) -> VocabCounts {
    VocabCounts::from_walks(corpus)
}

/// Sharded counting: per-thread partial counts merged by addition.
#[cfg(feature = "parallel")]
pub fn count_walks_parallel(corpus: &Corpus) -> VocabCounts {
    use rayon::prelude::*;

    corpus
        .walks()
        .par_iter()
        .fold(VocabCounts::new, |mut acc, walk| {
            acc.add_walk(walk);
            acc
        })
        .reduce(VocabCounts::new, |a, b| a + b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Corpus {
        Corpus::from(vec![vec![0, 1, 0], vec![1, 2], vec![2, 2, 2, 0]])
    }

    #[test]
    fn counts_occurrences_not_walks() {
        let v = count_walks(&corpus());
        assert_eq!(v.get(0), Some(3));
        assert_eq!(v.get(1), Some(2));
        assert_eq!(v.get(2), Some(4));
        assert_eq!(v.get(3), None);
        assert_eq!(v.total(), 9);
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn frequency_order_breaks_ties_by_node() {
        let v: VocabCounts = [(5, 2), (3, 2), (9, 7)].into_iter().collect();
        assert_eq!(v.sorted_by_frequency(), vec![(9, 7), (3, 2), (5, 2)]);
    }

    #[test]
    fn coverage_check_names_first_gap() {
        let v = count_walks(&corpus());
        assert!(v.ensure_covers(3).is_ok());
        assert_eq!(v.missing_nodes(5), vec![3, 4]);
        assert!(matches!(v.ensure_covers(5), Err(Error::UncoveredNode { node: 3 })));
    }

    #[test]
    fn add_is_commutative() {
        let a: VocabCounts = [(0, 1), (1, 4)].into_iter().collect();
        let b: VocabCounts = [(1, 1), (2, 2), (3, 3)].into_iter().collect();
        assert_eq!(a.clone() + b.clone(), b + a);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_count_matches_sequential() {
        let walks: Vec<Vec<usize>> = (0..200).map(|i| vec![i % 7, i % 3, i % 11]).collect();
        let c = Corpus::from(walks);
        assert_eq!(count_walks_parallel(&c), count_walks(&c));
    }
}
