//! Trained node vectors.

use crate::topk::top_k;
use std::collections::HashMap;

/// Dense embedding table: one row of `dim` floats per node.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    nodes: Vec<usize>,
    rows: HashMap<usize, usize>,
    dim: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// `data` is row-major, `nodes.len() * dim` long; row `i` belongs to `nodes[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `data.len() != nodes.len() * dim`.
    pub fn new(nodes: Vec<usize>, dim: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), nodes.len() * dim, "embedding matrix shape mismatch");
        let rows = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        Self { nodes, rows, dim, data }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Nodes in row order.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn get(&self, node: usize) -> Option<&[f32]> {
        self.rows.get(&node).map(|&i| self.row(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32])> + '_ {
        self.nodes.iter().enumerate().map(|(i, &n)| (n, self.row(i)))
    }

    /// Row-major matrix.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn cosine_similarity(&self, a: usize, b: usize) -> Option<f32> {
        Some(cosine(self.get(a)?, self.get(b)?))
    }

    /// The `k` nodes closest to `node` by cosine similarity, excluding itself.
    pub fn most_similar(&self, node: usize, k: usize) -> Option<Vec<(usize, f32)>> {
        let query = self.get(node)?;
        let scored = self
            .iter()
            .filter(|&(n, _)| n != node)
            .map(|(n, v)| (n, cosine(query, v)));
        Some(top_k(scored, k))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
