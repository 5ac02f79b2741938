//! Minimal graph adapter trait and a labelled multigraph container.

use std::collections::HashMap;
use std::hash::Hash;

/// A graph view that returns **borrowed** neighbor slices.
///
/// Nodes are the dense indices `0..node_count()`. Neighbor slices are
/// multisets: a node listed twice is twice as likely to be sampled.
pub trait Graph {
    fn node_count(&self) -> usize;
    fn neighbors(&self, node: usize) -> &[usize];
    fn out_degree(&self, node: usize) -> usize {
        self.neighbors(node).len()
    }
}

impl<G: Graph + ?Sized> Graph for &G {
    fn node_count(&self) -> usize {
        (**self).node_count()
    }
    fn neighbors(&self, node: usize) -> &[usize] {
        (**self).neighbors(node)
    }
}

/// Raw adjacency lists, `adj[u]` being the neighbors of `u`.
impl Graph for [Vec<usize>] {
    fn node_count(&self) -> usize {
        self.len()
    }
    fn neighbors(&self, node: usize) -> &[usize] {
        self.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl Graph for Vec<Vec<usize>> {
    fn node_count(&self) -> usize {
        self.len()
    }
    fn neighbors(&self, node: usize) -> &[usize] {
        self.as_slice().neighbors(node)
    }
}

/// Multigraph over opaque node labels.
///
/// Labels are interned to dense indices in insertion order. Repeated edges
/// are kept, so edge multiplicity acts as an integer edge weight for walks.
#[derive(Debug, Clone)]
pub struct AdjacencyList<N = usize> {
    labels: Vec<N>,
    index: HashMap<N, usize>,
    adj: Vec<Vec<usize>>,
}

impl<N> Default for AdjacencyList<N> {
    fn default() -> Self {
        Self { labels: Vec::new(), index: HashMap::new(), adj: Vec::new() }
    }
}

impl<N: Hash + Eq + Clone> AdjacencyList<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            labels: Vec::with_capacity(nodes),
            index: HashMap::with_capacity(nodes),
            adj: Vec::with_capacity(nodes),
        }
    }

    /// Insert `label` if it is new; returns its index either way.
    pub fn add_node(&mut self, label: N) -> usize {
        if let Some(&i) = self.index.get(&label) {
            return i;
        }
        let i = self.labels.len();
        self.index.insert(label.clone(), i);
        self.labels.push(label);
        self.adj.push(Vec::new());
        i
    }

    /// Directed arc `a -> b`.
    pub fn add_arc(&mut self, a: N, b: N) {
        let u = self.add_node(a);
        let v = self.add_node(b);
        self.adj[u].push(v);
    }

    /// Undirected edge: arcs in both directions. A self-loop lands twice in
    /// its own neighbor list.
    pub fn add_edge(&mut self, a: N, b: N) {
        let u = self.add_node(a);
        let v = self.add_node(b);
        self.adj[u].push(v);
        self.adj[v].push(u);
    }

    pub fn index_of(&self, label: &N) -> Option<usize> {
        self.index.get(label).copied()
    }
}

impl<N> AdjacencyList<N> {
    pub fn label(&self, node: usize) -> Option<&N> {
        self.labels.get(node)
    }

    pub fn labels(&self) -> &[N] {
        &self.labels
    }

    /// Number of stored arcs (an undirected edge counts twice).
    pub fn edge_count(&self) -> usize {
        self.adj.iter().map(Vec::len).sum()
    }

    /// Add reverse arcs so that `u -> v` occurs as often as `v -> u`.
    pub fn make_undirected(&mut self) {
        let mut counts: HashMap<(usize, usize), usize> = HashMap::new();
        for (u, nbrs) in self.adj.iter().enumerate() {
            for &v in nbrs {
                *counts.entry((u, v)).or_insert(0) += 1;
            }
        }
        let mut missing: Vec<(usize, usize, usize)> = Vec::new();
        for (&(u, v), &c) in &counts {
            if u == v {
                continue;
            }
            let back = counts.get(&(v, u)).copied().unwrap_or(0);
            if c > back {
                missing.push((v, u, c - back));
            }
        }
        // HashMap order is arbitrary; keep neighbor lists reproducible.
        missing.sort_unstable();
        for (v, u, extra) in missing {
            self.adj[v].extend(std::iter::repeat(u).take(extra));
        }
    }

    /// Collapse to a simple graph: sorted unique neighbors, no self-loops.
    pub fn make_simple(&mut self) {
        for (u, nbrs) in self.adj.iter_mut().enumerate() {
            nbrs.sort_unstable();
            nbrs.dedup();
            nbrs.retain(|&v| v != u);
        }
    }
}

impl<N> Graph for AdjacencyList<N> {
    fn node_count(&self) -> usize {
        self.labels.len()
    }
    fn neighbors(&self, node: usize) -> &[usize] {
        self.adj.get(node).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(feature = "petgraph")]
impl<N, E, Ty> Graph for petgraph::csr::Csr<N, E, Ty, usize>
where
    Ty: petgraph::EdgeType,
{
    fn node_count(&self) -> usize {
        petgraph::csr::Csr::node_count(self)
    }
    fn neighbors(&self, node: usize) -> &[usize] {
        if node >= petgraph::csr::Csr::node_count(self) {
            return &[];
        }
        self.neighbors_slice(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_is_idempotent() {
        let mut g: AdjacencyList<&str> = AdjacencyList::new();
        assert_eq!(g.add_node("a"), 0);
        assert_eq!(g.add_node("b"), 1);
        assert_eq!(g.add_node("a"), 0);
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.label(1), Some(&"b"));
        assert_eq!(g.index_of(&"c"), None);
    }

    #[test]
    fn repeated_edges_are_kept() {
        let mut g = AdjacencyList::new();
        g.add_edge("a", "b");
        g.add_edge("a", "b");
        g.add_edge("a", "c");
        assert_eq!(g.neighbors(0), &[1, 1, 2]);
        assert_eq!(g.out_degree(1), 2);
        assert_eq!(g.edge_count(), 6);
    }

    #[test]
    fn self_loop_counts_twice() {
        let mut g = AdjacencyList::new();
        g.add_edge(7u32, 7u32);
        assert_eq!(g.neighbors(0), &[0, 0]);
    }

    #[test]
    fn make_undirected_matches_multiplicity() {
        let mut g = AdjacencyList::new();
        g.add_arc(1, 2);
        g.add_arc(1, 2);
        g.add_arc(2, 1);
        g.add_arc(1, 3);
        g.make_undirected();
        assert_eq!(g.neighbors(0), &[1, 1, 2]);
        assert_eq!(g.neighbors(1), &[0, 0]);
        assert_eq!(g.neighbors(2), &[0]);
    }

    #[test]
    fn make_simple_dedups_and_drops_loops() {
        let mut g = AdjacencyList::new();
        g.add_edge(0, 1);
        g.add_edge(0, 1);
        g.add_edge(0, 0);
        g.make_simple();
        assert_eq!(g.neighbors(0), &[1]);
        assert_eq!(g.neighbors(1), &[0]);
    }

    #[test]
    fn out_of_range_node_has_no_neighbors() {
        let adj = vec![vec![0usize]];
        assert!(adj.neighbors(5).is_empty());
    }

    #[cfg(feature = "petgraph")]
    #[test]
    fn csr_graph_walks_like_an_adjacency_list() {
        use petgraph::csr::Csr;

        // a <-> b -> c, c has no out-arcs.
        let mut g: Csr<&str, (), petgraph::Directed, usize> = Csr::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, b, ());
        g.add_edge(b, a, ());
        g.add_edge(b, c, ());

        assert_eq!(Graph::node_count(&g), 3);
        assert_eq!(Graph::neighbors(&g, b), &[a, c]);
        assert!(Graph::neighbors(&g, c).is_empty());
        assert!(Graph::neighbors(&g, 7).is_empty());
        assert_eq!(g.out_degree(b), 2);

        let config = crate::WalkConfig { length: 6, walks_per_node: 4, ..Default::default() };
        let corpus = crate::generate_walks(&g, config).unwrap();
        assert_eq!(corpus.len(), 12);
        for w in corpus.iter() {
            for step in w.windows(2) {
                assert!(Graph::neighbors(&g, step[0]).contains(&step[1]), "{step:?} is not an arc");
            }
            if w.len() < 6 {
                assert_eq!(*w.last().unwrap(), c);
            }
        }
    }
}
