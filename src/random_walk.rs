//! Random walk generation.
//!
//! DeepWalk corpora: every node starts `walks_per_node` truncated uniform
//! walks. Each pass visits the start nodes in a freshly shuffled order, and
//! each walk draws from its own generator, seeded from the run seed and the
//! walk's position in the schedule. The sequential, parallel and streaming
//! entry points therefore emit the same walks for the same seed.

use crate::error::{Error, Result};
use crate::graph::Graph;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Largest corpus, in tokens, whose node ids fit in one allocation.
const MAX_TOKENS: usize = isize::MAX as usize / std::mem::size_of::<usize>();

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Maximum walk length, in nodes (start node included).
    pub length: usize,
    /// Walks started from every node.
    pub walks_per_node: usize,
    /// Per-step probability of jumping back to the start node.
    pub restart_probability: f64,
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { length: 40, walks_per_node: 10, restart_probability: 0.0, seed: 42 }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        if self.length < 1 {
            return Err(Error::config("walk length must be at least 1"));
        }
        if self.walks_per_node < 1 {
            return Err(Error::config("number of walks per node must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.restart_probability) {
            return Err(Error::config(format!(
                "restart probability must lie in [0, 1], got {}",
                self.restart_probability
            )));
        }
        corpus_tokens(1, *self)?;
        Ok(())
    }
}

/// Upper bound on the tokens `starts` start nodes produce under `config`.
fn corpus_tokens(starts: usize, config: WalkConfig) -> Result<usize> {
    starts
        .checked_mul(config.walks_per_node)
        .and_then(|walks| walks.checked_mul(config.length))
        .filter(|&tokens| tokens <= MAX_TOKENS)
        .ok_or_else(|| {
            Error::config(format!(
                "{starts} start nodes x {} walks x length {} does not fit in memory",
                config.walks_per_node, config.length
            ))
        })
}

/// An immutable, ordered collection of walks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    walks: Vec<Vec<usize>>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.walks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }

    pub fn walks(&self) -> &[Vec<usize>] {
        &self.walks
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<usize>> {
        self.walks.iter()
    }

    /// Total number of node occurrences over all walks.
    pub fn token_count(&self) -> usize {
        self.walks.iter().map(Vec::len).sum()
    }

    pub fn into_inner(self) -> Vec<Vec<usize>> {
        self.walks
    }
}

impl From<Vec<Vec<usize>>> for Corpus {
    fn from(walks: Vec<Vec<usize>>) -> Self {
        Self { walks }
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Vec<usize>;
    type IntoIter = std::slice::Iter<'a, Vec<usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.walks.iter()
    }
}

/// Walks from every node of `graph`.
pub fn generate_walks<G: Graph + ?Sized>(graph: &G, config: WalkConfig) -> Result<Corpus> {
    config.validate()?;
    let start_nodes: Vec<usize> = (0..graph.node_count()).collect();
    generate_walks_from_nodes(graph, &start_nodes, config)
}

/// Walks restricted to an explicit set of start nodes.
///
/// This is the sharding / "delta walk" primitive: regenerate walks only for
/// the nodes whose neighborhood changed.
pub fn generate_walks_from_nodes<G: Graph + ?Sized>(
    graph: &G,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Result<Corpus> {
    check_start_nodes(graph, start_nodes, config)?;
    log_plan(start_nodes.len(), config);

    let mut walks = Vec::with_capacity(start_nodes.len() * config.walks_per_node);
    for_each_scheduled(start_nodes, config, |i, node| {
        let mut walk = Vec::with_capacity(config.length);
        sample_walk(graph, node, config, &mut walk_rng(config.seed, i), &mut walk)?;
        walks.push(walk);
        Ok(())
    })?;
    Ok(Corpus::from(walks))
}

/// Parallel walk generation over (pass, start node) jobs.
///
/// Invariant: output equals [`generate_walks`] for the same config,
/// independent of Rayon thread count.
#[cfg(feature = "parallel")]
pub fn generate_walks_parallel<G: Graph + Sync + ?Sized>(
    graph: &G,
    config: WalkConfig,
) -> Result<Corpus> {
    config.validate()?;
    let start_nodes: Vec<usize> = (0..graph.node_count()).collect();
    generate_walks_parallel_from_nodes(graph, &start_nodes, config)
}

#[cfg(feature = "parallel")]
pub fn generate_walks_parallel_from_nodes<G: Graph + Sync + ?Sized>(
    graph: &G,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Result<Corpus> {
    use rayon::prelude::*;

    check_start_nodes(graph, start_nodes, config)?;
    log_plan(start_nodes.len(), config);

    let mut jobs: Vec<usize> = Vec::with_capacity(start_nodes.len() * config.walks_per_node);
    for_each_scheduled(start_nodes, config, |_, node| {
        jobs.push(node);
        Ok(())
    })?;

    let walks = jobs
        .par_iter()
        .enumerate()
        .map(|(i, &node)| -> Result<Vec<usize>> {
            let mut walk = Vec::with_capacity(config.length);
            sample_walk(graph, node, config, &mut walk_rng(config.seed, i), &mut walk)?;
            Ok(walk)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Corpus::from(walks))
}

/// Streaming walk generation: `f` sees each walk once, in corpus order.
///
/// A single walk buffer is reused, so memory stays flat in the number of walks.
pub fn for_each_walk<G, F>(graph: &G, config: WalkConfig, f: F) -> Result<()>
where
    G: Graph + ?Sized,
    F: FnMut(&[usize]),
{
    config.validate()?;
    let start_nodes: Vec<usize> = (0..graph.node_count()).collect();
    for_each_walk_from_nodes(graph, &start_nodes, config, f)
}

pub fn for_each_walk_from_nodes<G, F>(
    graph: &G,
    start_nodes: &[usize],
    config: WalkConfig,
    mut f: F,
) -> Result<()>
where
    G: Graph + ?Sized,
    F: FnMut(&[usize]),
{
    check_start_nodes(graph, start_nodes, config)?;
    log_plan(start_nodes.len(), config);

    let mut walk = Vec::new();
    for_each_scheduled(start_nodes, config, |i, node| {
        sample_walk(graph, node, config, &mut walk_rng(config.seed, i), &mut walk)?;
        f(walk.as_slice());
        Ok(())
    })
}

fn check_start_nodes<G: Graph + ?Sized>(
    graph: &G,
    start_nodes: &[usize],
    config: WalkConfig,
) -> Result<()> {
    config.validate()?;
    let n = graph.node_count();
    if let Some(&bad) = start_nodes.iter().find(|&&s| s >= n) {
        return Err(Error::config(format!("start node {bad} is not in a graph of {n} nodes")));
    }
    corpus_tokens(start_nodes.len(), config)?;
    Ok(())
}

fn log_plan(starts: usize, config: WalkConfig) {
    let total = starts.saturating_mul(config.walks_per_node);
    info!(
        nodes = starts,
        walks = total,
        data_size = total.saturating_mul(config.length),
        "generating random walks"
    );
}

/// Visit `(walk index, start node)` in corpus order.
///
/// Pass `e` shuffles the start nodes with a generator that depends only on
/// `(seed, e)`.
fn for_each_scheduled<F>(start_nodes: &[usize], config: WalkConfig, mut f: F) -> Result<()>
where
    F: FnMut(usize, usize) -> Result<()>,
{
    let mut order: Vec<usize> = Vec::with_capacity(start_nodes.len());
    let mut i = 0usize;
    for epoch in 0..config.walks_per_node as u64 {
        order.clear();
        order.extend_from_slice(start_nodes);
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(mix64(config.seed ^ epoch)));
        debug!(pass = epoch, walks = order.len(), "walk pass");
        for &node in &order {
            f(i, node)?;
            i += 1;
        }
    }
    Ok(())
}

fn walk_rng(seed: u64, index: usize) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(mix64(mix64(seed.rotate_left(32)) ^ index as u64))
}

/// One truncated walk from `start`, written into `walk`.
///
/// A node without neighbors ends the walk, so `walk.len() < config.length`
/// only happens at a dead end.
fn sample_walk<G: Graph + ?Sized, R: Rng>(
    graph: &G,
    start: usize,
    config: WalkConfig,
    rng: &mut R,
    walk: &mut Vec<usize>,
) -> Result<()> {
    let n = graph.node_count();
    walk.clear();
    walk.push(start);
    let mut curr = start;
    for _ in 1..config.length {
        let nbrs = graph.neighbors(curr);
        if nbrs.is_empty() {
            break;
        }
        let restart = config.restart_probability > 0.0
            && rng.random::<f64>() < config.restart_probability;
        let next = if restart {
            start
        } else {
            match nbrs.choose(rng) {
                Some(&next) => next,
                None => break,
            }
        };
        if next >= n {
            return Err(Error::GraphIntegrity { node: curr, neighbor: next, node_count: n });
        }
        walk.push(next);
        curr = next;
    }
    Ok(())
}

pub(crate) fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(length: usize, walks_per_node: usize) -> WalkConfig {
        WalkConfig { length, walks_per_node, ..Default::default() }
    }

    #[test]
    fn zero_length_or_count_is_rejected() {
        let g = vec![vec![0usize]];
        assert!(matches!(generate_walks(&g, cfg(0, 3)), Err(Error::Configuration(_))));
        assert!(matches!(generate_walks(&g, cfg(3, 0)), Err(Error::Configuration(_))));

        let mut seen = 0;
        let r = for_each_walk(&g, cfg(0, 3), |_| seen += 1);
        assert!(r.is_err());
        assert_eq!(seen, 0, "no walk may be emitted before validation fails");
    }

    #[test]
    fn oversized_corpus_is_rejected_before_sampling() {
        let g = vec![vec![1usize], vec![0], vec![1]];
        let huge = [cfg(usize::MAX, 2), cfg(2, usize::MAX), cfg(usize::MAX / 4, 2)];
        for c in huge {
            assert!(matches!(generate_walks(&g, c), Err(Error::Configuration(_))));
            let mut seen = 0;
            assert!(for_each_walk(&g, c, |_| seen += 1).is_err());
            assert_eq!(seen, 0);
        }
        // Fits for one start node, overflows across three.
        let c = cfg(MAX_TOKENS / 2, 1);
        assert!(c.validate().is_ok());
        assert!(matches!(generate_walks(&g, c), Err(Error::Configuration(_))));
    }

    #[test]
    fn restart_probability_out_of_range_is_rejected() {
        let g = vec![vec![0usize]];
        for bad in [-0.1, 1.5, f64::NAN] {
            let c = WalkConfig { restart_probability: bad, ..cfg(3, 1) };
            assert!(matches!(generate_walks(&g, c), Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn empty_graph_gives_empty_corpus() {
        let g: Vec<Vec<usize>> = Vec::new();
        let corpus = generate_walks(&g, cfg(5, 3)).unwrap();
        assert!(corpus.is_empty());
        assert_eq!(corpus.token_count(), 0);
    }

    #[test]
    fn each_pass_starts_every_node_once() {
        let g: Vec<Vec<usize>> = (0..6).map(|i| vec![(i + 1) % 6]).collect();
        let corpus = generate_walks(&g, cfg(3, 4)).unwrap();
        for pass in corpus.walks().chunks(6) {
            let mut starts: Vec<usize> = pass.iter().map(|w| w[0]).collect();
            starts.sort_unstable();
            assert_eq!(starts, (0..6).collect::<Vec<_>>());
        }
    }

    #[test]
    fn dangling_neighbor_is_an_integrity_error() {
        let g = vec![vec![1usize], vec![7usize]];
        let err = generate_walks(&g, cfg(4, 1)).unwrap_err();
        match err {
            Error::GraphIntegrity { node, neighbor, node_count } => {
                assert_eq!((node, neighbor, node_count), (1, 7, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn out_of_range_start_node_is_rejected() {
        let g = vec![vec![0usize]];
        let r = generate_walks_from_nodes(&g, &[3], cfg(2, 1));
        assert!(matches!(r, Err(Error::Configuration(_))));
    }

    #[test]
    fn full_restart_bounces_between_start_and_itself() {
        // restart_probability = 1: every step after the first returns to the start.
        let g = vec![vec![1usize], vec![0usize]];
        let c = WalkConfig { restart_probability: 1.0, ..cfg(5, 2) };
        let corpus = generate_walks(&g, c).unwrap();
        for w in corpus.iter() {
            assert_eq!(w.len(), 5);
            assert!(w.iter().all(|&v| v == w[0]));
        }
    }

    #[test]
    fn partial_restart_returns_at_the_configured_rate() {
        // Directed ring of 50: within 10 steps only a restart can revisit the start.
        let g: Vec<Vec<usize>> = (0..50).map(|i| vec![(i + 1) % 50]).collect();
        let c = WalkConfig { restart_probability: 0.3, seed: 21, ..cfg(10, 200) };
        let corpus = generate_walks(&g, c).unwrap();
        let (mut steps, mut back) = (0usize, 0usize);
        for w in corpus.iter() {
            assert_eq!(w.len(), 10);
            steps += w.len() - 1;
            back += w[1..].iter().filter(|&&v| v == w[0]).count();
        }
        let frac = back as f64 / steps as f64;
        assert!((frac - 0.3).abs() < 0.02, "expected ~0.3 of steps back to the start, got {frac:.4}");
    }

    #[test]
    fn restart_never_revives_a_dead_end() {
        let g = vec![Vec::<usize>::new()];
        let c = WalkConfig { restart_probability: 0.5, ..cfg(5, 3) };
        let corpus = generate_walks(&g, c).unwrap();
        assert!(corpus.iter().all(|w| w.as_slice() == [0]));
    }

    #[test]
    fn streaming_matches_collected() {
        let g: Vec<Vec<usize>> = vec![vec![1, 2], vec![0, 2], vec![0, 1, 3], vec![2]];
        let c = WalkConfig { seed: 9, ..cfg(6, 3) };
        let collected = generate_walks(&g, c).unwrap();
        let mut streamed = Vec::new();
        for_each_walk(&g, c, |w| streamed.push(w.to_vec())).unwrap();
        assert_eq!(collected.walks(), streamed.as_slice());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let g: Vec<Vec<usize>> = (0..50).map(|i| vec![(i + 1) % 50, (i + 49) % 50]).collect();
        let c = WalkConfig { seed: 5, ..cfg(10, 3) };
        let seq = generate_walks(&g, c).unwrap();
        let par = generate_walks_parallel(&g, c).unwrap();
        assert_eq!(seq, par);
    }
}
