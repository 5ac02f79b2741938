//! Skip-gram training over walk corpora.
//!
//! Walks are "sentences", nodes are "words": each center node predicts every
//! node within `window` positions on either side of it. Two output layers
//! are supported, picked by [`Objective`]:
//!
//! - **Hierarchical softmax**: nodes are leaves of a Huffman tree built from
//!   the vocabulary weights. Predicting a node is a chain of binary decisions
//!   along its root path, one output row per inner node. Frequent nodes get
//!   short codes.
//! - **Negative sampling**: one positive pair plus `negative` noise nodes
//!   drawn from weight^0.75, one output row per vocabulary node.
//!
//! The learning rate decays linearly over all tokens of all epochs.
//!
//! With `workers > 1` each epoch splits the corpus into contiguous shards,
//! trains a copy of the parameters per shard, then adds every copy's change
//! back onto the shared parameters. Each token contributes one full-size
//! update per epoch whatever the worker count. For a fixed seed and worker
//! count the result is deterministic, whether or not the shards run on Rayon.
//!
//! # References
//!
//! - Mikolov et al. (2013). "Distributed Representations of Words and Phrases."
//! - Perozzi et al. (2014). "DeepWalk: Online Learning of Social Representations."

use crate::embeddings::Embeddings;
use crate::random_walk::{mix64, Corpus};
use crate::trainer::{EmbeddingTrainer, Objective, TrainerConfig};
use crate::vocab::VocabCounts;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Dot products beyond this are saturated.
const MAX_EXP: f32 = 6.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipGramError {
    #[error("cannot train on an empty vocabulary")]
    EmptyVocabulary,

    #[error("node {0} occurs in the corpus but not in the vocabulary")]
    UnknownNode(usize),

    #[error("negative sampling needs a positive total vocabulary weight")]
    ZeroWeight,
}

/// The built-in [`EmbeddingTrainer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipGramTrainer;

impl EmbeddingTrainer for SkipGramTrainer {
    type Error = SkipGramError;

    fn train(
        &self,
        corpus: &Corpus,
        vocab: &VocabCounts,
        config: &TrainerConfig,
    ) -> Result<Embeddings, SkipGramError> {
        let model = Model::new(vocab, config)?;
        let rows = model.index_corpus(corpus)?;
        let params = model.fit(&rows);
        Ok(Embeddings::new(model.nodes, config.dimensions, params.input))
    }
}

/// Output layer, built once from the vocabulary weights.
enum OutputLayer {
    Tree(HuffmanTree),
    Noise { cumulative: Vec<f64>, negative: usize },
}

struct Model<'c> {
    config: &'c TrainerConfig,
    /// Vocabulary in frequency order; row `i` belongs to `nodes[i]`.
    nodes: Vec<usize>,
    row_of: HashMap<usize, usize>,
    output: OutputLayer,
}

#[derive(Clone)]
struct Params {
    input: Vec<f32>,
    output: Vec<f32>,
}

impl<'c> Model<'c> {
    fn new(vocab: &VocabCounts, config: &'c TrainerConfig) -> Result<Self, SkipGramError> {
        if vocab.is_empty() {
            return Err(SkipGramError::EmptyVocabulary);
        }
        let entries = vocab.sorted_by_frequency();
        let counts: Vec<u64> = entries.iter().map(|&(_, c)| c).collect();
        let nodes: Vec<usize> = entries.iter().map(|&(n, _)| n).collect();
        let row_of = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();

        let output = match config.objective {
            Objective::HierarchicalSoftmax => OutputLayer::Tree(HuffmanTree::new(&counts)),
            Objective::NegativeSampling { negative } => OutputLayer::Noise {
                cumulative: noise_distribution(&counts)?,
                negative,
            },
        };
        Ok(Self { config, nodes, row_of, output })
    }

    fn index_corpus(&self, corpus: &Corpus) -> Result<Vec<Vec<usize>>, SkipGramError> {
        corpus
            .iter()
            .map(|walk| {
                walk.iter()
                    .map(|n| self.row_of.get(n).copied().ok_or(SkipGramError::UnknownNode(*n)))
                    .collect()
            })
            .collect()
    }

    fn output_rows(&self) -> usize {
        match &self.output {
            OutputLayer::Tree(_) => self.nodes.len().saturating_sub(1),
            OutputLayer::Noise { .. } => self.nodes.len(),
        }
    }

    fn init_params(&self) -> Params {
        let dim = self.config.dimensions;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let input = (0..self.nodes.len() * dim)
            .map(|_| (rng.random::<f32>() - 0.5) / dim as f32)
            .collect();
        Params { input, output: vec![0.0; self.output_rows() * dim] }
    }

    fn fit(&self, rows: &[Vec<usize>]) -> Params {
        let mut params = self.init_params();
        let tokens: u64 = rows.iter().map(|w| w.len() as u64).sum();
        let total = tokens * self.config.epochs as u64;

        let shard_len = rows.len().div_ceil(self.config.workers).max(1);
        let shards: Vec<(usize, &[Vec<usize>])> = {
            let mut offset = 0usize;
            rows.chunks(shard_len)
                .map(|chunk| {
                    let start = offset;
                    offset += chunk.iter().map(Vec::len).sum::<usize>();
                    (start, chunk)
                })
                .collect()
        };

        for epoch in 0..self.config.epochs {
            let base = epoch as u64 * tokens;
            debug!(epoch, shards = shards.len(), lr = self.learning_rate(base, total), "training epoch");
            if shards.len() <= 1 {
                let mut rng = self.shard_rng(epoch, 0);
                self.train_shard(&mut params, rows, base, total, &mut rng);
                continue;
            }
            let copies = self.train_shards(&params, &shards, epoch, base, total);
            merge_updates(&mut params, &copies);
        }
        params
    }

    #[cfg(feature = "parallel")]
    fn train_shards(
        &self,
        params: &Params,
        shards: &[(usize, &[Vec<usize>])],
        epoch: usize,
        base: u64,
        total: u64,
    ) -> Vec<Params> {
        use rayon::prelude::*;

        shards
            .par_iter()
            .enumerate()
            .map(|(s, &(start, walks))| {
                let mut local = params.clone();
                let mut rng = self.shard_rng(epoch, s);
                self.train_shard(&mut local, walks, base + start as u64, total, &mut rng);
                local
            })
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn train_shards(
        &self,
        params: &Params,
        shards: &[(usize, &[Vec<usize>])],
        epoch: usize,
        base: u64,
        total: u64,
    ) -> Vec<Params> {
        shards
            .iter()
            .enumerate()
            .map(|(s, &(start, walks))| {
                let mut local = params.clone();
                let mut rng = self.shard_rng(epoch, s);
                self.train_shard(&mut local, walks, base + start as u64, total, &mut rng);
                local
            })
            .collect()
    }

    fn shard_rng(&self, epoch: usize, shard: usize) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(mix64(self.config.seed ^ ((epoch as u64) << 32) ^ shard as u64))
    }

    fn learning_rate(&self, processed: u64, total: u64) -> f32 {
        let lr = self.config.learning_rate;
        let progress = processed as f32 / (total + 1) as f32;
        (lr * (1.0 - progress)).max(self.config.min_learning_rate)
    }

    /// Sequential SGD over `walks`; `processed` is the global token index of
    /// the first token, for the learning-rate schedule.
    fn train_shard<R: Rng>(
        &self,
        params: &mut Params,
        walks: &[Vec<usize>],
        mut processed: u64,
        total: u64,
        rng: &mut R,
    ) {
        let dim = self.config.dimensions;
        let window = self.config.window;
        let mut grad = vec![0.0f32; dim];

        for walk in walks {
            for (pos, &center) in walk.iter().enumerate() {
                let lr = self.learning_rate(processed, total);
                processed += 1;

                let lo = pos.saturating_sub(window);
                let hi = (pos + window + 1).min(walk.len());
                for ctx_pos in lo..hi {
                    if ctx_pos == pos {
                        continue;
                    }
                    let context = walk[ctx_pos];
                    grad.fill(0.0);
                    let l1 = &params.input[center * dim..(center + 1) * dim];
                    match &self.output {
                        OutputLayer::Tree(tree) => {
                            for &(inner, bit) in tree.path(context) {
                                let l2 = &mut params.output[inner * dim..(inner + 1) * dim];
                                let f = dot(l1, l2);
                                if f <= -MAX_EXP || f >= MAX_EXP {
                                    continue;
                                }
                                let g = (1.0 - bit as f32 - sigmoid(f)) * lr;
                                apply(&mut grad, l1, l2, g);
                            }
                        }
                        OutputLayer::Noise { cumulative, negative } => {
                            for d in 0..=*negative {
                                let (target, label) = if d == 0 {
                                    (context, 1.0)
                                } else {
                                    let t = sample_noise(cumulative, rng);
                                    if t == context {
                                        continue;
                                    }
                                    (t, 0.0)
                                };
                                let l2 = &mut params.output[target * dim..(target + 1) * dim];
                                let f = dot(l1, l2).clamp(-MAX_EXP, MAX_EXP);
                                let g = (label - sigmoid(f)) * lr;
                                apply(&mut grad, l1, l2, g);
                            }
                        }
                    }
                    for (w, &e) in params.input[center * dim..(center + 1) * dim].iter_mut().zip(&grad) {
                        *w += e;
                    }
                }
            }
        }
    }
}

/// Accumulate the input gradient into `grad`, then update the output row.
fn apply(grad: &mut [f32], l1: &[f32], l2: &mut [f32], g: f32) {
    for i in 0..grad.len() {
        grad[i] += g * l2[i];
        l2[i] += g * l1[i];
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// `params += Σ (copy - params)`, summed in shard order.
fn merge_updates(params: &mut Params, copies: &[Params]) {
    for (i, w) in params.input.iter_mut().enumerate() {
        let base = *w;
        *w = copies.iter().fold(base, |acc, c| acc + (c.input[i] - base));
    }
    for (i, w) in params.output.iter_mut().enumerate() {
        let base = *w;
        *w = copies.iter().fold(base, |acc, c| acc + (c.output[i] - base));
    }
}

/// Cumulative unigram^0.75 weights.
fn noise_distribution(counts: &[u64]) -> Result<Vec<f64>, SkipGramError> {
    let mut acc = 0.0f64;
    let cumulative: Vec<f64> = counts
        .iter()
        .map(|&c| {
            acc += (c as f64).powf(0.75);
            acc
        })
        .collect();
    if !(acc > 0.0) {
        return Err(SkipGramError::ZeroWeight);
    }
    Ok(cumulative)
}

fn sample_noise<R: Rng>(cumulative: &[f64], rng: &mut R) -> usize {
    let total = cumulative[cumulative.len() - 1];
    let r = rng.random::<f64>() * total;
    cumulative.partition_point(|&c| c <= r).min(cumulative.len() - 1)
}

/// Huffman coding of the vocabulary, built the way word2vec.c builds it.
struct HuffmanTree {
    /// Per leaf: `(inner node, code bit)` from the root down.
    paths: Vec<Vec<(usize, u8)>>,
}

impl HuffmanTree {
    /// `counts` must be sorted in descending order.
    fn new(counts: &[u64]) -> Self {
        let v = counts.len();
        let mut count = vec![u64::MAX; 2 * v];
        count[..v].copy_from_slice(counts);
        let mut parent = vec![0usize; 2 * v];
        let mut binary = vec![0u8; 2 * v];

        // Leaves are consumed from the small end, merged nodes from the front;
        // both runs stay sorted so the two smallest are always at a cursor.
        let mut leaf = v;
        let mut merged = v;
        for a in 0..v.saturating_sub(1) {
            let min1 = take_min(&count, &mut leaf, &mut merged);
            let min2 = take_min(&count, &mut leaf, &mut merged);
            count[v + a] = count[min1].saturating_add(count[min2]);
            parent[min1] = v + a;
            parent[min2] = v + a;
            binary[min2] = 1;
        }

        let root = (2 * v).saturating_sub(2);
        let paths = (0..v)
            .map(|w| {
                let mut path = Vec::new();
                let mut b = w;
                while b != root {
                    path.push((parent[b] - v, binary[b]));
                    b = parent[b];
                }
                path.reverse();
                path
            })
            .collect();
        Self { paths }
    }

    fn path(&self, leaf: usize) -> &[(usize, u8)] {
        &self.paths[leaf]
    }
}

/// `leaf` counts down over sorted leaves (exclusive), `merged` up over inner nodes.
fn take_min(count: &[u64], leaf: &mut usize, merged: &mut usize) -> usize {
    if *leaf > 0 && count[*leaf - 1] < count[*merged] {
        *leaf -= 1;
        *leaf
    } else {
        *merged += 1;
        *merged - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn huffman_codes_are_prefix_free_and_favor_frequent() {
        let counts = [50u64, 20, 10, 10, 5, 1];
        let tree = HuffmanTree::new(&counts);
        let codes: Vec<Vec<u8>> = tree.paths.iter().map(|p| p.iter().map(|&(_, b)| b).collect()).collect();

        for i in 0..codes.len() {
            for j in 0..codes.len() {
                if i != j {
                    assert!(!codes[j].starts_with(&codes[i]), "{:?} prefixes {:?}", codes[i], codes[j]);
                }
            }
        }
        assert!(codes[0].len() <= codes[5].len());
        // Every path starts at the root, which is the last inner node.
        assert!(tree.paths.iter().all(|p| p[0].0 == counts.len() - 2));
    }

    #[test]
    fn huffman_single_leaf_has_empty_path() {
        let tree = HuffmanTree::new(&[7]);
        assert!(tree.path(0).is_empty());
    }

    #[test]
    fn huffman_two_leaves_share_root() {
        let tree = HuffmanTree::new(&[3, 1]);
        assert_eq!(tree.path(0), &[(0, 1)]);
        assert_eq!(tree.path(1), &[(0, 0)]);
    }

    #[test]
    fn noise_never_draws_zero_weight() {
        let cum = noise_distribution(&[0, 4, 0, 1]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..2_000 {
            let k = sample_noise(&cum, &mut rng);
            assert!(k == 1 || k == 3, "drew zero-weight entry {k}");
        }
        assert_eq!(noise_distribution(&[0, 0]), Err(SkipGramError::ZeroWeight));
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let r = SkipGramTrainer.train(&Corpus::default(), &VocabCounts::new(), &TrainerConfig::default());
        assert_eq!(r.unwrap_err(), SkipGramError::EmptyVocabulary);
    }

    #[test]
    fn token_outside_vocabulary_is_an_error() {
        let corpus = Corpus::from(vec![vec![0, 1]]);
        let vocab: VocabCounts = [(0, 1)].into_iter().collect();
        let r = SkipGramTrainer.train(&corpus, &vocab, &TrainerConfig::default());
        assert_eq!(r.unwrap_err(), SkipGramError::UnknownNode(1));
    }

    #[test]
    fn every_vocabulary_node_gets_a_row() {
        let corpus = Corpus::from(vec![vec![4, 2, 4], vec![9]]);
        let vocab = crate::vocab::count_walks(&corpus);
        let cfg = TrainerConfig { dimensions: 8, ..Default::default() };
        let emb = SkipGramTrainer.train(&corpus, &vocab, &cfg).unwrap();
        assert_eq!(emb.len(), 3);
        assert_eq!(emb.nodes()[0], 4, "most frequent node comes first");
        for n in [2, 4, 9] {
            assert_eq!(emb.get(n).map(<[f32]>::len), Some(8));
        }
    }

    #[test]
    fn shard_updates_add_up_instead_of_averaging() {
        let mut params = Params { input: vec![1.0, 0.0], output: vec![0.5] };
        let copies = [
            Params { input: vec![1.5, 0.0], output: vec![0.5] },
            Params { input: vec![1.0, -0.25], output: vec![1.0] },
            Params { input: vec![2.0, 0.0], output: vec![0.5] },
        ];
        merge_updates(&mut params, &copies);
        assert_eq!(params.input, vec![2.5, -0.25]);
        assert_eq!(params.output, vec![1.0]);
    }
}
