//! Training configuration and the bridge to an embedding trainer.
//!
//! The trainer itself is pluggable ([`EmbeddingTrainer`]). What this module
//! pins down is the policy every run follows:
//!
//! - skip-gram only, with a symmetric context window;
//! - exactly one objective, hierarchical softmax unless negative sampling is
//!   asked for;
//! - no minimum-count pruning: every node seen in a walk gets a vector;
//! - under [`ModelKind::Skipgram`] the vocabulary weights are the corpus
//!   occurrence counts, handed to the trainer instead of letting it estimate
//!   its own.

use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::random_walk::Corpus;
use crate::vocab::{count_walks, VocabCounts};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Output-layer objective. The two are mutually exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Objective {
    /// Huffman-coded binary tree over the vocabulary weights.
    #[default]
    HierarchicalSoftmax,
    /// `negative` noise nodes per positive pair, drawn from weight^0.75.
    NegativeSampling { negative: usize },
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::HierarchicalSoftmax => f.write_str("hierarchical-softmax"),
            Objective::NegativeSampling { negative } => write!(f, "negative-sampling({negative})"),
        }
    }
}

/// Which training path to take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModelKind {
    /// The trainer builds its vocabulary from the corpus on its own.
    #[default]
    Word2Vec,
    /// Corpus occurrence counts are supplied as the vocabulary weights.
    Skipgram,
}

impl ModelKind {
    pub fn name(self) -> &'static str {
        match self {
            ModelKind::Word2Vec => "Word2Vec",
            ModelKind::Skipgram => "Skipgram",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Word2Vec" => Ok(ModelKind::Word2Vec),
            "Skipgram" => Ok(ModelKind::Skipgram),
            other => Err(Error::config(format!(
                "unknown model '{other}'; valid models: 'Word2Vec', 'Skipgram'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainerConfig {
    /// Embedding dimensionality.
    pub dimensions: usize,
    /// Context radius on each side of the center node.
    pub window: usize,
    pub objective: Objective,
    pub workers: usize,
    /// Passes over the corpus.
    pub epochs: usize,
    pub learning_rate: f32,
    /// Floor of the linear learning-rate decay.
    pub min_learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            dimensions: 64,
            window: 5,
            objective: Objective::HierarchicalSoftmax,
            workers: 1,
            epochs: 1,
            learning_rate: 0.025,
            min_learning_rate: 0.0001,
            seed: 1,
        }
    }
}

impl TrainerConfig {
    /// Nodes seen fewer times than this are dropped from the vocabulary.
    /// Always zero: every sampled node is kept.
    pub const MIN_COUNT: u64 = 0;

    pub fn min_count(&self) -> u64 {
        Self::MIN_COUNT
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 {
            return Err(Error::config("embedding dimensionality must be positive"));
        }
        if self.window == 0 {
            return Err(Error::config("context window must be positive"));
        }
        if self.workers == 0 {
            return Err(Error::config("worker count must be positive"));
        }
        if self.epochs == 0 {
            return Err(Error::config("epoch count must be positive"));
        }
        if let Objective::NegativeSampling { negative: 0 } = self.objective {
            return Err(Error::config("negative sampling needs at least one noise sample"));
        }
        if !(self.min_learning_rate > 0.0 && self.min_learning_rate <= self.learning_rate) {
            return Err(Error::config(format!(
                "learning rates must satisfy 0 < min ({}) <= initial ({})",
                self.min_learning_rate, self.learning_rate
            )));
        }
        Ok(())
    }
}

/// Where the vocabulary weights come from.
#[derive(Debug, Clone, PartialEq)]
pub enum VocabularySource {
    /// Left to [`EmbeddingTrainer::estimate_vocabulary`].
    Estimate,
    /// Fixed weights, used as-is.
    Override(VocabCounts),
}

/// A generic skip-gram trainer.
///
/// `estimate_vocabulary` is the trainer's own frequency estimate. Training
/// always receives the resolved vocabulary explicitly, so an override
/// replaces the estimate entirely (it shapes both the Huffman tree and the
/// noise distribution).
pub trait EmbeddingTrainer {
    type Error: std::error::Error + Send + Sync + 'static;

    fn estimate_vocabulary(&self, corpus: &Corpus) -> VocabCounts {
        count_walks(corpus)
    }

    fn train(
        &self,
        corpus: &Corpus,
        vocab: &VocabCounts,
        config: &TrainerConfig,
    ) -> std::result::Result<Embeddings, Self::Error>;
}

/// One fully specified, immutable training invocation.
#[derive(Debug, Clone)]
pub struct TrainingJob<'a> {
    model: ModelKind,
    corpus: &'a Corpus,
    vocabulary: VocabularySource,
    config: TrainerConfig,
    /// Size of the graph the corpus was sampled from, when known.
    node_count: Option<usize>,
}

impl<'a> TrainingJob<'a> {
    pub fn new(model: ModelKind, corpus: &'a Corpus, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let vocabulary = match model {
            ModelKind::Word2Vec => VocabularySource::Estimate,
            ModelKind::Skipgram => VocabularySource::Override(count_walks(corpus)),
        };
        Ok(Self { model, corpus, vocabulary, config, node_count: None })
    }

    /// Skip-gram job with caller-computed counts (e.g. from
    /// `count_walks_parallel`).
    pub fn with_vocabulary(
        corpus: &'a Corpus,
        counts: VocabCounts,
        config: TrainerConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model: ModelKind::Skipgram,
            corpus,
            vocabulary: VocabularySource::Override(counts),
            config,
            node_count: None,
        })
    }

    /// Require the resolved vocabulary to cover every node in
    /// `0..node_count` of the walked graph.
    pub fn covering(self, node_count: usize) -> Self {
        Self { node_count: Some(node_count), ..self }
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn corpus(&self) -> &Corpus {
        self.corpus
    }

    pub fn vocabulary(&self) -> &VocabularySource {
        &self.vocabulary
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn node_count(&self) -> Option<usize> {
        self.node_count
    }

    /// Resolve the vocabulary and hand everything to `trainer`.
    ///
    /// Fails with [`Error::UncoveredNode`] if a corpus token has no
    /// vocabulary weight or, under [`covering`](Self::covering), a graph
    /// node was never counted. Fails with [`Error::Training`] if the trainer
    /// fails.
    pub fn run<T: EmbeddingTrainer>(&self, trainer: &T) -> Result<Embeddings> {
        let estimated;
        let vocab = match &self.vocabulary {
            VocabularySource::Override(counts) => counts,
            VocabularySource::Estimate => {
                estimated = trainer.estimate_vocabulary(self.corpus);
                &estimated
            }
        };

        if let Some(&node) = self.corpus.iter().flatten().find(|&&n| !vocab.contains(n)) {
            return Err(Error::UncoveredNode { node });
        }
        if let Some(n) = self.node_count {
            vocab.ensure_covers(n)?;
        }

        info!(
            model = %self.model,
            walks = self.corpus.len(),
            tokens = self.corpus.token_count(),
            vocab = vocab.len(),
            dimensions = self.config.dimensions,
            window = self.config.window,
            objective = %self.config.objective,
            workers = self.config.workers,
            "training embeddings"
        );

        trainer
            .train(self.corpus, vocab, &self.config)
            .map_err(|e| Error::Training(Box::new(e)))
    }
}
