//! # deepwalk
//!
//! Node embeddings from truncated random walks.
//!
//! A run has three stages:
//!
//! 1. [`generate_walks`]: `walks_per_node` uniform walks from every node of a
//!    [`Graph`], at most `length` nodes each. Repeated edges raise a
//!    neighbor's sampling weight.
//! 2. [`count_walks`]: how often each node occurs in the corpus. These
//!    counts, not graph degrees, weight the training vocabulary.
//! 3. [`TrainingJob`]: skip-gram over the corpus through an
//!    [`EmbeddingTrainer`] ([`SkipGramTrainer`] is built in), hierarchical
//!    softmax by default, with no minimum-count pruning.
//!
//! ```rust
//! use deepwalk::{
//!     generate_walks, AdjacencyList, ModelKind, SkipGramTrainer, TrainerConfig, TrainingJob,
//!     WalkConfig,
//! };
//!
//! let mut g = AdjacencyList::new();
//! g.add_edge("a", "b");
//! g.add_edge("b", "c");
//!
//! let corpus = generate_walks(&g, WalkConfig { length: 10, walks_per_node: 5, ..Default::default() })?;
//! let config = TrainerConfig { dimensions: 16, ..Default::default() };
//! let embeddings = TrainingJob::new(ModelKind::Skipgram, &corpus, config)?.run(&SkipGramTrainer)?;
//! assert_eq!(embeddings.len(), 3);
//! # Ok::<(), deepwalk::Error>(())
//! ```

pub mod embeddings;
pub mod error;
pub mod formats;
pub mod graph;
pub mod random_walk;
pub mod skipgram;
pub mod topk;
pub mod trainer;
pub mod vocab;

pub use embeddings::Embeddings;
pub use error::{Error, Result, TrainerError};
pub use formats::{read_adjacency_list, read_edge_list, write_word2vec_text, Format};
pub use graph::{AdjacencyList, Graph};
pub use random_walk::{
    for_each_walk, for_each_walk_from_nodes, generate_walks, generate_walks_from_nodes, Corpus,
    WalkConfig,
};
#[cfg(feature = "parallel")]
pub use random_walk::{generate_walks_parallel, generate_walks_parallel_from_nodes};
pub use skipgram::{SkipGramError, SkipGramTrainer};
pub use topk::top_k;
pub use trainer::{EmbeddingTrainer, ModelKind, Objective, TrainerConfig, TrainingJob, VocabularySource};
pub use vocab::{count_walks, VocabCounts};
#[cfg(feature = "parallel")]
pub use vocab::count_walks_parallel;
