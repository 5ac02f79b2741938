//! deepwalk CLI - learn node embeddings from a graph file.
//!
//! # Usage
//!
//! ```bash
//! # Adjacency list in, word2vec text vectors out
//! deepwalk --input karate.adjlist --output karate.embeddings
//!
//! # Edge list, corpus-weighted vocabulary, 128 dimensions
//! deepwalk --format edgelist --input blog.edges --output blog.emb \
//!     --model Skipgram --representation-size 128 --workers 4
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use deepwalk::{
    count_walks, write_word2vec_text, Corpus, Format, Graph, ModelKind, Objective, SkipGramTrainer,
    TrainerConfig, TrainingJob, WalkConfig,
};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "deepwalk")]
#[command(about = "Learn node embeddings with truncated random walks and skip-gram", long_about = None)]
struct Cli {
    /// Input graph file
    #[arg(long)]
    input: PathBuf,

    /// Output file for the vectors (word2vec text format)
    #[arg(long)]
    output: PathBuf,

    /// Input format: adjlist, edgelist or mat
    #[arg(long, default_value = "adjlist")]
    format: String,

    /// Walks started from each node
    #[arg(long, default_value_t = 10)]
    number_walks: usize,

    /// Maximum length of each walk, in nodes
    #[arg(long, default_value_t = 40)]
    walk_length: usize,

    /// Number of latent dimensions to learn for each node
    #[arg(long, default_value_t = 64)]
    representation_size: usize,

    /// Skip-gram context radius
    #[arg(long, default_value_t = 5)]
    window_size: usize,

    /// Training path: Word2Vec or Skipgram
    #[arg(long, default_value = "Word2Vec")]
    model: String,

    /// Use negative sampling with this many noise nodes instead of
    /// hierarchical softmax
    #[arg(long)]
    negative: Option<usize>,

    /// Passes over the corpus
    #[arg(long, default_value_t = 1)]
    epochs: usize,

    /// Training and walk-generation parallelism
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Probability of jumping back to the start node at each step
    #[arg(long, default_value_t = 0.0)]
    restart_probability: f64,

    /// Seed for walks and weight initialization
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log filter (overridden by RUST_LOG)
    #[arg(short, long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).compact().init();

    // Selectors and numeric settings are checked before the graph is read.
    let format: Format = cli.format.parse()?;
    let model: ModelKind = cli.model.parse()?;
    let walk_config = WalkConfig {
        length: cli.walk_length,
        walks_per_node: cli.number_walks,
        restart_probability: cli.restart_probability,
        seed: cli.seed,
    };
    walk_config.validate()?;
    let trainer_config = TrainerConfig {
        dimensions: cli.representation_size,
        window: cli.window_size,
        objective: match cli.negative {
            Some(negative) => Objective::NegativeSampling { negative },
            None => Objective::HierarchicalSoftmax,
        },
        workers: cli.workers,
        epochs: cli.epochs,
        seed: cli.seed,
        ..Default::default()
    };
    trainer_config.validate()?;

    #[cfg(feature = "parallel")]
    rayon::ThreadPoolBuilder::new()
        .num_threads(cli.workers)
        .build_global()
        .context("failed to start worker pool")?;

    let file = File::open(&cli.input)
        .with_context(|| format!("failed to open {}", cli.input.display()))?;
    let graph = format
        .read(BufReader::new(file))
        .with_context(|| format!("failed to read {} as {format}", cli.input.display()))?;
    info!(nodes = graph.labels().len(), arcs = graph.edge_count(), "loaded graph");

    let corpus = walk(&graph, walk_config, cli.workers)?;
    let job = if model == ModelKind::Skipgram {
        TrainingJob::with_vocabulary(&corpus, count(&corpus, cli.workers), trainer_config)?
    } else {
        TrainingJob::new(model, &corpus, trainer_config)?
    };
    let embeddings = job.covering(graph.node_count()).run(&SkipGramTrainer)?;

    let out = File::create(&cli.output)
        .with_context(|| format!("failed to create {}", cli.output.display()))?;
    write_word2vec_text(BufWriter::new(out), &embeddings, |n| {
        graph.label(n).map(String::as_str).unwrap_or("?")
    })?;
    info!(vectors = embeddings.len(), output = %cli.output.display(), "wrote embeddings");
    Ok(())
}

#[cfg(feature = "parallel")]
fn walk<G: Graph + Sync>(graph: &G, config: WalkConfig, workers: usize) -> deepwalk::Result<Corpus> {
    if workers > 1 {
        deepwalk::generate_walks_parallel(graph, config)
    } else {
        deepwalk::generate_walks(graph, config)
    }
}

#[cfg(not(feature = "parallel"))]
fn walk<G: Graph>(graph: &G, config: WalkConfig, _workers: usize) -> deepwalk::Result<Corpus> {
    deepwalk::generate_walks(graph, config)
}

#[cfg(feature = "parallel")]
fn count(corpus: &Corpus, workers: usize) -> deepwalk::VocabCounts {
    if workers > 1 {
        deepwalk::count_walks_parallel(corpus)
    } else {
        count_walks(corpus)
    }
}

#[cfg(not(feature = "parallel"))]
fn count(corpus: &Corpus, _workers: usize) -> deepwalk::VocabCounts {
    count_walks(corpus)
}
