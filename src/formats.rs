//! Plain-text graph readers and the word2vec text writer.
//!
//! Node tokens are kept as strings. Blank lines and lines starting with `#`
//! are skipped.

use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::graph::AdjacencyList;
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

/// Input graph format selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    /// `node nbr1 nbr2 ...` per line.
    #[default]
    Adjlist,
    /// `a b` per line, one undirected edge.
    Edgelist,
    /// Sparse adjacency matrix stored as a named variable in a MATLAB file.
    Mat,
}

impl Format {
    pub fn name(self) -> &'static str {
        match self {
            Format::Adjlist => "adjlist",
            Format::Edgelist => "edgelist",
            Format::Mat => "mat",
        }
    }

    /// Read a graph in this format.
    pub fn read<R: BufRead>(self, reader: R) -> Result<AdjacencyList<String>> {
        match self {
            Format::Adjlist => read_adjacency_list(reader),
            Format::Edgelist => read_edge_list(reader),
            Format::Mat => Err(Error::config(
                "the 'mat' format is recognized but not readable by this build; \
                 export the matrix as an edge list",
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "adjlist" => Ok(Format::Adjlist),
            "edgelist" => Ok(Format::Edgelist),
            "mat" => Ok(Format::Mat),
            other => Err(Error::config(format!(
                "unknown file format '{other}'; valid formats: 'adjlist', 'edgelist', 'mat'"
            ))),
        }
    }
}

fn content_lines<R: BufRead>(reader: R) -> impl Iterator<Item = Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)).map_err(Error::from))
        .filter(|r| match r {
            Ok((_, l)) => {
                let t = l.trim();
                !t.is_empty() && !t.starts_with('#')
            }
            Err(_) => true,
        })
}

/// Adjacency list: the first token of a line is the node, the rest are its
/// neighbors. Arcs are mirrored afterwards, so the graph is undirected.
pub fn read_adjacency_list<R: BufRead>(reader: R) -> Result<AdjacencyList<String>> {
    let mut g = AdjacencyList::new();
    for line in content_lines(reader) {
        let (_, line) = line?;
        let mut tokens = line.split_whitespace();
        let Some(node) = tokens.next() else { continue };
        g.add_node(node.to_owned());
        for nbr in tokens {
            g.add_arc(node.to_owned(), nbr.to_owned());
        }
    }
    g.make_undirected();
    Ok(g)
}

/// Edge list: exactly two tokens per line. Extra columns (weights) are
/// rejected rather than silently dropped.
pub fn read_edge_list<R: BufRead>(reader: R) -> Result<AdjacencyList<String>> {
    let mut g = AdjacencyList::new();
    for line in content_lines(reader) {
        let (line_no, line) = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            [a, b] => g.add_edge((*a).to_owned(), (*b).to_owned()),
            _ => {
                return Err(Error::Parse {
                    line: line_no,
                    message: format!("expected 2 node tokens, found {}", tokens.len()),
                })
            }
        }
    }
    Ok(g)
}

/// word2vec text format: a `count dim` header, then one `label v1 v2 ...`
/// line per node.
pub fn write_word2vec_text<W, F, L>(mut writer: W, embeddings: &Embeddings, label: F) -> Result<()>
where
    W: Write,
    F: Fn(usize) -> L,
    L: fmt::Display,
{
    writeln!(writer, "{} {}", embeddings.len(), embeddings.dim())?;
    for (node, v) in embeddings.iter() {
        write!(writer, "{}", label(node))?;
        for x in v {
            write!(writer, " {x}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}
