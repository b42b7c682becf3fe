//! Loaders for the flat files the evaluator consumes.
//!
//! Every `parse_*` function reads from any `BufRead` and names the input
//! `source` in its errors; the `read_*` wrappers open a file first.
//! Any malformed line aborts the load, no partial graph or labeling is returned.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};

use crate::config::READ_BUFFER_SIZE;
use crate::error::{EvalError, Result};
use crate::graph::{GraphSnapshot, VInt};
use crate::partition::{Label, Labeling};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GraphFormat {
    /// `numNodes numEdges` header, then the neighbors of node i on line i + 1.
    Metis,
    /// One `u v` pair per line.
    EdgeList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PartitionFormat {
    /// One community id per line, in 1-based node order.
    Metis,
    /// One `node community` pair per line.
    Pairs,
}

fn parse_token<T: FromStr>(token: &str, source: &str, line: usize) -> Result<T> {
    token.parse::<T>().map_err(|_| {
        EvalError::malformed(source, line, format!("'{}' is not a valid non-negative integer", token))
    })
}

/// Iterate `(1-based line number, line)` and turn read failures into errors.
fn numbered_lines<'a, R: BufRead + 'a>(
    reader: R,
    source: &'a str,
) -> impl Iterator<Item = Result<(usize, String)>> + 'a {
    reader.lines().enumerate().map(move |(index, line)| {
        line.map(|text| (index + 1, text))
            .map_err(|error| EvalError::Io { input: source.to_owned(), error })
    })
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|error| EvalError::Io {
        input: path.display().to_string(),
        error,
    })?;
    Ok(BufReader::with_capacity(READ_BUFFER_SIZE, file))
}

/// Parse an edge list. Blank lines and `#` comments are skipped.
pub fn parse_edge_list<R: BufRead>(reader: R, source: &str, is_directed: bool) -> Result<GraphSnapshot> {
    let mut edges = Vec::new();
    for line in numbered_lines(reader, source) {
        let (line_no, line) = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(EvalError::malformed(source, line_no,
                format!("expected 'u v', found {} fields", tokens.len())));
        }
        let u: VInt = parse_token(tokens[0], source, line_no)?;
        let v: VInt = parse_token(tokens[1], source, line_no)?;
        edges.push((u, v));
    }
    let graph = GraphSnapshot::from_edges(edges, is_directed);
    info!("Loaded {}: {} vertices, {} edges", source, graph.vertex_count(), graph.edge_count());
    Ok(graph)
}

/// Parse a METIS adjacency file into an undirected graph with vertices
/// `1..=numNodes`. `%` lines are comments.
pub fn parse_metis_graph<R: BufRead>(reader: R, source: &str) -> Result<GraphSnapshot> {
    let mut header: Option<(u32, u64)> = None;
    let mut adj_map = BTreeMap::<VInt, Vec<VInt>>::new();
    let mut vertex: VInt = 0;
    for line in numbered_lines(reader, source) {
        let (line_no, line) = line?;
        if line.trim_start().starts_with('%') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let (vertex_count, _) = match header {
            Some(header) => header,
            None => {
                // The first line: "numNodes numEdges [fmt]".
                if tokens.len() < 2 {
                    return Err(EvalError::malformed(source, line_no,
                        "header must start with 'numNodes numEdges'"));
                }
                let vertex_count: u32 = parse_token(tokens[0], source, line_no)?;
                let edge_count: u64 = parse_token(tokens[1], source, line_no)?;
                if tokens.len() > 2 && !tokens[2].trim_start_matches('0').is_empty() {
                    return Err(EvalError::malformed(source, line_no,
                        format!("weighted METIS graphs (fmt {}) are not supported", tokens[2])));
                }
                for v in 1..=vertex_count {
                    adj_map.insert(v, Vec::new());
                }
                header = Some((vertex_count, edge_count));
                continue;
            }
        };

        if vertex == vertex_count {
            if tokens.is_empty() {
                continue;
            }
            return Err(EvalError::malformed(source, line_no,
                format!("more adjacency lines than the {} declared nodes", vertex_count)));
        }
        vertex += 1;
        for token in tokens {
            let neighbor: VInt = parse_token(token, source, line_no)?;
            if neighbor == 0 || neighbor > vertex_count {
                return Err(EvalError::malformed(source, line_no,
                    format!("neighbor {} outside of 1..={}", neighbor, vertex_count)));
            }
            adj_map.entry(vertex).or_insert_with(Vec::new).push(neighbor);
            if neighbor != vertex {
                adj_map.entry(neighbor).or_insert_with(Vec::new).push(vertex);
            }
        }
    }

    let (vertex_count, edge_count) = header.ok_or_else(|| {
        EvalError::malformed(source, 0, "missing 'numNodes numEdges' header")
    })?;
    if vertex < vertex_count {
        warn!("{}: {} adjacency lines for {} nodes, the rest are isolated", source, vertex, vertex_count);
    }
    for neighbors in adj_map.values_mut() {
        neighbors.sort_unstable();
        neighbors.dedup();
    }
    let graph = GraphSnapshot::from_adj_map(adj_map, false);
    if graph.edge_count() as u64 != edge_count {
        warn!("{}: header declares {} edges, found {}", source, edge_count, graph.edge_count());
    }
    info!("Loaded {}: {} vertices, {} edges", source, graph.vertex_count(), graph.edge_count());
    Ok(graph)
}

/// Parse a METIS partition: the label of node i on line i.
pub fn parse_metis_partition<R: BufRead>(reader: R, source: &str) -> Result<Labeling> {
    let mut labeling = Labeling::new();
    for line in numbered_lines(reader, source) {
        let (line_no, line) = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 1 {
            return Err(EvalError::malformed(source, line_no,
                format!("expected one community id, found {} fields", tokens.len())));
        }
        let label: Label = parse_token(tokens[0], source, line_no)?;
        labeling.insert(line_no as VInt, label);
    }
    info!("Loaded {}: {} labeled vertices", source, labeling.len());
    Ok(labeling)
}

/// Parse `node community` pairs. Blank lines and `#` comments are skipped.
pub fn parse_node_community_pairs<R: BufRead>(reader: R, source: &str) -> Result<Labeling> {
    let mut labeling = Labeling::new();
    for line in numbered_lines(reader, source) {
        let (line_no, line) = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != 2 {
            return Err(EvalError::malformed(source, line_no,
                format!("expected 'node community', found {} fields", tokens.len())));
        }
        let vertex: VInt = parse_token(tokens[0], source, line_no)?;
        let label: Label = parse_token(tokens[1], source, line_no)?;
        labeling.insert(vertex, label);
    }
    info!("Loaded {}: {} labeled vertices", source, labeling.len());
    Ok(labeling)
}

/// Parse a ground-truth file: every vertex listed on line i gets label i
/// (0-based). A vertex listed twice keeps its last label.
pub fn parse_ground_truth<R: BufRead>(reader: R, source: &str) -> Result<Labeling> {
    let mut labeling = Labeling::new();
    let mut groups = 0usize;
    for line in numbered_lines(reader, source) {
        let (line_no, line) = line?;
        let label = (line_no - 1) as Label;
        for token in line.split_whitespace() {
            let vertex: VInt = parse_token(token, source, line_no)?;
            labeling.insert(vertex, label);
        }
        groups = line_no;
    }
    info!("Loaded {}: {} groups over {} vertices", source, groups, labeling.len());
    Ok(labeling)
}

pub fn read_graph(path: impl AsRef<Path>, format: GraphFormat, is_directed: bool) -> Result<GraphSnapshot> {
    let path = path.as_ref();
    let reader = open(path)?;
    let source = path.display().to_string();
    match format {
        GraphFormat::Metis => {
            if is_directed {
                warn!("{}: METIS graphs are undirected, ignoring the directed flag", source);
            }
            parse_metis_graph(reader, &source)
        }
        GraphFormat::EdgeList => parse_edge_list(reader, &source, is_directed),
    }
}

pub fn read_partition(path: impl AsRef<Path>, format: PartitionFormat) -> Result<Labeling> {
    let path = path.as_ref();
    let reader = open(path)?;
    let source = path.display().to_string();
    match format {
        PartitionFormat::Metis => parse_metis_partition(reader, &source),
        PartitionFormat::Pairs => parse_node_community_pairs(reader, &source),
    }
}

pub fn read_ground_truth(path: impl AsRef<Path>) -> Result<Labeling> {
    let path = path.as_ref();
    let reader = open(path)?;
    parse_ground_truth(reader, &path.display().to_string())
}
