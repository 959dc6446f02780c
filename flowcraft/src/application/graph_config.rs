// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Declarative pipeline graphs for the CLI: a YAML or JSON document
//! describing a source, a chain of operators, and a sink, all operating on
//! `serde_json::Value` items. This is the engine's one concession to
//! dynamic typing — a caller linking against the library directly builds a
//! strongly typed pipeline out of `flowcraft::infrastructure` pieces
//! instead, with no `Value` boxing anywhere. The CLI exists to run
//! something without writing Rust, so it pays that cost at the boundary.
//!
//! Operators that would change the item type (`group_by`, hash/sorted
//! joins) aren't exposed here — they'd break the graph's single `Value`
//! item type. Reach for the library directly when a graph needs one of
//! those.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;

use flowcraft_domain::{BasePipe, Codec, PipelineError, PipelineResult, ReadOptions, ShuffleConfig, SyncPipe, WorkerAddress, WriteOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::infrastructure::codec::JsonCodecImpl;
use crate::infrastructure::operators::{Filter, Head, Skip};
use crate::infrastructure::reduce::{dedup_by, ExternalSort, HashReductor};
use crate::infrastructure::shuffle::ShuffleExchange;
use crate::infrastructure::sources::FileSource;
use crate::infrastructure::terminal::Consumer;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub operators: Vec<OperatorConfig>,
    pub sink: SinkConfig,
    /// Present iff this graph has a shuffle stage. `shuffle-worker` reads
    /// this to learn the peer topology; `run`/`validate`/`benchmark` ignore
    /// it (they drive the graph single-process, with no partitioning).
    #[serde(default)]
    pub shuffle: Option<ShuffleTopology>,
}

/// Peer addresses for a graph's shuffle stage, in the order a caller
/// assigns `--worker-index` against — canonical `(host, port)` sorting
/// happens inside [`ShuffleConfig::new`], not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShuffleTopology {
    /// `"host:port"` per worker.
    pub workers: Vec<String>,
    /// Port this process listens on when it runs as the worker at its
    /// index in `workers`.
    pub local_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SourceConfig {
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SinkConfig {
    File { path: PathBuf },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum OperatorConfig {
    Head { limit: u64 },
    Skip { count: u64 },
    /// Keeps items where `field` (a top-level object key) is present and
    /// not JSON `null`.
    FilterPresent { field: String },
    /// Drops repeats of `field`'s value, keeping the first occurrence.
    DedupBy { field: String },
    /// Sorts by `field`, spilling to disk once more than `max_in_memory`
    /// items have accumulated.
    SortBy { field: String, max_in_memory: usize },
}

/// Parses a graph from YAML or JSON text, trying YAML first since it's a
/// JSON superset only in the strict sense — `serde_yaml` accepts both.
pub fn parse_graph(text: &str) -> PipelineResult<GraphConfig> {
    serde_yaml::from_str(text).map_err(|e| PipelineError::validation(format!("invalid graph config: {e}")))
}

fn field_value<'a>(item: &'a Value, field: &str) -> Option<&'a Value> {
    item.get(field)
}

fn compare_by_field(field: &str, a: &Value, b: &Value) -> Ordering {
    match (field_value(a, field), field_value(b, field)) {
        (Some(a), Some(b)) => compare_values(a, b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn apply_operator(input: Box<dyn SyncPipe<Item = Value>>, op: &OperatorConfig) -> PipelineResult<Box<dyn SyncPipe<Item = Value>>> {
    Ok(match op {
        OperatorConfig::Head { limit } => Box::new(Head::new(input, *limit)),
        OperatorConfig::Skip { count } => Box::new(Skip::new(input, *count)),
        OperatorConfig::FilterPresent { field } => {
            let field = field.clone();
            Box::new(Filter::new(input, move |item: &Value| !matches!(field_value(item, &field), None | Some(Value::Null))))
        }
        OperatorConfig::DedupBy { field } => {
            let field = field.clone();
            let config = dedup_by(move |item: &Value| field_value(item, &field).cloned().unwrap_or(Value::Null).to_string());
            let partitions = flowcraft_bootstrap::platform::create_platform().cpu_count();
            Box::new(HashReductor::new(input, config, partitions)?)
        }
        OperatorConfig::SortBy { field, max_in_memory } => {
            let field = field.clone();
            let comparator: Arc<dyn Fn(&Value, &Value) -> Ordering + Send + Sync> = Arc::new(move |a, b| compare_by_field(&field, a, b));
            Box::new(ExternalSort::new(input, comparator, (*max_in_memory).max(1))?)
        }
    })
}

fn open_source(graph: &GraphConfig, codec: &Arc<JsonCodecImpl<Value>>) -> PipelineResult<Box<dyn SyncPipe<Item = Value>>> {
    let SourceConfig::File { path } = &graph.source;
    let mut pipe: Box<dyn SyncPipe<Item = Value>> = Box::new(FileSource::new(path.clone(), ReadOptions::default(), Arc::new(JsonDecoderHandle(codec.clone()))));
    for op in &graph.operators {
        pipe = apply_operator(pipe, op)?;
    }
    Ok(pipe)
}

/// Builds and drains the whole graph: opens the source, chains every
/// operator in order, and streams the result into the sink.
pub fn run_graph(graph: &GraphConfig) -> PipelineResult<u64> {
    let codec = Arc::new(JsonCodecImpl::<Value>::default());
    let mut pipe = open_source(graph, &codec)?;

    let mut count = 0u64;
    pipe.start()?;
    let SinkConfig::File { path } = &graph.sink;
    let mut encoder = codec.encoder_factory().open(Box::new(std::fs::File::create(path).map_err(PipelineError::from)?), &WriteOptions::default())?;
    while let Some(item) = pipe.next()? {
        encoder.encode(&item)?;
        count += 1;
    }
    pipe.close();
    encoder.finish()?;
    Ok(count)
}

fn parse_worker_address(spec: &str) -> PipelineResult<WorkerAddress> {
    let (host, port) = spec.rsplit_once(':').ok_or_else(|| PipelineError::validation(format!("invalid worker address {spec:?}, expected host:port")))?;
    let port: u16 = port.parse().map_err(|_| PipelineError::validation(format!("invalid worker port in {spec:?}")))?;
    Ok(WorkerAddress::new(host, port))
}

/// Hashes a `Value` by its canonical JSON text, since `Value` has no
/// structural `Hash` impl. Used as the shuffle stage's default partition
/// function for CLI-driven graphs.
fn hash_value(item: &Value) -> usize {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    item.to_string().hash(&mut hasher);
    hasher.finish() as usize
}

/// Runs this process as one participant in `graph`'s shuffle stage: drains
/// the local source/operator chain, exchanges items with every peer named
/// in `graph.shuffle`, and writes whatever lands in this worker's shard to
/// the sink.
pub fn run_shuffle_worker(graph: &GraphConfig, worker_index: usize) -> PipelineResult<u64> {
    let topology = graph.shuffle.as_ref().ok_or_else(|| PipelineError::validation("graph has no shuffle stage"))?;

    let addresses: Vec<WorkerAddress> = topology.workers.iter().map(|s| parse_worker_address(s)).collect::<PipelineResult<_>>()?;
    let my_address = addresses
        .get(worker_index)
        .cloned()
        .ok_or_else(|| PipelineError::validation(format!("worker index {worker_index} out of range for {} workers", addresses.len())))?;
    let mut sorted = addresses.clone();
    sorted.sort();
    let my_index = sorted.iter().position(|a| *a == my_address).expect("my_address came from addresses, sorted is a permutation of it");

    let shuffle_config = ShuffleConfig::new(addresses, my_index, topology.local_port, hash_value);

    let codec = Arc::new(JsonCodecImpl::<Value>::default());
    let pipe = open_source(graph, &codec)?;
    let mut exchange = ShuffleExchange::new(shuffle_config, pipe);

    let SinkConfig::File { path } = &graph.sink;
    let mut encoder = codec.encoder_factory().open(Box::new(std::fs::File::create(path).map_err(PipelineError::from)?), &WriteOptions::default())?;
    let mut count = 0u64;
    exchange.start()?;
    while let Some(item) = exchange.next()? {
        encoder.encode(&item)?;
        count += 1;
    }
    exchange.close();
    encoder.finish()?;
    Ok(count)
}

/// `JsonCodecImpl<T>::decoder_factory()` borrows `&self`; this owns a
/// cloned `Arc` so `FileSource` can hold a `'static` factory without the
/// codec itself needing to implement `DecoderFactory` directly.
struct JsonDecoderHandle(Arc<JsonCodecImpl<Value>>);

impl flowcraft_domain::DecoderFactory<Value> for JsonDecoderHandle {
    fn open(&self, reader: Box<dyn std::io::Read + Send>, options: &ReadOptions) -> PipelineResult<Box<dyn flowcraft_domain::Decoder<Value>>> {
        self.0.decoder_factory().open(reader, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_yaml_graph() {
        let yaml = r#"
source:
  type: file
  path: in.jsonl
operators:
  - type: head
    limit: 10
sink:
  type: file
  path: out.jsonl
"#;
        let graph = parse_graph(yaml).unwrap();
        assert_eq!(graph.operators.len(), 1);
        assert!(matches!(graph.source, SourceConfig::File { .. }));
    }

    #[test]
    fn runs_a_head_graph_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.jsonl");
        std::fs::write(&input_path, "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n").unwrap();
        let output_path = dir.path().join("out.jsonl");

        let graph = GraphConfig {
            source: SourceConfig::File { path: input_path },
            operators: vec![OperatorConfig::Head { limit: 2 }],
            sink: SinkConfig::File { path: output_path.clone() },
            shuffle: None,
        };

        let count = run_graph(&graph).unwrap();
        assert_eq!(count, 2);
        let written = std::fs::read_to_string(&output_path).unwrap();
        assert_eq!(written.lines().count(), 2);
    }

    #[test]
    fn sorts_by_field_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("in.jsonl");
        std::fs::write(&input_path, "{\"n\":3}\n{\"n\":1}\n{\"n\":2}\n").unwrap();
        let output_path = dir.path().join("out.jsonl");

        let graph = GraphConfig {
            source: SourceConfig::File { path: input_path },
            operators: vec![OperatorConfig::SortBy { field: "n".to_string(), max_in_memory: 100 }],
            sink: SinkConfig::File { path: output_path.clone() },
            shuffle: None,
        };

        run_graph(&graph).unwrap();
        let written = std::fs::read_to_string(&output_path).unwrap();
        let values: Vec<i64> = written.lines().map(|l| serde_json::from_str::<Value>(l).unwrap()["n"].as_i64().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    fn free_port() -> u16 {
        std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap().local_addr().unwrap().port()
    }

    #[test]
    fn two_worker_shuffle_graph_partitions_by_n() {
        let dir = tempfile::tempdir().unwrap();
        let input_a = dir.path().join("in_a.jsonl");
        let input_b = dir.path().join("in_b.jsonl");
        std::fs::write(&input_a, "{\"n\":10}\n{\"n\":11}\n{\"n\":12}\n{\"n\":13}\n").unwrap();
        std::fs::write(&input_b, "{\"n\":20}\n{\"n\":21}\n{\"n\":22}\n{\"n\":23}\n").unwrap();
        let output_a = dir.path().join("out_a.jsonl");
        let output_b = dir.path().join("out_b.jsonl");

        let port_a = free_port();
        let port_b = free_port();
        let topology = ShuffleTopology { workers: vec![format!("127.0.0.1:{port_a}"), format!("127.0.0.1:{port_b}")], local_port: 0 };

        let graph_a = GraphConfig {
            source: SourceConfig::File { path: input_a },
            operators: vec![],
            sink: SinkConfig::File { path: output_a.clone() },
            shuffle: Some(ShuffleTopology { local_port: port_a, ..topology.clone() }),
        };
        let graph_b = GraphConfig {
            source: SourceConfig::File { path: input_b },
            operators: vec![],
            sink: SinkConfig::File { path: output_b.clone() },
            shuffle: Some(ShuffleTopology { local_port: port_b, ..topology }),
        };

        let worker_a = std::thread::spawn(move || run_shuffle_worker(&graph_a, 0));
        let worker_b = std::thread::spawn(move || run_shuffle_worker(&graph_b, 1));
        worker_a.join().unwrap().unwrap();
        worker_b.join().unwrap().unwrap();

        let read_ns = |path: &std::path::Path| -> Vec<i64> {
            std::fs::read_to_string(path).unwrap().lines().map(|l| serde_json::from_str::<Value>(l).unwrap()["n"].as_i64().unwrap()).collect()
        };
        let mut seen_a = read_ns(&output_a);
        let mut seen_b = read_ns(&output_b);
        seen_a.sort();
        seen_b.sort();

        // Every item landed in exactly one worker's output, and the two
        // outputs partition the combined input.
        let mut combined: Vec<i64> = seen_a.iter().chain(seen_b.iter()).cloned().collect();
        combined.sort();
        assert_eq!(combined, vec![10, 11, 12, 13, 20, 21, 22, 23]);
    }
}
