// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Hash-based reduction with partitioned spill (`§4.6`). Phase one routes
//! every item to one of `partition_count` spill files by `hash(key) mod P`;
//! phase two drains each partition in turn, building an in-memory
//! `HashMap<K, A>` that never has to hold more than one partition's worth
//! of keys at once. Grouping and deduplication are just this with an
//! aggregator that collects or discards duplicates.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use flowcraft_domain::{default_partition_fn, BasePipe, Codec, Compression, PipelineError, PipelineResult, ProgressCell, ReductorConfig, SyncPipe, WriteOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::infrastructure::aux::PeekBuffer;
use crate::infrastructure::codec::JsonCodecImpl;
use crate::infrastructure::sources::FileSource;

enum Stage<O> {
    Collecting,
    PerPartition { remaining: Vec<std::path::PathBuf>, current: std::vec::IntoIter<O> },
}

/// Reduces an upstream of `I` into `O` by key, spilling intermediate
/// `(key, item)` pairs across `partition_count` files so no single
/// partition needs to hold the whole key space in memory at once.
pub struct HashReductor<I, K, A, O> {
    input: Box<dyn SyncPipe<Item = I>>,
    config: ReductorConfig<I, K, A, O>,
    partition_count: usize,
    temp_dir: tempfile::TempDir,
    progress: ProgressCell,
    stage: Stage<O>,
    peeked: PeekBuffer<O>,
}

impl<I, K, A, O> HashReductor<I, K, A, O>
where
    I: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Sync + std::hash::Hash + Eq + Clone + Serialize + DeserializeOwned + 'static,
    A: 'static,
    O: Send + 'static,
{
    pub fn new(input: Box<dyn SyncPipe<Item = I>>, config: ReductorConfig<I, K, A, O>, partition_count: usize) -> PipelineResult<Self> {
        let temp_dir = tempfile::tempdir().map_err(PipelineError::from)?;
        Ok(Self {
            input,
            config,
            partition_count: partition_count.max(1),
            temp_dir,
            progress: ProgressCell::new(),
            stage: Stage::Collecting,
            peeked: PeekBuffer::new(),
        })
    }

    fn partition_path(&self, index: usize) -> std::path::PathBuf {
        self.temp_dir.path().join(format!("partition-{index:04}.jsonl.zst"))
    }

    fn route_to_partitions(&mut self) -> PipelineResult<()> {
        let codec: JsonCodecImpl<(K, I)> = JsonCodecImpl::default();
        let options = WriteOptions { compression: Compression::Zstd, ..Default::default() };
        let mut encoders = Vec::with_capacity(self.partition_count);
        for index in 0..self.partition_count {
            let file = std::fs::File::create(self.partition_path(index)).map_err(PipelineError::from)?;
            encoders.push(codec.encoder_factory().open(Box::new(file) as Box<dyn Write + Send>, &options)?);
        }

        let mut consumed: u64 = 0;
        while let Some(item) = self.input.next()? {
            let key = self.config.key_of(&item);
            let partition = default_partition_fn(&key) % self.partition_count;
            encoders[partition].encode(&(key, item))?;
            consumed += 1;
            self.progress.set((consumed as f64 / (consumed as f64 + 1.0)).min(0.99));
        }
        for mut encoder in encoders {
            encoder.finish()?;
        }
        Ok(())
    }

    fn drain_partition(config: &ReductorConfig<I, K, A, O>, path: &std::path::Path) -> PipelineResult<Vec<O>> {
        let codec: Arc<JsonCodecImpl<(K, I)>> = Arc::new(JsonCodecImpl::default());
        let decoder_factory = PairDecoderFactory { codec };
        let options = flowcraft_domain::ReadOptions { compression: Compression::Zstd, ..Default::default() };
        let mut source: FileSource<(K, I)> = FileSource::new(path.to_path_buf(), options, Arc::new(decoder_factory));
        source.start()?;

        let mut aggregators: HashMap<K, A> = HashMap::new();
        while let Some((key, item)) = source.next()? {
            let agg = aggregators.entry(key.clone()).or_insert_with(|| config.new_aggregator(&key));
            config.accumulate(agg, item)?;
        }
        source.close();
        // The partition only exists to bound peak memory during the drain;
        // once its contents are in `aggregators` it can be reclaimed right
        // away instead of waiting for the whole `temp_dir` to drop.
        std::fs::remove_file(path).map_err(PipelineError::from)?;
        Ok(aggregators.into_iter().map(|(_, agg)| config.finalize(agg)).collect())
    }
}

impl<I, K, A, O> BasePipe for HashReductor<I, K, A, O>
where
    I: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Sync + std::hash::Hash + Eq + Clone + Serialize + DeserializeOwned + 'static,
    A: 'static,
    O: Send + 'static,
{
    fn progress(&self) -> f64 {
        match &self.stage {
            Stage::Collecting => self.progress.get(),
            Stage::PerPartition { remaining, .. } => {
                let done = self.partition_count - remaining.len();
                (done as f64 / self.partition_count as f64).clamp(0.0, 1.0)
            }
        }
    }

    fn close(&mut self) {
        self.input.close();
    }
}

impl<I, K, A, O> SyncPipe for HashReductor<I, K, A, O>
where
    I: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Sync + std::hash::Hash + Eq + Clone + Serialize + DeserializeOwned + 'static,
    A: 'static,
    O: Send + 'static,
{
    type Item = O;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()?;
        self.route_to_partitions()?;
        let remaining: Vec<_> = (0..self.partition_count).map(|i| self.partition_path(i)).collect();
        self.stage = Stage::PerPartition { remaining, current: Vec::new().into_iter() };
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<O>> {
        let stage = &mut self.stage;
        let progress = &self.progress;
        let config = &self.config;
        self.peeked.next(|| pull_reduced_item(stage, config, progress))
    }

    fn peek(&mut self) -> PipelineResult<Option<&O>> {
        let stage = &mut self.stage;
        let progress = &self.progress;
        let config = &self.config;
        self.peeked.peek(|| pull_reduced_item(stage, config, progress))
    }
}

fn pull_reduced_item<I, K, A, O>(stage: &mut Stage<O>, config: &ReductorConfig<I, K, A, O>, progress: &ProgressCell) -> PipelineResult<Option<O>>
where
    I: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    K: Send + Sync + std::hash::Hash + Eq + Clone + Serialize + DeserializeOwned + 'static,
    A: 'static,
    O: Send + 'static,
{
    loop {
        let Stage::PerPartition { remaining, current } = stage else {
            unreachable!("start() always resolves Collecting into PerPartition");
        };
        if let Some(item) = current.next() {
            return Ok(Some(item));
        }
        let Some(path) = remaining.pop() else {
            progress.complete();
            return Ok(None);
        };
        let drained = HashReductor::<I, K, A, O>::drain_partition(config, &path)?;
        if let Stage::PerPartition { current, .. } = stage {
            *current = drained.into_iter();
        }
    }
}

struct PairDecoderFactory<K, I> {
    codec: Arc<JsonCodecImpl<(K, I)>>,
}

impl<K, I> flowcraft_domain::DecoderFactory<(K, I)> for PairDecoderFactory<K, I>
where
    K: Send + Sync + Serialize + DeserializeOwned + 'static,
    I: Send + Sync + Serialize + DeserializeOwned + 'static,
{
    fn open(
        &self,
        reader: Box<dyn std::io::Read + Send>,
        options: &flowcraft_domain::ReadOptions,
    ) -> PipelineResult<Box<dyn flowcraft_domain::Decoder<(K, I)>>> {
        self.codec.decoder_factory().open(reader, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    #[test]
    fn sums_values_by_key_across_partitions() {
        let input = Box::new(CollectionSource::new(vec![
            ("a".to_string(), 1),
            ("b".to_string(), 10),
            ("a".to_string(), 2),
            ("c".to_string(), 100),
            ("b".to_string(), 20),
        ]));
        let config = ReductorConfig::new(
            |item: &(String, i32)| item.0.clone(),
            |_key: &String| 0i32,
            |agg: &mut i32, item: (String, i32)| {
                *agg += item.1;
                Ok(())
            },
            |agg: i32| agg,
        );
        let mut reductor = HashReductor::new(input, config, 4).unwrap();
        reductor.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = reductor.next().unwrap() {
            out.push(v);
        }
        out.sort();
        assert_eq!(out, vec![3, 30, 100]);
    }

    #[test]
    fn drained_partition_files_are_removed() {
        let input = Box::new(CollectionSource::new(vec![("a".to_string(), 1), ("b".to_string(), 2)]));
        let config = ReductorConfig::new(
            |item: &(String, i32)| item.0.clone(),
            |_key: &String| 0i32,
            |agg: &mut i32, item: (String, i32)| {
                *agg += item.1;
                Ok(())
            },
            |agg: i32| agg,
        );
        let mut reductor = HashReductor::new(input, config, 2).unwrap();
        reductor.start().unwrap();
        while reductor.next().unwrap().is_some() {}

        let Stage::PerPartition { remaining, .. } = &reductor.stage else {
            unreachable!();
        };
        assert!(remaining.is_empty());
        assert_eq!(std::fs::read_dir(reductor.temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn peek_matches_next_without_consuming() {
        let input = Box::new(CollectionSource::new(vec![("a".to_string(), 1)]));
        let config = ReductorConfig::new(
            |item: &(String, i32)| item.0.clone(),
            |_key: &String| 0i32,
            |agg: &mut i32, item: (String, i32)| {
                *agg += item.1;
                Ok(())
            },
            |agg: i32| agg,
        );
        let mut reductor = HashReductor::new(input, config, 1).unwrap();
        reductor.start().unwrap();
        assert_eq!(reductor.peek().unwrap(), Some(&1));
        assert_eq!(reductor.peek().unwrap(), Some(&1));
        assert_eq!(reductor.next().unwrap(), Some(1));
        assert_eq!(reductor.peek().unwrap(), None);
        assert_eq!(reductor.next().unwrap(), None);
    }
}
