// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Hash join (`§4.7`): for inputs that aren't pre-sorted by key, partition
//! both sides by `hash(key) mod P` into matching spill files, then join each
//! partition in memory and concatenate the results. Every key's left and
//! right rows land in the same partition, so the per-partition join sees
//! the complete picture for that key without needing a global sort.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use flowcraft_domain::{default_partition_fn, BasePipe, Codec, Compression, JoinMode, JoinRecord, PipelineError, PipelineResult, ProgressCell, SyncPipe, WriteOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::infrastructure::aux::PeekBuffer;
use crate::infrastructure::codec::JsonCodecImpl;
use crate::infrastructure::sources::FileSource;

enum Stage<K, L, R> {
    Collecting,
    PerPartition { remaining: Vec<(std::path::PathBuf, Vec<std::path::PathBuf>)>, current: std::vec::IntoIter<JoinRecord<K, L, R>> },
}

/// Joins one left input against N right inputs by hash-partitioning every
/// side on the join key.
pub struct HashJoin<K, L, R> {
    left: Box<dyn SyncPipe<Item = (K, L)>>,
    right: Vec<Box<dyn SyncPipe<Item = (K, R)>>>,
    mode: JoinMode,
    partition_count: usize,
    temp_dir: tempfile::TempDir,
    progress: ProgressCell,
    stage: Stage<K, L, R>,
    peeked: PeekBuffer<JoinRecord<K, L, R>>,
}

impl<K, L, R> HashJoin<K, L, R>
where
    K: Send + Sync + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
    L: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    R: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
{
    pub fn new(
        left: Box<dyn SyncPipe<Item = (K, L)>>,
        right: Vec<Box<dyn SyncPipe<Item = (K, R)>>>,
        mode: JoinMode,
        partition_count: usize,
    ) -> PipelineResult<Self> {
        let temp_dir = tempfile::tempdir().map_err(PipelineError::from)?;
        Ok(Self {
            left,
            right,
            mode,
            partition_count: partition_count.max(1),
            temp_dir,
            progress: ProgressCell::new(),
            stage: Stage::Collecting,
            peeked: PeekBuffer::new(),
        })
    }

    fn left_partition_path(&self, index: usize) -> std::path::PathBuf {
        self.temp_dir.path().join(format!("left-{index:04}.jsonl.zst"))
    }

    fn right_partition_path(&self, right_idx: usize, index: usize) -> std::path::PathBuf {
        self.temp_dir.path().join(format!("right-{right_idx}-{index:04}.jsonl.zst"))
    }

    fn route_side<T: Serialize + DeserializeOwned + Send + Sync + 'static>(
        &self,
        input: &mut Box<dyn SyncPipe<Item = (K, T)>>,
        path_for: impl Fn(usize) -> std::path::PathBuf,
    ) -> PipelineResult<()> {
        let codec: JsonCodecImpl<(K, T)> = JsonCodecImpl::default();
        let options = WriteOptions { compression: Compression::Zstd, ..Default::default() };
        let mut encoders = Vec::with_capacity(self.partition_count);
        for index in 0..self.partition_count {
            let file = std::fs::File::create(path_for(index)).map_err(PipelineError::from)?;
            encoders.push(codec.encoder_factory().open(Box::new(file) as Box<dyn Write + Send>, &options)?);
        }
        while let Some((key, item)) = input.next()? {
            let partition = default_partition_fn(&key) % self.partition_count;
            encoders[partition].encode(&(key, item))?;
        }
        for mut encoder in encoders {
            encoder.finish()?;
        }
        Ok(())
    }

    fn load_partition<T: Serialize + DeserializeOwned + Send + Sync + Clone + 'static>(path: &std::path::Path) -> PipelineResult<Vec<(K, T)>> {
        let codec: Arc<JsonCodecImpl<(K, T)>> = Arc::new(JsonCodecImpl::default());
        let decoder_factory = PairDecoderFactory { codec };
        let options = flowcraft_domain::ReadOptions { compression: Compression::Zstd, ..Default::default() };
        let mut source: FileSource<(K, T)> = FileSource::new(path.to_path_buf(), options, Arc::new(decoder_factory));
        source.start()?;
        let mut out = Vec::new();
        while let Some(row) = source.next()? {
            out.push(row);
        }
        Ok(out)
    }

    fn join_partition(mode: JoinMode, right_total: usize, left_path: &std::path::Path, right_paths: &[std::path::PathBuf]) -> PipelineResult<Vec<JoinRecord<K, L, R>>> {
        let left_rows = Self::load_partition::<L>(left_path)?;
        let mut records: HashMap<K, JoinRecord<K, L, R>> = HashMap::new();
        for (key, item) in left_rows {
            records.entry(key.clone()).or_insert_with(|| JoinRecord::new(key, right_total)).left.push(item);
        }
        for (right_idx, path) in right_paths.iter().enumerate() {
            let rows = Self::load_partition::<R>(path)?;
            for (key, item) in rows {
                records.entry(key.clone()).or_insert_with(|| JoinRecord::new(key, right_total)).right[right_idx].push(item);
            }
        }

        Ok(records
            .into_values()
            .filter(|record| {
                let left_present = !record.left.is_empty();
                mode.should_emit(left_present, record.right_count_present(), right_total)
            })
            .collect())
    }
}

impl<K, L, R> BasePipe for HashJoin<K, L, R>
where
    K: Send + Sync + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
    L: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    R: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
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
        self.left.close();
        for right in &mut self.right {
            right.close();
        }
    }
}

impl<K, L, R> SyncPipe for HashJoin<K, L, R>
where
    K: Send + Sync + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
    L: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    R: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
{
    type Item = JoinRecord<K, L, R>;

    fn start(&mut self) -> PipelineResult<()> {
        self.left.start()?;
        for right in &mut self.right {
            right.start()?;
        }

        let mut left = std::mem::replace(&mut self.left, Box::new(crate::infrastructure::sources::CollectionSource::new(Vec::new())));
        self.route_side(&mut left, |index| self.left_partition_path(index))?;
        self.left = left;

        let right_inputs = std::mem::take(&mut self.right);
        let mut routed_right = Vec::with_capacity(right_inputs.len());
        for (idx, mut input) in right_inputs.into_iter().enumerate() {
            self.route_side(&mut input, |index| self.right_partition_path(idx, index))?;
            routed_right.push(input);
        }
        self.right = routed_right;

        let remaining: Vec<_> = (0..self.partition_count)
            .map(|i| (self.left_partition_path(i), (0..self.right.len()).map(|r| self.right_partition_path(r, i)).collect()))
            .collect();
        self.stage = Stage::PerPartition { remaining, current: Vec::new().into_iter() };
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<JoinRecord<K, L, R>>> {
        let stage = &mut self.stage;
        let progress = &self.progress;
        let mode = self.mode;
        let right_total = self.right.len();
        self.peeked.next(|| pull_hash_join_record(stage, mode, right_total, progress))
    }

    fn peek(&mut self) -> PipelineResult<Option<&JoinRecord<K, L, R>>> {
        let stage = &mut self.stage;
        let progress = &self.progress;
        let mode = self.mode;
        let right_total = self.right.len();
        self.peeked.peek(|| pull_hash_join_record(stage, mode, right_total, progress))
    }
}

fn pull_hash_join_record<K, L, R>(
    stage: &mut Stage<K, L, R>,
    mode: JoinMode,
    right_total: usize,
    progress: &ProgressCell,
) -> PipelineResult<Option<JoinRecord<K, L, R>>>
where
    K: Send + Sync + Clone + std::hash::Hash + Eq + Serialize + DeserializeOwned + 'static,
    L: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
    R: Send + Sync + Clone + Serialize + DeserializeOwned + 'static,
{
    loop {
        let Stage::PerPartition { remaining, current } = stage else {
            unreachable!("start() always resolves Collecting into PerPartition");
        };
        if let Some(record) = current.next() {
            return Ok(Some(record));
        }
        let Some((left_path, right_paths)) = remaining.pop() else {
            progress.complete();
            return Ok(None);
        };
        let joined = HashJoin::<K, L, R>::join_partition(mode, right_total, &left_path, &right_paths)?;
        if let Stage::PerPartition { current, .. } = stage {
            *current = joined.into_iter();
        }
    }
}

struct PairDecoderFactory<K, T> {
    codec: Arc<JsonCodecImpl<(K, T)>>,
}

impl<K, T> flowcraft_domain::DecoderFactory<(K, T)> for PairDecoderFactory<K, T>
where
    K: Send + Sync + Serialize + DeserializeOwned + 'static,
    T: Send + Sync + Serialize + DeserializeOwned + 'static,
{
    fn open(
        &self,
        reader: Box<dyn std::io::Read + Send>,
        options: &flowcraft_domain::ReadOptions,
    ) -> PipelineResult<Box<dyn flowcraft_domain::Decoder<(K, T)>>> {
        self.codec.decoder_factory().open(reader, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    #[test]
    fn inner_hash_join_matches_keys_regardless_of_input_order() {
        let left = Box::new(CollectionSource::new(vec![(3, "c"), (1, "a"), (2, "b")]));
        let right = Box::new(CollectionSource::new(vec![(2, "y"), (3, "z")]));
        let mut join = HashJoin::new(left, vec![right], JoinMode::Inner, 3).unwrap();
        join.start().unwrap();
        let mut keys = Vec::new();
        while let Some(record) = join.next().unwrap() {
            keys.push(record.key);
        }
        keys.sort();
        assert_eq!(keys, vec![2, 3]);
    }

    #[test]
    fn peek_matches_next_without_consuming() {
        let left = Box::new(CollectionSource::new(vec![(1, "a")]));
        let right = Box::new(CollectionSource::new(vec![(1, "x")]));
        let mut join = HashJoin::new(left, vec![right], JoinMode::Inner, 1).unwrap();
        join.start().unwrap();
        assert_eq!(join.peek().unwrap().map(|r| r.key), Some(1));
        assert_eq!(join.peek().unwrap().map(|r| r.key), Some(1));
        assert_eq!(join.next().unwrap().map(|r| r.key), Some(1));
        assert_eq!(join.peek().unwrap(), None);
        assert_eq!(join.next().unwrap(), None);
    }
}
