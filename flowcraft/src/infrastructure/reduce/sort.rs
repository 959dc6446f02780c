// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! External sort with spill (`§4.5`): accumulate up to `max_in_memory`
//! items, sort the batch in place, and spill it to a temp file once the
//! threshold is crossed. Once the upstream is drained, either the whole
//! input fit in memory (no spill needed) or every run gets replayed through
//! [`SortedMergeAll`] to produce one fully sorted, duplicate-preserving
//! stream.

use std::io::{Read, Write};
use std::sync::Arc;

use flowcraft_domain::{BasePipe, Codec, Compression, PipelineError, PipelineResult, ProgressCell, SyncPipe, WriteOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::infrastructure::codec::JsonCodecImpl;
use crate::infrastructure::sources::FileSource;

use super::set_ops::SortedMergeAll;

type Comparator<T> = Arc<dyn Fn(&T, &T) -> std::cmp::Ordering + Send + Sync>;

enum Stage<T> {
    Collecting,
    Draining { merge: Box<SortedMergeAll<T>> },
    InMemory { buffer: std::vec::IntoIter<T> },
}

/// Sorts an upstream's items end to end, spilling to disk once the running
/// batch exceeds `max_in_memory`.
pub struct ExternalSort<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    comparator: Comparator<T>,
    max_in_memory: usize,
    temp_dir: tempfile::TempDir,
    runs_written: usize,
    progress: ProgressCell,
    stage: Stage<T>,
}

impl<T: Send + Clone + Serialize + DeserializeOwned + Sync + 'static> ExternalSort<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, comparator: Comparator<T>, max_in_memory: usize) -> PipelineResult<Self> {
        let temp_dir = tempfile::tempdir().map_err(PipelineError::from)?;
        Ok(Self {
            input,
            comparator,
            max_in_memory: max_in_memory.max(1),
            temp_dir,
            runs_written: 0,
            progress: ProgressCell::new(),
            stage: Stage::Collecting,
        })
    }

    /// Number of sorted runs spilled to disk so far (visible mainly for
    /// tests asserting the spill threshold actually triggered).
    pub fn runs_written(&self) -> usize {
        self.runs_written
    }

    fn spill(&mut self, mut batch: Vec<T>) -> PipelineResult<std::path::PathBuf> {
        batch.sort_by(|a, b| (self.comparator)(a, b));
        let path = self.temp_dir.path().join(format!("run-{:06}.jsonl.zst", self.runs_written));
        self.runs_written += 1;
        let file = std::fs::File::create(&path).map_err(PipelineError::from)?;
        let codec: JsonCodecImpl<T> = JsonCodecImpl::default();
        let options = WriteOptions { compression: Compression::Zstd, ..Default::default() };
        let mut encoder = codec.encoder_factory().open(Box::new(file) as Box<dyn Write + Send>, &options)?;
        for item in &batch {
            encoder.encode(item)?;
        }
        encoder.finish()?;
        Ok(path)
    }

    fn drain_input_to_runs(&mut self) -> PipelineResult<Vec<std::path::PathBuf>> {
        let mut buffer = Vec::with_capacity(self.max_in_memory);
        let mut runs = Vec::new();
        let mut consumed: u64 = 0;
        while let Some(item) = self.input.next()? {
            buffer.push(item);
            consumed += 1;
            self.progress.set((consumed as f64 / (consumed as f64 + 1.0)).min(0.99));
            if buffer.len() >= self.max_in_memory {
                runs.push(self.spill(std::mem::take(&mut buffer))?);
            }
        }
        if !buffer.is_empty() {
            if runs.is_empty() {
                buffer.sort_by(|a, b| (self.comparator)(a, b));
                self.stage = Stage::InMemory { buffer: buffer.into_iter() };
                return Ok(Vec::new());
            }
            runs.push(self.spill(buffer)?);
        }
        Ok(runs)
    }
}

impl<T: Send + Clone + Serialize + DeserializeOwned + Sync + 'static> BasePipe for ExternalSort<T> {
    fn progress(&self) -> f64 {
        match &self.stage {
            Stage::Collecting => self.progress.get(),
            Stage::InMemory { .. } => 1.0,
            Stage::Draining { merge } => merge.progress(),
        }
    }

    fn close(&mut self) {
        if let Stage::Draining { merge } = &mut self.stage {
            merge.close();
        }
        self.input.close();
    }
}

impl<T: Send + Clone + Serialize + DeserializeOwned + Sync + 'static> SyncPipe for ExternalSort<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()?;
        let runs = self.drain_input_to_runs()?;
        if matches!(self.stage, Stage::Collecting) {
            let comparator_fn: Box<dyn Fn(&T, &T) -> std::cmp::Ordering + Send> = {
                let cmp = self.comparator.clone();
                Box::new(move |a: &T, b: &T| cmp(a, b))
            };
            let codec: JsonCodecImpl<T> = JsonCodecImpl::default();
            let codec = Arc::new(codec);
            let mut readers: Vec<Box<dyn SyncPipe<Item = T>>> = Vec::new();
            for path in runs {
                let codec = codec.clone();
                let decoder_factory = RunDecoderFactory { codec };
                let options = flowcraft_domain::ReadOptions { compression: Compression::Zstd, ..Default::default() };
                readers.push(Box::new(FileSource::new(path, options, Arc::new(decoder_factory))));
            }
            let merge = SortedMergeAll::new(readers, comparator_fn);
            let mut merge = Box::new(merge);
            merge.start()?;
            self.stage = Stage::Draining { merge };
            self.progress.set(0.99);
        }
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        match &mut self.stage {
            Stage::Collecting => unreachable!("start() always resolves Collecting into InMemory or Draining"),
            Stage::InMemory { buffer } => {
                let next = buffer.next();
                if next.is_none() {
                    self.progress.complete();
                }
                Ok(next)
            }
            Stage::Draining { merge } => {
                let next = merge.next()?;
                if next.is_none() {
                    self.progress.complete();
                }
                Ok(next)
            }
        }
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        match &mut self.stage {
            Stage::Collecting => unreachable!("start() always resolves Collecting into InMemory or Draining"),
            Stage::InMemory { buffer } => Ok(buffer.as_slice().first()),
            Stage::Draining { merge } => merge.peek(),
        }
    }
}

struct RunDecoderFactory<T> {
    codec: Arc<JsonCodecImpl<T>>,
}

impl<T: Send + Clone + Serialize + DeserializeOwned + Sync + 'static> flowcraft_domain::DecoderFactory<T> for RunDecoderFactory<T> {
    fn open(&self, reader: Box<dyn Read + Send>, options: &flowcraft_domain::ReadOptions) -> PipelineResult<Box<dyn flowcraft_domain::Decoder<T>>> {
        self.codec.decoder_factory().open(reader, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    fn cmp() -> Comparator<i32> {
        Arc::new(|a: &i32, b: &i32| a.cmp(b))
    }

    #[test]
    fn sorts_small_input_without_spilling() {
        let input = Box::new(CollectionSource::new(vec![5, 3, 1, 4, 2]));
        let mut sort = ExternalSort::new(input, cmp(), 100).unwrap();
        sort.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = sort.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
        assert_eq!(sort.runs_written(), 0);
    }

    #[test]
    fn spills_and_merges_when_input_exceeds_threshold() {
        let values: Vec<i32> = (0..23).rev().collect();
        let input = Box::new(CollectionSource::new(values));
        let mut sort = ExternalSort::new(input, cmp(), 5).unwrap();
        sort.start().unwrap();
        assert!(sort.runs_written() >= 4);
        let mut out = Vec::new();
        while let Some(v) = sort.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, (0..23).collect::<Vec<_>>());
    }

    #[test]
    fn peek_matches_next_without_consuming_when_in_memory() {
        let input = Box::new(CollectionSource::new(vec![3, 1, 2]));
        let mut sort = ExternalSort::new(input, cmp(), 100).unwrap();
        sort.start().unwrap();
        assert_eq!(sort.peek().unwrap(), Some(&1));
        assert_eq!(sort.next().unwrap(), Some(1));
        assert_eq!(sort.peek().unwrap(), Some(&2));
        assert_eq!(sort.next().unwrap(), Some(2));
        assert_eq!(sort.next().unwrap(), Some(3));
        assert_eq!(sort.peek().unwrap(), None);
    }

    #[test]
    fn peek_matches_next_without_consuming_when_draining_runs() {
        let values: Vec<i32> = (0..12).rev().collect();
        let input = Box::new(CollectionSource::new(values));
        let mut sort = ExternalSort::new(input, cmp(), 3).unwrap();
        sort.start().unwrap();
        assert_eq!(sort.peek().unwrap(), Some(&0));
        assert_eq!(sort.peek().unwrap(), Some(&0));
        assert_eq!(sort.next().unwrap(), Some(0));
        assert_eq!(sort.peek().unwrap(), Some(&1));
    }
}
