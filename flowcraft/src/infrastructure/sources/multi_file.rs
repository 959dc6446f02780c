// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Enumerates files under one or more roots, optionally filters and shards
//! them, and chains a [`FileSource`] per selected file into one logical
//! stream (`§4.2`).

use crate::infrastructure::aux::lpt::lpt_assign;
use crate::infrastructure::aux::path_utils::{dedup_by_filename, list_files};
use crate::infrastructure::sources::file::FileSource;
use flowcraft_domain::{BasePipe, Decoder, DecoderFactory, PipelineResult, ProgressCell, ReadOptions, ShardSpecifier, SyncPipe};
use std::path::PathBuf;
use std::sync::Arc;

/// How files are assigned to shards when a [`ShardSpecifier`] is given.
#[derive(Debug, Clone, Copy)]
pub enum ShardingDiscipline {
    /// Deterministic `index mod total` over the file list, by count.
    ByCount,
    /// LPT heuristic balancing approximate total byte volume per shard.
    ByVolume,
}

pub struct MultiFileSourceBuilder {
    roots: Vec<PathBuf>,
    recursive: bool,
    predicate: Option<Arc<dyn Fn(&std::path::Path) -> bool + Send + Sync>>,
    comparator: Option<Arc<dyn Fn(&PathBuf, &PathBuf) -> std::cmp::Ordering + Send + Sync>>,
    shard: Option<(ShardSpecifier, ShardingDiscipline)>,
}

impl Default for MultiFileSourceBuilder {
    fn default() -> Self {
        Self { roots: Vec::new(), recursive: false, predicate: None, comparator: None, shard: None }
    }
}

impl MultiFileSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn filter(mut self, predicate: impl Fn(&std::path::Path) -> bool + Send + Sync + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn sort_by(mut self, comparator: impl Fn(&PathBuf, &PathBuf) -> std::cmp::Ordering + Send + Sync + 'static) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    pub fn shard(mut self, spec: ShardSpecifier, discipline: ShardingDiscipline) -> Self {
        self.shard = Some((spec, discipline));
        self
    }

    /// Resolves the final, canonically-ordered, deduplicated, sharded list
    /// of `(path, size)` pairs this source would read.
    pub fn resolve(&self) -> std::io::Result<Vec<(PathBuf, u64)>> {
        let mut all = Vec::new();
        for root in &self.roots {
            all.extend(list_files(root, self.recursive)?);
        }
        let mut files = dedup_by_filename(all);

        if let Some(predicate) = &self.predicate {
            files.retain(|(path, _)| predicate(path));
        }

        match &self.comparator {
            Some(cmp) => files.sort_by(|a, b| cmp(&a.0, &b.0)),
            None => files.sort_by(|a, b| a.0.cmp(&b.0)),
        }

        if let Some((spec, discipline)) = &self.shard {
            let shard_of: Vec<usize> = match discipline {
                ShardingDiscipline::ByCount => (0..files.len()).map(|i| i % spec.total() as usize).collect(),
                ShardingDiscipline::ByVolume => {
                    let sizes: Vec<u64> = files.iter().map(|(_, size)| *size).collect();
                    lpt_assign(&sizes, spec.total() as usize)
                }
            };
            files = files
                .into_iter()
                .zip(shard_of)
                .filter(|(_, shard)| *shard == spec.index() as usize)
                .map(|(file, _)| file)
                .collect();
        }

        Ok(files)
    }

    pub fn build<T: Send + 'static>(self, decoder_factory: Arc<dyn DecoderFactory<T>>, options: ReadOptions) -> PipelineResult<MultiFileSource<T>> {
        let files = self.resolve().map_err(flowcraft_domain::PipelineError::from)?;
        Ok(MultiFileSource {
            files,
            options,
            decoder_factory,
            current: None,
            current_index: 0,
            progress: ProgressCell::new(),
        })
    }
}

/// Chains one [`FileSource`] per selected file, in shard order, into a
/// single logical `SyncPipe`.
pub struct MultiFileSource<T> {
    files: Vec<(PathBuf, u64)>,
    options: ReadOptions,
    decoder_factory: Arc<dyn DecoderFactory<T>>,
    current: Option<FileSource<T>>,
    current_index: usize,
    progress: ProgressCell,
}

impl<T: Send + 'static> MultiFileSource<T> {
    fn advance_to_next_file(&mut self) -> PipelineResult<bool> {
        loop {
            if self.current_index >= self.files.len() {
                return Ok(false);
            }
            let (path, _) = self.files[self.current_index].clone();
            self.current_index += 1;
            let mut source = FileSource::new(path, self.options.clone(), self.decoder_factory.clone());
            source.start()?;
            // Skip files that are empty — avoid returning an inert source.
            if source.peek()?.is_some() {
                self.current = Some(source);
                return Ok(true);
            }
        }
    }
}

impl<T: Send + 'static> BasePipe for MultiFileSource<T> {
    fn progress(&self) -> f64 {
        if self.files.is_empty() {
            return 1.0;
        }
        let files_done = self.current_index.saturating_sub(1) as f64;
        let current_fraction = self.current.as_ref().map(|c| c.progress()).unwrap_or(0.0);
        ((files_done + current_fraction) / self.files.len() as f64).clamp(0.0, 1.0)
    }

    fn close(&mut self) {
        if let Some(mut source) = self.current.take() {
            source.close();
        }
    }
}

impl<T: Send + 'static> SyncPipe for MultiFileSource<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        if self.files.is_empty() {
            self.progress.complete();
            return Ok(());
        }
        self.advance_to_next_file()?;
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        loop {
            match &mut self.current {
                None => {
                    self.progress.complete();
                    return Ok(None);
                }
                Some(source) => match source.next()? {
                    Some(item) => return Ok(Some(item)),
                    None => {
                        source.close();
                        self.current = None;
                        if !self.advance_to_next_file()? {
                            self.progress.complete();
                            return Ok(None);
                        }
                    }
                },
            }
        }
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        match &mut self.current {
            None => Ok(None),
            Some(source) => source.peek(),
        }
    }
}
