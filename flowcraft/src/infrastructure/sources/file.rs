// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A single-file source: opens a stream under the given read options (with
//! compression auto-detected from the path suffix when requested) and
//! decodes it item-by-item through a supplied [`DecoderFactory`].

use flowcraft_domain::{BasePipe, Compression, Decoder, DecoderFactory, PipelineError, PipelineResult, ProgressCell, ReadOptions, SyncPipe};
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks bytes read through it so the owning source can compute progress
/// without the decoder trait needing to expose byte counts itself.
struct CountingReader<R> {
    inner: R,
    counter: Arc<AtomicU64>,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

pub struct FileSource<T> {
    path: PathBuf,
    options: ReadOptions,
    decoder_factory: Arc<dyn DecoderFactory<T>>,
    decoder: Option<Box<dyn Decoder<T>>>,
    total_bytes: u64,
    bytes_read: Arc<AtomicU64>,
    progress: ProgressCell,
    peeked: Option<Option<T>>,
}

impl<T: Send> FileSource<T> {
    pub fn new(path: impl Into<PathBuf>, mut options: ReadOptions, decoder_factory: Arc<dyn DecoderFactory<T>>) -> Self {
        let path = path.into();
        if options.compression == Compression::None {
            options.compression = Compression::detect(&path.to_string_lossy());
        }
        Self {
            path,
            options,
            decoder_factory,
            decoder: None,
            total_bytes: 0,
            bytes_read: Arc::new(AtomicU64::new(0)),
            progress: ProgressCell::new(),
            peeked: None,
        }
    }
}

impl<T: Send> BasePipe for FileSource<T> {
    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn close(&mut self) {
        self.decoder = None;
    }
}

impl<T: Send> SyncPipe for FileSource<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        let file = std::fs::File::open(&self.path)
            .map_err(|e| PipelineError::io(format!("opening {}: {e}", self.path.display())))?;
        self.total_bytes = file.metadata().map(|m| m.len()).unwrap_or(0);
        let counting = CountingReader { inner: file, counter: self.bytes_read.clone() };
        self.decoder = Some(self.decoder_factory.open(Box::new(counting), &self.options)?);
        Ok(())
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        if let Some(buffered) = self.peeked.take() {
            return Ok(buffered);
        }
        match self.decoder.as_mut() {
            None => Ok(None),
            Some(decoder) => {
                let item = decoder.decode_next()?;
                if item.is_none() {
                    self.progress.complete();
                } else if self.total_bytes > 0 {
                    let read = self.bytes_read.load(Ordering::Relaxed);
                    self.progress.set(read as f64 / self.total_bytes as f64);
                }
                Ok(item)
            }
        }
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        if self.peeked.is_none() {
            let next = self.next()?;
            self.peeked = Some(next);
        }
        Ok(self.peeked.as_ref().and_then(|o| o.as_ref()))
    }
}
