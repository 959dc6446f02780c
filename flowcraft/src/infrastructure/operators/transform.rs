// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The single-input pass-through operator family: map, filter, head, skip,
//! sampler, callback, and progress. Each wraps one upstream `SyncPipe` and
//! forwards `progress`/`close` to it unless noted otherwise.

use flowcraft_domain::{BasePipe, PipelineResult, ProgressCell, SyncPipe};

/// Applies `f` to every item. Pure pass-through for progress.
pub struct Map<I, O, F: FnMut(I) -> O> {
    input: Box<dyn SyncPipe<Item = I>>,
    f: F,
    peeked: Option<Option<O>>,
}

impl<I, O, F: FnMut(I) -> O> Map<I, O, F> {
    pub fn new(input: Box<dyn SyncPipe<Item = I>>, f: F) -> Self {
        Self { input, f, peeked: None }
    }
}

impl<I: Send, O: Send, F: FnMut(I) -> O + Send> BasePipe for Map<I, O, F> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<I: Send, O: Send, F: FnMut(I) -> O + Send> SyncPipe for Map<I, O, F> {
    type Item = O;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<O>> {
        if let Some(buffered) = self.peeked.take() {
            return Ok(buffered);
        }
        Ok(self.input.next()?.map(&mut self.f))
    }

    fn peek(&mut self) -> PipelineResult<Option<&O>> {
        if self.peeked.is_none() {
            let next = self.next()?;
            self.peeked = Some(next);
        }
        Ok(self.peeked.as_ref().and_then(|o| o.as_ref()))
    }
}

/// Emits only items for which `predicate` returns `true`.
pub struct Filter<T, F: FnMut(&T) -> bool> {
    input: Box<dyn SyncPipe<Item = T>>,
    predicate: F,
    peeked: Option<Option<T>>,
}

impl<T, F: FnMut(&T) -> bool> Filter<T, F> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, predicate: F) -> Self {
        Self { input, predicate, peeked: None }
    }
}

impl<T: Send, F: FnMut(&T) -> bool + Send> BasePipe for Filter<T, F> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send, F: FnMut(&T) -> bool + Send> SyncPipe for Filter<T, F> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        if let Some(buffered) = self.peeked.take() {
            return Ok(buffered);
        }
        loop {
            match self.input.next()? {
                None => return Ok(None),
                Some(item) if (self.predicate)(&item) => return Ok(Some(item)),
                Some(_) => continue,
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

/// Emits at most the first `limit` items, then reports done and closes the
/// upstream proactively so producers don't keep working past what's needed.
pub struct Head<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    limit: u64,
    emitted: u64,
    progress: ProgressCell,
}

impl<T> Head<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, limit: u64) -> Self {
        Self { input, limit, emitted: 0, progress: ProgressCell::new() }
    }
}

impl<T: Send> BasePipe for Head<T> {
    fn progress(&self) -> f64 {
        self.progress.get()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send> SyncPipe for Head<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        if self.emitted >= self.limit {
            self.progress.complete();
            return Ok(None);
        }
        match self.input.next()? {
            None => {
                self.progress.complete();
                Ok(None)
            }
            Some(item) => {
                self.emitted += 1;
                self.progress.set(self.emitted as f64 / self.limit.max(1) as f64);
                if self.emitted >= self.limit {
                    self.input.close();
                }
                Ok(Some(item))
            }
        }
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        if self.emitted >= self.limit {
            Ok(None)
        } else {
            self.input.peek()
        }
    }
}

/// Drops the first `count` items, then forwards everything else untouched.
pub struct Skip<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    remaining: u64,
}

impl<T> Skip<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, count: u64) -> Self {
        Self { input, remaining: count }
    }
}

impl<T: Send> BasePipe for Skip<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send> SyncPipe for Skip<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        while self.remaining > 0 {
            if self.input.next()?.is_none() {
                return Ok(None);
            }
            self.remaining -= 1;
        }
        self.input.next()
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        if self.remaining == 0 {
            self.input.peek()
        } else {
            Ok(None)
        }
    }
}

/// Keeps roughly one in every `rate` items, deterministically by position.
pub struct Sampler<T> {
    input: Box<dyn SyncPipe<Item = T>>,
    rate: u64,
    position: u64,
    peeked: Option<Option<T>>,
}

impl<T> Sampler<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, rate: u64) -> Self {
        assert!(rate > 0, "sampler rate must be positive");
        Self { input, rate, position: 0, peeked: None }
    }
}

impl<T: Send> BasePipe for Sampler<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send> SyncPipe for Sampler<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        if let Some(buffered) = self.peeked.take() {
            return Ok(buffered);
        }
        loop {
            match self.input.next()? {
                None => return Ok(None),
                Some(item) => {
                    let keep = self.position % self.rate == 0;
                    self.position += 1;
                    if keep {
                        return Ok(Some(item));
                    }
                }
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

/// Invokes `on_item` for every item (for side effects such as metrics) and
/// `on_end` exactly once when the stream ends, without altering the stream.
pub struct Callback<T, F: FnMut(&T), E: FnMut()> {
    input: Box<dyn SyncPipe<Item = T>>,
    on_item: F,
    on_end: Option<E>,
}

impl<T, F: FnMut(&T), E: FnMut()> Callback<T, F, E> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>, on_item: F, on_end: E) -> Self {
        Self { input, on_item, on_end: Some(on_end) }
    }
}

impl<T: Send, F: FnMut(&T) + Send, E: FnMut() + Send> BasePipe for Callback<T, F, E> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send, F: FnMut(&T) + Send, E: FnMut() + Send> SyncPipe for Callback<T, F, E> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        match self.input.next()? {
            Some(item) => {
                (self.on_item)(&item);
                Ok(Some(item))
            }
            None => {
                if let Some(mut on_end) = self.on_end.take() {
                    on_end();
                }
                Ok(None)
            }
        }
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        self.input.peek()
    }
}

/// A pass-through operator whose only job is to sit at a strategic point in
/// the graph so `progress()` queries land somewhere other than the sink
/// (`§4.1`: "position progress pipes in strategic points").
pub struct ProgressPoint<T> {
    input: Box<dyn SyncPipe<Item = T>>,
}

impl<T> ProgressPoint<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>) -> Self {
        Self { input }
    }
}

impl<T: Send> BasePipe for ProgressPoint<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send> SyncPipe for ProgressPoint<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.input.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        self.input.next()
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        self.input.peek()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    #[test]
    fn map_transforms_every_item() {
        let mut pipe = Map::new(Box::new(CollectionSource::new(vec![1, 2, 3])), |x| x * 10);
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![10, 20, 30]);
    }

    #[test]
    fn map_peek_matches_the_next_mapped_item_without_consuming_it() {
        let mut pipe = Map::new(Box::new(CollectionSource::new(vec![1, 2])), |x| x * 10);
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&10));
        assert_eq!(pipe.peek().unwrap(), Some(&10));
        assert_eq!(pipe.next().unwrap(), Some(10));
        assert_eq!(pipe.peek().unwrap(), Some(&20));
        assert_eq!(pipe.next().unwrap(), Some(20));
        assert_eq!(pipe.peek().unwrap(), None);
        assert_eq!(pipe.next().unwrap(), None);
    }

    #[test]
    fn filter_keeps_matching_items() {
        let mut pipe = Filter::new(Box::new(CollectionSource::new(vec![1, 2, 3, 4, 5])), |x: &i32| x % 2 == 0);
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![2, 4]);
    }

    #[test]
    fn filter_peek_skips_ahead_to_the_next_match() {
        let mut pipe = Filter::new(Box::new(CollectionSource::new(vec![1, 3, 4, 5])), |x: &i32| x % 2 == 0);
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&4));
        assert_eq!(pipe.next().unwrap(), Some(4));
        assert_eq!(pipe.peek().unwrap(), None);
    }

    #[test]
    fn head_truncates() {
        let mut pipe = Head::new(Box::new(CollectionSource::new(vec![1, 2, 3, 4, 5])), 2);
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2]);
        assert_eq!(pipe.progress(), 1.0);
    }

    #[test]
    fn head_peek_reports_none_once_the_limit_is_reached() {
        let mut pipe = Head::new(Box::new(CollectionSource::new(vec![1, 2, 3])), 1);
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&1));
        assert_eq!(pipe.next().unwrap(), Some(1));
        assert_eq!(pipe.peek().unwrap(), None);
    }

    #[test]
    fn skip_drops_prefix() {
        let mut pipe = Skip::new(Box::new(CollectionSource::new(vec![1, 2, 3, 4])), 2);
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![3, 4]);
    }

    #[test]
    fn sampler_peek_matches_the_next_kept_item() {
        let mut pipe = Sampler::new(Box::new(CollectionSource::new(vec![1, 2, 3, 4, 5, 6])), 3);
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&1));
        assert_eq!(pipe.next().unwrap(), Some(1));
        assert_eq!(pipe.peek().unwrap(), Some(&4));
        assert_eq!(pipe.next().unwrap(), Some(4));
        assert_eq!(pipe.peek().unwrap(), None);
    }
}
