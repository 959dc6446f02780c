// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Async-native operators (`§4.12`): each wraps an upstream `AsyncPipe` by
//! registering itself as that pipe's listener, transforming callbacks, and
//! forwarding the result to its own registered listener. `§4.1`'s lifecycle
//! invariant (exactly one of `on_done`/`on_error`, no `on_next` after) is
//! preserved because these operators never originate terminal events of
//! their own — they only relay what the wrapped pipe reports.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flowcraft_domain::{AsyncListener, AsyncPipe, BasePipe, PipelineError, PipelineResult};

/// Applies `f` to every item a wrapped `AsyncPipe` produces.
pub struct AsyncMap<T: Send + 'static, O: Send + 'static> {
    input: Box<dyn AsyncPipe<Item = T>>,
    mapper: Option<Arc<dyn Fn(T) -> O + Send + Sync>>,
    listener: Option<Arc<dyn AsyncListener<O>>>,
}

impl<T: Send + 'static, O: Send + 'static> AsyncMap<T, O> {
    pub fn new(input: Box<dyn AsyncPipe<Item = T>>, f: impl Fn(T) -> O + Send + Sync + 'static) -> Self {
        Self { input, mapper: Some(Arc::new(f)), listener: None }
    }
}

impl<T: Send + 'static, O: Send + 'static> BasePipe for AsyncMap<T, O> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send + 'static, O: Send + 'static> AsyncPipe for AsyncMap<T, O> {
    type Item = O;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<O>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        let downstream = self.listener.clone().expect("set_listener must be called before start()");
        let f = self.mapper.take().expect("start() called more than once");
        self.input.set_listener(Arc::new(OwnedMapListener { downstream, f }));
        self.input.start()
    }
}

struct OwnedMapListener<T, O> {
    downstream: Arc<dyn AsyncListener<O>>,
    f: Arc<dyn Fn(T) -> O + Send + Sync>,
}

impl<T, O> AsyncListener<T> for OwnedMapListener<T, O> {
    fn on_next(&self, item: T) {
        self.downstream.on_next((self.f)(item));
    }
    fn on_done(&self) {
        self.downstream.on_done();
    }
    fn on_error(&self, err: PipelineError) {
        self.downstream.on_error(err);
    }
}

struct FilterListener<T> {
    downstream: Arc<dyn AsyncListener<T>>,
    predicate: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: Send> AsyncListener<T> for FilterListener<T> {
    fn on_next(&self, item: T) {
        if (self.predicate)(&item) {
            self.downstream.on_next(item);
        }
    }
    fn on_done(&self) {
        self.downstream.on_done();
    }
    fn on_error(&self, err: PipelineError) {
        self.downstream.on_error(err);
    }
}

/// Forwards only the items matching `predicate`.
pub struct AsyncFilter<T: Send + 'static> {
    input: Box<dyn AsyncPipe<Item = T>>,
    predicate: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
    listener: Option<Arc<dyn AsyncListener<T>>>,
}

impl<T: Send + 'static> AsyncFilter<T> {
    pub fn new(input: Box<dyn AsyncPipe<Item = T>>, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self { input, predicate: Some(Arc::new(predicate)), listener: None }
    }
}

impl<T: Send + 'static> BasePipe for AsyncFilter<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send + 'static> AsyncPipe for AsyncFilter<T> {
    type Item = T;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<T>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        let downstream = self.listener.clone().expect("set_listener must be called before start()");
        let predicate = self.predicate.take().expect("start() called more than once");
        self.input.set_listener(Arc::new(FilterListener { downstream, predicate }));
        self.input.start()
    }
}

struct TimeoutListener<T> {
    downstream: Arc<dyn AsyncListener<T>>,
    fired: Arc<AtomicBool>,
}

impl<T: Send> AsyncListener<T> for TimeoutListener<T> {
    fn on_next(&self, item: T) {
        if !self.fired.load(Ordering::Acquire) {
            self.downstream.on_next(item);
        }
    }
    fn on_done(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.downstream.on_done();
        }
    }
    fn on_error(&self, err: PipelineError) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(err);
        }
    }
}

/// Forwards a wrapped `AsyncPipe` unless `deadline` elapses first, in which
/// case it raises a timeout error instead. A watchdog thread and the
/// wrapped pipe's own terminal callback race to flip `fired`; whichever
/// wins the CAS is the one that gets to call the downstream listener, so
/// `on_done`/`on_error` still fires exactly once even under a race.
pub struct AsyncTimeout<T: Send + 'static> {
    input: Box<dyn AsyncPipe<Item = T>>,
    deadline: Duration,
    listener: Option<Arc<dyn AsyncListener<T>>>,
    watchdog: Arc<Mutex<Option<std::thread::JoinHandle<()>>>>,
}

impl<T: Send + 'static> AsyncTimeout<T> {
    pub fn new(input: Box<dyn AsyncPipe<Item = T>>, deadline: Duration) -> Self {
        Self { input, deadline, listener: None, watchdog: Arc::new(Mutex::new(None)) }
    }
}

impl<T: Send + 'static> BasePipe for AsyncTimeout<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
        if let Some(handle) = self.watchdog.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> AsyncPipe for AsyncTimeout<T> {
    type Item = T;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<T>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        let downstream = self.listener.clone().expect("set_listener must be called before start()");
        let fired = Arc::new(AtomicBool::new(false));

        self.input.set_listener(Arc::new(TimeoutListener { downstream: downstream.clone(), fired: fired.clone() }));

        let deadline = self.deadline;
        let watchdog_fired = fired.clone();
        let watchdog_downstream = downstream;
        let started_at = Instant::now();
        *self.watchdog.lock().unwrap() = Some(std::thread::spawn(move || {
            let remaining = deadline.saturating_sub(started_at.elapsed());
            std::thread::sleep(remaining);
            if !watchdog_fired.swap(true, Ordering::AcqRel) {
                watchdog_downstream.on_error(PipelineError::timeout(format!("no terminal event within {deadline:?}")));
            }
        }));

        self.input.start()
    }
}

struct HeadListener<T> {
    downstream: Arc<dyn AsyncListener<T>>,
    limit: u64,
    emitted: AtomicBool,
    count: Arc<std::sync::atomic::AtomicU64>,
}

impl<T: Send> AsyncListener<T> for HeadListener<T> {
    fn on_next(&self, item: T) {
        let seen = self.count.fetch_add(1, Ordering::AcqRel);
        if seen < self.limit {
            self.downstream.on_next(item);
            if seen + 1 == self.limit && !self.emitted.swap(true, Ordering::AcqRel) {
                self.downstream.on_done();
            }
        }
    }
    fn on_done(&self) {
        if !self.emitted.swap(true, Ordering::AcqRel) {
            self.downstream.on_done();
        }
    }
    fn on_error(&self, err: PipelineError) {
        if !self.emitted.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(err);
        }
    }
}

/// Forwards at most the first `limit` items, then reports done without
/// waiting for the wrapped pipe's own terminal callback. `on_next` and the
/// wrapped pipe's terminal callback can race on the same item count, so
/// `emitted` (a CAS, not a plain flag) guarantees `on_done`/`on_error` still
/// reaches `downstream` exactly once.
pub struct AsyncHead<T: Send + 'static> {
    input: Box<dyn AsyncPipe<Item = T>>,
    limit: u64,
    listener: Option<Arc<dyn AsyncListener<T>>>,
}

impl<T: Send + 'static> AsyncHead<T> {
    pub fn new(input: Box<dyn AsyncPipe<Item = T>>, limit: u64) -> Self {
        Self { input, limit, listener: None }
    }
}

impl<T: Send + 'static> BasePipe for AsyncHead<T> {
    fn progress(&self) -> f64 {
        self.input.progress()
    }
    fn close(&mut self) {
        self.input.close();
    }
}

impl<T: Send + 'static> AsyncPipe for AsyncHead<T> {
    type Item = T;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<T>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        let downstream = self.listener.clone().expect("set_listener must be called before start()");
        self.input.set_listener(Arc::new(HeadListener {
            downstream,
            limit: self.limit,
            emitted: AtomicBool::new(false),
            count: Arc::new(std::sync::atomic::AtomicU64::new(0)),
        }));
        self.input.start()
    }
}

struct UnionListener<T> {
    downstream: Arc<dyn AsyncListener<T>>,
    remaining: Arc<std::sync::atomic::AtomicUsize>,
    failed: Arc<AtomicBool>,
}

impl<T: Send> AsyncListener<T> for UnionListener<T> {
    fn on_next(&self, item: T) {
        if !self.failed.load(Ordering::Acquire) {
            self.downstream.on_next(item);
        }
    }
    fn on_done(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 && !self.failed.load(Ordering::Acquire) {
            self.downstream.on_done();
        }
    }
    fn on_error(&self, err: PipelineError) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            self.downstream.on_error(err);
        }
    }
}

/// Interleaves several async pipes of the same item type as their items
/// arrive, rather than draining them in order the way the sync `Concat`
/// does. `on_done` only reaches `downstream` once every input has reported
/// done; the first `on_error` from any input wins and suppresses the rest.
pub struct AsyncUnion<T: Send + 'static> {
    inputs: Vec<Box<dyn AsyncPipe<Item = T>>>,
    listener: Option<Arc<dyn AsyncListener<T>>>,
}

impl<T: Send + 'static> AsyncUnion<T> {
    pub fn new(inputs: Vec<Box<dyn AsyncPipe<Item = T>>>) -> Self {
        Self { inputs, listener: None }
    }
}

impl<T: Send + 'static> BasePipe for AsyncUnion<T> {
    fn progress(&self) -> f64 {
        if self.inputs.is_empty() {
            return 1.0;
        }
        self.inputs.iter().map(|p| p.progress()).sum::<f64>() / self.inputs.len() as f64
    }
    fn close(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
    }
}

impl<T: Send + 'static> AsyncPipe for AsyncUnion<T> {
    type Item = T;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<T>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        let downstream = self.listener.clone().expect("set_listener must be called before start()");
        if self.inputs.is_empty() {
            downstream.on_done();
            return Ok(());
        }
        let remaining = Arc::new(std::sync::atomic::AtomicUsize::new(self.inputs.len()));
        let failed = Arc::new(AtomicBool::new(false));
        for input in &mut self.inputs {
            input.set_listener(Arc::new(UnionListener { downstream: downstream.clone(), remaining: remaining.clone(), failed: failed.clone() }));
        }
        for input in &mut self.inputs {
            input.start()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::async_runtime::bridge::AsyncToSync;
    use crate::infrastructure::sources::CollectionSource;

    fn async_source(items: Vec<i32>) -> Box<dyn AsyncPipe<Item = i32>> {
        Box::new(crate::infrastructure::async_runtime::bridge::SyncToAsync::new(Box::new(CollectionSource::new(items))))
    }

    fn drain(pipe: Box<dyn AsyncPipe<Item = i32>>) -> Vec<i32> {
        let mut bridged = AsyncToSync::new(pipe, 8);
        bridged.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = bridged.next().unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn head_stops_after_limit() {
        let head = AsyncHead::new(async_source(vec![1, 2, 3, 4, 5]), 3);
        assert_eq!(drain(Box::new(head)), vec![1, 2, 3]);
    }

    #[test]
    fn head_with_limit_above_input_size_forwards_everything() {
        let head = AsyncHead::new(async_source(vec![1, 2]), 10);
        assert_eq!(drain(Box::new(head)), vec![1, 2]);
    }

    #[test]
    fn head_of_empty_input_forwards_nothing() {
        let head = AsyncHead::new(async_source(vec![]), 5);
        assert_eq!(drain(Box::new(head)), Vec::<i32>::new());
    }

    #[test]
    fn union_forwards_every_input_item() {
        let union = AsyncUnion::new(vec![async_source(vec![1, 2]), async_source(vec![3, 4])]);
        let mut items = drain(Box::new(union));
        items.sort();
        assert_eq!(items, vec![1, 2, 3, 4]);
    }

    #[test]
    fn union_of_no_inputs_completes_immediately() {
        let union: AsyncUnion<i32> = AsyncUnion::new(vec![]);
        assert_eq!(drain(Box::new(union)), Vec::<i32>::new());
    }
}
