// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bridges between the sync and async pipe families (`§4.12`).
//!
//! [`SyncToAsync`] drives a `SyncPipe` on a background thread and forwards
//! every item to a registered [`AsyncListener`]. [`AsyncToSync`] is the
//! inverse: it registers itself as the listener on an `AsyncPipe` and
//! funnels callbacks through a [`BlockingQueue`] so a pull-based caller can
//! `next()` it like any other `SyncPipe`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use flowcraft_domain::{AsyncListener, AsyncPipe, BasePipe, PipeState, PipelineError, PipelineResult, ProgressCell, SyncPipe};

use super::blocking_queue::{BlockingQueue, PopOutcome};

enum Envelope<T> {
    Item(T),
    Done,
    Error(PipelineError),
}

/// Runs a `SyncPipe` to completion on a background thread, pushing every
/// item (and the terminal done/error event) to whichever listener is
/// registered before `start()`.
pub struct SyncToAsync<T: Send + 'static> {
    input: Option<Box<dyn SyncPipe<Item = T>>>,
    listener: Option<Arc<dyn AsyncListener<T>>>,
    progress: Arc<ProgressCell>,
    state: Arc<PipeState>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl<T: Send + 'static> SyncToAsync<T> {
    pub fn new(input: Box<dyn SyncPipe<Item = T>>) -> Self {
        Self { input: Some(input), listener: None, progress: Arc::new(ProgressCell::new()), state: Arc::new(PipeState::new()), handle: None }
    }
}

impl<T: Send + 'static> BasePipe for SyncToAsync<T> {
    fn progress(&self) -> f64 {
        self.progress.get()
    }

    fn close(&mut self) {
        if self.state.close() {
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl<T: Send + 'static> AsyncPipe for SyncToAsync<T> {
    type Item = T;

    fn set_listener(&mut self, listener: Arc<dyn AsyncListener<T>>) {
        self.listener = Some(listener);
    }

    fn start(&mut self) -> PipelineResult<()> {
        self.state.start();
        let mut input = self.input.take().expect("start() called more than once");
        let listener = self.listener.clone().expect("set_listener must be called before start()");
        let progress = self.progress.clone();
        let state = self.state.clone();

        self.handle = Some(std::thread::spawn(move || {
            let outcome = (|| -> PipelineResult<()> {
                input.start()?;
                while !state.is_terminal() {
                    match input.next()? {
                        None => break,
                        Some(item) => {
                            progress.set(input.progress());
                            listener.on_next(item);
                        }
                    }
                }
                Ok(())
            })();
            input.close();
            match outcome {
                Ok(()) => {
                    progress.complete();
                    if state.finish(flowcraft_domain::LifecycleState::Done) {
                        listener.on_done();
                    }
                }
                Err(err) => {
                    if state.finish(flowcraft_domain::LifecycleState::Error) {
                        listener.on_error(err);
                    }
                }
            }
        }));
        Ok(())
    }
}

struct QueueListener<T> {
    queue: Arc<BlockingQueue<Envelope<T>>>,
}

impl<T: Send> AsyncListener<T> for QueueListener<T> {
    fn on_next(&self, item: T) {
        let _ = self.queue.push_blocking(Envelope::Item(item));
    }
    fn on_done(&self) {
        let _ = self.queue.push_blocking(Envelope::Done);
    }
    fn on_error(&self, err: PipelineError) {
        let _ = self.queue.push_blocking(Envelope::Error(err));
    }
}

/// Adapts an `AsyncPipe` into a `SyncPipe` by buffering its push-based
/// callbacks through a bounded queue that `next()` drains.
pub struct AsyncToSync<T: Send + 'static> {
    inner: Box<dyn AsyncPipe<Item = T>>,
    queue: Arc<BlockingQueue<Envelope<T>>>,
    done: AtomicBool,
    peeked: Mutex<Option<Option<T>>>,
}

impl<T: Send + 'static> AsyncToSync<T> {
    pub fn new(mut inner: Box<dyn AsyncPipe<Item = T>>, queue_capacity: usize) -> Self {
        let queue = Arc::new(BlockingQueue::new(queue_capacity));
        inner.set_listener(Arc::new(QueueListener { queue: queue.clone() }));
        Self { inner, queue, done: AtomicBool::new(false), peeked: Mutex::new(None) }
    }

    fn pull(&self) -> PipelineResult<Option<T>> {
        pull_envelope(&self.done, &self.queue)
    }
}

fn pull_envelope<T: Send>(done: &AtomicBool, queue: &BlockingQueue<Envelope<T>>) -> PipelineResult<Option<T>> {
    if done.load(Ordering::Acquire) {
        return Ok(None);
    }
    match queue.pop_blocking() {
        PopOutcome::Item(Envelope::Item(item)) => Ok(Some(item)),
        PopOutcome::Item(Envelope::Done) | PopOutcome::Closed => {
            done.store(true, Ordering::Release);
            Ok(None)
        }
        PopOutcome::Item(Envelope::Error(err)) => {
            done.store(true, Ordering::Release);
            Err(err)
        }
    }
}

impl<T: Send + 'static> BasePipe for AsyncToSync<T> {
    fn progress(&self) -> f64 {
        self.inner.progress()
    }

    fn close(&mut self) {
        self.queue.close();
        self.inner.close();
    }
}

impl<T: Send + 'static> SyncPipe for AsyncToSync<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.inner.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        if let Some(buffered) = self.peeked.get_mut().unwrap().take() {
            return Ok(buffered);
        }
        self.pull()
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        if self.peeked.get_mut().unwrap().is_none() {
            let item = pull_envelope(&self.done, &self.queue)?;
            *self.peeked.get_mut().unwrap() = Some(item);
        }
        Ok(self.peeked.get_mut().unwrap().as_ref().and_then(|o| o.as_ref()))
    }
}
