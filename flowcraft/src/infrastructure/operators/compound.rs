// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A compound pipe wraps an internally-assembled sub-graph behind one
//! `SyncPipe` facade. Operators like the hash-join (partition, then join per
//! partition, then concat the results) are built this way: the caller only
//! ever sees the outer `CompoundPipe`, never the sub-graph's wiring.

use flowcraft_domain::{BasePipe, PipelineResult, SyncPipe};

pub struct CompoundPipe<T> {
    inner: Box<dyn SyncPipe<Item = T>>,
}

impl<T> CompoundPipe<T> {
    pub fn new(inner: Box<dyn SyncPipe<Item = T>>) -> Self {
        Self { inner }
    }
}

impl<T: Send> BasePipe for CompoundPipe<T> {
    fn progress(&self) -> f64 {
        self.inner.progress()
    }
    fn close(&mut self) {
        self.inner.close();
    }
}

impl<T: Send> SyncPipe for CompoundPipe<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.inner.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        self.inner.next()
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        self.inner.peek()
    }
}
