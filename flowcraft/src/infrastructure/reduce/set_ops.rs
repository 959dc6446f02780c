// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Sorted set operators (`§4.4`): union, intersection, and subtraction over
//! N sorted inputs, plus the duplicate-preserving sorted merge used by the
//! external sort's final combine phase. Each is a thin `SyncPipe` built on
//! [`SortedMergeCore`]; the only difference between them is which rounds
//! they forward and when they stop early.

use flowcraft_domain::{BasePipe, PipelineResult, SyncPipe};

use crate::infrastructure::aux::PeekBuffer;

use super::sorted_merge::{SetOpMode, SortedMergeCore};

type Comparator<T> = Box<dyn Fn(&T, &T) -> std::cmp::Ordering + Send>;

/// Streams one equivalence class at a time from N sorted inputs, keeping
/// every duplicate. Used as the final combine phase of an external sort
/// where runs must merge without losing repeated keys.
pub struct SortedMergeAll<T> {
    core: SortedMergeCore<T>,
    comparator: Comparator<T>,
    pending: std::collections::VecDeque<T>,
    peeked: PeekBuffer<T>,
}

impl<T: Send + Clone> SortedMergeAll<T> {
    pub fn new(inputs: Vec<Box<dyn SyncPipe<Item = T>>>, comparator: Comparator<T>) -> Self {
        Self { core: SortedMergeCore::new(inputs), comparator, pending: std::collections::VecDeque::new(), peeked: PeekBuffer::new() }
    }
}

impl<T: Send + Clone> BasePipe for SortedMergeAll<T> {
    fn progress(&self) -> f64 {
        self.core.progress()
    }
    fn close(&mut self) {
        self.core.close();
    }
}

impl<T: Send + Clone> SyncPipe for SortedMergeAll<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.core.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        let pending = &mut self.pending;
        let core = &mut self.core;
        let comparator = self.comparator.as_ref();
        self.peeked.next(|| pull_round(pending, core, comparator))
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        let pending = &mut self.pending;
        let core = &mut self.core;
        let comparator = self.comparator.as_ref();
        self.peeked.peek(|| pull_round(pending, core, comparator))
    }
}

fn pull_round<T: Send + Clone>(
    pending: &mut std::collections::VecDeque<T>,
    core: &mut SortedMergeCore<T>,
    comparator: &(dyn Fn(&T, &T) -> std::cmp::Ordering + Send),
) -> PipelineResult<Option<T>> {
    loop {
        if let Some(item) = pending.pop_front() {
            return Ok(Some(item));
        }
        match core.next_round(comparator)? {
            None => return Ok(None),
            Some(round) => pending.extend(round.items),
        }
    }
}

/// A sorted set operator (union/intersection/subtraction) over N sorted
/// inputs, emitting each distinct key at most once.
pub struct SortedSetOp<T> {
    core: SortedMergeCore<T>,
    comparator: Comparator<T>,
    mode: SetOpMode,
    finished: bool,
    peeked: PeekBuffer<T>,
}

impl<T: Send + Clone> SortedSetOp<T> {
    pub fn new(inputs: Vec<Box<dyn SyncPipe<Item = T>>>, comparator: Comparator<T>, mode: SetOpMode) -> Self {
        Self { core: SortedMergeCore::new(inputs), comparator, mode, finished: false, peeked: PeekBuffer::new() }
    }

    pub fn union(inputs: Vec<Box<dyn SyncPipe<Item = T>>>, comparator: Comparator<T>) -> Self {
        Self::new(inputs, comparator, SetOpMode::Union)
    }

    pub fn intersection_any(inputs: Vec<Box<dyn SyncPipe<Item = T>>>, comparator: Comparator<T>) -> Self {
        Self::new(inputs, comparator, SetOpMode::IntersectionAny)
    }

    pub fn intersection_full(inputs: Vec<Box<dyn SyncPipe<Item = T>>>, comparator: Comparator<T>) -> Self {
        Self::new(inputs, comparator, SetOpMode::IntersectionFull)
    }

    pub fn subtraction(left: Box<dyn SyncPipe<Item = T>>, right: Box<dyn SyncPipe<Item = T>>, comparator: Comparator<T>) -> Self {
        Self::new(vec![left, right], comparator, SetOpMode::Subtraction)
    }
}

impl<T: Send + Clone> BasePipe for SortedSetOp<T> {
    fn progress(&self) -> f64 {
        if self.finished {
            1.0
        } else {
            self.core.progress()
        }
    }
    fn close(&mut self) {
        self.core.close();
    }
}

impl<T: Send + Clone> SyncPipe for SortedSetOp<T> {
    type Item = T;

    fn start(&mut self) -> PipelineResult<()> {
        self.core.start()
    }

    fn next(&mut self) -> PipelineResult<Option<T>> {
        let finished = &mut self.finished;
        let core = &mut self.core;
        let comparator = self.comparator.as_ref();
        let mode = self.mode;
        self.peeked.next(|| pull_set_op_item(finished, core, comparator, mode))
    }

    fn peek(&mut self) -> PipelineResult<Option<&T>> {
        let finished = &mut self.finished;
        let core = &mut self.core;
        let comparator = self.comparator.as_ref();
        let mode = self.mode;
        self.peeked.peek(|| pull_set_op_item(finished, core, comparator, mode))
    }
}

fn pull_set_op_item<T: Send + Clone>(
    finished: &mut bool,
    core: &mut SortedMergeCore<T>,
    comparator: &(dyn Fn(&T, &T) -> std::cmp::Ordering + Send),
    mode: SetOpMode,
) -> PipelineResult<Option<T>> {
    loop {
        if *finished || mode.should_terminate_early(core.exhausted_flags()) {
            *finished = true;
            return Ok(None);
        }
        match core.next_round(comparator)? {
            None => {
                *finished = true;
                return Ok(None);
            }
            Some(round) => {
                if mode.should_emit(&round.contributors, core.input_count()) {
                    return Ok(Some(round.items[0].clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    fn cmp() -> Comparator<i32> {
        Box::new(|a: &i32, b: &i32| a.cmp(b))
    }

    fn src(v: Vec<i32>) -> Box<dyn SyncPipe<Item = i32>> {
        Box::new(CollectionSource::new(v))
    }

    #[test]
    fn union_pipe_dedupes() {
        let mut pipe = SortedSetOp::union(vec![src(vec![1, 2, 3]), src(vec![2, 3, 4])], cmp());
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 3, 4]);
        assert_eq!(pipe.progress(), 1.0);
    }

    #[test]
    fn subtraction_pipe_stops_early_once_left_drained() {
        let mut pipe = SortedSetOp::subtraction(src(vec![1, 3]), src(vec![2, 3, 4, 5, 6]), cmp());
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1]);
    }

    #[test]
    fn merge_all_preserves_duplicates() {
        let mut pipe = SortedMergeAll::new(vec![src(vec![1, 2, 2]), src(vec![2, 3])], cmp());
        pipe.start().unwrap();
        let mut out = Vec::new();
        while let Some(v) = pipe.next().unwrap() {
            out.push(v);
        }
        assert_eq!(out, vec![1, 2, 2, 2, 3]);
    }

    #[test]
    fn merge_all_peek_matches_next_without_consuming() {
        let mut pipe = SortedMergeAll::new(vec![src(vec![1, 2]), src(vec![2])], cmp());
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&1));
        assert_eq!(pipe.peek().unwrap(), Some(&1));
        assert_eq!(pipe.next().unwrap(), Some(1));
        assert_eq!(pipe.peek().unwrap(), Some(&2));
        assert_eq!(pipe.next().unwrap(), Some(2));
        assert_eq!(pipe.next().unwrap(), Some(2));
        assert_eq!(pipe.peek().unwrap(), None);
    }

    #[test]
    fn union_pipe_peek_matches_next_without_consuming() {
        let mut pipe = SortedSetOp::union(vec![src(vec![1, 2]), src(vec![2])], cmp());
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap(), Some(&1));
        assert_eq!(pipe.next().unwrap(), Some(1));
        assert_eq!(pipe.peek().unwrap(), Some(&2));
        assert_eq!(pipe.next().unwrap(), Some(2));
        assert_eq!(pipe.peek().unwrap(), None);
        assert_eq!(pipe.next().unwrap(), None);
    }
}
