// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The unified multi-way sorted-merge state machine (`§4.4`) that drives
//! merge, union, intersection, subtraction, and sorted-join. All of these
//! are instances of one engine, pulled one equivalence class at a time so
//! that none of them need to buffer more than one round of input in memory.
//!
//! Every round: read the current head of each non-exhausted input, find the
//! minimal head under `comparator`, gather every head equal to it under the
//! same comparator (co-equal heads are consumed together — this is what
//! folds duplicates across inputs for the set operators), return the
//! equivalence class plus the "which inputs contributed" bitset, and
//! advance the contributors so the next call starts from fresh heads.
//!
//! `comparator` must be consistent with equality: `cmp(a, b) == Equal` must
//! imply the caller treats `a` and `b` as the same key. An input that
//! produces a head less than what it produced last time violates
//! sortedness and raises [`PipelineError::ordering`].
//!
//! Fan-in is resolved by a linear scan over current heads rather than a
//! binary heap: with a dynamic, caller-supplied comparator a heap needs
//! either per-call-site `Ord` boilerplate or an `Rc<dyn Fn>` carried in
//! every heap entry, and merge fan-in in this engine's use (external-sort
//! chunk counts, join input counts) is small enough that `O(inputs)` per
//! round costs nothing in practice.

use flowcraft_domain::{PipelineError, PipelineResult, SyncPipe};

/// One equivalence class pulled from the merge: the co-equal items and
/// which input indices contributed one each (input `0` is always the
/// left/first input for join and set-op purposes).
pub struct MergeRound<T> {
    pub items: Vec<T>,
    pub contributors: Vec<usize>,
}

/// Drives N sorted inputs through the merge state machine one equivalence
/// class at a time.
pub struct SortedMergeCore<T> {
    inputs: Vec<Box<dyn SyncPipe<Item = T>>>,
    heads: Vec<Option<T>>,
    last_emitted: Vec<Option<T>>,
    exhausted: Vec<bool>,
    primed: bool,
}

impl<T: Send + Clone> SortedMergeCore<T> {
    pub fn new(inputs: Vec<Box<dyn SyncPipe<Item = T>>>) -> Self {
        let n = inputs.len();
        Self {
            inputs,
            heads: vec![None; n],
            last_emitted: vec![None; n],
            exhausted: vec![false; n],
            primed: false,
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn start(&mut self) -> PipelineResult<()> {
        for input in &mut self.inputs {
            input.start()?;
        }
        Ok(())
    }

    pub fn progress(&self) -> f64 {
        if self.inputs.is_empty() {
            return 1.0;
        }
        self.inputs.iter().map(|p| p.progress()).fold(f64::INFINITY, f64::min).min(1.0)
    }

    pub fn close(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
    }

    /// `true` once every input has reported end of stream.
    pub fn all_exhausted(&self) -> bool {
        self.exhausted.iter().all(|&e| e)
    }

    pub fn exhausted_flags(&self) -> &[bool] {
        &self.exhausted
    }

    /// Returns the next equivalence class, or `None` once every input is
    /// drained.
    pub fn next_round(&mut self, comparator: &(impl Fn(&T, &T) -> std::cmp::Ordering + ?Sized)) -> PipelineResult<Option<MergeRound<T>>> {
        if !self.primed {
            for i in 0..self.inputs.len() {
                self.heads[i] = self.pull_next(i, comparator)?;
            }
            self.primed = true;
        }

        let min_idx = self
            .heads
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_some())
            .min_by(|(_, a), (_, b)| comparator(a.as_ref().unwrap(), b.as_ref().unwrap()))
            .map(|(i, _)| i);

        let Some(min_idx) = min_idx else {
            return Ok(None);
        };
        let min_value = self.heads[min_idx].clone().unwrap();

        let mut items = Vec::new();
        let mut contributors = Vec::new();
        for i in 0..self.inputs.len() {
            if let Some(head) = &self.heads[i] {
                if comparator(head, &min_value) == std::cmp::Ordering::Equal {
                    items.push(head.clone());
                    contributors.push(i);
                }
            }
        }

        for &i in &contributors {
            self.heads[i] = self.pull_next(i, comparator)?;
        }

        Ok(Some(MergeRound { items, contributors }))
    }

    fn pull_next(&mut self, i: usize, comparator: &(impl Fn(&T, &T) -> std::cmp::Ordering + ?Sized)) -> PipelineResult<Option<T>> {
        if self.exhausted[i] {
            return Ok(None);
        }
        match self.inputs[i].next()? {
            None => {
                self.exhausted[i] = true;
                Ok(None)
            }
            Some(item) => {
                if let Some(prev) = &self.last_emitted[i] {
                    if comparator(prev, &item) == std::cmp::Ordering::Greater {
                        return Err(PipelineError::ordering(format!(
                            "input {i} produced an out-of-order item: sortedness violated"
                        )));
                    }
                }
                self.last_emitted[i] = Some(item.clone());
                Ok(Some(item))
            }
        }
    }
}

/// Which classes of co-equal items a set operator emits (`§4.4`). `0` is
/// always the left/first input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpMode {
    Union,
    /// Emit iff the left input and at least one other input contributed.
    IntersectionAny,
    /// Emit iff the left input and *every* other input contributed.
    IntersectionFull,
    /// Emit iff the left input contributed and the right input (index 1)
    /// did not.
    Subtraction,
}

impl SetOpMode {
    pub fn should_emit(&self, contributors: &[usize], total_inputs: usize) -> bool {
        let left = contributors.contains(&0);
        match self {
            SetOpMode::Union => true,
            SetOpMode::IntersectionAny => left && contributors.iter().any(|&i| i != 0),
            SetOpMode::IntersectionFull => left && contributors.len() == total_inputs,
            SetOpMode::Subtraction => left && !contributors.contains(&1),
        }
    }

    /// Whether the merge can stop early given the current per-input
    /// exhaustion flags, without waiting for every input to drain.
    pub fn should_terminate_early(&self, exhausted: &[bool]) -> bool {
        match self {
            SetOpMode::Union => false,
            SetOpMode::IntersectionAny | SetOpMode::IntersectionFull => exhausted.iter().any(|&e| e),
            SetOpMode::Subtraction => exhausted.first().copied().unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    fn cmp_i32(a: &i32, b: &i32) -> std::cmp::Ordering {
        a.cmp(b)
    }

    fn run_set_op(a: Vec<i32>, b: Vec<i32>, mode: SetOpMode) -> PipelineResult<Vec<i32>> {
        let mut core = SortedMergeCore::new(vec![
            Box::new(CollectionSource::new(a)) as Box<dyn SyncPipe<Item = i32>>,
            Box::new(CollectionSource::new(b)),
        ]);
        core.start()?;
        let mut out = Vec::new();
        while !mode.should_terminate_early(core.exhausted_flags()) {
            match core.next_round(&cmp_i32)? {
                None => break,
                Some(round) => {
                    if mode.should_emit(&round.contributors, core.input_count()) {
                        out.push(round.items[0]);
                    }
                }
            }
        }
        Ok(out)
    }

    #[test]
    fn union_dedupes_across_inputs() {
        assert_eq!(run_set_op(vec![1, 2, 3], vec![2, 3, 4], SetOpMode::Union).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn intersection_any_keeps_common_items() {
        assert_eq!(run_set_op(vec![1, 2, 3], vec![2, 3, 4], SetOpMode::IntersectionAny).unwrap(), vec![2, 3]);
    }

    #[test]
    fn subtraction_removes_right_side() {
        assert_eq!(run_set_op(vec![1, 2, 2, 3, 5], vec![2, 5], SetOpMode::Subtraction).unwrap(), vec![1, 3]);
    }

    #[test]
    fn intersect_with_self_is_dedup() {
        assert_eq!(
            run_set_op(vec![1, 1, 2, 3, 3, 3], vec![1, 1, 2, 3, 3, 3], SetOpMode::IntersectionAny).unwrap(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn subtract_from_self_is_empty() {
        assert!(run_set_op(vec![1, 2, 3], vec![1, 2, 3], SetOpMode::Subtraction).unwrap().is_empty());
    }

    #[test]
    fn ordering_violation_is_detected() {
        let mut core = SortedMergeCore::new(vec![
            Box::new(CollectionSource::new(vec![2, 1, 3])) as Box<dyn SyncPipe<Item = i32>>,
        ]);
        core.start().unwrap();
        let mut result = Ok(None);
        while let Ok(Some(_)) = &result {
            result = core.next_round(&cmp_i32);
        }
        assert!(result.is_err());
    }
}
