// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Sorted join (`§4.7`): N-way join of one left input against one or more
//! right inputs, all pre-sorted by join key, via [`SortedMergeCore`]. Each
//! input is first mapped into a `(key, side)` pair so the merge core can
//! treat left and right rows uniformly; `next()` then regroups each
//! equivalence class into a [`JoinRecord`] and applies [`JoinMode`].

use flowcraft_domain::{BasePipe, JoinMode, JoinRecord, PipelineResult, SyncPipe};

use crate::infrastructure::aux::PeekBuffer;

use super::sorted_merge::SortedMergeCore;

/// Tags a row with which side of the join it came from; `Right` also
/// carries which right-hand input produced it (0-based among the right
/// inputs, not counting the left one).
#[derive(Clone)]
pub enum JoinSide<L, R> {
    Left(L),
    Right(usize, R),
}

type KeyedRow<K, L, R> = (K, JoinSide<L, R>);
type KeyComparator<K> = Box<dyn Fn(&K, &K) -> std::cmp::Ordering + Send>;

pub struct SortedJoin<K, L, R> {
    core: SortedMergeCore<KeyedRow<K, L, R>>,
    key_cmp: KeyComparator<K>,
    mode: JoinMode,
    right_total: usize,
    finished: bool,
    peeked: PeekBuffer<JoinRecord<K, L, R>>,
}

impl<K: Send + Clone, L: Send + Clone, R: Send + Clone> SortedJoin<K, L, R> {
    /// `left` and `right` must already be sorted by key ascending under
    /// `key_cmp`; `right.len()` right-hand inputs are joined against one
    /// left input.
    pub fn new(
        left: Box<dyn SyncPipe<Item = KeyedRow<K, L, R>>>,
        right: Vec<Box<dyn SyncPipe<Item = KeyedRow<K, L, R>>>>,
        key_cmp: KeyComparator<K>,
        mode: JoinMode,
    ) -> Self {
        let right_total = right.len();
        let mut inputs = vec![left];
        inputs.extend(right);
        Self { core: SortedMergeCore::new(inputs), key_cmp, mode, right_total, finished: false, peeked: PeekBuffer::new() }
    }
}

impl<K: Send + Clone, L: Send + Clone, R: Send + Clone> BasePipe for SortedJoin<K, L, R> {
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

impl<K: Send + Clone, L: Send + Clone, R: Send + Clone> SyncPipe for SortedJoin<K, L, R> {
    type Item = JoinRecord<K, L, R>;

    fn start(&mut self) -> PipelineResult<()> {
        self.core.start()
    }

    fn next(&mut self) -> PipelineResult<Option<JoinRecord<K, L, R>>> {
        let finished = &mut self.finished;
        let core = &mut self.core;
        let key_cmp = self.key_cmp.as_ref();
        let mode = self.mode;
        let right_total = self.right_total;
        self.peeked.next(|| pull_join_record(finished, core, key_cmp, mode, right_total))
    }

    fn peek(&mut self) -> PipelineResult<Option<&JoinRecord<K, L, R>>> {
        let finished = &mut self.finished;
        let core = &mut self.core;
        let key_cmp = self.key_cmp.as_ref();
        let mode = self.mode;
        let right_total = self.right_total;
        self.peeked.peek(|| pull_join_record(finished, core, key_cmp, mode, right_total))
    }
}

fn pull_join_record<K: Send + Clone, L: Send + Clone, R: Send + Clone>(
    finished: &mut bool,
    core: &mut SortedMergeCore<KeyedRow<K, L, R>>,
    key_cmp: &(dyn Fn(&K, &K) -> std::cmp::Ordering + Send),
    mode: JoinMode,
    right_total: usize,
) -> PipelineResult<Option<JoinRecord<K, L, R>>> {
    loop {
        if *finished {
            return Ok(None);
        }
        let row_cmp = |a: &KeyedRow<K, L, R>, b: &KeyedRow<K, L, R>| key_cmp(&a.0, &b.0);
        match core.next_round(&row_cmp)? {
            None => {
                *finished = true;
                return Ok(None);
            }
            Some(round) => {
                let key = round.items[0].0.clone();
                let mut record = JoinRecord::new(key, right_total);
                for (_, side) in round.items {
                    match side {
                        JoinSide::Left(l) => record.left.push(l),
                        JoinSide::Right(i, r) => record.right[i].push(r),
                    }
                }
                let left_present = !record.left.is_empty();
                let right_matched = record.right_count_present();
                if mode.should_emit(left_present, right_matched, right_total) {
                    return Ok(Some(record));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::sources::CollectionSource;

    fn left_rows(v: Vec<(i32, &'static str)>) -> Box<dyn SyncPipe<Item = KeyedRow<i32, &'static str, &'static str>>> {
        Box::new(CollectionSource::new(v.into_iter().map(|(k, l)| (k, JoinSide::Left(l))).collect()))
    }

    fn right_rows(idx: usize, v: Vec<(i32, &'static str)>) -> Box<dyn SyncPipe<Item = KeyedRow<i32, &'static str, &'static str>>> {
        Box::new(CollectionSource::new(v.into_iter().map(move |(k, r)| (k, JoinSide::Right(idx, r))).collect()))
    }

    #[test]
    fn inner_join_keeps_only_matched_keys() {
        let mut pipe = SortedJoin::new(
            left_rows(vec![(1, "a"), (2, "b"), (3, "c")]),
            vec![right_rows(0, vec![(2, "x"), (3, "y")])],
            Box::new(|a: &i32, b: &i32| a.cmp(b)),
            JoinMode::Inner,
        );
        pipe.start().unwrap();
        let mut keys = Vec::new();
        while let Some(record) = pipe.next().unwrap() {
            keys.push(record.key);
        }
        assert_eq!(keys, vec![2, 3]);
    }

    #[test]
    fn left_join_keeps_every_left_key() {
        let mut pipe = SortedJoin::new(
            left_rows(vec![(1, "a"), (2, "b")]),
            vec![right_rows(0, vec![(2, "x")])],
            Box::new(|a: &i32, b: &i32| a.cmp(b)),
            JoinMode::Left,
        );
        pipe.start().unwrap();
        let mut keys = Vec::new();
        while let Some(record) = pipe.next().unwrap() {
            keys.push(record.key);
        }
        assert_eq!(keys, vec![1, 2]);
    }

    #[test]
    fn peek_matches_next_without_consuming() {
        let mut pipe = SortedJoin::new(
            left_rows(vec![(1, "a"), (2, "b")]),
            vec![right_rows(0, vec![(2, "x")])],
            Box::new(|a: &i32, b: &i32| a.cmp(b)),
            JoinMode::Left,
        );
        pipe.start().unwrap();
        assert_eq!(pipe.peek().unwrap().map(|r| r.key), Some(1));
        assert_eq!(pipe.peek().unwrap().map(|r| r.key), Some(1));
        assert_eq!(pipe.next().unwrap().map(|r| r.key), Some(1));
        assert_eq!(pipe.peek().unwrap().map(|r| r.key), Some(2));
        assert_eq!(pipe.next().unwrap().map(|r| r.key), Some(2));
        assert_eq!(pipe.peek().unwrap().map(|r| r.key), None);
        assert_eq!(pipe.next().unwrap().map(|r| r.key), None);
    }
}
