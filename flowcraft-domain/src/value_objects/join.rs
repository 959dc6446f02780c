// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Join records and join-mode selection, shared by the sorted and hash join
//! operators.

/// One key's worth of matched rows: the left-side items sharing `key`, and
/// for each right-side input, the items it contributed sharing `key`.
#[derive(Debug, Clone)]
pub struct JoinRecord<K, L, R> {
    pub key: K,
    pub left: Vec<L>,
    /// `right[i]` holds the items contributed by the i-th right-hand input.
    pub right: Vec<Vec<R>>,
}

impl<K, L, R> JoinRecord<K, L, R> {
    pub fn new(key: K, right_inputs: usize) -> Self {
        Self { key, left: Vec::new(), right: (0..right_inputs).map(|_| Vec::new()).collect() }
    }

    pub fn right_count_present(&self) -> usize {
        self.right.iter().filter(|r| !r.is_empty()).count()
    }
}

/// Which equivalence classes a join operator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinMode {
    /// Emit every left key, whether or not any right side matched.
    Left,
    /// Emit only keys present on the left and at least one right input.
    Inner,
    /// Emit only keys present on the left and *every* right input.
    FullInner,
    /// Emit every key seen on any side.
    Outer,
}

impl JoinMode {
    /// Decides emission given whether the left side matched and how many of
    /// the `right_total` right-hand inputs contributed.
    pub fn should_emit(&self, left_present: bool, right_matched: usize, right_total: usize) -> bool {
        match self {
            JoinMode::Left => left_present,
            JoinMode::Inner => left_present && right_matched > 0,
            JoinMode::FullInner => left_present && right_matched == right_total,
            JoinMode::Outer => true,
        }
    }
}
