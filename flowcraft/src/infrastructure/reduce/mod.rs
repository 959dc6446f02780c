// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Sort, reduce, and join core (`§4.4`-`§4.7`): the sorted multi-way merge
//! engine and everything built on it (set operators, sorted join), external
//! sort with spill, hash-based reduction with partitioned spill (and its
//! grouping/dedup specializations), hash join, and top-K.

pub mod grouper;
pub mod hash_join;
pub mod hash_reductor;
pub mod set_ops;
pub mod sort;
pub mod sorted_join;
pub mod sorted_merge;
pub mod top_k;

pub use grouper::{dedup_by, group_by};
pub use hash_join::HashJoin;
pub use hash_reductor::HashReductor;
pub use set_ops::{SortedMergeAll, SortedSetOp};
pub use sort::ExternalSort;
pub use sorted_join::{JoinSide, SortedJoin};
pub use sorted_merge::{MergeRound, SetOpMode, SortedMergeCore};
pub use top_k::TopK;
