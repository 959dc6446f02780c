// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Leaf source pipes: in-memory collections/generators and file/multi-file
//! readers (`§4.2`).

pub mod collection;
pub mod file;
pub mod multi_file;

pub use collection::{CollectionSource, GeneratorSource};
pub use file::FileSource;
pub use multi_file::{MultiFileSource, MultiFileSourceBuilder, ShardingDiscipline};
