// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Small helpers for enumerating files under one or more roots, shared by
//! the multi-file source and terminal sharders.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Walks `root`, optionally recursively, returning `(path, size_bytes)` for
/// every regular file. Symlinks are not followed.
pub fn list_files(root: &Path, recursive: bool) -> std::io::Result<Vec<(PathBuf, u64)>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if recursive {
                    stack.push(entry.path());
                }
                continue;
            }
            if file_type.is_file() {
                let size = entry.metadata()?.len();
                out.push((entry.path(), size));
            }
        }
    }
    Ok(out)
}

/// Merges files discovered under multiple roots, deduplicating by file name
/// (last root wins) and returning them in canonical (lexicographic path)
/// order.
pub fn dedup_by_filename(files: Vec<(PathBuf, u64)>) -> Vec<(PathBuf, u64)> {
    let mut by_name: BTreeMap<String, (PathBuf, u64)> = BTreeMap::new();
    for (path, size) in files {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        by_name.insert(name, (path, size));
    }
    let mut out: Vec<(PathBuf, u64)> = by_name.into_values().collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedups_keeping_canonical_order() {
        let files = vec![
            (PathBuf::from("/a/c.txt"), 1),
            (PathBuf::from("/b/a.txt"), 2),
            (PathBuf::from("/a/a.txt"), 3), // same filename as above, later root wins
        ];
        let deduped = dedup_by_filename(files);
        let names: Vec<_> = deduped.iter().map(|(p, _)| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["a.txt", "c.txt"]);
        assert_eq!(deduped[0].1, 3);
    }
}
