// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Security validation for CLI arguments: every path is canonicalized
//! before use (rejects traversal outside what the OS will actually open)
//! and every free-form string is checked against a small denylist of
//! shell/format-string metacharacters before it can reach a log line or a
//! spawned process.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),
    #[error("argument contains a disallowed character: {0:?}")]
    UnsafeArgument(String),
}

const DISALLOWED_CHARS: &[char] = &[';', '|', '&', '$', '`', '\n', '\r', '\0'];

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a path that must already exist: rejects disallowed
    /// characters, then canonicalizes so relative `..` segments resolve to
    /// their real location (or fail if that location doesn't exist).
    pub fn validate_path(raw: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(raw)?;
        let path = Path::new(raw);
        path.canonicalize().map_err(|_| ParseError::PathNotFound(path.to_path_buf()))
    }

    /// Validates a free-form argument (a path that may not exist yet, a
    /// pipeline name, ...) without requiring it to resolve on disk.
    pub fn validate_argument(raw: &str) -> Result<(), ParseError> {
        if raw.is_empty() {
            return Err(ParseError::UnsafeArgument(raw.to_string()));
        }
        if let Some(bad) = raw.chars().find(|c| DISALLOWED_CHARS.contains(c)) {
            return Err(ParseError::UnsafeArgument(format!("{raw} (disallowed character {bad:?})")));
        }
        Ok(())
    }
}
