// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! POSIX-style exit codes (`sysexits.h`), so a failed run tells shell
//! scripts something more specific than "1".

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    GeneralError = 1,
    /// EX_USAGE: bad CLI arguments.
    Usage = 64,
    /// EX_DATAERR: input data was invalid (e.g. a malformed pipeline config).
    DataError = 65,
    /// EX_NOINPUT: an input path could not be read.
    NoInput = 66,
    /// EX_IOERR: an I/O error occurred mid-run.
    IoError = 74,
    /// EX_TEMPFAIL: a transient failure (shuffle peer unreachable); retryable.
    TempFail = 75,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

pub fn map_error_to_exit_code(err: &flowcraft_domain::PipelineError) -> ExitCode {
    use flowcraft_domain::PipelineError;
    match err {
        PipelineError::Validation(_) | PipelineError::Ordering(_) => ExitCode::DataError,
        PipelineError::Io(_) => ExitCode::IoError,
        PipelineError::Timeout(_) | PipelineError::Resource(_) => ExitCode::TempFail,
        PipelineError::Cancelled(_) | PipelineError::Internal(_) => ExitCode::GeneralError,
    }
}

pub fn result_to_exit_code(result: Result<(), flowcraft_domain::PipelineError>) -> std::process::ExitCode {
    match result {
        Ok(()) => ExitCode::Ok.into(),
        Err(e) => {
            tracing::error!("{e}");
            map_error_to_exit_code(&e).into()
        }
    }
}
