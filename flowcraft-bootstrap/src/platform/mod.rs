// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! OS abstraction the engine's worker-sizing and spill-directory logic
//! queries at startup (default CPU parallelism, temp-dir location,
//! page-aligned buffer sizing) without scattering `#[cfg(unix)]` through
//! the infrastructure layer.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not supported on this platform: {0}")]
    NotSupported(String),
    #[error("platform error: {0}")]
    Other(String),
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Memory page size, for aligning spill-file read buffers.
    fn page_size(&self) -> usize;

    /// Logical CPU count, the default worker-pool size for
    /// `run_parallel`/hash-reductor partition counts when the caller
    /// doesn't override it.
    fn cpu_count(&self) -> usize;

    fn platform_name(&self) -> &'static str;

    /// Default root for spill files and shuffle scratch space.
    fn temp_dir(&self) -> PathBuf;

    fn is_elevated(&self) -> bool;

    async fn sync_file(&self, file: &tokio::fs::File) -> Result<(), PlatformError>;
}

#[cfg(unix)]
type PlatformImpl = UnixPlatform;
#[cfg(windows)]
type PlatformImpl = WindowsPlatform;

pub fn create_platform() -> Box<dyn Platform> {
    Box::new(PlatformImpl::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_platform_reports_plausible_values() {
        let platform = create_platform();
        assert!(platform.cpu_count() >= 1);
        assert!(platform.page_size() >= 512);
        assert!(!platform.platform_name().is_empty());
        assert!(!platform.temp_dir().as_os_str().is_empty());
    }
}
