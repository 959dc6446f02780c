// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Bootstrap-phase logging: a minimal trait so CLI parsing and validation
//! failures — which happen before `init_logging` installs the real
//! `tracing` subscriber — can still be reported consistently, and so tests
//! can assert on bootstrap messages without a subscriber in the loop.

pub trait BootstrapLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Routes through `tracing` under the `bootstrap` target.
pub struct ConsoleLogger {
    prefix: String,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::with_prefix("bootstrap")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapLogger for ConsoleLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "bootstrap", "[{}] {}", self.prefix, message);
    }
}

#[derive(Default)]
pub struct NoOpLogger;

impl BootstrapLogger for NoOpLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Level {
        Error,
        Warn,
        Info,
        Debug,
    }

    #[derive(Default)]
    struct CapturingLogger {
        messages: Mutex<Vec<(Level, String)>>,
    }

    impl BootstrapLogger for CapturingLogger {
        fn error(&self, message: &str) {
            self.messages.lock().unwrap().push((Level::Error, message.to_string()));
        }
        fn warn(&self, message: &str) {
            self.messages.lock().unwrap().push((Level::Warn, message.to_string()));
        }
        fn info(&self, message: &str) {
            self.messages.lock().unwrap().push((Level::Info, message.to_string()));
        }
        fn debug(&self, message: &str) {
            self.messages.lock().unwrap().push((Level::Debug, message.to_string()));
        }
    }

    #[test]
    fn noop_logger_discards_everything() {
        let logger = NoOpLogger;
        logger.error("e");
        logger.warn("w");
        logger.info("i");
        logger.debug("d");
    }

    #[test]
    fn capturing_logger_records_level_and_message() {
        let logger = Arc::new(CapturingLogger::default());
        logger.info("starting up");
        logger.error("spill directory unwritable");
        let messages = logger.messages.lock().unwrap();
        assert_eq!(messages[0], (Level::Info, "starting up".to_string()));
        assert_eq!(messages[1], (Level::Error, "spill directory unwritable".to_string()));
    }
}
