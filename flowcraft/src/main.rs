// /////////////////////////////////////////////////////////////////////////////
// Flowcraft
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use flowcraft_bootstrap::logger::{BootstrapLogger, ConsoleLogger};

fn main() -> std::process::ExitCode {
    // No `tracing` subscriber exists yet at this point, so a bad argument
    // list is reported directly rather than through the bootstrap logger.
    let cli = match flowcraft_bootstrap::bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return flowcraft_bootstrap::ExitCode::Usage.into();
        }
    };

    flowcraft_bootstrap::init_logging(cli.verbose);

    let bootstrap_logger = ConsoleLogger::default();
    bootstrap_logger.info("flowcraft starting up");

    let coordinator = flowcraft_bootstrap::ShutdownCoordinator::default();
    flowcraft_bootstrap::signals::install(&coordinator);

    let result = flowcraft::presentation::dispatch(cli.command, coordinator.token());
    if result.is_err() {
        bootstrap_logger.warn("dispatch returned an error, see above for detail");
    }
    flowcraft_bootstrap::result_to_exit_code(result)
}
