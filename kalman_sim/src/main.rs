// kalman_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use kalman_sim::cli::Cli;
use kalman_sim::logging::init_logging;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match kalman_sim::run_from_cli(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
