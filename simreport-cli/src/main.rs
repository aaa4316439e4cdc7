//! ## simreport
//! Drives the reporting client from the command line.
//!
//! - `simreport demo` runs a synthetic simulation through a session built
//!   from configuration.
//! - `simreport listen` accepts collector connections and prints every
//!   record it decodes.

use clap::Parser;
use simreport_telemetry::ReportLogger;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ReportLogger::init();
    let cli = Cli::parse();
    commands::run_command(cli).await
}
