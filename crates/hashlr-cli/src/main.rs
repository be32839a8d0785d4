//! hashlr CLI - train, score and evaluate hashed logistic-regression click models.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hashlr_cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("hashlr=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("hashlr CLI starting...");
    hashlr_cli::run(cli)?;
    info!("hashlr CLI completed successfully");
    Ok(())
}
