use anyhow::{Error, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use isd_fetch::{cli::Cli, run, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let conf = Config::try_from(cli)?;
    run(conf).await?;

    Ok(())
}
