//! NOAA ISD global-hourly archive downloader and per-year aggregator.
//!
//! Resolves a remote file index into a year → archive filename map, hands
//! one job per requested year to a fixed pool of workers over a message
//! channel, and concatenates the station files of each archive into one
//! aggregate artifact per year (plaintext `<year>` or gzip `<year>.gz`).

pub mod cli;
pub mod config;
pub mod error;
pub mod index;
pub mod master;
pub mod worker;

use std::sync::Arc;

pub use config::Config;
pub use error::{Error, Result};
pub use master::Master;

/// Runs one whole batch: `start`, then unconditional best-effort `stop`.
pub async fn run(conf: Config) -> Result<()> {
    let mut master = Master::new(Arc::new(conf));

    let result = master.start().await;
    master.stop().await;

    result
}
