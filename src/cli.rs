//! Command line interface.

use std::path::PathBuf;

use clap::{command, Parser};

use crate::config;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the archive index
    #[arg(long, default_value = config::DEFAULT_URL)]
    pub url: String,

    /// Pattern matching archive filenames in the index document
    #[arg(long, default_value = config::DEFAULT_INDEX_REGEX)]
    pub index_regex: String,

    /// Pattern selecting which extracted member files are aggregated
    #[arg(long, default_value = config::DEFAULT_MEMBER_REGEX)]
    pub member_regex: String,

    /// Overall run deadline, in seconds
    #[arg(long, default_value_t = config::DEFAULT_RUN_TIME_MAX_SECS)]
    pub run_time_max: u64,

    /// Number of worker tasks
    #[arg(long, default_value_t = config::DEFAULT_WORKERS_COUNT)]
    pub workers_count: usize,

    /// Completion poll interval, in seconds
    #[arg(long, default_value_t = config::DEFAULT_POLLING_TIMEOUT_SECS)]
    pub polling_timeout: f64,

    /// Grace period between terminate and kill at shutdown, in seconds
    #[arg(long, default_value_t = config::DEFAULT_TERMINATE_TIMEOUT_SECS)]
    pub terminate_timeout: f64,

    /// For example: --years 1901; --years 1901,1902; --years 1901-1930
    #[arg(long, default_value = config::DEFAULT_YEARS)]
    pub years: String,

    /// Force overwrite files if they already exist
    #[arg(long)]
    pub force: bool,

    /// Directory for dumping temporary data (tarball extraction)
    #[arg(long, default_value = config::DEFAULT_TMP_DIR)]
    pub tmp_dir: PathBuf,

    /// Directory the per-year aggregates are written into
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// If set, the result is gzipped into "<year>.gz" instead of plaintext "<year>"
    #[arg(long)]
    pub is_compress: bool,
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_defaults() {
        let cli = Cli::parse_from(["isd-fetch"]);

        assert_eq!(cli.url, config::DEFAULT_URL);
        assert_eq!(cli.workers_count, config::DEFAULT_WORKERS_COUNT);
        assert_eq!(cli.years, "1901,1902");
        assert!(!cli.force);
        assert!(!cli.is_compress);
    }

    #[test]
    fn should_parse_flags_and_overrides() {
        let cli = Cli::parse_from([
            "isd-fetch",
            "--years",
            "1901-1910",
            "--workers-count",
            "4",
            "--force",
            "--is-compress",
        ]);

        assert_eq!(cli.years, "1901-1910");
        assert_eq!(cli.workers_count, 4);
        assert!(cli.force);
        assert!(cli.is_compress);
    }
}
