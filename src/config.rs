//! Immutable run configuration.
//!
//! Built once from the CLI at start-up and shared read-only by the master
//! and every worker. Defaults target the NOAA ISD global-hourly archive.

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context, Result};
use regex::Regex;

use crate::cli::Cli;

pub const DEFAULT_URL: &str = "https://www.ncei.noaa.gov/data/global-hourly/archive/isd/";
pub const DEFAULT_INDEX_REGEX: &str = r">(isd_\d{4}_c.*\.tar\.gz)<";
pub const DEFAULT_MEMBER_REGEX: &str = r"\d+-\d+-\d+";
pub const DEFAULT_RUN_TIME_MAX_SECS: u64 = 300;
pub const DEFAULT_WORKERS_COUNT: usize = 2;
pub const DEFAULT_POLLING_TIMEOUT_SECS: f64 = 2.0;
pub const DEFAULT_TERMINATE_TIMEOUT_SECS: f64 = 2.0;
pub const DEFAULT_YEARS: &str = "1901,1902";
pub const DEFAULT_TMP_DIR: &str = "/tmp/noaa_isd";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the archive index, normalized to one trailing `/`.
    pub url: String,
    /// Pattern locating archive filenames in the index document.
    pub index_regex: Regex,
    /// Pattern selecting which extracted members are aggregated.
    pub member_regex: Regex,
    pub run_time_max: Duration,
    pub workers_count: usize,
    pub polling_timeout: Duration,
    pub terminate_timeout: Duration,
    pub years: Vec<String>,
    /// Overwrite an existing aggregate instead of skipping the year.
    pub force: bool,
    /// Parent directory for per-year extraction directories.
    pub tmp_dir: PathBuf,
    /// Directory the aggregate artifacts are written into.
    pub out_dir: PathBuf,
    /// Write `<year>.gz` (gzip) instead of plaintext `<year>`.
    pub compress: bool,
}

impl TryFrom<Cli> for Config {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let index_regex = Regex::new(&cli.index_regex)
            .with_context(|| format!("invalid index regex `{}`", cli.index_regex))?;
        let member_regex = Regex::new(&cli.member_regex)
            .with_context(|| format!("invalid member regex `{}`", cli.member_regex))?;

        Ok(Config {
            url: normalize_url(&cli.url),
            index_regex,
            member_regex,
            run_time_max: Duration::from_secs(cli.run_time_max),
            workers_count: cli.workers_count,
            polling_timeout: Duration::from_secs_f64(cli.polling_timeout),
            terminate_timeout: Duration::from_secs_f64(cli.terminate_timeout),
            years: parse_years(&cli.years)?,
            force: cli.force,
            tmp_dir: cli.tmp_dir,
            out_dir: cli.out_dir,
            compress: cli.is_compress,
        })
    }
}

/// Ensures the base URL ends with exactly one `/` so filenames append cleanly.
pub fn normalize_url(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

/// Expands a year argument into a sorted list of year strings.
///
/// Accepts a single year (`1901`), a comma-separated list (`1901,1903`) or an
/// inclusive range (`1901-1930`). A comma takes precedence over a dash.
pub fn parse_years(input: &str) -> Result<Vec<String>> {
    let input = input.trim();

    if !input.contains(',') {
        if let Some((start, end)) = input.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .with_context(|| format!("invalid year range `{input}`"))?;
            let end: u32 = end
                .trim()
                .parse()
                .with_context(|| format!("invalid year range `{input}`"))?;
            ensure!(start <= end, "invalid year range `{input}`");

            return Ok((start..=end).map(|y| y.to_string()).collect());
        }
    }

    let mut years: Vec<String> = input
        .split(',')
        .map(|y| y.trim().to_string())
        .filter(|y| !y.is_empty())
        .collect();
    ensure!(!years.is_empty(), "no years given");
    years.sort();

    Ok(years)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_single_year() {
        assert_eq!(parse_years("1901").unwrap(), vec!["1901"]);
    }

    #[test]
    fn should_parse_year_list_sorted() {
        assert_eq!(
            parse_years("1903,1901,1902").unwrap(),
            vec!["1901", "1902", "1903"]
        );
    }

    #[test]
    fn should_expand_year_range() {
        assert_eq!(
            parse_years("1901-1903").unwrap(),
            vec!["1901", "1902", "1903"]
        );
    }

    #[test]
    fn should_reject_backwards_range() {
        assert!(parse_years("1903-1901").is_err());
    }

    #[test]
    fn should_normalize_trailing_slash() {
        assert_eq!(normalize_url("http://x/isd"), "http://x/isd/");
        assert_eq!(normalize_url("http://x/isd///"), "http://x/isd/");
        assert_eq!(normalize_url("http://x/isd/"), "http://x/isd/");
    }
}
