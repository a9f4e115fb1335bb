//! Resolves the remote file index into a year → archive filename map.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

/// Year → archive filename, built once per run.
pub type Index = BTreeMap<String, String>;

/// Fetches the index document and scans it for archive filenames.
pub async fn fetch_index(url: &str, pattern: &Regex) -> Result<Index> {
    let response = reqwest::get(url).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::IndexFetch(status));
    }

    let body = response.text().await?;

    Ok(parse_index(&body, pattern))
}

/// Extracts the year → filename map from an index document.
///
/// The archive filename is the pattern's first capture group, or the whole
/// match if the pattern has none. The year is the second `_`-separated
/// segment of the filename (`isd_1901_c20180826T025524.tar.gz` → `1901`);
/// filenames without one are skipped.
pub fn parse_index(body: &str, pattern: &Regex) -> Index {
    let mut index = Index::new();

    for caps in pattern.captures_iter(body) {
        let filename = match caps.get(1).or_else(|| caps.get(0)) {
            Some(m) => m.as_str(),
            None => continue,
        };

        match year_of(filename) {
            Some(year) => {
                index.insert(year.to_string(), filename.to_string());
            }
            None => debug!(filename, "no year segment in archive filename"),
        }
    }

    index
}

fn year_of(filename: &str) -> Option<&str> {
    filename.split('_').nth(1)
}

// -- Tests -------------------------------------------------------------------
