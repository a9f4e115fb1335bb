//! Shared fixtures: in-memory gzip-tar archives, index pages and configs.

use std::{path::Path, time::Duration};

use flate2::{write::GzEncoder, Compression};
use regex::Regex;

use isd_fetch::{config, Config};

/// Builds a gzip-compressed tar archive holding the given members, in order.
pub fn archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, *data).unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap()
}

/// Renders a minimal index listing page linking the given archive filenames.
pub fn index_page(filenames: &[&str]) -> String {
    let rows: Vec<String> = filenames
        .iter()
        .map(|f| format!(r#"<tr><td><a href="{f}">{f}</a></td></tr>"#))
        .collect();

    format!(
        "<html><body><table>{}</table></body></html>",
        rows.join("\n")
    )
}

/// A config with test-friendly timings, pointed at a mock server.
pub fn test_config(server_uri: &str, years: &[&str], tmp_dir: &Path, out_dir: &Path) -> Config {
    Config {
        url: format!("{}/", server_uri.trim_end_matches('/')),
        index_regex: Regex::new(config::DEFAULT_INDEX_REGEX).unwrap(),
        member_regex: Regex::new(config::DEFAULT_MEMBER_REGEX).unwrap(),
        run_time_max: Duration::from_secs(10),
        workers_count: 2,
        polling_timeout: Duration::from_millis(50),
        terminate_timeout: Duration::from_millis(50),
        years: years.iter().map(|y| y.to_string()).collect(),
        force: false,
        tmp_dir: tmp_dir.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        compress: false,
    }
}
