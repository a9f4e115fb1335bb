//! Fatal error taxonomy for a run.
//!
//! These are the conditions that abort the whole run. Per-archive download
//! failures are deliberately not here: a worker logs them and reports the
//! year as done (see `worker`).

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The index document fetch returned a non-success status.
    #[error("index fetch failed with status {0}")]
    IndexFetch(StatusCode),

    /// Transport-level failure while fetching the index document.
    #[error("index fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// None of the requested years exist in the resolved index.
    #[error("nothing to do: none of the requested years {0:?} are available")]
    NoWork(Vec<String>),

    /// Years were still pending when the run deadline expired.
    #[error("run deadline exceeded; still pending: {0:?}")]
    DeadlineExceeded(Vec<String>),

    /// A worker stopped running while work was still pending.
    #[error("worker {0} died while work was pending")]
    WorkerDied(usize),
}
