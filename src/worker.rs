//! Worker task: turns one job at a time into a per-year aggregate file.

use std::{
    fs::{self, OpenOptions},
    io::{Cursor, Write},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use regex::Regex;
use tar::Archive;
use tokio::{
    sync::{mpsc, Mutex},
    time::timeout,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// One unit of work: aggregate this year's archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub year: String,
    pub filename: String,
}

/// How long a dequeue waits before re-checking for a termination request.
const JOB_POLL_TIMEOUT: Duration = Duration::from_secs(2);

pub struct Worker {
    number: usize,
    conf: Arc<Config>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    done: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        number: usize,
        conf: Arc<Config>,
        jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
        done: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Self {
        Worker {
            number,
            conf,
            jobs,
            done,
            cancel,
        }
    }

    /// Worker loop.
    ///
    /// Runs until the master cancels the token or closes the job channel.
    /// Termination requests are only observed between jobs, at the dequeue
    /// point. An unhandled job error ends the task, which the master's
    /// liveness check reports as a dead worker.
    pub async fn run(self) -> Result<()> {
        loop {
            let job = {
                let mut jobs = self.jobs.lock().await;
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(()),
                    dequeued = timeout(JOB_POLL_TIMEOUT, jobs.recv()) => match dequeued {
                        Ok(Some(job)) => job,
                        Ok(None) => return Ok(()),
                        Err(_) => continue,
                    },
                }
            };

            self.process(&job).await?;

            // Reported for every accepted job, even when the download failed
            // or the year was skipped.
            self.done
                .send(job.year)
                .context("completion channel closed")?;
        }
    }

    /// Processes one job: download, unpack, aggregate.
    ///
    /// A non-success archive status or an already-existing output finishes
    /// the job without producing new data; only I/O and extraction errors
    /// propagate.
    async fn process(&self, job: &Job) -> Result<()> {
        let conf = &self.conf;
        let url = format!("{}{}", conf.url, job.filename);

        info!(worker = self.number, %url, "fetching archive");

        let response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            warn!(
                worker = self.number,
                filename = job.filename.as_str(),
                status = %response.status(),
                "cannot download archive; marking the year as done"
            );
            return Ok(());
        }

        let result = output_path(&conf.out_dir, &job.year, conf.compress);

        if result.is_file() {
            if !conf.force {
                info!(
                    worker = self.number,
                    path = %result.display(),
                    "output already exists; skipping"
                );
                return Ok(());
            }

            info!(
                worker = self.number,
                path = %result.display(),
                "output already exists; removing"
            );
            fs::remove_file(&result)?;
        }

        let tmp = conf.tmp_dir.join(&job.year);
        fs::create_dir_all(&tmp)?;

        info!(
            worker = self.number,
            filename = job.filename.as_str(),
            tmp = %tmp.display(),
            "unpacking archive"
        );

        let body = response.bytes().await?;
        let members = unpack_archive(&body, &tmp)?;

        aggregate(&members, &conf.member_regex, &tmp, &result, conf.compress)?;

        Ok(())
    }
}

/// Returns `<out_dir>/<year>.gz` when compressing, `<out_dir>/<year>` otherwise.
pub fn output_path(out_dir: &Path, year: &str, compress: bool) -> PathBuf {
    if compress {
        out_dir.join(format!("{year}.gz"))
    } else {
        out_dir.join(year)
    }
}

/// True when `pattern` matches at the start of the member name.
pub fn is_member(name: &str, pattern: &Regex) -> bool {
    pattern.find(name).is_some_and(|m| m.start() == 0)
}

/// Unpacks every member of a gzip-compressed tar archive into `dest` and
/// returns the member names in archive listing order.
///
/// All members are extracted, not just the ones that will be aggregated.
pub fn unpack_archive(body: &[u8], dest: &Path) -> Result<Vec<String>> {
    let tar = GzDecoder::new(Cursor::new(body));
    let mut archive = Archive::new(tar);

    let mut members = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        members.push(entry.path()?.to_string_lossy().into_owned());
        entry.unpack_in(dest)?;
    }

    Ok(members)
}

/// Appends the raw bytes of every member matching `pattern`, in listing
/// order, onto `out` (a fresh gzip stream appended to the file when
/// `compress` is set).
pub fn aggregate(
    members: &[String],
    pattern: &Regex,
    tmp: &Path,
    out: &Path,
    compress: bool,
) -> Result<()> {
    let selected: Vec<&String> = members.iter().filter(|m| is_member(m, pattern)).collect();

    let file = OpenOptions::new().create(true).append(true).open(out)?;

    if compress {
        let mut sink = GzEncoder::new(file, Compression::default());
        append_members(&mut sink, &selected, tmp, out)?;
        sink.finish()?;
    } else {
        let mut sink = file;
        append_members(&mut sink, &selected, tmp, out)?;
    }

    Ok(())
}

fn append_members<W: Write>(sink: &mut W, members: &[&String], tmp: &Path, out: &Path) -> Result<()> {
    for member in members {
        info!(member = member.as_str(), out = %out.display(), "aggregating member");
        let data = fs::read(tmp.join(member))
            .with_context(|| format!("reading extracted member `{member}`"))?;
        sink.write_all(&data)?;
    }

    Ok(())
}

// -- Tests -------------------------------------------------------------------
