use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::counts::PartialCountMap;
use crate::error::{Error, Result, WorkerStatus};
use crate::plan::FileRange;
use crate::scan::RangeScanner;
use crate::spill;

/// How a unit hands its tally back to the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Handoff {
    /// Returned through the join.
    #[default]
    InMemory,
    /// Persisted as `partial_<index>` inside a run-private directory created
    /// under the given path, read back after the barrier, then deleted.
    Spill(PathBuf),
}

enum Handed {
    Counts(PartialCountMap),
    Spilled(PathBuf),
}

/// Scan every range on its own thread and collect the partial tallies.
///
/// Waits for all units before looking at any result. If a unit fails, the
/// whole run fails with the lowest failing index, and nothing scanned by the
/// other units is returned.
pub fn scan_all<S: RangeScanner>(
    scanner: &S,
    ranges: &[FileRange],
    handoff: &Handoff,
) -> Result<Vec<PartialCountMap>> {
    if ranges.is_empty() {
        return Ok(Vec::new());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("hitcount-worker-{i}"))
        .build()
        .map_err(|e| Error::Config(format!("failed to start worker pool: {e}")))?;

    let run_dir = match handoff {
        Handoff::InMemory => None,
        Handoff::Spill(dir) => Some(
            tempfile::Builder::new()
                .prefix("hitcount-partials-")
                .tempdir_in(dir)
                .map_err(|e| Error::io(dir, e))?,
        ),
    };
    let spill_dir = run_dir.as_ref().map(|d| d.path());

    let outcomes: Vec<(usize, std::result::Result<Handed, WorkerStatus>)> = pool.install(|| {
        ranges
            .par_iter()
            .map(|range| (range.index, run_unit(scanner, range, spill_dir)))
            .collect()
    });

    let mut handed = Vec::with_capacity(outcomes.len());
    let mut failure = None;
    for (index, outcome) in outcomes {
        match outcome {
            Ok(h) => handed.push(h),
            Err(status) => {
                warn!(worker = index, status = ?status, "worker exited abnormally");
                failure.get_or_insert(Error::WorkerFailure { index, status });
            }
        }
    }

    if let Some(err) = failure {
        if let Some(dir) = run_dir {
            for range in ranges {
                remove_artifact(&spill::artifact_path(dir.path(), range.index));
            }
            if let Err(e) = dir.close() {
                warn!(error = %e, "failed to remove partial-count directory");
            }
        }
        return Err(err);
    }

    let mut partials = Vec::with_capacity(handed.len());
    for h in handed {
        match h {
            Handed::Counts(counts) => partials.push(counts),
            Handed::Spilled(path) => {
                let counts = spill::read_partial(&path).map_err(|e| Error::io(&path, e))?;
                remove_artifact(&path);
                partials.push(counts);
            }
        }
    }
    Ok(partials)
}

fn run_unit<S: RangeScanner>(
    scanner: &S,
    range: &FileRange,
    spill_dir: Option<&Path>,
) -> std::result::Result<Handed, WorkerStatus> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> io::Result<Handed> {
        let counts = scanner.scan(range)?;
        match spill_dir {
            None => Ok(Handed::Counts(counts)),
            Some(dir) => {
                let path = spill::artifact_path(dir, range.index);
                spill::write_partial(&path, &counts)?;
                debug!(worker = range.index, path = %path.display(), "partial counts spilled");
                Ok(Handed::Spilled(path))
            }
        }
    }));

    match outcome {
        Ok(Ok(handed)) => Ok(handed),
        Ok(Err(e)) => Err(WorkerStatus::Io(e)),
        Err(payload) => Err(WorkerStatus::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn remove_artifact(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial counts"),
    }
}
