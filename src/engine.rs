use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::info;

use crate::config::{Config, Input};
use crate::coordinator::{scan_all, Handoff};
use crate::counts::{AggregateCountMap, PartialCountMap};
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::output::write_output;
use crate::plan::plan;
use crate::scan::{scan_reader, FileScanner};

/// Outcome of a successful run.
#[derive(Debug)]
pub struct CountReport {
    pub aggregate: AggregateCountMap,
    /// Records tallied across all units.
    pub lines: u64,
    pub elapsed: Duration,
}

/// Count the input described by `config` without writing anything.
pub fn count(config: &Config) -> Result<CountReport> {
    config.validate()?;
    let started = Instant::now();

    let partials = match &config.input {
        Input::Stdin => {
            let stdin = io::stdin();
            let counts = scan_reader(stdin.lock(), config.layout, config.buffer_size)
                .map_err(|e| Error::io("<stdin>", e))?;
            vec![counts]
        }
        Input::File(path) => scan_file(path, config)?,
    };

    let lines = partials.iter().map(|p| p.total()).sum();
    let aggregate = merge(partials)?;
    Ok(CountReport {
        aggregate,
        lines,
        elapsed: started.elapsed(),
    })
}

fn scan_file(path: &Path, config: &Config) -> Result<Vec<PartialCountMap>> {
    let file_size = match config.size_hint {
        Some(hint) => hint,
        None => std::fs::metadata(path).map_err(|e| Error::io(path, e))?.len(),
    };

    let mut ranges = plan(file_size, config.worker_count);
    if config.size_hint.is_some() {
        if let Some(last) = ranges.pop() {
            ranges.push(last.open_ended());
        }
    }

    info!(
        input = %path.display(),
        file_size,
        estimated = config.size_hint.is_some(),
        workers = config.worker_count,
        prefix_len = config.layout.prefix_len(),
        suffix_len = config.layout.suffix_len(),
        spill = matches!(config.handoff, Handoff::Spill(_)),
        "starting scan"
    );

    let scanner = FileScanner::new(path, config.layout, config.buffer_size);
    scan_all(&scanner, &ranges, &config.handoff)
}

/// Count the input and write the aggregate to `config.output`. Nothing is
/// written unless every unit and the merge succeed.
pub fn run(config: &Config) -> Result<CountReport> {
    let report = count(config)?;
    write_output(&config.output, &report.aggregate, config.json_style)?;
    info!(
        output = %config.output.display(),
        urls = report.aggregate.len(),
        lines = report.lines,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "done"
    );
    Ok(report)
}
