use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use hitcount::config::DEFAULT_WORKERS;
use hitcount::{Config, Handoff, Input, JsonStyle, RecordLayout, DEFAULT_BUFFER_SIZE};

/// Count `url,date` occurrences in a fixed-layout record file.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Input file, or `-` to read standard input sequentially
    input: PathBuf,
    /// Output JSON document
    output: PathBuf,
    /// Number of parallel scanning units
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,
    /// Read size per chunk, in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,
    /// Bytes before the key in every record
    #[arg(long, default_value_t = RecordLayout::DEFAULT_PREFIX_LEN)]
    prefix_len: usize,
    /// Bytes after the key in every record, excluding the newline
    #[arg(long, default_value_t = RecordLayout::DEFAULT_SUFFIX_LEN)]
    suffix_len: usize,
    /// Estimated input size in bytes; skips the size lookup
    #[arg(long)]
    size_hint: Option<u64>,
    /// Hand partial counts back through files in this directory
    #[arg(long)]
    spill_dir: Option<PathBuf>,
    /// Output formatting
    #[arg(long, value_enum, default_value_t = JsonStyle::Compat)]
    json_style: JsonStyle,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            input: Input::from_arg(&self.input),
            output: self.output,
            worker_count: self.workers,
            buffer_size: self.buffer_size,
            layout: RecordLayout::new(self.prefix_len, self.suffix_len),
            size_hint: self.size_hint,
            handoff: self.spill_dir.map_or(Handoff::InMemory, Handoff::Spill),
            json_style: self.json_style,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let input = args.input.display().to_string();
    let config = args.into_config();
    hitcount::run(&config)
        .inspect_err(|err| match err.worker_index() {
            Some(worker) => error!(worker, "run aborted: {err}"),
            None => error!("run aborted: {err}"),
        })
        .with_context(|| format!("failed to count records in {input}"))?;
    Ok(())
}
