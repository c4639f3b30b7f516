use std::path::{Path, PathBuf};

use crate::coordinator::Handoff;
use crate::error::{Error, Result};
use crate::layout::RecordLayout;
use crate::output::JsonStyle;
use crate::scan::DEFAULT_BUFFER_SIZE;

pub const DEFAULT_WORKERS: usize = 4;
/// Upper bound on scanning units; each one is an OS thread.
pub const MAX_WORKERS: usize = 1024;

/// Where records are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Read sequentially from standard input.
    Stdin,
    /// Split into ranges and scanned in parallel.
    File(PathBuf),
}

impl Input {
    /// `-` selects standard input.
    pub fn from_arg(arg: &Path) -> Self {
        if arg.as_os_str() == "-" {
            Input::Stdin
        } else {
            Input::File(arg.to_path_buf())
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: Input,
    pub output: PathBuf,
    pub worker_count: usize,
    pub buffer_size: usize,
    pub layout: RecordLayout,
    /// Estimated input size; when set, planning skips the metadata lookup and
    /// the last range reads to end-of-file.
    pub size_hint: Option<u64>,
    pub handoff: Handoff,
    pub json_style: JsonStyle,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: Input::File(input.into()),
            output: output.into(),
            worker_count: DEFAULT_WORKERS,
            buffer_size: DEFAULT_BUFFER_SIZE,
            layout: RecordLayout::default(),
            size_hint: None,
            handoff: Handoff::InMemory,
            json_style: JsonStyle::default(),
        }
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::Config("worker count must be at least 1".to_string()));
        }
        if self.worker_count > MAX_WORKERS {
            return Err(Error::Config(format!(
                "worker count {} exceeds the maximum of {MAX_WORKERS}",
                self.worker_count
            )));
        }
        if self.layout.framing_len().is_none() {
            return Err(Error::Config(format!(
                "record layout overflows: prefix {} + suffix {} bytes",
                self.layout.prefix_len(),
                self.layout.suffix_len()
            )));
        }
        if self.buffer_size == 0 {
            return Err(Error::Config("buffer size must be at least 1 byte".to_string()));
        }
        if let Handoff::Spill(dir) = &self.handoff {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "spill directory {} does not exist",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::new("in.csv", "out.json");
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.buffer_size, 64 * 1024 * 1024);
        assert_eq!(config.layout, RecordLayout::new(19, 35));
        assert_eq!(config.handoff, Handoff::InMemory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_workers_and_buffer() {
        assert!(matches!(
            Config::new("a", "b").with_workers(0).validate(),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::new("a", "b").with_buffer_size(0).validate(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn rejects_too_many_workers() {
        assert!(Config::new("a", "b").with_workers(MAX_WORKERS).validate().is_ok());
        let err = Config::new("a", "b")
            .with_workers(100_000_000_000)
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("exceeds the maximum")));
    }

    #[test]
    fn rejects_overflowing_layout() {
        let err = Config::new("a", "b")
            .with_layout(RecordLayout::new(usize::MAX, 1))
            .validate()
            .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("record layout overflows")));
        assert!(Config::new("a", "b")
            .with_layout(RecordLayout::new(usize::MAX, 0))
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_missing_spill_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new("a", "b");
        config.handoff = Handoff::Spill(dir.path().join("nope"));
        assert!(matches!(config.validate(), Err(Error::Config(_))));
        config.handoff = Handoff::Spill(dir.path().to_path_buf());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn dash_means_stdin() {
        assert_eq!(Input::from_arg(Path::new("-")), Input::Stdin);
        assert_eq!(
            Input::from_arg(Path::new("data.csv")),
            Input::File(PathBuf::from("data.csv"))
        );
    }
}
