//! Parallel, range-partitioned counting of `url,date` keys in large
//! fixed-layout record files.
//!
//! The input is split into byte ranges ([`plan()`]), each range is scanned on
//! its own thread ([`FileScanner`]), and the per-thread tallies are merged
//! into a sorted URL -> date -> count document ([`merge()`]).

pub mod config;
pub mod coordinator;
pub mod counts;
pub mod engine;
pub mod error;
pub mod layout;
pub mod merge;
pub mod output;
pub mod plan;
pub mod scan;
pub mod spill;

pub use config::{Config, Input};
pub use coordinator::{scan_all, Handoff};
pub use counts::{AggregateCountMap, PartialCountMap};
pub use engine::{count, run, CountReport};
pub use error::{Error, Result, WorkerStatus};
pub use layout::RecordLayout;
pub use merge::merge;
pub use output::{write_json, write_output, JsonStyle};
pub use plan::{plan, FileRange};
pub use scan::{scan_reader, FileScanner, RangeScanner, DEFAULT_BUFFER_SIZE};
