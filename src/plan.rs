/// A contiguous byte span assigned to one scanning unit.
///
/// The unit owns every line whose first byte lies in `[start, end_hint)`.
/// It reads past `end_hint` to finish the last such line, and skips the line
/// straddling `start` because the previous unit finishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRange {
    pub index: usize,
    pub start: u64,
    pub end_hint: u64,
}

impl FileRange {
    pub fn len(&self) -> u64 {
        self.end_hint.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the upper bound so the unit reads until end-of-file.
    pub fn open_ended(self) -> Self {
        Self {
            end_hint: u64::MAX,
            ..self
        }
    }
}

/// Split `file_size` bytes into `worker_count` equal spans; the last span
/// absorbs the remainder. `worker_count` must be at least 1.
pub fn plan(file_size: u64, worker_count: usize) -> Vec<FileRange> {
    assert!(worker_count >= 1, "worker_count must be at least 1");
    let workers = worker_count as u64;
    let part = file_size / workers;

    (0..worker_count)
        .map(|index| {
            let start = index as u64 * part;
            let end_hint = if index == worker_count - 1 {
                file_size
            } else {
                start + part
            };
            FileRange {
                index,
                start,
                end_hint,
            }
        })
        .collect()
}
