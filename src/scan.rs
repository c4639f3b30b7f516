use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

use memchr::memchr_iter;
use tracing::debug;

use crate::counts::PartialCountMap;
use crate::layout::RecordLayout;
use crate::plan::FileRange;

pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024 * 1024; // 64MB per read

// Reads past the range end only need to finish one line.
const TAIL_READ_SIZE: usize = 64 * 1024;

/// Produces the partial tally for one range. The coordinator runs one call
/// per range, each on its own thread.
pub trait RangeScanner: Sync {
    fn scan(&self, range: &FileRange) -> io::Result<PartialCountMap>;
}

/// Scans byte ranges of a file on disk.
#[derive(Debug, Clone)]
pub struct FileScanner {
    path: PathBuf,
    layout: RecordLayout,
    buffer_size: usize,
}

impl FileScanner {
    pub fn new(path: impl Into<PathBuf>, layout: RecordLayout, buffer_size: usize) -> Self {
        Self {
            path: path.into(),
            layout,
            buffer_size: buffer_size.max(1),
        }
    }
}

impl RangeScanner for FileScanner {
    fn scan(&self, range: &FileRange) -> io::Result<PartialCountMap> {
        // Each unit opens its own file handle
        let mut file = File::open(&self.path)?;
        if range.is_empty() {
            return Ok(PartialCountMap::new());
        }

        // Start one byte early: if that byte is a newline, the line at
        // `start` is ours and the discarded fragment is empty.
        let origin = range.start.saturating_sub(1);
        file.seek(SeekFrom::Start(origin))?;

        let mut scan = LineScan {
            layout: self.layout,
            end_hint: range.end_hint,
            skip_first: range.start > 0,
        };
        let counts = scan.run(&mut file, origin, self.buffer_size)?;
        debug!(
            worker = range.index,
            start = range.start,
            end_hint = range.end_hint,
            keys = counts.len(),
            lines = counts.total(),
            "range scanned"
        );
        Ok(counts)
    }
}

/// Count every record from `reader` sequentially, until end-of-input.
pub fn scan_reader<R: Read>(
    mut reader: R,
    layout: RecordLayout,
    buffer_size: usize,
) -> io::Result<PartialCountMap> {
    let mut scan = LineScan {
        layout,
        end_hint: u64::MAX,
        skip_first: false,
    };
    scan.run(&mut reader, 0, buffer_size.max(1))
}

struct LineScan {
    layout: RecordLayout,
    end_hint: u64,
    skip_first: bool,
}

impl LineScan {
    /// Tally lines starting before `end_hint`, reading from `origin` onwards.
    fn run<R: Read>(
        &mut self,
        reader: &mut R,
        origin: u64,
        buffer_size: usize,
    ) -> io::Result<PartialCountMap> {
        let mut counts = PartialCountMap::new();
        let mut buffer = vec![0u8; buffer_size];
        // Bytes of a line that spans chunk boundaries.
        let mut carry: Vec<u8> = Vec::new();
        // File offset just past the last byte read.
        let mut offset = origin;

        loop {
            let want = if offset < self.end_hint {
                buffer_size.min(usize::try_from(self.end_hint - offset).unwrap_or(usize::MAX))
            } else {
                buffer_size.min(TAIL_READ_SIZE)
            };

            let bytes_read = read_some(reader, &mut buffer[..want])?;
            if bytes_read == 0 {
                // Unterminated final line
                if !carry.is_empty() && !self.skip_first {
                    counts.record(self.layout.key(&carry));
                }
                return Ok(counts);
            }

            let chunk = &buffer[..bytes_read];
            let chunk_base = offset;
            offset += bytes_read as u64;

            let mut pos = 0;
            for newline in memchr_iter(b'\n', chunk) {
                if self.skip_first {
                    self.skip_first = false;
                } else if carry.is_empty() {
                    counts.record(self.layout.key(&chunk[pos..newline]));
                } else {
                    carry.extend_from_slice(&chunk[pos..newline]);
                    counts.record(self.layout.key(&carry));
                }
                carry.clear();
                pos = newline + 1;
                // The next line starts in the following range.
                if chunk_base + pos as u64 >= self.end_hint {
                    return Ok(counts);
                }
            }
            carry.extend_from_slice(&chunk[pos..]);
        }
    }
}

fn read_some<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
