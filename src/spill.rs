//! Worker-private on-disk handoff of partial tallies.
//!
//! Each record is `key_len: u32 LE`, `count: u64 LE`, then the key bytes.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::counts::PartialCountMap;

const WRITE_BUFFER: usize = 1024 * 1024;

/// Artifact path for the unit with the given index.
pub fn artifact_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("partial_{index}"))
}

pub fn write_partial(path: &Path, counts: &PartialCountMap) -> io::Result<()> {
    let mut out = BufWriter::with_capacity(WRITE_BUFFER, File::create(path)?);
    for (key, count) in counts.iter() {
        let key_len = u32::try_from(key.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "key longer than u32::MAX"))?;
        out.write_all(&key_len.to_le_bytes())?;
        out.write_all(&count.to_le_bytes())?;
        out.write_all(key)?;
    }
    out.flush()?;
    Ok(())
}

pub fn read_partial(path: &Path) -> io::Result<PartialCountMap> {
    let mut input = BufReader::new(File::open(path)?);
    let mut counts = PartialCountMap::new();
    let mut header = [0u8; 12];
    let mut key = Vec::new();
    while read_header(&mut input, &mut header)? {
        let mut len_bytes = [0u8; 4];
        let mut count_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[..4]);
        count_bytes.copy_from_slice(&header[4..]);
        key.resize(u32::from_le_bytes(len_bytes) as usize, 0);
        input.read_exact(&mut key)?;
        counts.add(&key, u64::from_le_bytes(count_bytes));
    }
    Ok(counts)
}

// false on clean end-of-file, error on a truncated header
fn read_header<R: Read>(input: &mut R, header: &mut [u8; 12]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < header.len() {
        match input.read(&mut header[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated partial-count record",
                ))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
