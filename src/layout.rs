/// Fixed-width framing around the composite key of each record.
///
/// A record line (without its trailing `\n`) is
/// `<prefix_len bytes><key bytes><suffix_len bytes>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    prefix_len: usize,
    suffix_len: usize,
}

impl RecordLayout {
    pub const DEFAULT_PREFIX_LEN: usize = 19;
    pub const DEFAULT_SUFFIX_LEN: usize = 35;

    pub const fn new(prefix_len: usize, suffix_len: usize) -> Self {
        Self {
            prefix_len,
            suffix_len,
        }
    }

    pub fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    pub fn suffix_len(&self) -> usize {
        self.suffix_len
    }

    /// Total framing bytes per record, `None` if the sum overflows.
    pub fn framing_len(&self) -> Option<usize> {
        self.prefix_len.checked_add(self.suffix_len)
    }

    /// Slice the key out of `line`. Lines too short to hold the framing yield
    /// an empty key.
    #[inline]
    pub fn key<'a>(&self, line: &'a [u8]) -> &'a [u8] {
        match line.len().checked_sub(self.suffix_len) {
            Some(end) if end >= self.prefix_len => &line[self.prefix_len..end],
            _ => &[],
        }
    }
}

impl Default for RecordLayout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX_LEN, Self::DEFAULT_SUFFIX_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_suffix() {
        let layout = RecordLayout::new(3, 2);
        assert_eq!(layout.key(b"abcurl,2024-01-01xy"), b"url,2024-01-01");
    }

    #[test]
    fn default_layout_offsets() {
        let layout = RecordLayout::default();
        let line = format!("{}{}{}", "p".repeat(19), "urlA,2024-01-01", "s".repeat(35));
        assert_eq!(layout.key(line.as_bytes()), b"urlA,2024-01-01");
    }

    #[test]
    fn short_line_yields_empty_key() {
        let layout = RecordLayout::new(4, 4);
        assert_eq!(layout.key(b"1234567"), b"");
        assert_eq!(layout.key(b"12345678"), b"");
        assert_eq!(layout.key(b""), b"");
    }

    #[test]
    fn huge_framing_does_not_overflow() {
        let layout = RecordLayout::new(usize::MAX, 1);
        assert_eq!(layout.framing_len(), None);
        assert_eq!(layout.key(b"https://example.org/a,2024-01-01"), b"");
        assert_eq!(RecordLayout::new(1, usize::MAX).key(b"abc"), b"");
        assert_eq!(RecordLayout::default().framing_len(), Some(54));
    }
}
