use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use tracing::debug;

use crate::counts::AggregateCountMap;
use crate::error::{Error, Result};

/// Pretty-printing flavour of the output document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum JsonStyle {
    /// Four-space indent, `/` escaped as `\/`, non-ASCII as `\uXXXX`.
    #[default]
    Compat,
    /// serde_json's two-space pretty printer.
    Plain,
}

/// Serialize `aggregate` into `writer`.
pub fn write_json<W: Write>(writer: W, aggregate: &AggregateCountMap, style: JsonStyle) -> io::Result<()> {
    match style {
        JsonStyle::Compat => {
            let mut ser = serde_json::Serializer::with_formatter(writer, CompatFormatter::new());
            aggregate.serialize(&mut ser)?;
        }
        JsonStyle::Plain => {
            let mut ser = serde_json::Serializer::pretty(writer);
            aggregate.serialize(&mut ser)?;
        }
    }
    Ok(())
}

/// Write the document next to `path` and rename it into place, so `path`
/// either holds the complete document or is left untouched.
pub fn write_output(path: &Path, aggregate: &AggregateCountMap, style: JsonStyle) -> Result<()> {
    let serialization = |source: io::Error| Error::Serialization {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(".hitcount-")
        .tempfile_in(dir)
        .map_err(serialization)?;
    {
        let mut out = BufWriter::new(staged.as_file_mut());
        write_json(&mut out, aggregate, style).map_err(serialization)?;
        out.flush().map_err(serialization)?;
    }
    staged.persist(path).map_err(|e| serialization(e.error))?;
    debug!(path = %path.display(), urls = aggregate.len(), "output written");
    Ok(())
}

struct CompatFormatter {
    inner: PrettyFormatter<'static>,
}

impl CompatFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl Formatter for CompatFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_array(writer)
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object(writer)
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.inner.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        let mut plain_from = 0;
        for (i, c) in fragment.char_indices() {
            if c != '/' && c.is_ascii() {
                continue;
            }
            writer.write_all(fragment[plain_from..i].as_bytes())?;
            if c == '/' {
                writer.write_all(b"\\/")?;
            } else {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
            plain_from = i + c.len_utf8();
        }
        writer.write_all(fragment[plain_from..].as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json_string(aggregate: &AggregateCountMap, style: JsonStyle) -> String {
        let mut out = Vec::new();
        write_json(&mut out, aggregate, style).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn sample() -> AggregateCountMap {
        let mut aggregate = AggregateCountMap::new();
        aggregate.add("/blog/b", "2024-01-02", 1);
        aggregate.add("/blog/a", "2024-01-02", 3);
        aggregate.add("/blog/a", "2024-01-01", 2);
        aggregate
    }

    #[test]
    fn compat_style_matches_reference_layout() {
        let expected = concat!(
            "{\n",
            "    \"\\/blog\\/a\": {\n",
            "        \"2024-01-01\": 2,\n",
            "        \"2024-01-02\": 3\n",
            "    },\n",
            "    \"\\/blog\\/b\": {\n",
            "        \"2024-01-02\": 1\n",
            "    }\n",
            "}"
        );
        assert_eq!(to_json_string(&sample(), JsonStyle::Compat), expected);
    }

    #[test]
    fn plain_style_is_serde_pretty() {
        let text = to_json_string(&sample(), JsonStyle::Plain);
        assert!(text.starts_with("{\n  \"/blog/a\": {\n    \"2024-01-01\": 2,"));
    }

    #[test]
    fn compat_escapes_non_ascii() {
        let mut aggregate = AggregateCountMap::new();
        aggregate.add("/café", "2024-01-01", 1);
        aggregate.add("/😀", "2024-01-01", 1);
        let text = to_json_string(&aggregate, JsonStyle::Compat);
        assert!(text.contains("\"\\/caf\\u00e9\""));
        assert!(text.contains("\"\\/\\ud83d\\ude00\""));
    }

    #[test]
    fn empty_aggregate_is_empty_object() {
        assert_eq!(to_json_string(&AggregateCountMap::new(), JsonStyle::Compat), "{}");
    }

    #[test]
    fn write_output_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        std::fs::write(&path, "stale").unwrap();
        write_output(&path, &sample(), JsonStyle::Compat).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            to_json_string(&sample(), JsonStyle::Compat)
        );
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn unwritable_destination_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.json");
        let err = write_output(&path, &sample(), JsonStyle::Compat).unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }
}
