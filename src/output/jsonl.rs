//! Newline-delimited JSON record stream
//!
//! One record per line, each a flat JSON object with an optional `_meta`
//! member.

use crate::extract::Record;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Streams records as NDJSON into any writer
pub struct JsonlWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write_record(&mut self, record: &Record) -> crate::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[Record]) -> crate::Result<usize> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(records.len())
    }

    /// Records written so far
    pub fn count(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> crate::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlWriter<BufWriter<File>> {
    /// Creates (truncating) `path`, creating parent directories
    pub fn create(path: &Path) -> crate::Result<Self> {
        create_parent_dirs(path)?;
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }

    /// Opens `path` for appending, creating it and its parent directories
    pub fn append(path: &Path) -> crate::Result<Self> {
        create_parent_dirs(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

fn create_parent_dirs(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Writes `records` to `path`, replacing any existing content
///
/// # Returns
///
/// The number of records written
pub fn write_jsonl(path: &Path, records: &[Record]) -> crate::Result<usize> {
    let mut writer = JsonlWriter::create(path)?;
    let written = writer.write_all(records)?;
    writer.flush()?;
    tracing::info!("Wrote {} records to {}", written, path.display());
    Ok(written)
}

/// Appends `records` to `path`
pub fn append_jsonl(path: &Path, records: &[Record]) -> crate::Result<usize> {
    let mut writer = JsonlWriter::append(path)?;
    let written = writer.write_all(records)?;
    writer.flush()?;
    tracing::info!("Appended {} records to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RecordMeta;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn record(title: &str) -> Record {
        let mut record = Record::default();
        record.insert("title", title);
        record
    }

    #[test]
    fn test_writer_emits_one_line_per_record() {
        let mut writer = JsonlWriter::new(Vec::new());
        writer.write_all(&[record("a"), record("b")]).unwrap();
        assert_eq!(writer.count(), 2);

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, [r#"{"title":"a"}"#, r#"{"title":"b"}"#]);
    }

    #[test]
    fn test_meta_is_a_nested_member() {
        let rec = record("a").with_meta(RecordMeta {
            url: "https://a.test/".to_string(),
            fetched_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            schema: "news".to_string(),
            page: Some(2),
        });
        let mut writer = JsonlWriter::new(Vec::new());
        writer.write_record(&rec).unwrap();

        let line: Value = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(line["title"], "a");
        assert_eq!(line["_meta"]["page"], 2);
        assert_eq!(line["_meta"]["schema"], "news");
    }

    #[test]
    fn test_write_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("records.jsonl");

        assert_eq!(write_jsonl(&path, &[record("a")]).unwrap(), 1);
        assert_eq!(append_jsonl(&path, &[record("b"), record("c")]).unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 3);

        write_jsonl(&path, &[record("z")]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"title\":\"z\"}\n"
        );
    }
}
