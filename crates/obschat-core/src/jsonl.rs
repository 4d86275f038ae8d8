//! JSONL read/append utilities.
//!
//! Session state persists as JSON Lines files; these helpers keep the
//! read-skip-malformed and append-one-line conventions in one place.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Read entries from a JSONL file, skipping malformed lines with a warning.
///
/// Warnings carry the file path and line number. A missing file reads as
/// empty.
pub fn read_jsonl_file<T: DeserializeOwned>(path: &Path) -> io::Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                eprintln!(
                    "[WARN] {}:{}: skipping malformed entry: {}",
                    path.display(),
                    line_num + 1,
                    e
                );
            }
        }
    }

    Ok(entries)
}

/// Append one entry as a single JSON line, creating the file if needed.
pub fn append_jsonl_entry<T: Serialize>(path: &Path, entry: &T) -> io::Result<()> {
    let line = serde_json::to_string(entry)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        n: u32,
    }

    #[test]
    fn test_append_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        append_jsonl_entry(&path, &Row { n: 1 }).unwrap();
        append_jsonl_entry(&path, &Row { n: 2 }).unwrap();
        let rows: Vec<Row> = read_jsonl_file(&path).unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }]);
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "{\"n\":1}\nnot json\n\n{\"n\":3}\n").unwrap();
        let rows: Vec<Row> = read_jsonl_file(&path).unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 3 }]);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<Row> = read_jsonl_file(&dir.path().join("absent.jsonl")).unwrap();
        assert!(rows.is_empty());
    }
}
