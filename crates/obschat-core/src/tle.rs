//! Three-line element (TLE) catalog parsing.
//!
//! Catalogs use the three-line form: a name line starting with `0`,
//! followed by the two element lines. Groups not introduced by a name line
//! are skipped, as are truncated trailing groups.

use std::fs;
use std::io;
use std::path::Path;

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TleRecord {
    /// NORAD catalog id, taken from columns 3-7 of element line 1.
    pub norad_id: String,
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Parse a three-line element catalog.
pub fn parse_tle(text: &str) -> Vec<TleRecord> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let Some(name) = lines[i].strip_prefix('0') else {
            i += 1;
            continue;
        };
        if i + 2 >= lines.len() {
            break;
        }
        let line1 = lines[i + 1].trim();
        let line2 = lines[i + 2].trim();
        let norad_id = line1
            .get(2..7)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        records.push(TleRecord {
            norad_id,
            name: name.trim().to_string(),
            line1: line1.to_string(),
            line2: line2.to_string(),
        });
        i += 3;
    }
    records
}

/// Read and parse a catalog file.
pub fn read_tle_file(path: &Path) -> io::Result<Vec<TleRecord>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_tle(&text))
}
