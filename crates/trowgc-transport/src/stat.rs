//! Parsing of `stat -c '%s %Y %n'` output.

use chrono::DateTime;
use trowgc_types::{InventoryEntry, TransportError, TransportResult};

/// The `stat` format string whose output [`parse_stat_line`] understands.
pub const STAT_FORMAT: &str = "%s %Y %n";

/// Parse one `<size> <mtime-epoch-secs> <path>` line.
///
/// The path is everything after the second field and may contain spaces.
pub fn parse_stat_line(line: &str) -> TransportResult<InventoryEntry> {
    let malformed = || TransportError::Malformed(format!("bad stat line {line:?}"));

    let (size, rest) = line.trim_start().split_once(' ').ok_or_else(malformed)?;
    let (mtime, path) = rest.trim_start().split_once(' ').ok_or_else(malformed)?;
    let path = path.trim_end_matches(['\r', '\n']);
    if path.is_empty() {
        return Err(malformed());
    }

    let size: u64 = size.parse().map_err(|_| malformed())?;
    let mtime: i64 = mtime.parse().map_err(|_| malformed())?;
    let modified_at = DateTime::from_timestamp(mtime, 0).ok_or_else(malformed)?;
    Ok(InventoryEntry::new(path, size, modified_at))
}

/// Parse a whole inventory listing, skipping blank lines.
pub fn parse_stat_output(output: &str) -> TransportResult<Vec<InventoryEntry>> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_stat_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_line() {
        let entry = parse_stat_line("1234 1700000000 /data/blobs/sha256/abc").unwrap();
        assert_eq!(entry.size, 1234);
        assert_eq!(entry.modified_at.timestamp(), 1_700_000_000);
        assert_eq!(entry.path, "/data/blobs/sha256/abc");
    }

    #[test]
    fn path_may_contain_spaces() {
        let entry = parse_stat_line("1 2 /data/manifests/my repo/tag one").unwrap();
        assert_eq!(entry.path, "/data/manifests/my repo/tag one");
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_stat_line("1234 1700000000").is_err());
        assert!(parse_stat_line("1234").is_err());
        assert!(parse_stat_line("").is_err());
    }

    #[test]
    fn rejects_non_numeric_fields() {
        assert!(parse_stat_line("big 1700000000 /x").is_err());
        assert!(parse_stat_line("12 yesterday /x").is_err());
        assert!(parse_stat_line("-1 1700000000 /x").is_err());
    }

    #[test]
    fn output_skips_blank_lines() {
        let out = "1 10 /a\n\n2 20 /b\n";
        let entries = parse_stat_output(out).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].path, "/b");
    }

    #[test]
    fn output_fails_on_any_bad_line() {
        assert!(parse_stat_output("1 10 /a\ngarbage\n").is_err());
    }
}
