//! CSV listing parser
//!
//! The installer's `-l` output is one well-known header line followed by rows
//! of `CFBundleIdentifier, CFBundleVersion, CFBundleDisplayName`. Parsing is
//! best-effort: the header and any line with fewer than three comma-separated
//! fields produce no record and no error, only a counter bump.

use appdock_core::prelude::*;
use appdock_core::types::AppRecord;

/// Field-name tokens that identify the listing header line
const HEADER_TOKENS: [&str; 3] = ["CFBundleIdentifier", "CFBundleVersion", "CFBundleDisplayName"];

/// Per-refresh parse counters, kept for observability of silent drops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Lines that produced a record
    pub parsed: usize,

    /// Non-header lines dropped as malformed
    pub dropped: usize,
}

/// Line-by-line parser for one listing refresh.
///
/// Feed every output line as it arrives; call [`finish`](Self::finish) after
/// the stream ends to take the accumulated records.
#[derive(Debug, Default)]
pub struct ListingParser {
    apps: Vec<AppRecord>,
    stats: ParseStats,
}

impl ListingParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line of installer output.
    ///
    /// Records keep the order the installer emitted them; no sort is implied.
    pub fn feed_line(&mut self, line: &str) {
        if line.trim().is_empty() || is_header_line(line) {
            return;
        }

        match parse_record(line) {
            Some(record) => {
                self.apps.push(record);
                self.stats.parsed += 1;
            }
            None => {
                debug!("Dropping malformed listing line: {}", line);
                self.stats.dropped += 1;
            }
        }
    }

    /// Finish the refresh, yielding the records and the drop counters.
    pub fn finish(self) -> (Vec<AppRecord>, ParseStats) {
        if self.stats.dropped > 0 {
            debug!(
                "Listing parse: {} records, {} malformed lines dropped",
                self.stats.parsed, self.stats.dropped
            );
        }
        (self.apps, self.stats)
    }
}

/// The header line carries all three field-name tokens.
fn is_header_line(line: &str) -> bool {
    HEADER_TOKENS.iter().all(|token| line.contains(token))
}

/// Split one CSV row into an [`AppRecord`].
///
/// The bundle identifier is taken verbatim from the first field; version and
/// display name are trimmed and stripped of surrounding quotes. Rows with
/// fewer than three fields, or an empty bundle identifier, yield `None`.
fn parse_record(line: &str) -> Option<AppRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 3 {
        return None;
    }

    let bundle_id = fields[0].to_string();
    if bundle_id.trim().is_empty() {
        return None;
    }

    Some(AppRecord {
        bundle_id,
        version: clean_field(fields[1]),
        display_name: clean_field(fields[2]),
    })
}

fn clean_field(field: &str) -> String {
    field.trim().trim_matches('"').to_string()
}
