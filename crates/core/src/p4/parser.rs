//! Parsers for tagged (`p4 -ztag`) and extended-error (`p4 -e`) output.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::paths::unescape_wildcards;

/// The fields of one `fstat` record that state classification needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FstatRecord {
    pub depot_path: String,
    pub client_path: String,
    pub moved_file: Option<String>,
    pub action: String,
    pub head_action: String,
    pub have_rev: String,
    pub head_rev: String,
}

/// Split `-ztag` output into records of `... key value` fields.
///
/// Records are separated by blank lines. Lines without the `... ` prefix
/// are ignored.
pub fn parse_ztag_records(text: &str) -> Vec<HashMap<String, String>> {
    let mut records = Vec::new();
    let mut current: HashMap<String, String> = HashMap::new();

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !current.is_empty() {
                records.push(std::mem::take(&mut current));
            }
            continue;
        }
        let Some(field) = line.strip_prefix("... ") else {
            debug!(line, "skipping untagged output line");
            continue;
        };
        let (key, value) = match field.split_once(' ') {
            Some((key, value)) => (key, value),
            None => (field, ""),
        };
        current.insert(key.to_string(), value.to_string());
    }
    if !current.is_empty() {
        records.push(current);
    }
    records
}

pub fn parse_ztag_fstat(text: &str) -> Vec<FstatRecord> {
    debug!("parsing fstat output ({} bytes)", text.len());
    let mut records = Vec::new();
    for mut fields in parse_ztag_records(text) {
        let Some(client_path) = fields.remove("clientFile") else {
            warn!(?fields, "skipping fstat record without clientFile");
            continue;
        };
        let moved_file = fields.remove("movedFile").map(|f| unescape_wildcards(&f));
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();
        records.push(FstatRecord {
            depot_path: unescape_wildcards(&take("depotFile")),
            client_path,
            moved_file,
            action: take("action"),
            head_action: take("headAction"),
            have_rev: take("haveRev"),
            head_rev: take("headRev"),
        });
    }
    debug!(count = records.len(), "parsed fstat records");
    records
}

/// Message severities carried in the top nibble of a `p4 -e` error code.
pub const E_EMPTY: u32 = 0;
pub const E_INFO: u32 = 1;
pub const E_WARN: u32 = 2;
pub const E_FAILED: u32 = 3;
pub const E_FATAL: u32 = 4;

/// Error subsystem of the server's own messages.
pub const ES_SERVER: u32 = 7;

/// Unique code of an error id: `(subsystem << 10) | code`, the low 16 bits
/// of the full `codeN` value.
pub const fn unique_code(subsystem: u32, code: u32) -> u32 {
    (subsystem << 10) | code
}

/// The server's "move command disabled" rejection.
pub const MOVE_REJECTED: u32 = unique_code(ES_SERVER, 691);

pub fn severity_name(severity: u32) -> &'static str {
    match severity {
        E_EMPTY => "empty",
        E_INFO => "info",
        E_WARN => "warning",
        E_FAILED => "error",
        _ => "fatal",
    }
}

/// Full `codeN` values in `p4 -e` output.
fn parse_raw_codes(text: &str) -> Vec<u32> {
    let mut codes = Vec::new();
    for (key, value) in tagged_fields(text) {
        if !is_numbered(key, "code") {
            continue;
        }
        match value.parse::<u32>() {
            Ok(code) => codes.push(code),
            Err(_) => warn!(key, value, "unparseable error code"),
        }
    }
    codes
}

/// Unique error codes (low 16 bits of each `codeN` field) in `p4 -e` output.
pub fn parse_error_codes(text: &str) -> Vec<u32> {
    parse_raw_codes(text)
        .into_iter()
        .map(|code| code & 0xFFFF)
        .collect()
}

/// Highest severity reported in `p4 -e` output, taken from `severity`
/// fields and from the top nibble of each code. `None` when the output
/// carries no error dictionary at all.
pub fn parse_error_severity(text: &str) -> Option<u32> {
    let from_fields = tagged_fields(text)
        .filter(|(key, _)| *key == "severity" || is_numbered(key, "severity"))
        .filter_map(|(_, value)| value.parse::<u32>().ok());
    let from_codes = parse_raw_codes(text).into_iter().map(|code| code >> 28);
    from_fields.chain(from_codes).max()
}

fn tagged_fields(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let mut tokens = line.split_whitespace().skip_while(|t| *t == "...");
        Some((tokens.next()?, tokens.next()?))
    })
}

fn is_numbered(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}
