//! Output formatting utilities.

use chrono::{TimeZone, Utc};
use countersign_journal::AuditRecord;
use serde_json::Value;

/// Formats a value as pretty JSON.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

/// Formats epoch milliseconds as RFC 3339, or the raw number if out of range.
pub fn format_timestamp(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(time) => time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

/// Formats an audit record as a table row.
pub fn format_audit_row(record: &AuditRecord) -> String {
    let entry = &record.entry;
    format!(
        "{:<6} {:<24} {:<16} {:<36} {}",
        record.seq,
        format_timestamp(entry.timestamp),
        truncate(entry.user_id.as_ref().map(|u| u.as_str()).unwrap_or("-"), 16),
        entry.action,
        entry.details
    )
}

/// Prints the audit table header.
#[allow(clippy::print_literal)]
pub fn print_audit_header() {
    println!(
        "{:<6} {:<24} {:<16} {:<36} {}",
        "SEQ", "TIME", "USER", "ACTION", "DETAILS"
    );
    println!("{}", "-".repeat(100));
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(1_700_000_000_000), "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn long_values_are_truncated() {
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("short", 8), "short");
    }
}
