// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export file names.

use chrono::NaiveDateTime;

/// Sortable local timestamp with `:` replaced by `-`.
pub const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Collapse whitespace runs to `_`, then drop everything outside
/// `[A-Za-z0-9_-]`.
pub fn sanitize(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

pub fn stamp(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// `{reporter}_{facility}_{stamp}.zip`
pub fn archive_file_name(reporter_name: &str, facility_name: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}.zip",
        sanitize(reporter_name),
        sanitize(facility_name),
        stamp(at)
    )
}

/// `{facility}_{stamp}.pdf`, with `report` standing in for a facility name
/// that sanitizes to nothing.
pub fn report_file_name(facility_name: &str, at: NaiveDateTime) -> String {
    let facility = sanitize(facility_name);
    let facility = if facility.is_empty() { "report".to_string() } else { facility };
    format!("{facility}_{}.pdf", stamp(at))
}
