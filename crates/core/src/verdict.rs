//! Verdict parser
//!
//! The judge is asked for seven `####` sections. The response is split on
//! `####`; each chunk's first line is its header and the remaining lines
//! its body. A header is matched against [`VerdictField::ALL`] in order by
//! case-insensitive substring. Unknown headers, headers with no body, and
//! missing sections leave the corresponding field empty. Parsing never
//! fails.

use crate::models::{JudgeReport, VerdictField};

/// Marker that opens each verdict section
pub const SECTION_MARKER: &str = "####";

pub fn parse_verdict(response: &str) -> JudgeReport {
    let mut report = JudgeReport::default();

    for chunk in response.split(SECTION_MARKER) {
        let chunk = chunk.trim();
        let Some((header, body)) = chunk.split_once('\n') else {
            continue;
        };
        let body = body.trim();
        if body.is_empty() {
            continue;
        }

        let Some(field) = match_header(header) else {
            tracing::debug!(header = %header.trim(), "Unrecognised verdict section");
            continue;
        };

        // First occurrence wins
        let slot = report.field_mut(field);
        if slot.is_empty() {
            *slot = body.to_string();
        }
    }

    report
}

fn match_header(header: &str) -> Option<VerdictField> {
    let header = header.trim().to_lowercase();
    VerdictField::ALL
        .into_iter()
        .find(|field| field.keywords().iter().all(|k| header.contains(k)))
}
