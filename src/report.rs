//! Rendering comparison results
//!
//! Plain-text lines for terminals and logs, and a JSON document for
//! scripts. Neither rendering includes content digests.

use crate::compare::{Completion, ComparisonResult};
use crate::error::Result;

use serde::Serialize;
use std::path::Path;

/// Verdict line for a result
pub fn verdict_line(result: &ComparisonResult) -> String {
    match result.completion {
        Completion::Complete if result.all_matched => {
            "Yes: every file in A exists in B with identical content.".to_string()
        }
        Completion::Complete => format!(
            "No: {} of {} files in A are missing from B or differ.",
            result.diagnostics.len(),
            result.stats.files_checked
        ),
        Completion::Incomplete { unchecked } => format!(
            "Incomplete: verification was aborted with {} files unchecked; {} discrepancies found so far.",
            unchecked,
            result.diagnostics.len()
        ),
    }
}

/// Verdict line followed by one line per diagnostic and one per warning
pub fn render_lines(result: &ComparisonResult) -> Vec<String> {
    let mut lines = Vec::with_capacity(1 + result.diagnostics.len() + result.warnings.len());
    lines.push(verdict_line(result));
    lines.extend(result.diagnostics.iter().map(|diff| format!("- {}", diff)));
    lines.extend(result.warnings.iter().map(|warning| format!("warning: {}", warning)));
    lines
}

#[derive(Serialize)]
struct JsonReport<'a> {
    dir_a: &'a Path,
    dir_b: &'a Path,
    verdict: String,
    #[serde(flatten)]
    result: &'a ComparisonResult,
}

/// Pretty-printed JSON document describing `result`
pub fn to_json(result: &ComparisonResult, dir_a: &Path, dir_b: &Path) -> Result<String> {
    let report = JsonReport {
        dir_a,
        dir_b,
        verdict: verdict_line(result),
        result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
