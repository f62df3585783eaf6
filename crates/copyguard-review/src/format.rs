//! Markdown table rendering of review results.

use copyguard_core::types::{ComplianceResult, ReviewVerdict};

const PASS_HEADER: &str = "| Category | Original text | Verdict |\n| --- | --- | --- |\n";
const REJECT_HEADER: &str = "| Category | Original text | Verdict | Hit term | Risk category | Risk level | Rule source | Rationale |\n\
| --- | --- | --- | --- | --- | --- | --- | --- |\n";

/// Render results as a pipe table.
///
/// Three columns when nothing was rejected; eight columns (reject rows only)
/// when at least one row carries a violation.
pub fn format_table(results: &[ComplianceResult]) -> String {
    if results.is_empty() {
        return format!("{PASS_HEADER}|  |  | {} |\n", ReviewVerdict::Pass);
    }

    let mut out = String::new();
    if results.iter().any(ComplianceResult::is_reject) {
        out.push_str(REJECT_HEADER);
        for result in results {
            let Some(v) = &result.violation else { continue };
            out.push_str(&row(&[
                &result.category,
                &result.original_text,
                result.review_result().as_str(),
                &v.hit_word,
                &v.risk_category,
                &v.risk_level,
                &v.rule_source,
                &v.brief_description,
            ]));
        }
    } else {
        out.push_str(PASS_HEADER);
        for result in results {
            out.push_str(&row(&[
                &result.category,
                &result.original_text,
                result.review_result().as_str(),
            ]));
        }
    }
    out
}

fn row(cells: &[&str]) -> String {
    let cells: Vec<String> = cells.iter().map(|c| escape_cell(c)).collect();
    format!("| {} |\n", cells.join(" | "))
}

/// Keep a cell on one line and out of the column separators.
fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
        .replace(['\r', '\n'], " ")
}
