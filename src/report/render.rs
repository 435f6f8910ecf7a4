use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;

use super::types::{RankedFinding, ScoredReport};

/// Column headings of the findings table.
pub const COLUMNS: [&str; 5] = ["Item", "Level", "Summary", "Content", "Case"];

/// Markup substitutions applied, in order, to the explain note.
fn markup_passes() -> &'static [(Regex, &'static str)] {
    static PASSES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PASSES.get_or_init(|| {
        [
            (r"(?m)^####(.+)$", r#"<h4 style="margin:5px 20px;">$1</h4>"#),
            (r"(?m)^###(.+)$", r#"<h3 style="margin:10px 0px;">$1:</h3>"#),
            (r"(?m)^\* (.+)$", r#"<ul style="margin:0px;">$1</ul>"#),
            (r"\*\*(.+?)\*\*", "<strong>$1</strong>"),
        ]
        .into_iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
        .collect()
    })
}

/// Escape text for inclusion in HTML element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert the analyzer's lightweight markup (`###`, `####`, `* `, `**`) to HTML.
pub fn markup_to_html(text: &str) -> String {
    let mut html = escape_html(text);
    for (pattern, replacement) in markup_passes() {
        html = pattern.replace_all(&html, *replacement).into_owned();
    }
    html
}

/// The score headline.
pub fn render_score(report: &ScoredReport) -> String {
    format!(
        "<h3 style=\"margin:20px 0px 0px 0px\">Score: {}</h3>",
        report.score
    )
}

/// The explain note as HTML, or an empty string when there is none.
pub fn render_explain(report: &ScoredReport) -> String {
    match &report.explain {
        Some(explain) => format!(
            "<div style=\"margin-bottom:20px;\">{}</div>",
            markup_to_html(&explain.case)
        ),
        None => String::new(),
    }
}

/// The ordinary findings as a table. With no findings only the header
/// row is emitted, so the table is always present.
pub fn render_findings(report: &ScoredReport) -> String {
    let mut html = String::new();
    if !report.findings.is_empty() {
        html.push_str("<h3 style=\"margin:10px 0px;\">SQL advice and optimizations:</h3>");
    }
    html.push_str("<table class=\"table_results\"><thead><tr>");
    for column in COLUMNS {
        // writing to a String cannot fail
        let _ = write!(html, "<th><span>{column}</span></th>");
    }
    html.push_str("</tr></thead><tbody>");
    for (index, ranked) in report.findings.iter().enumerate() {
        let class = if index % 2 == 0 { "odd" } else { "even" };
        let _ = write!(html, "<tr class=\"{class}\">");
        for column in COLUMNS {
            let _ = write!(
                html,
                "<td class=\"data text\"><span>{}</span></td>",
                escape_html(&cell(ranked, column))
            );
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn cell(ranked: &RankedFinding, column: &str) -> String {
    let finding = &ranked.finding;
    match column {
        "Item" => finding.item.clone(),
        "Level" => ranked.level.to_string(),
        "Summary" => finding.summary.clone(),
        "Content" => finding.content.clone(),
        "Case" => finding.case.clone(),
        other => finding
            .extra
            .get(other)
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_default(),
    }
}
