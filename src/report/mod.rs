pub mod render;
pub mod score;
pub mod types;

pub use types::{AnalysisResult, ScoredReport};

use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// A finished analysis, ready for output.
#[derive(Debug)]
pub enum Report {
    Scored(ScoredReport),
    /// Non-JSON report modes are shown exactly as the analyzer printed them.
    Raw(String),
}

/// Score decoded findings; raw output is carried through untouched.
pub fn build(result: AnalysisResult) -> Report {
    match result {
        AnalysisResult::Findings(findings) => Report::Scored(score::score(findings)),
        AnalysisResult::Raw(text) => Report::Raw(text),
    }
}

/// Output the report to the terminal (default) or to an HTML file.
#[instrument(skip(report))]
pub fn output(report: &Report, output_path: Option<&Path>) -> Result<(), ReportError> {
    match output_path {
        None => {
            debug!("writing report to terminal");
            match report {
                Report::Scored(scored) => print_terminal_report(scored),
                Report::Raw(text) => print!("{text}"),
            }
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing report to file");
            let contents = match report {
                Report::Scored(scored) => html_fragments(scored),
                Report::Raw(text) => text.clone(),
            };
            std::fs::write(path, contents)?;
            Ok(())
        }
    }
}

/// Headline, explain block and findings table, in display order.
pub fn html_fragments(report: &ScoredReport) -> String {
    let mut html = render::render_score(report);
    html.push('\n');
    html.push_str(&render::render_explain(report));
    html.push('\n');
    html.push_str(&render::render_findings(report));
    html.push('\n');
    html
}

/// Format and print the report to the terminal with colors.
///
/// Score: 85
///
/// ═══ Explain ═══
/// ...
///
/// ═══ Findings ═══
///   • [L3] COL.001  Avoid SELECT *
fn print_terminal_report(report: &ScoredReport) {
    println!();
    println!("Score: {}", colorize_score(report.score));
    println!();

    if let Some(explain) = &report.explain {
        println!("═══ Explain ═══");
        println!("{}", explain.case.trim_end());
        println!();
    }

    println!("═══ Findings ═══");
    if report.findings.is_empty() {
        println!("  No findings.");
    } else {
        for ranked in &report.findings {
            let finding = &ranked.finding;
            println!(
                "  • [L{}] {}  {}",
                ranked.level,
                finding.item.bold(),
                finding.summary
            );
            if !finding.content.trim().is_empty() {
                println!("      {}", finding.content.trim());
            }
        }
    }
    println!();
}

fn colorize_score(score: u32) -> colored::ColoredString {
    let text = score.to_string();
    if score >= 80 {
        text.green().bold()
    } else if score >= 60 {
        text.yellow().bold()
    } else {
        text.red().bold()
    }
}
