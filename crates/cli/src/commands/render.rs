//! Minimal report renderers over the correlated finding view.

use anyhow::Result;
use colored::*;
use saguru_scanners::{CoreFinding, CoreScanResult, Severity};
use std::fmt::Write;

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub fn render(result: &CoreScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => render_text(result),
        OutputFormat::Json => Ok(result.to_json()?),
        OutputFormat::Markdown => render_markdown(result),
    }
}

fn findings_of(result: &CoreScanResult, severity: Severity) -> Vec<&CoreFinding> {
    result
        .report_findings()
        .iter()
        .filter(|f| f.severity == severity)
        .collect()
}

fn render_text(result: &CoreScanResult) -> Result<String> {
    let mut out = String::new();

    writeln!(&mut out, "{}", "════════════════════════════════════════".bright_blue())?;
    writeln!(&mut out, "{}", "       REPOSITORY SCAN REPORT".bright_blue().bold())?;
    writeln!(&mut out, "{}", "════════════════════════════════════════".bright_blue())?;

    if result.report_findings().is_empty() {
        writeln!(&mut out, "\n{}", "✨ No findings.".green())?;
    }

    for severity in Severity::ALL {
        let findings = findings_of(result, severity);
        if findings.is_empty() {
            continue;
        }

        let badge = match severity {
            Severity::Critical => "CRITICAL".red().bold(),
            Severity::High => "HIGH".bright_red(),
            Severity::Medium => "MEDIUM".yellow(),
            Severity::Low => "LOW".bright_yellow(),
        };
        writeln!(&mut out, "\n{} {} ({})", "▶".bright_white(), badge, findings.len())?;
        writeln!(&mut out, "{}", "─".repeat(40).bright_black())?;

        for finding in findings {
            writeln!(
                &mut out,
                "\n  {} {} {}",
                "•".bright_white(),
                finding.summary.bright_white().bold(),
                format!("[{}]", finding.kind).bright_cyan()
            )?;
            writeln!(&mut out, "    Source: {}", finding.source)?;
            if let Some(category) = &finding.category {
                writeln!(&mut out, "    Category: {}", category)?;
            }
            match &finding.location {
                Some(location) => writeln!(&mut out, "    📍 {}", location)?,
                None => writeln!(&mut out, "    📍 repository-wide")?,
            }
            if let Some(evidence) = finding.details.get("evidence") {
                writeln!(&mut out, "    Evidence: {}", evidence.bright_black())?;
            }
        }
    }

    writeln!(
        &mut out,
        "\n📊 {} files, {} chunks scanned in {} ms",
        result.stats.scanned_files, result.stats.scanned_chunks, result.stats.duration_ms
    )?;

    Ok(out)
}

fn render_markdown(result: &CoreScanResult) -> Result<String> {
    let mut out = String::new();

    writeln!(&mut out, "# Repository Scan Report")?;
    writeln!(&mut out, "\n**Date:** {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;

    writeln!(&mut out, "\n## Summary\n")?;
    writeln!(&mut out, "| Severity | Count |")?;
    writeln!(&mut out, "|----------|-------|")?;
    for severity in Severity::ALL {
        let count = result.count_by_severity(severity);
        if count > 0 {
            writeln!(&mut out, "| {} | {} |", severity, count)?;
        }
    }
    writeln!(
        &mut out,
        "\n**Scanned:** {} files, {} chunks in {} ms",
        result.stats.scanned_files, result.stats.scanned_chunks, result.stats.duration_ms
    )?;

    writeln!(&mut out, "\n## Findings")?;
    for (i, finding) in result.report_findings().iter().enumerate() {
        writeln!(
            &mut out,
            "\n### {}. {} **{}** {}",
            i + 1,
            finding.severity.emoji(),
            finding.severity,
            finding.summary
        )?;
        writeln!(&mut out, "\n**Source:** {} ({})", finding.source, finding.kind)?;
        if let Some(category) = &finding.category {
            writeln!(&mut out, "**Category:** {}", category)?;
        }
        match &finding.location {
            Some(location) => writeln!(&mut out, "**Location:** `{}`", location)?,
            None => writeln!(&mut out, "**Location:** repository-wide")?,
        }
        for (key, value) in &finding.details {
            writeln!(&mut out, "- `{}`: {}", key, value)?;
        }
    }

    Ok(out)
}
