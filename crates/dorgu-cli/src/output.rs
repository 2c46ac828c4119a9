use dorgu_core::manifest::GeneratedDocument;
use dorgu_core::validate::{Severity, ValidationResult};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  "));

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Dry-run rendering: a `--- path ---` header before each document.
pub fn format_documents(documents: &[GeneratedDocument]) -> String {
    let mut out = String::new();
    for doc in documents {
        out.push_str(&format!("--- {} ---\n", doc.path));
        out.push_str(&doc.content);
        if !doc.content.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

fn marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    }
}

/// Issues arrive grouped by severity; each suggestion is indented beneath
/// its issue.
pub fn format_validation(result: &ValidationResult) -> String {
    if result.issues.is_empty() {
        return "  All validation checks passed\n".to_string();
    }
    let mut out = String::new();
    for issue in &result.issues {
        out.push_str(&format!(
            "  {} [{}] {}\n",
            marker(issue.severity),
            issue.category,
            issue.message
        ));
        if !issue.suggestion.is_empty() {
            out.push_str(&format!("    → {}\n", issue.suggestion));
        }
    }
    out.push_str(&format!("\n{}\n", result.summary));
    out
}
