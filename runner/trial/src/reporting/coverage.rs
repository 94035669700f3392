//! Coverage artifacts: a text table, `coverage-final.json` and `lcov.info`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use crate::config::CoverageFormat;
use crate::errors::RunError;
use crate::test::{percentage, CoverageRecord, CoverageReport};

pub const JSON_FILE: &str = "coverage-final.json";
pub const LCOV_FILE: &str = "lcov.info";

/// Per-file table plus totals and the modules whose coverage was discarded.
pub fn render_text(report: &CoverageReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_table(&mut out, report);
    out
}

fn write_table(out: &mut String, report: &CoverageReport) -> fmt::Result {
    let width = report
        .records
        .iter()
        .map(|r| r.source_path.len())
        .chain(std::iter::once("All files".len()))
        .max()
        .unwrap_or_default();

    writeln!(out, "{:<width$} | % Lines | % Branch | Uncovered lines", "File")?;
    writeln!(out, "{:-<width$}-|---------|----------|----------------", "")?;

    let (mut lines, mut lines_hit, mut branches, mut branches_hit) = (0, 0, 0, 0);
    for record in &report.records {
        lines += record.executable_lines.len();
        lines_hit += record.covered_lines();
        branches += record.branch_total();
        branches_hit += record.branches_covered();
        let uncovered: Vec<String> = record
            .executable_lines
            .difference(&record.hit_lines)
            .map(u32::to_string)
            .collect();
        writeln!(
            out,
            "{:<width$} | {:>7.2} | {:>8.2} | {}",
            record.source_path,
            percentage(record.covered_lines(), record.executable_lines.len()),
            percentage(record.branches_covered(), record.branch_total()),
            uncovered.join(",")
        )?;
    }
    writeln!(
        out,
        "{:<width$} | {:>7.2} | {:>8.2} |",
        "All files",
        percentage(lines_hit, lines),
        percentage(branches_hit, branches)
    )?;

    if !report.unavailable.is_empty() {
        writeln!(out)?;
        writeln!(out, "Coverage unavailable:")?;
        for (module, file) in &report.unavailable {
            writeln!(out, "  {module} (in {file})")?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BranchDto {
    line: u32,
    taken: u64,
    not_taken: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordDto<'r> {
    path: &'r str,
    executable_lines: Vec<u32>,
    hit_lines: Vec<u32>,
    branches: BTreeMap<u32, BranchDto>,
}

/// `coverage-final.json`: one entry per source path.
pub fn render_json(report: &CoverageReport) -> Result<String, serde_json::Error> {
    let document: BTreeMap<&str, RecordDto<'_>> = report
        .records
        .iter()
        .map(|record| {
            let branches = record
                .branch_lines
                .iter()
                .map(|(&id, &line)| {
                    let counts = record.outcome(id);
                    (
                        id,
                        BranchDto {
                            line,
                            taken: counts.taken,
                            not_taken: counts.not_taken,
                        },
                    )
                })
                .collect();
            (
                record.source_path.as_str(),
                RecordDto {
                    path: &record.source_path,
                    executable_lines: record.executable_lines.iter().copied().collect(),
                    hit_lines: record.hit_lines.iter().copied().collect(),
                    branches,
                },
            )
        })
        .collect();
    serde_json::to_string_pretty(&document)
}

/// LCOV tracefile.
pub fn render_lcov(report: &CoverageReport) -> String {
    let mut out = String::new();
    for record in &report.records {
        // Writing into a String cannot fail.
        let _ = write_lcov_record(&mut out, record);
    }
    out
}

fn write_lcov_record(out: &mut String, record: &CoverageRecord) -> fmt::Result {
    writeln!(out, "TN:")?;
    writeln!(out, "SF:{}", record.source_path)?;
    for line in &record.executable_lines {
        writeln!(out, "DA:{line},{}", u8::from(record.hit_lines.contains(line)))?;
    }
    writeln!(out, "LF:{}", record.executable_lines.len())?;
    writeln!(out, "LH:{}", record.covered_lines())?;
    for (&id, &line) in &record.branch_lines {
        let reached = record.branch_outcomes.contains_key(&id);
        let counts = record.outcome(id);
        for (index, count) in [counts.taken, counts.not_taken].into_iter().enumerate() {
            if reached {
                writeln!(out, "BRDA:{line},{id},{index},{count}")?;
            } else {
                writeln!(out, "BRDA:{line},{id},{index},-")?;
            }
        }
    }
    writeln!(out, "BRF:{}", record.branch_total())?;
    writeln!(out, "BRH:{}", record.branches_covered())?;
    writeln!(out, "end_of_record")
}

/// Write the file artifacts among `formats` into `dir`. The text format is
/// printed, not written. Returns the paths written.
pub fn write_artifacts(
    report: &CoverageReport,
    dir: &Path,
    formats: &[CoverageFormat],
) -> Result<Vec<PathBuf>, RunError> {
    let mut written = Vec::new();
    for format in formats {
        let (name, contents) = match format {
            CoverageFormat::Text => continue,
            CoverageFormat::Json => (JSON_FILE, render_json(report)?),
            CoverageFormat::Lcov => (LCOV_FILE, render_lcov(report)),
        };
        std::fs::create_dir_all(dir).map_err(|source| RunError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(name);
        std::fs::write(&path, contents).map_err(|source| RunError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "coverage artifact written");
        written.push(path);
    }
    Ok(written)
}
