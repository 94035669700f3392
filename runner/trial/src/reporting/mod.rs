//! Rendering of run results.
//!
//! Everything developer-facing goes through the [`PathRewriter`]: locations
//! are shown as `source/path.trial:line` and raw identifiers inside failure
//! messages are rewritten to source paths.

pub mod coverage;

use serde::Serialize;
use std::fmt::{self, Write as _};
use trial_script::Location;

use crate::errors::RunError;
use crate::paths::{PathError, PathRewriter};
use crate::test::{CaseResult, CaseStatus, FileReport, FileState, RunSummary, TestFile};

/// Console report: failures always, passes and console output when verbose,
/// then the summary block.
pub fn render(
    summary: &RunSummary,
    reports: &[FileReport],
    rewriter: &PathRewriter,
    verbose: bool,
) -> Result<String, PathError> {
    let mut out = String::new();
    for report in reports {
        if !verbose && !report.has_failures() {
            continue;
        }
        let path = rewriter.to_source(&report.file.raw_id)?;
        let locations = report
            .cases
            .iter()
            .map(|case| {
                case.location
                    .as_ref()
                    .map(|l| display_location(l, rewriter))
                    .transpose()
            })
            .collect::<Result<Vec<_>, _>>()?;
        // Writing into a String cannot fail.
        let _ = write_file(&mut out, report, path, &locations, rewriter, verbose);
    }
    let _ = write_summary(&mut out, summary);
    Ok(out)
}

fn write_file(
    out: &mut String,
    report: &FileReport,
    path: &str,
    locations: &[Option<String>],
    rewriter: &PathRewriter,
    verbose: bool,
) -> fmt::Result {
    write!(out, "\n{path}")?;
    if report.state == FileState::Errored {
        write!(out, " (errored)")?;
    }
    writeln!(out)?;

    for (case, location) in report.cases.iter().zip(locations) {
        match case.status {
            CaseStatus::Failed => write_failure(out, case, location.as_deref(), rewriter)?,
            CaseStatus::Passed if verbose => {
                writeln!(out, "  PASS: {} ({:.2?})", case.name, case.duration)?;
            }
            CaseStatus::Skipped if verbose => writeln!(out, "  SKIP: {}", case.name)?,
            CaseStatus::Passed | CaseStatus::Skipped => {}
        }
    }

    if verbose && !report.console.is_empty() {
        writeln!(out, "  console:")?;
        for line in report.console.lines() {
            writeln!(out, "    {line}")?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut String, summary: &RunSummary) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "Test Summary:")?;
    writeln!(
        out,
        "  {} files ({} errored)",
        summary.total_files, summary.errored_files
    )?;
    writeln!(
        out,
        "  {} passed, {} failed, {} skipped ({} total)",
        summary.passed_cases, summary.failed_cases, summary.skipped_cases, summary.total_cases
    )?;
    writeln!(out, "  Completed in {:.2?}", summary.wall_clock)?;
    writeln!(out)?;

    if summary.has_failures() {
        writeln!(out, "FAILED")
    } else if summary.total_files == 0 {
        writeln!(out, "NO TESTS FOUND")
    } else {
        writeln!(out, "OK")
    }
}

fn write_failure(
    out: &mut String,
    case: &CaseResult,
    location: Option<&str>,
    rewriter: &PathRewriter,
) -> fmt::Result {
    let message = case
        .failure_message
        .as_deref()
        .map(|m| rewriter.rewrite_text(m))
        .unwrap_or_default();
    let mut lines = message.lines();
    write!(out, "  FAIL: {}", case.name)?;
    if let Some(first) = lines.next() {
        write!(out, " - {first}")?;
    }
    writeln!(out)?;
    for line in lines {
        writeln!(out, "    {line}")?;
    }
    if let Some(location) = location {
        writeln!(out, "    at {location}")?;
    }
    Ok(())
}

/// `source/path.trial:line`. Every origin is a registered module, so an
/// unknown one is reported instead of leaking the raw identifier.
pub fn display_location(
    location: &Location,
    rewriter: &PathRewriter,
) -> Result<String, PathError> {
    let path = rewriter.to_source(&location.origin)?;
    Ok(format!("{path}:{}", location.line))
}

/// Discovered source paths, grouped.
pub fn render_list(files: &[TestFile]) -> String {
    let mut out = String::new();
    let mut group: Option<&str> = None;
    for file in files {
        if group != Some(file.group.as_str()) {
            out.push_str(&file.group);
            out.push_str(":\n");
            group = Some(file.group.as_str());
        }
        out.push_str("  ");
        out.push_str(&file.source_path);
        out.push('\n');
    }
    out
}

// === JSON run document ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunDocument<'r> {
    success: bool,
    summary: SummaryDto,
    files: Vec<FileDto<'r>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDto {
    total_files: usize,
    total_cases: usize,
    passed_cases: usize,
    failed_cases: usize,
    skipped_cases: usize,
    errored_files: usize,
    wall_clock_millis: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileDto<'r> {
    source_path: &'r str,
    raw_identifier: &'r str,
    group: &'r str,
    status: &'static str,
    duration_millis: u64,
    console: &'r str,
    cases: Vec<CaseDto<'r>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CaseDto<'r> {
    name: &'r str,
    status: &'static str,
    duration_millis: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

/// Machine-readable run document. `success` agrees with the exit code.
pub fn render_json(
    summary: &RunSummary,
    reports: &[FileReport],
    rewriter: &PathRewriter,
    pass_with_no_tests: bool,
) -> Result<String, RunError> {
    let files = reports
        .iter()
        .map(|report| file_dto(report, rewriter))
        .collect::<Result<Vec<_>, _>>()?;

    let document = RunDocument {
        success: summary.exit_code(pass_with_no_tests) == 0,
        summary: SummaryDto {
            total_files: summary.total_files,
            total_cases: summary.total_cases,
            passed_cases: summary.passed_cases,
            failed_cases: summary.failed_cases,
            skipped_cases: summary.skipped_cases,
            errored_files: summary.errored_files,
            wall_clock_millis: summary.wall_clock_millis(),
        },
        files,
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

fn file_dto<'r>(
    report: &'r FileReport,
    rewriter: &'r PathRewriter,
) -> Result<FileDto<'r>, PathError> {
    let cases = report
        .cases
        .iter()
        .map(|case| -> Result<CaseDto<'r>, PathError> {
            Ok(CaseDto {
                name: &case.name,
                status: case.status.as_str(),
                duration_millis: case.duration_millis(),
                failure_message: case
                    .failure_message
                    .as_deref()
                    .map(|m| rewriter.rewrite_text(m).into_owned()),
                location: case
                    .location
                    .as_ref()
                    .map(|l| display_location(l, rewriter))
                    .transpose()?,
            })
        })
        .collect::<Result<_, PathError>>()?;

    Ok(FileDto {
        source_path: rewriter.to_source(&report.file.raw_id)?,
        raw_identifier: &report.file.raw_id,
        group: &report.file.group,
        status: report.state.as_str(),
        duration_millis: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        console: &report.console,
        cases,
    })
}
