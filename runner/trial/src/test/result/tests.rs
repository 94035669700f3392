use super::*;
use pretty_assertions::assert_eq;

fn file(name: &str) -> TestFile {
    TestFile {
        raw_id: format!("game.{name}.spec"),
        source_path: format!("{name}.spec.trial"),
        group: "default".into(),
    }
}

fn report(name: &str, state: FileState, cases: Vec<CaseResult>) -> FileReport {
    FileReport {
        state,
        cases,
        ..FileReport::new(file(name))
    }
}

#[test]
fn test_case_constructors() {
    let failed = CaseResult::failed("a".into(), "boom".into(), None, Duration::from_millis(3));
    assert_eq!(failed.status, CaseStatus::Failed);
    assert_eq!(failed.failure_message.as_deref(), Some("boom"));
    assert_eq!(failed.duration_millis(), 3);

    let skipped = CaseResult::skipped("b".into());
    assert_eq!(skipped.duration, Duration::ZERO);
    assert!(skipped.failure_message.is_none());
    assert!(CaseResult::passed("c".into(), Duration::ZERO)
        .failure_message
        .is_none());
}

#[test]
fn test_summary_arithmetic() {
    let reports = vec![
        report(
            "a",
            FileState::Completed,
            vec![
                CaseResult::passed("one".into(), Duration::ZERO),
                CaseResult::skipped("two".into()),
            ],
        ),
        report(
            "b",
            FileState::Errored,
            vec![CaseResult::failed("b.spec.trial".into(), "load".into(), None, Duration::ZERO)],
        ),
    ];
    let summary = RunSummary::from_reports(&reports, Duration::from_millis(7));
    assert_eq!(
        summary,
        RunSummary {
            total_files: 2,
            total_cases: 3,
            passed_cases: 1,
            failed_cases: 1,
            skipped_cases: 1,
            errored_files: 1,
            wall_clock: Duration::from_millis(7),
        }
    );
    assert_eq!(
        summary.total_cases,
        summary.passed_cases + summary.failed_cases + summary.skipped_cases
    );
    assert!(reports[1].has_failures());
    assert!(!reports[0].has_failures());
}

#[test]
fn test_summary_exit_code() {
    let empty = RunSummary::default();
    assert_eq!(empty.exit_code(false), 1); // No tests
    assert_eq!(empty.exit_code(true), 0);

    let mut summary = RunSummary {
        total_files: 1,
        total_cases: 1,
        passed_cases: 1,
        ..RunSummary::default()
    };
    assert_eq!(summary.exit_code(false), 0);

    summary.errored_files = 1;
    assert_eq!(summary.exit_code(true), 1);
}

#[test]
fn test_file_state_terminal() {
    assert!(!FileState::Pending.is_terminal());
    assert!(!FileState::Running.is_terminal());
    assert!(FileState::Completed.is_terminal());
    assert!(FileState::Errored.is_terminal());
}
