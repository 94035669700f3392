use super::*;
use crate::test::discovery::discover;
use crate::test::result::{CaseStatus, FileState};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

const COUNTER: &str = "let value = 0\n";
const MUTATES: &str = r#"
use c = "src/counter"
test "bumps to 41" {
    c.value = 41
    expect c.value == 41
}
"#;
const EXPECTS_ZERO: &str = r#"
use c = "src/counter"
test "starts at zero" { expect c.value == 0 }
"#;

fn project(files: &[(&str, &str)]) -> (TempDir, Arc<Config>, Arc<PathRewriter>) {
    let dir = tempfile::tempdir().unwrap();
    for (path, text) in files {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }
    let config = Arc::new(Config::defaults_for(dir.path()).unwrap());
    let rewriter = Arc::new(
        PathRewriter::scan(&config.root, &config.sandbox, &config.extension).unwrap(),
    );
    (dir, config, rewriter)
}

fn runner(config: &Arc<Config>, rewriter: &Arc<PathRewriter>, workers: usize) -> TestRunner {
    TestRunner::new(
        Arc::clone(config),
        Arc::clone(rewriter),
        TestRunnerConfig {
            workers,
            coverage: false,
            name_pattern: None,
        },
    )
}

#[test]
fn test_module_state_never_leaks_between_files() {
    let (_dir, config, rewriter) = project(&[
        ("src/counter.trial", COUNTER),
        ("tests/a.spec.trial", MUTATES),
        ("tests/b.spec.trial", EXPECTS_ZERO),
    ]);
    let files = discover(&config, &rewriter).collect_files().unwrap();
    let runner = runner(&config, &rewriter, 1);

    let forward = runner.run(&files);
    let reversed: Vec<TestFile> = files.iter().rev().cloned().collect();
    let backward = runner.run(&reversed);

    for outcome in [forward, backward] {
        assert_eq!(outcome.summary.passed_cases, 2);
        assert_eq!(outcome.summary.failed_cases, 0);
        assert_eq!(outcome.summary.exit_code(false), 0);
    }
}

#[test]
fn test_errored_file_counts_as_a_failed_case() {
    let (_dir, config, rewriter) = project(&[
        (
            "a.spec.trial",
            "test \"one\" { expect true }\ntest \"two\" { expect true }\n",
        ),
        ("b.spec.trial", "test \"broken\" { expect false }\n"),
        ("c.spec.trial", "use m = \"nowhere\"\n"),
    ]);
    let files = discover(&config, &rewriter).collect_files().unwrap();
    let outcome = runner(&config, &rewriter, 1).run(&files);

    let summary = outcome.summary;
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.total_cases, 4);
    assert_eq!(summary.passed_cases, 2);
    assert_eq!(summary.failed_cases, 2);
    assert_eq!(summary.skipped_cases, 0);
    assert_eq!(summary.errored_files, 1);
    assert_eq!(summary.exit_code(false), 1);

    let errored = &outcome.reports[2];
    assert_eq!(errored.state, FileState::Errored);
    assert_eq!(errored.cases[0].name, "c.spec.trial");
}

#[test]
fn test_parallel_run_matches_sequential_order() {
    let mut files = vec![("src/counter.trial", COUNTER)];
    let names: Vec<String> = (0..8).map(|i| format!("tests/f{i}.spec.trial")).collect();
    for (i, name) in names.iter().enumerate() {
        files.push((name.as_str(), if i % 2 == 0 { MUTATES } else { EXPECTS_ZERO }));
    }
    let (_dir, config, rewriter) = project(&files);
    let discovered = discover(&config, &rewriter).collect_files().unwrap();

    let sequential = runner(&config, &rewriter, 1).run(&discovered);
    let parallel = runner(&config, &rewriter, 4).run(&discovered);

    let order = |outcome: &RunOutcome| -> Vec<(String, Vec<CaseStatus>)> {
        outcome
            .reports
            .iter()
            .map(|r| (r.file.source_path.clone(), r.cases.iter().map(|c| c.status).collect()))
            .collect()
    };
    assert_eq!(order(&sequential), order(&parallel));
    assert_eq!(parallel.summary.passed_cases, 8);
}

#[test]
fn test_coverage_is_merged_across_files() {
    let (_dir, config, rewriter) = project(&[
        ("src/branchy.trial", "let on = true\nlet out = 0\n"),
        (
            "a.spec.trial",
            "use b = \"src/branchy\"\ntest \"x\" { expect b.on }\n",
        ),
        ("b.spec.trial", "use b = \"src/branchy\"\ntest \"y\" { expect b.out == 0 }\n"),
    ]);
    let files = discover(&config, &rewriter).collect_files().unwrap();
    let runner = TestRunner::new(
        Arc::clone(&config),
        Arc::clone(&rewriter),
        TestRunnerConfig {
            workers: 2,
            coverage: true,
            name_pattern: None,
        },
    );
    let coverage = runner.run(&files).coverage.unwrap();
    let report = coverage.finalize(&config, &rewriter).unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].source_path, "src/branchy.trial");
    assert_eq!(report.records[0].covered_lines(), 2);
}

#[test]
fn test_no_files_is_an_empty_run() {
    let (_dir, config, rewriter) = project(&[]);
    let outcome = runner(&config, &rewriter, 4).run(&[]);
    assert_eq!(outcome.summary.total_files, 0);
    assert_eq!(outcome.summary.exit_code(false), 1);
    assert_eq!(outcome.summary.exit_code(true), 0);
    assert!(outcome.coverage.is_none());
}
