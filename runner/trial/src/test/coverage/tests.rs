use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const MODULE: &str = "let x = 1\nif x > 0 {\n  x = 2\n} else {\n  x = 3\n}\n";

fn fixture(root: &Path) -> (Config, Arc<PathRewriter>) {
    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("tests")).unwrap();
    fs::write(root.join("src/logic.trial"), MODULE).unwrap();
    fs::write(root.join("src/unused.trial"), "let a = 1\nlet b = 2\n").unwrap();
    fs::write(root.join("tests/logic.spec.trial"), "use l = \"src/logic\"\n").unwrap();
    let config = Config::defaults_for(root).unwrap();
    let rewriter = Arc::new(PathRewriter::scan(&config.root, &config.sandbox, &config.extension).unwrap());
    (config, rewriter)
}

fn test_file() -> TestFile {
    TestFile {
        raw_id: "game.tests.logic.spec".into(),
        source_path: "tests/logic.spec.trial".into(),
        group: "default".into(),
    }
}

fn set_of(raw: &str, lines: &[u32], branches: &[(u32, bool)]) -> CoverageSet {
    let mut hits = ModuleHits::default();
    hits.hit_lines.extend(lines.iter().copied());
    for &(branch, taken) in branches {
        let counts = hits.branch_outcomes.entry(branch).or_default();
        if taken {
            counts.taken += 1;
        } else {
            counts.not_taken += 1;
        }
    }
    let mut set = CoverageSet::default();
    set.modules.insert(
        raw.to_string(),
        ModuleCoverage {
            executable_lines: lines.iter().copied().collect(),
            branch_lines: branches.iter().map(|&(b, _)| (b, b + 1)).collect(),
            hits,
        },
    );
    set
}

#[test]
fn test_collector_records_lines_and_branches() {
    let dir = tempdir().unwrap();
    let (config, rewriter) = fixture(dir.path());
    let mut registry = ModuleRegistry::new(&config.root, Arc::clone(&rewriter));
    registry.chunk("game.src.logic").unwrap();

    let mut collector = CoverageCollector::new();
    for line in [1, 2, 3] {
        collector.line("game.src.logic", line);
    }
    collector.branch("game.src.logic", 0, true);
    collector.line("game.tests.logic.spec", 1);

    let set = collector.finish(&registry, &test_file());
    assert!(set.unavailable.is_empty());
    assert_eq!(set.modules.len(), 1);
    let module = &set.modules["game.src.logic"];
    assert_eq!(module.executable_lines.len(), 4);
    assert_eq!(
        module.hits.branch_outcomes.get(&0),
        Some(&BranchCounts {
            taken: 1,
            not_taken: 0
        })
    );
}

#[test]
fn test_mismatched_hits_degrade_to_unavailable() {
    let dir = tempdir().unwrap();
    let (config, rewriter) = fixture(dir.path());
    let mut registry = ModuleRegistry::new(&config.root, Arc::clone(&rewriter));
    registry.chunk("game.src.logic").unwrap();

    let mut collector = CoverageCollector::new();
    collector.line("game.src.logic", 99);
    let set = collector.finish(&registry, &test_file());

    assert!(set.modules.is_empty());
    let report = set.finalize(&config, &rewriter).unwrap();
    assert_eq!(
        report.unavailable,
        vec![(
            "src/logic.trial".to_string(),
            "tests/logic.spec.trial".to_string()
        )]
    );
}

#[test]
fn test_finalize_excludes_tests_and_applies_collect_from() {
    let dir = tempdir().unwrap();
    let (mut config, rewriter) = fixture(dir.path());

    let loaded = set_of("game.src.logic", &[1, 2], &[(0, true)])
        .merged(set_of("game.tests.logic.spec", &[1], &[]));
    let report = loaded.clone().finalize(&config, &rewriter).unwrap();
    let paths: Vec<&str> = report.records.iter().map(|r| r.source_path.as_str()).collect();
    assert_eq!(paths, vec!["src/logic.trial"]);

    config = Config::from_toml(
        "[coverage]\ncollect_from = [\"src/**/*.trial\"]\n[[group]]\nname = \"default\"\n",
        dir.path(),
    )
    .unwrap();
    let report = loaded.finalize(&config, &rewriter).unwrap();
    let paths: Vec<&str> = report.records.iter().map(|r| r.source_path.as_str()).collect();
    assert_eq!(paths, vec!["src/logic.trial", "src/unused.trial"]);
    let unused = &report.records[1];
    assert_eq!(unused.executable_lines.len(), 2);
    assert!(unused.hit_lines.is_empty());
    assert_eq!(unused.covered_lines(), 0);
}

#[test]
fn test_files_of_custom_groups_are_not_covered() {
    let dir = tempdir().unwrap();
    fixture(dir.path());
    fs::create_dir_all(dir.path().join("checks")).unwrap();
    fs::write(dir.path().join("checks/smoke.trial"), "test \"boots\" {\n}\n").unwrap();
    let rewriter = Arc::new(PathRewriter::scan(dir.path(), "game", "trial").unwrap());
    let config = Config::from_toml(
        "[coverage]\ncollect_from = [\"**/*.trial\"]\n\
         [[group]]\nname = \"checks\"\npattern = \"checks/*.trial\"\n",
        dir.path(),
    )
    .unwrap();

    let loaded =
        set_of("game.src.logic", &[1], &[]).merged(set_of("game.checks.smoke", &[1], &[]));
    let report = loaded.finalize(&config, &rewriter).unwrap();
    let paths: Vec<&str> = report.records.iter().map(|r| r.source_path.as_str()).collect();
    assert_eq!(paths, vec!["src/logic.trial", "src/unused.trial"]);
}

#[test]
fn test_record_counts() {
    let record = CoverageRecord {
        source_path: "src/logic.trial".into(),
        executable_lines: [1, 2, 3, 5].into_iter().collect(),
        hit_lines: [1, 2, 3].into_iter().collect(),
        branch_outcomes: [(0, BranchCounts { taken: 2, not_taken: 0 })]
            .into_iter()
            .collect(),
        branch_lines: [(0, 2), (1, 7)].into_iter().collect(),
    };
    assert_eq!(record.covered_lines(), 3);
    assert_eq!(record.branch_total(), 4);
    assert_eq!(record.branches_covered(), 1);
    assert_eq!(record.outcome(1), BranchCounts::default());
    assert!((percentage(3, 4) - 75.0).abs() < f64::EPSILON);
    assert!((percentage(0, 0) - 100.0).abs() < f64::EPSILON);
}

fn arb_set() -> impl Strategy<Value = CoverageSet> {
    let module = (
        prop::sample::select(vec!["game.a", "game.b", "game.c"]),
        prop::collection::vec(1u32..20, 0..6),
        prop::collection::vec((0u32..4, any::<bool>()), 0..6),
    );
    (
        prop::collection::vec(module, 0..4),
        prop::collection::vec(("game.[a-c]", "game.t[0-2]"), 0..3),
    )
        .prop_map(|(modules, unavailable)| {
            let mut set = CoverageSet::default();
            for (raw, lines, branches) in modules {
                set.merge(set_of(raw, &lines, &branches));
            }
            set.unavailable.extend(unavailable);
            set
        })
}

proptest! {
    #[test]
    fn merge_is_commutative(a in arb_set(), b in arb_set()) {
        prop_assert_eq!(a.clone().merged(b.clone()), b.merged(a));
    }

    #[test]
    fn merge_is_associative(a in arb_set(), b in arb_set(), c in arb_set()) {
        let left = a.clone().merged(b.clone()).merged(c.clone());
        let right = a.merged(b.merged(c));
        prop_assert_eq!(left, right);
    }
}
