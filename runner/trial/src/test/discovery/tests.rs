use super::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "test \"ok\" { expect true }\n").unwrap();
}

fn setup(root: &Path, toml: &str) -> (Arc<Config>, Arc<PathRewriter>) {
    let config = Arc::new(Config::from_toml(toml, root).unwrap());
    let rewriter = Arc::new(PathRewriter::scan(&config.root, &config.sandbox, &config.extension).unwrap());
    (config, rewriter)
}

fn sources(files: &[TestFile]) -> Vec<&str> {
    files.iter().map(|f| f.source_path.as_str()).collect()
}

const TWO_GROUPS: &str = r#"
[[group]]
name = "server"
roots = ["tests/server"]

[[group]]
name = "client"
roots = ["tests/client"]
"#;

#[test]
fn test_groups_in_declared_order_sorted_within() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tests/client/b.spec.trial");
    write(dir.path(), "tests/client/a.spec.trial");
    write(dir.path(), "tests/server/z.spec.trial");
    write(dir.path(), "tests/client/helper.trial");
    let (config, rewriter) = setup(dir.path(), TWO_GROUPS);

    let files = discover(&config, &rewriter).collect_files().unwrap();
    assert_eq!(
        sources(&files),
        vec![
            "tests/server/z.spec.trial",
            "tests/client/a.spec.trial",
            "tests/client/b.spec.trial",
        ]
    );
    assert_eq!(files[0].group, "server");
    assert_eq!(files[1].raw_id, "game.tests.client.a.spec");
}

#[test]
fn test_discovery_is_idempotent() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tests/client/a.spec.trial");
    write(dir.path(), "tests/server/b.spec.trial");
    let (config, rewriter) = setup(dir.path(), TWO_GROUPS);

    let discovery = discover(&config, &rewriter);
    let first = discovery.collect_files().unwrap();
    let second: Vec<TestFile> = (&discovery).into_iter().map(Result::unwrap).collect();
    assert_eq!(first, second);
}

#[test]
fn test_discovery_is_lazy() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tests/client/a.spec.trial");
    write(dir.path(), "tests/client/b.spec.trial");
    write(dir.path(), "tests/server/c.spec.trial");
    let (config, rewriter) = setup(dir.path(), TWO_GROUPS);

    let discovery = discover(&config, &rewriter);
    fs::remove_file(dir.path().join("tests/client/a.spec.trial")).unwrap();
    let files = discovery.collect_files().unwrap();
    assert_eq!(
        sources(&files),
        vec!["tests/server/c.spec.trial", "tests/client/b.spec.trial"]
    );
}

#[test]
fn test_overlapping_groups_are_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tests/client/a.spec.trial");
    let (config, rewriter) = setup(
        dir.path(),
        r#"
[[group]]
name = "all"

[[group]]
name = "client"
roots = ["tests/client"]
"#,
    );

    let discovery = discover(&config, &rewriter);
    let mut iter = discovery.iter();
    let Some(Err(RunError::Config(ConfigError::OverlappingGroups { path, first, second }))) =
        iter.next()
    else {
        panic!("overlap must be reported");
    };
    assert_eq!(path, "tests/client/a.spec.trial");
    assert_eq!((first.as_str(), second.as_str()), ("all", "client"));
    assert!(iter.next().is_none());
}

#[test]
fn test_skip_hidden_and_target() {
    let dir = tempdir().unwrap();
    write(dir.path(), ".hidden/a.spec.trial");
    write(dir.path(), "target/b.spec.trial");
    write(dir.path(), "node_modules/c.spec.trial");
    write(dir.path(), "real.spec.trial");
    let (config, rewriter) = setup(dir.path(), "[[group]]\nname = \"default\"\n");

    let files = discover(&config, &rewriter).collect_files().unwrap();
    assert_eq!(sources(&files), vec!["real.spec.trial"]);
}

#[test]
fn test_group_and_path_filters() {
    let dir = tempdir().unwrap();
    write(dir.path(), "tests/client/a.spec.trial");
    write(dir.path(), "tests/client/b.spec.trial");
    write(dir.path(), "tests/server/c.spec.trial");
    let (config, rewriter) = setup(dir.path(), TWO_GROUPS);

    let only_client = discover(&config, &rewriter)
        .with_groups(&["client".to_string()])
        .unwrap()
        .with_path_pattern(Regex::new("b\\.spec").unwrap());
    let files = only_client.collect_files().unwrap();
    assert_eq!(sources(&files), vec!["tests/client/b.spec.trial"]);

    let unknown = discover(&config, &rewriter).with_groups(&["nope".to_string()]);
    assert!(matches!(unknown, Err(ConfigError::UnknownGroup { .. })));
}

#[test]
fn test_empty_tree_yields_nothing() {
    let dir = tempdir().unwrap();
    let (config, rewriter) = setup(dir.path(), "[[group]]\nname = \"default\"\n");
    assert!(discover(&config, &rewriter).collect_files().unwrap().is_empty());
}
