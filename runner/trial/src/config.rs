//! Run configuration.
//!
//! Loaded once from TOML, validated into an immutable [`Config`], then shared
//! by reference (usually `Arc<Config>`) with discovery, the workers and the
//! reporter. Nothing re-reads or re-validates it mid-run.

use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::paths::{module_source, normalize_relative};

/// Fatal configuration problem, reported before any discovery.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("project root {} does not exist", root.display())]
    MissingProjectRoot { root: PathBuf },
    #[error("invalid `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("no groups configured")]
    NoGroups,
    #[error("group #{index} has an empty name")]
    EmptyGroupName { index: usize },
    #[error("group `{name}` is declared more than once")]
    DuplicateGroup { name: String },
    #[error("group `{group}` has an invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        group: String,
        pattern: String,
        source: globset::Error,
    },
    #[error("group `{group}` root `{root}` is not a directory")]
    MissingRoot { group: String, root: String },
    #[error("group `{group}` setup module `{module}` does not exist")]
    MissingSetupModule { group: String, module: String },
    #[error("unknown group `{name}`")]
    UnknownGroup { name: String },
    #[error("invalid --{flag} regex: {source}")]
    InvalidRegex {
        flag: &'static str,
        source: regex::Error,
    },
    #[error("{path} matches both group `{first}` and group `{second}`")]
    OverlappingGroups {
        path: String,
        first: String,
        second: String,
    },
}

/// Coverage artifact format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageFormat {
    Text,
    Json,
    Lcov,
}

// === On-disk shape ===

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default = "default_root")]
    root: PathBuf,
    #[serde(default = "default_sandbox")]
    sandbox: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    workers: Option<usize>,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    coverage: RawCoverage,
    #[serde(default, rename = "group")]
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCoverage {
    #[serde(default)]
    enabled: bool,
    #[serde(default = "default_coverage_dir")]
    directory: PathBuf,
    #[serde(default = "default_formats")]
    formats: Vec<CoverageFormat>,
    #[serde(default)]
    collect_from: Vec<String>,
}

impl Default for RawCoverage {
    fn default() -> Self {
        RawCoverage {
            enabled: false,
            directory: default_coverage_dir(),
            formats: default_formats(),
            collect_from: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGroup {
    name: String,
    #[serde(default = "default_group_roots")]
    roots: Vec<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    setup: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_sandbox() -> String {
    "game".into()
}
fn default_extension() -> String {
    "trial".into()
}
fn default_timeout_ms() -> u64 {
    5_000
}
fn default_coverage_dir() -> PathBuf {
    PathBuf::from("coverage")
}
fn default_formats() -> Vec<CoverageFormat> {
    vec![CoverageFormat::Text, CoverageFormat::Json, CoverageFormat::Lcov]
}
fn default_group_roots() -> Vec<String> {
    vec![".".into()]
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

// === Validated shape ===

/// One named partition of the test files.
#[derive(Clone, Debug)]
pub struct GroupConfig {
    pub name: String,
    /// Root directories, relative to the project root with `/` separators.
    /// The project root itself is the empty string.
    pub roots: Vec<String>,
    pub pattern: String,
    matcher: GlobMatcher,
    /// Module requests evaluated at the start of every file of this group.
    pub setup: Vec<String>,
}

impl GroupConfig {
    /// Returns true if `source_path` lies under one of this group's roots
    /// and satisfies its pattern.
    pub fn matches(&self, source_path: &str) -> bool {
        self.roots.iter().any(|root| is_under(source_path, root))
            && self.matcher.is_match(source_path)
    }
}

fn is_under(source_path: &str, root: &str) -> bool {
    root.is_empty()
        || source_path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Clone, Debug)]
pub struct CoverageConfig {
    pub enabled: bool,
    /// Absolute artifact directory.
    pub directory: PathBuf,
    pub formats: Vec<CoverageFormat>,
    /// Globs (relative to the project root) of modules reported even when
    /// no test loads them. When non-empty, only matching modules are reported.
    pub collect_from: Vec<String>,
    collect_matcher: GlobSet,
}

impl CoverageConfig {
    /// Returns true if `source_path` is reported under `collect_from`.
    pub fn collects(&self, source_path: &str) -> bool {
        self.collect_from.is_empty() || self.collect_matcher.is_match(source_path)
    }
}

/// Compile a glob where `*` stays within one path segment.
fn compile_glob(pattern: &str) -> Result<Glob, globset::Error> {
    GlobBuilder::new(pattern).literal_separator(true).build()
}

/// Validated run configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Absolute project root.
    pub root: PathBuf,
    pub sandbox: String,
    /// Script extension without the dot.
    pub extension: String,
    pub suffix: String,
    pub workers: usize,
    pub timeout_ms: u64,
    pub seed: u64,
    pub coverage: CoverageConfig,
    pub groups: Vec<GroupConfig>,
}

impl Config {
    /// Read and validate a config file. Relative paths inside it are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let raw: RawConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(config = %path.display(), "loaded config");
        Self::validate(raw, base)
    }

    /// Validate TOML text as if it lived in `base`.
    pub fn from_toml(text: &str, base: &Path) -> Result<Config, ConfigError> {
        let raw: RawConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: base.join("<inline>"),
            source,
        })?;
        Self::validate(raw, base)
    }

    /// Configuration used when no config file exists: one `default` group
    /// covering the whole project.
    pub fn defaults_for(base: &Path) -> Result<Config, ConfigError> {
        Self::from_toml("[[group]]\nname = \"default\"\n", base)
    }

    fn validate(raw: RawConfig, base: &Path) -> Result<Config, ConfigError> {
        let root = base.join(&raw.root);
        let root = std::fs::canonicalize(&root)
            .ok()
            .filter(|r| r.is_dir())
            .ok_or(ConfigError::MissingProjectRoot { root })?;

        if raw.sandbox.is_empty()
            || !raw
                .sandbox
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::InvalidValue {
                field: "sandbox",
                reason: format!("`{}` must be a non-empty identifier", raw.sandbox),
            });
        }
        let extension = raw.extension.trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extension",
                reason: "must not be empty".into(),
            });
        }
        let suffix = raw.suffix.unwrap_or_else(|| format!(".spec.{extension}"));
        let workers = raw.workers.unwrap_or_else(default_workers);
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "must be at least 1".into(),
            });
        }
        if raw.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                reason: "must be greater than 0".into(),
            });
        }

        let mut collect = GlobSetBuilder::new();
        for pattern in &raw.coverage.collect_from {
            let glob = compile_glob(pattern).map_err(|source| ConfigError::InvalidPattern {
                group: "coverage.collect_from".into(),
                pattern: pattern.clone(),
                source,
            })?;
            collect.add(glob);
        }
        let collect_matcher = collect.build().map_err(|source| ConfigError::InvalidPattern {
            group: "coverage.collect_from".into(),
            pattern: raw.coverage.collect_from.join(", "),
            source,
        })?;
        let coverage = CoverageConfig {
            enabled: raw.coverage.enabled,
            directory: root.join(raw.coverage.directory),
            formats: raw.coverage.formats,
            collect_from: raw.coverage.collect_from,
            collect_matcher,
        };

        if raw.groups.is_empty() {
            return Err(ConfigError::NoGroups);
        }
        let mut groups: Vec<GroupConfig> = Vec::with_capacity(raw.groups.len());
        for (index, group) in raw.groups.into_iter().enumerate() {
            if group.name.trim().is_empty() {
                return Err(ConfigError::EmptyGroupName { index });
            }
            if groups.iter().any(|g| g.name == group.name) {
                return Err(ConfigError::DuplicateGroup { name: group.name });
            }
            groups.push(validate_group(group, &root, &extension, &suffix)?);
        }

        Ok(Config {
            root,
            sandbox: raw.sandbox,
            extension,
            suffix,
            workers,
            timeout_ms: raw.timeout_ms,
            seed: raw.seed,
            coverage,
            groups,
        })
    }

    pub fn group(&self, name: &str) -> Option<&GroupConfig> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Names of the groups whose pattern `source_path` satisfies.
    pub fn groups_matching<'c>(&'c self, source_path: &'c str) -> impl Iterator<Item = &'c str> {
        self.groups
            .iter()
            .filter(move |g| g.matches(source_path))
            .map(|g| g.name.as_str())
    }
}

fn validate_group(
    group: RawGroup,
    root: &Path,
    extension: &str,
    suffix: &str,
) -> Result<GroupConfig, ConfigError> {
    let pattern = group.pattern.unwrap_or_else(|| format!("**/*{suffix}"));
    let matcher = compile_glob(&pattern)
        .map_err(|source| ConfigError::InvalidPattern {
            group: group.name.clone(),
            pattern: pattern.clone(),
            source,
        })?
        .compile_matcher();

    let mut roots = Vec::with_capacity(group.roots.len());
    for dir in group.roots {
        let normalized = normalize_relative(&dir).filter(|r| root.join(r).is_dir());
        match normalized {
            Some(relative) => roots.push(relative),
            None => {
                return Err(ConfigError::MissingRoot {
                    group: group.name,
                    root: dir,
                })
            }
        }
    }

    for module in &group.setup {
        let exists = normalize_relative(&module_source(module, extension))
            .is_some_and(|source| root.join(source).is_file());
        if !exists {
            return Err(ConfigError::MissingSetupModule {
                group: group.name,
                module: module.clone(),
            });
        }
    }

    Ok(GroupConfig {
        name: group.name,
        roots,
        pattern,
        matcher,
        setup: group.setup,
    })
}
