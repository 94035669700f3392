//! Path rewriting between sandbox identifiers and source paths.
//!
//! Inside the interpreter every chunk is named by a *raw identifier*: the
//! sandbox prefix followed by the file's root-relative path components, with
//! the script extension dropped (`tests/client/counter.spec.trial` becomes
//! `game.tests.client.counter.spec`). Developers want source paths back, so
//! the [`PathRewriter`] keeps a write-once bidirectional table built by one
//! scan of the project at startup.

use regex::Regex;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Dotted identifier tokens: candidate raw identifiers inside free text.
#[expect(clippy::expect_used, reason = "the pattern is a literal")]
static RAW_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9_]+(?:\.[A-Za-z0-9_\-]+)+").expect("raw token pattern is valid")
});

/// Path table errors. All of them abort the run.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("unknown raw identifier `{raw}`")]
    UnknownIdentifier { raw: String },
    #[error("unknown source path `{source_path}`")]
    UnknownPath { source_path: String },
    #[error("`{raw}` cannot map to `{source_path}`: already mapped to `{existing}`")]
    ConflictingMapping {
        raw: String,
        source_path: String,
        existing: String,
    },
    #[error("`{source_path}` has no raw identifier: {reason}")]
    Unmappable { source_path: String, reason: String },
    #[error("failed to scan {}: {source}", dir.display())]
    Scan {
        dir: PathBuf,
        source: std::io::Error,
    },
}

/// Bidirectional raw identifier / source path table.
#[derive(Debug)]
pub struct PathRewriter {
    sandbox: String,
    extension: String,
    to_source: FxHashMap<String, String>,
    to_raw: FxHashMap<String, String>,
}

impl PathRewriter {
    pub fn new(sandbox: &str, extension: &str) -> Self {
        PathRewriter {
            sandbox: sandbox.to_string(),
            extension: extension.to_string(),
            to_source: FxHashMap::default(),
            to_raw: FxHashMap::default(),
        }
    }

    /// Build the table from every script file under `root`.
    ///
    /// Files with no raw identifier are left out of the table; only
    /// colliding identifiers fail the scan.
    pub fn scan(root: &Path, sandbox: &str, extension: &str) -> Result<Self, PathError> {
        let mut rewriter = PathRewriter::new(sandbox, extension);
        for source in script_files(root, extension)? {
            match rewriter.raw_for(&source) {
                Ok(raw) => rewriter.register(&raw, &source)?,
                Err(e) => tracing::warn!("skipping script: {e}"),
            }
        }
        tracing::debug!(
            root = %root.display(),
            mappings = rewriter.to_source.len(),
            "path table built"
        );
        Ok(rewriter)
    }

    /// Record `raw <-> source_path`. Re-registering the same pair is a no-op;
    /// anything else touching an existing entry is a conflict.
    pub fn register(&mut self, raw: &str, source_path: &str) -> Result<(), PathError> {
        if let Some(existing) = self.to_source.get(raw) {
            if existing == source_path {
                return Ok(());
            }
            return Err(PathError::ConflictingMapping {
                raw: raw.to_string(),
                source_path: source_path.to_string(),
                existing: existing.clone(),
            });
        }
        if let Some(existing) = self.to_raw.get(source_path) {
            return Err(PathError::ConflictingMapping {
                raw: raw.to_string(),
                source_path: source_path.to_string(),
                existing: existing.clone(),
            });
        }
        self.to_source
            .insert(raw.to_string(), source_path.to_string());
        self.to_raw
            .insert(source_path.to_string(), raw.to_string());
        Ok(())
    }

    pub fn to_source(&self, raw: &str) -> Result<&str, PathError> {
        self.to_source
            .get(raw)
            .map(String::as_str)
            .ok_or_else(|| PathError::UnknownIdentifier {
                raw: raw.to_string(),
            })
    }

    pub fn to_raw(&self, source_path: &str) -> Result<&str, PathError> {
        self.to_raw
            .get(source_path)
            .map(String::as_str)
            .ok_or_else(|| PathError::UnknownPath {
                source_path: source_path.to_string(),
            })
    }

    /// Derive the raw identifier a source path gets under this sandbox.
    pub fn raw_for(&self, source_path: &str) -> Result<String, PathError> {
        let unmappable = |reason: &str| PathError::Unmappable {
            source_path: source_path.to_string(),
            reason: reason.to_string(),
        };
        let stem = source_path
            .strip_suffix(&self.extension)
            .and_then(|s| s.strip_suffix('.'))
            .ok_or_else(|| unmappable("missing script extension"))?;

        let mut raw = self.sandbox.clone();
        for segment in stem.split('/') {
            if segment.is_empty() || segment.starts_with('.') || segment.ends_with('.') {
                return Err(unmappable("empty path segment"));
            }
            raw.push('.');
            raw.push_str(segment);
        }
        Ok(raw)
    }

    /// Replace every registered raw identifier in `text` with its source path.
    pub fn rewrite_text<'t>(&self, text: &'t str) -> Cow<'t, str> {
        RAW_TOKEN.replace_all(text, |caps: &regex::Captures<'_>| {
            let token = &caps[0];
            self.to_source
                .get(token)
                .map_or_else(|| token.to_string(), Clone::clone)
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Every registered source path, sorted.
    pub fn source_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.to_raw.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/// Source path of a module request: the request itself when it already
/// carries the extension, otherwise the request plus the extension.
pub fn module_source(request: &str, extension: &str) -> String {
    let has_extension = request
        .strip_suffix(extension)
        .is_some_and(|s| s.ends_with('.'));
    if has_extension {
        request.to_string()
    } else {
        format!("{request}.{extension}")
    }
}

/// Normalize a relative path to `/`-separated form, resolving `.` and `..`.
/// Returns `None` for absolute paths and paths escaping the project root.
pub fn normalize_relative(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.join("/"))
}

/// Directories never descended into.
fn is_ignored_dir(name: &str) -> bool {
    matches!(name, "target" | "node_modules" | ".git")
}

/// Root-relative source paths of every `*.<extension>` file under `root`,
/// sorted. Hidden entries and build/vendor directories are skipped.
pub fn script_files(root: &Path, extension: &str) -> Result<Vec<String>, PathError> {
    script_files_in(root, root, extension)
}

/// Like [`script_files`], restricted to the subtree `dir` of `root`.
pub fn script_files_in(root: &Path, dir: &Path, extension: &str) -> Result<Vec<String>, PathError> {
    let mut files = Vec::new();
    walk(root, dir, extension, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, extension: &str, files: &mut Vec<String>) -> Result<(), PathError> {
    let entries = fs::read_dir(dir).map_err(|source| PathError::Scan {
        dir: dir.to_path_buf(),
        source,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        // Skip hidden files and directories
        if name.starts_with('.') {
            continue;
        }

        if path.is_dir() {
            if is_ignored_dir(name) {
                continue;
            }
            walk(root, &path, extension, files)?;
        } else if path.extension().is_some_and(|e| e == extension) {
            if let Some(source) = relative_source(root, &path) {
                files.push(source);
            }
        }
    }
    Ok(())
}

/// `/`-separated path of `path` relative to `root`.
pub fn relative_source(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts = relative
        .components()
        .map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
