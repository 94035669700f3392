//! Test file discovery.
//!
//! [`discover`] returns a [`Discovery`]: a description of what to scan, not
//! the scan itself. Nothing touches the filesystem until it is iterated, and
//! every iteration rescans, so two passes over an unchanged tree yield the
//! same sequence. Files come out grouped in declared group order, sorted by
//! source path within each group.

use regex::Regex;
use std::sync::Arc;

use crate::config::{Config, ConfigError};
use crate::errors::RunError;
use crate::paths::{script_files_in, PathRewriter};

/// A discovered test file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestFile {
    /// Sandbox identifier the interpreter knows the file by.
    pub raw_id: String,
    /// Root-relative source path.
    pub source_path: String,
    /// The one group the file belongs to.
    pub group: String,
}

/// Lazy, restartable sequence of test files.
#[derive(Clone, Debug)]
pub struct Discovery {
    config: Arc<Config>,
    rewriter: Arc<PathRewriter>,
    /// Restrict output to these groups (overlap is still checked against all).
    only_groups: Option<Vec<String>>,
    path_pattern: Option<Regex>,
}

/// Describe the test files of every configured group.
pub fn discover(config: &Arc<Config>, rewriter: &Arc<PathRewriter>) -> Discovery {
    Discovery {
        config: Arc::clone(config),
        rewriter: Arc::clone(rewriter),
        only_groups: None,
        path_pattern: None,
    }
}

impl Discovery {
    /// Only yield files of the named groups.
    pub fn with_groups(mut self, names: &[String]) -> Result<Self, ConfigError> {
        if let Some(unknown) = names.iter().find(|n| self.config.group(n).is_none()) {
            return Err(ConfigError::UnknownGroup {
                name: unknown.clone(),
            });
        }
        self.only_groups = (!names.is_empty()).then(|| names.to_vec());
        Ok(self)
    }

    /// Only yield files whose source path matches `pattern`.
    #[must_use]
    pub fn with_path_pattern(mut self, pattern: Regex) -> Self {
        self.path_pattern = Some(pattern);
        self
    }

    /// Start a fresh scan.
    pub fn iter(&self) -> DiscoveryIter<'_> {
        DiscoveryIter {
            discovery: self,
            next_group: 0,
            pending: Vec::new().into_iter(),
            failed: false,
        }
    }

    /// Run a full scan, stopping at the first error.
    pub fn collect_files(&self) -> Result<Vec<TestFile>, RunError> {
        self.iter().collect()
    }

    fn wants_group(&self, name: &str) -> bool {
        self.only_groups
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == name))
    }

    /// Every member of group `index`, sorted by source path.
    fn scan_group(&self, index: usize) -> Result<Vec<TestFile>, RunError> {
        let config = &self.config;
        let group = &config.groups[index];
        let mut sources = Vec::new();
        for root in &group.roots {
            let dir = config.root.join(root);
            sources.extend(script_files_in(&config.root, &dir, &config.extension)?);
        }
        sources.sort();
        sources.dedup();

        let mut files = Vec::new();
        for source_path in sources {
            if !group.matches(&source_path) {
                continue;
            }
            let overlap = {
                let mut owners = config.groups_matching(&source_path);
                owners
                    .next()
                    .zip(owners.next())
                    .map(|(first, second)| (first.to_string(), second.to_string()))
            };
            if let Some((first, second)) = overlap {
                return Err(ConfigError::OverlappingGroups {
                    path: source_path,
                    first,
                    second,
                }
                .into());
            }
            if self
                .path_pattern
                .as_ref()
                .is_some_and(|p| !p.is_match(&source_path))
            {
                continue;
            }
            let raw_id = self.rewriter.to_raw(&source_path)?.to_string();
            files.push(TestFile {
                raw_id,
                source_path,
                group: group.name.clone(),
            });
        }
        tracing::debug!(group = %group.name, files = files.len(), "group scanned");
        Ok(files)
    }
}

impl<'d> IntoIterator for &'d Discovery {
    type Item = Result<TestFile, RunError>;
    type IntoIter = DiscoveryIter<'d>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`Discovery`]. Scans group by group; stops after an error.
pub struct DiscoveryIter<'d> {
    discovery: &'d Discovery,
    next_group: usize,
    pending: std::vec::IntoIter<TestFile>,
    failed: bool,
}

impl Iterator for DiscoveryIter<'_> {
    type Item = Result<TestFile, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed {
                return None;
            }
            if let Some(file) = self.pending.next() {
                return Some(Ok(file));
            }
            let groups = &self.discovery.config.groups;
            if self.next_group >= groups.len() {
                return None;
            }
            let index = self.next_group;
            self.next_group += 1;
            if !self.discovery.wants_group(&groups[index].name) {
                continue;
            }
            match self.discovery.scan_group(index) {
                Ok(files) => self.pending = files.into_iter(),
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
