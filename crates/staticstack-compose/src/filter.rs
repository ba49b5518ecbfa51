//! Include/exclude filters that partition the asset tree between jobs.

use globset::{Glob, GlobSet, GlobSetBuilder};
use staticstack_common::error::{Result, StackError};

use crate::asset::AssetFile;

/// Glob filter over `/`-prefixed asset keys.
///
/// A key is selected when it matches any include pattern (or there are no
/// include patterns) and no exclude pattern.
#[derive(Debug, Clone)]
pub struct FileFilter {
    include: Vec<String>,
    exclude: Vec<String>,
    include_set: GlobSet,
    exclude_set: GlobSet,
}

impl FileFilter {
    /// Compiles a filter from include and exclude patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn new(include: &[&str], exclude: &[&str]) -> Result<Self> {
        Ok(Self {
            include: include.iter().map(|p| (*p).to_owned()).collect(),
            exclude: exclude.iter().map(|p| (*p).to_owned()).collect(),
            include_set: build_set(include)?,
            exclude_set: build_set(exclude)?,
        })
    }

    /// Filter selecting only the given patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn including(patterns: &[&str]) -> Result<Self> {
        Self::new(patterns, &[])
    }

    /// Filter selecting everything except the given patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is not a valid glob.
    pub fn excluding(patterns: &[&str]) -> Result<Self> {
        Self::new(&[], patterns)
    }

    /// Include patterns as declared.
    #[must_use]
    pub fn include(&self) -> &[String] {
        &self.include
    }

    /// Exclude patterns as declared.
    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    /// Returns `true` if the key passes the filter.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        let included = self.include.is_empty() || self.include_set.is_match(key);
        included && !self.exclude_set.is_match(key)
    }

    /// Selects the files passing the filter, preserving order.
    #[must_use]
    pub fn select<'a>(&self, files: &'a [AssetFile]) -> Vec<&'a AssetFile> {
        files.iter().filter(|f| self.matches(&f.key)).collect()
    }
}

impl PartialEq for FileFilter {
    fn eq(&self, other: &Self) -> bool {
        self.include == other.include && self.exclude == other.exclude
    }
}

impl Eq for FileFilter {}

fn build_set(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| StackError::Config {
            message: format!("invalid file pattern \"{pattern}\": {e}"),
        })?;
        let _ = builder.add(glob);
    }
    builder.build().map_err(|e| StackError::Config {
        message: format!("cannot compile file patterns: {e}"),
    })
}
