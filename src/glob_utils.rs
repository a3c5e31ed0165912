//! Glob pattern matching for corpus-relative paths

use globset::{Glob, GlobSet, GlobSetBuilder};

/// Include/exclude filter compiled once per scan
///
/// A path passes when it matches at least one include pattern (or there are
/// none) and no exclude pattern. Paths are corpus-relative with `/` separators.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl PathFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, globset::Error> {
        let include = if include.is_empty() {
            None
        } else {
            Some(build_set(include)?)
        };
        Ok(Self {
            include,
            exclude: build_set(exclude)?,
        })
    }

    pub fn is_match(&self, relative_path: &str) -> bool {
        let path = relative_path.trim_start_matches('/');
        if let Some(include) = &self.include
            && !include.is_match(path)
        {
            return false;
        }
        !self.exclude.is_match(path)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build()
}
