//! Scan phase: walk the corpus, classify every regular file, hash the eligible ones

use super::SourceFile;
use super::hasher::hash_file;
use crate::config::CorpusConfig;
use crate::error::{ConfigError, SyncError};
use crate::extract::{ExtractorRegistry, Format};
use crate::glob_utils::PathFilter;
use crate::types::{SkipReason, SkippedFile};
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Everything one scan found; all lists are sorted by path
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<SkippedFile>,
    /// Directories the walk could not read; their contents are unknown
    pub unreadable: Vec<UnreadablePath>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreadablePath {
    /// Corpus-relative path with `/` separators
    pub path: String,
    pub cause: String,
}

impl ScanResult {
    /// The read error hiding `path` from this scan, if it lies under an unreadable directory
    pub fn unreadable_cause(&self, path: &str) -> Option<&str> {
        self.unreadable
            .iter()
            .find(|u| {
                path.strip_prefix(u.path.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
            .map(|u| u.cause.as_str())
    }
}

struct Candidate {
    path: String,
    abs_path: PathBuf,
    category: String,
    format: Format,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

struct Walked {
    candidates: Vec<Candidate>,
    skipped: Vec<SkippedFile>,
    unreadable: Vec<UnreadablePath>,
}

pub struct CorpusScanner {
    pub(crate) root: PathBuf,
    pub(crate) filter: PathFilter,
    pub(crate) max_file_size: u64,
    pub(crate) default_category: String,
    registry: ExtractorRegistry,
    /// Absolute paths never treated as corpus content (state and lock files)
    ignored_paths: Vec<PathBuf>,
    threads: usize,
}

impl CorpusScanner {
    pub fn new(config: &CorpusConfig, registry: ExtractorRegistry) -> Result<Self, SyncError> {
        let filter = PathFilter::new(&config.include_patterns, &config.exclude_patterns)
            .map_err(|e| ConfigError::InvalidValue {
                key: "corpus patterns".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            root: config.root.clone(),
            filter,
            max_file_size: config.max_file_size,
            default_category: config.default_category.clone(),
            registry,
            ignored_paths: Vec::new(),
            threads: 0,
        })
    }

    /// Size of the hashing thread pool (0 lets rayon decide)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Never report `path` as part of the corpus
    pub fn with_ignored_path(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.ignored_paths
            .push(std::path::absolute(&path).unwrap_or(path));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the corpus and hash every extractable file
    pub fn scan(&self) -> Result<ScanResult, SyncError> {
        if !self.root.is_dir() {
            return Err(SyncError::CorpusNotFound(self.root.display().to_string()));
        }

        let Walked {
            candidates,
            mut skipped,
            mut unreadable,
        } = self.collect_candidates()?;
        tracing::debug!(
            "Hashing {} candidate files ({} skipped during walk)",
            candidates.len(),
            skipped.len()
        );

        let hashed = self.hash_candidates(candidates)?;

        let mut files = Vec::with_capacity(hashed.len());
        for (candidate, result) in hashed {
            match result {
                Ok(hash) => files.push(SourceFile {
                    path: candidate.path,
                    abs_path: candidate.abs_path,
                    category: candidate.category,
                    format: candidate.format,
                    hash,
                    size: candidate.size,
                    modified: candidate.modified,
                }),
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", candidate.path, e);
                    skipped.push(SkippedFile {
                        path: candidate.path,
                        reason: SkipReason::Unreadable {
                            cause: e.to_string(),
                        },
                    });
                }
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        skipped.sort_by(|a, b| a.path.cmp(&b.path));
        unreadable.sort_by(|a, b| a.path.cmp(&b.path));

        tracing::info!(
            "Scanned {}: {} files, {} skipped, {} unreadable directories",
            self.root.display(),
            files.len(),
            skipped.len(),
            unreadable.len()
        );
        Ok(ScanResult {
            files,
            skipped,
            unreadable,
        })
    }

    fn collect_candidates(&self) -> Result<Walked, SyncError> {
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        let mut unreadable = Vec::new();

        // Every regular file counts: no hidden-file or ignore-file filtering
        let walker = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(dir) = self.unreadable_from(e)? {
                        tracing::warn!("Cannot read {}: {}", dir.path, dir.cause);
                        unreadable.push(dir);
                    }
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let abs_path = entry.path();
            if self.is_ignored_path(abs_path) {
                continue;
            }

            let Some(relative) = self.relative_path(abs_path) else {
                continue;
            };

            if !self.filter.is_match(&relative) {
                continue;
            }

            let Some(format) = Format::from_path(abs_path) else {
                tracing::debug!("Skipping {}: unrecognized format", relative);
                skipped.push(SkippedFile {
                    path: relative,
                    reason: SkipReason::UnknownFormat,
                });
                continue;
            };

            if !self.registry.is_available(format) {
                skipped.push(SkippedFile {
                    path: relative,
                    reason: SkipReason::FormatUnavailable { format },
                });
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    skipped.push(SkippedFile {
                        path: relative,
                        reason: SkipReason::Unreadable {
                            cause: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            if metadata.len() > self.max_file_size {
                tracing::debug!("Skipping large file: {}", relative);
                skipped.push(SkippedFile {
                    path: relative,
                    reason: SkipReason::TooLarge {
                        size: metadata.len(),
                        limit: self.max_file_size,
                    },
                });
                continue;
            }

            candidates.push(Candidate {
                category: self.category_of(&relative),
                path: relative,
                abs_path: abs_path.to_path_buf(),
                format,
                size: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        Ok(Walked {
            candidates,
            skipped,
            unreadable,
        })
    }

    /// Attribute a walk error to a corpus path; an unreadable root fails the scan
    pub(crate) fn unreadable_from(
        &self,
        err: ignore::Error,
    ) -> Result<Option<UnreadablePath>, SyncError> {
        let cause = err.to_string();
        let scan_failed = |path: &Path| SyncError::ScanFailed {
            path: path.display().to_string(),
            cause: cause.clone(),
        };

        let Some(path) = error_path(&err) else {
            return Err(scan_failed(&self.root));
        };
        match path.strip_prefix(&self.root) {
            Ok(relative) if relative.as_os_str().is_empty() => Err(scan_failed(path)),
            Ok(_) => Ok(self.relative_path(path).map(|relative| UnreadablePath {
                path: relative,
                cause: cause.clone(),
            })),
            Err(_) => Err(scan_failed(path)),
        }
    }

    fn hash_candidates(
        &self,
        candidates: Vec<Candidate>,
    ) -> Result<Vec<(Candidate, std::io::Result<String>)>, SyncError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|e| SyncError::other(format!("Failed to build hashing pool: {}", e)))?;

        Ok(pool.install(|| {
            candidates
                .into_par_iter()
                .map(|candidate| {
                    let hash = hash_file(&candidate.abs_path);
                    (candidate, hash)
                })
                .collect()
        }))
    }

    /// Corpus-relative path with `/` separators, or None if not valid UTF-8
    pub(crate) fn relative_path(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        match parts {
            Some(parts) if !parts.is_empty() => Some(parts.join("/")),
            _ => {
                tracing::warn!("Skipping path that is not valid UTF-8: {:?}", path);
                None
            }
        }
    }

    /// First path component under the root, or the default category
    pub(crate) fn category_of(&self, relative: &str) -> String {
        match relative.split_once('/') {
            Some((category, _)) => category.to_string(),
            None => self.default_category.clone(),
        }
    }

    fn is_ignored_path(&self, path: &Path) -> bool {
        if self.ignored_paths.is_empty() {
            return false;
        }
        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        self.ignored_paths.iter().any(|p| *p == absolute)
    }
}

fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
