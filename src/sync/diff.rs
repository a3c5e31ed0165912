//! Diff phase: classify scanned files against the recorded state

use crate::corpus::ScanResult;
use crate::state::SyncState;
use crate::types::{ChangeSet, SkipReason, SkippedFile, SyncMode};
use std::collections::HashSet;

/// Classify every scanned file as added, modified or unchanged, and every
/// recorded path that vanished from the corpus as removed
///
/// Skipped files take no part in the diff. A skipped file that has a record
/// is neither diffed nor removed, so its chunks stay in the index until its
/// format becomes available again. The same holds for recorded files under a
/// directory the scan could not read. In force mode every recorded file is
/// treated as modified regardless of its hash.
pub fn compute_changes(scan: &ScanResult, state: &SyncState, mode: SyncMode) -> ChangeSet {
    let mut changes = ChangeSet {
        skipped: scan.skipped.clone(),
        ..ChangeSet::default()
    };

    for file in &scan.files {
        match state.get(&file.path) {
            None => changes.added.push(file.path.clone()),
            Some(_) if mode == SyncMode::Force => changes.modified.push(file.path.clone()),
            Some(record) if record.hash != file.hash => {
                changes.modified.push(file.path.clone())
            }
            Some(_) => changes.unchanged.push(file.path.clone()),
        }
    }

    let present: HashSet<&str> = scan
        .files
        .iter()
        .map(|f| f.path.as_str())
        .chain(scan.skipped.iter().map(|s| s.path.as_str()))
        .collect();

    for path in state.files.keys() {
        if present.contains(path.as_str()) {
            continue;
        }
        match scan.unreadable_cause(path) {
            Some(cause) => changes.skipped.push(SkippedFile {
                path: path.clone(),
                reason: SkipReason::Unreadable {
                    cause: cause.to_string(),
                },
            }),
            None => changes.removed.push(path.clone()),
        }
    }

    // Scan output is sorted, but keep the guarantee local
    changes.skipped.sort_by(|a, b| a.path.cmp(&b.path));
    changes.added.sort();
    changes.modified.sort();
    changes.unchanged.sort();

    tracing::debug!(
        "Diff ({}): {} added, {} modified, {} removed, {} unchanged, {} skipped",
        mode,
        changes.added.len(),
        changes.modified.len(),
        changes.removed.len(),
        changes.unchanged.len(),
        changes.skipped.len()
    );

    changes
}
