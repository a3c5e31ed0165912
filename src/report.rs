//! Human-readable rendering of check, sync and status reports

use crate::extract::Unavailable;
use crate::types::{ChangeCounts, ChangeSet, CheckReport, StatusReport, SyncReport};

fn counts_line(counts: &ChangeCounts) -> String {
    format!(
        "{} added, {} modified, {} removed, {} unchanged, {} skipped, {} failed",
        counts.added,
        counts.modified,
        counts.removed,
        counts.unchanged,
        counts.skipped,
        counts.failed
    )
}

fn push_changes(out: &mut String, changes: &ChangeSet) {
    for path in &changes.added {
        out.push_str(&format!("  added     {}\n", path));
    }
    for path in &changes.modified {
        out.push_str(&format!("  modified  {}\n", path));
    }
    for path in &changes.removed {
        out.push_str(&format!("  removed   {}\n", path));
    }

    let unavailable = changes.unavailable_counts();
    if !unavailable.is_empty() {
        let parts: Vec<String> = unavailable
            .iter()
            .map(|(format, n)| format!("{} ({} file{})", format, n, plural(*n)))
            .collect();
        out.push_str(&format!("Unavailable formats: {}\n", parts.join(", ")));
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn render_check(report: &CheckReport) -> String {
    let mut out = format!("Check ({}): {}\n", report.mode, counts_line(&report.counts));
    push_changes(&mut out, &report.changes);
    for skipped in &report.changes.skipped {
        out.push_str(&format!("  skipped   {} ({})\n", skipped.path, skipped.reason));
    }
    if report.changes.is_empty() {
        out.push_str("Index is up to date\n");
    }
    out
}

pub fn render_sync(report: &SyncReport) -> String {
    let mode = report
        .mode
        .map(|m| m.to_string())
        .unwrap_or_else(|| "incremental".to_string());
    let mut out = format!("Sync ({}): {}\n", mode, counts_line(&report.counts));

    out.push_str(&format!(
        "Chunks: {} upserted, {} deleted, {} total\n",
        report.chunks_upserted, report.chunks_deleted, report.total_chunks
    ));

    for failed in &report.failed {
        out.push_str(&format!(
            "  failed    {} [{}]: {}\n",
            failed.path, failed.stage, failed.error
        ));
    }

    let unavailable = report
        .skipped
        .iter()
        .filter(|s| matches!(s.reason, crate::types::SkipReason::FormatUnavailable { .. }))
        .count();
    if unavailable > 0 {
        out.push_str(&format!(
            "Skipped {} file{} with unavailable formats\n",
            unavailable,
            plural(unavailable)
        ));
    }

    if report.cancelled {
        out.push_str("Cancelled before all files were processed\n");
    }
    if !report.committed && report.is_partial() {
        out.push_str("Sync state was NOT updated; pending files will be retried\n");
    }
    if report.is_partial() && !report.unreconciled.is_empty() {
        out.push_str(&format!(
            "Not yet reconciled: {}\n",
            report.unreconciled.join(", ")
        ));
    }

    out.push_str(&format!("Finished in {}ms\n", report.duration_ms));
    out
}

pub fn render_status(report: &StatusReport) -> String {
    let mut out = format!("Sync state: {}\n", report.state_path);
    let last_sync = report
        .last_sync
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    out.push_str(&format!("Last sync:  {}\n", last_sync));
    out.push_str(&format!(
        "Total:      {} files, {} chunks\n",
        report.total_files, report.total_chunks
    ));

    if !report.by_category.is_empty() {
        out.push_str("\nBy category:\n");
        for (category, totals) in &report.by_category {
            out.push_str(&format!(
                "  {:<20} {:>6} files {:>8} chunks\n",
                category, totals.files, totals.chunks
            ));
        }
    }

    if !report.by_format.is_empty() {
        out.push_str("\nBy format:\n");
        for (format, totals) in &report.by_format {
            out.push_str(&format!(
                "  {:<20} {:>6} files {:>8} chunks\n",
                format.label(),
                totals.files,
                totals.chunks
            ));
        }
    }

    out.push_str("\nFormat support:\n");
    for support in &report.format_support {
        let status = match support.reason {
            None => "available",
            Some(Unavailable::NotCompiled) => "unavailable (not compiled in)",
            Some(Unavailable::Disabled) => "unavailable (disabled)",
        };
        out.push_str(&format!("  {:<20} {}\n", support.format.label(), status));
    }

    if !report.files.is_empty() {
        out.push_str("\nFiles:\n");
        for file in &report.files {
            out.push_str(&format!(
                "  {} [{}] {} chunks\n",
                file.path, file.format, file.chunks
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Format, FormatSupport};
    use crate::types::{
        FailedFile, FailureStage, FileStatus, SkipReason, SkippedFile, SyncMode, Totals,
    };
    use std::collections::BTreeMap;

    #[test]
    fn test_render_check_lists_changes() {
        let changes = ChangeSet {
            added: vec!["faq/new.md".to_string()],
            modified: vec!["a.txt".to_string()],
            removed: vec![],
            unchanged: vec!["b.txt".to_string()],
            skipped: vec![SkippedFile {
                path: "docs/x.pdf".to_string(),
                reason: SkipReason::FormatUnavailable {
                    format: Format::PageDoc,
                },
            }],
        };
        let report = CheckReport {
            mode: SyncMode::Incremental,
            counts: changes.counts(),
            changes,
        };

        let text = render_check(&report);
        assert!(text.starts_with(
            "Check (incremental): 1 added, 1 modified, 0 removed, 1 unchanged, 1 skipped, 0 failed\n"
        ));
        assert!(text.contains("  added     faq/new.md\n"));
        assert!(text.contains("  modified  a.txt\n"));
        assert!(text.contains("Unavailable formats: pdf (1 file)\n"));
        assert!(text.contains("  skipped   docs/x.pdf (FormatUnavailable (pdf))\n"));
        assert!(!text.contains("up to date"));
    }

    #[test]
    fn test_render_sync_partial() {
        let report = SyncReport {
            mode: Some(SyncMode::Incremental),
            failed: vec![FailedFile {
                path: "b.txt".to_string(),
                stage: FailureStage::Index,
                error: "boom".to_string(),
            }],
            unreconciled: vec!["a.txt".to_string(), "b.txt".to_string()],
            ..SyncReport::default()
        };

        let text = render_sync(&report);
        assert!(text.contains("  failed    b.txt [index]: boom\n"));
        assert!(text.contains("NOT updated"));
        assert!(text.contains("Not yet reconciled: a.txt, b.txt\n"));
    }

    #[test]
    fn test_render_status_tables() {
        let mut by_category = BTreeMap::new();
        by_category.insert("faq".to_string(), Totals { files: 2, chunks: 6 });
        let mut by_format = BTreeMap::new();
        by_format.insert(Format::PlainText, Totals { files: 2, chunks: 6 });

        let report = StatusReport {
            state_path: "/data/sync_state.json".to_string(),
            total_files: 2,
            total_chunks: 6,
            last_sync: None,
            by_category,
            by_format,
            format_support: vec![
                FormatSupport {
                    format: Format::PlainText,
                    available: true,
                    reason: None,
                },
                FormatSupport {
                    format: Format::PageDoc,
                    available: false,
                    reason: Some(Unavailable::Disabled),
                },
            ],
            files: vec![FileStatus {
                path: "faq/a.txt".to_string(),
                category: "faq".to_string(),
                format: Format::PlainText,
                chunks: 3,
            }],
        };

        let text = render_status(&report);
        assert!(text.contains("Last sync:  never\n"));
        assert!(text.contains("Total:      2 files, 6 chunks\n"));
        assert!(text.contains("faq"));
        assert!(text.contains("unavailable (disabled)"));
        assert!(text.contains("  faq/a.txt [text] 3 chunks\n"));
    }
}
