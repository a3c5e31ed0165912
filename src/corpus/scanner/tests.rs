//! Tests for CorpusScanner

use super::*;
use crate::corpus::hasher::hash_bytes;
use std::fs;
use tempfile::TempDir;

fn config_for(root: &Path) -> CorpusConfig {
    CorpusConfig {
        root: root.to_path_buf(),
        ..Default::default()
    }
}

fn scanner_for(root: &Path) -> CorpusScanner {
    CorpusScanner::new(&config_for(root), ExtractorRegistry::default()).unwrap()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_new_uses_config() {
    let temp = TempDir::new().unwrap();
    let mut config = config_for(temp.path());
    config.max_file_size = 1024;
    config.default_category = "misc".to_string();

    let scanner = CorpusScanner::new(&config, ExtractorRegistry::default()).unwrap();
    assert_eq!(scanner.root(), temp.path());
    assert_eq!(scanner.max_file_size, 1024);
    assert_eq!(scanner.default_category, "misc");
}

#[test]
fn test_new_rejects_bad_pattern() {
    let temp = TempDir::new().unwrap();
    let mut config = config_for(temp.path());
    config.include_patterns = vec!["[oops".to_string()];

    let result = CorpusScanner::new(&config, ExtractorRegistry::default());
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[test]
fn test_scan_nonexistent_root() {
    let scanner = scanner_for(Path::new("/nonexistent/corpus/12345"));
    let result = scanner.scan();
    assert!(matches!(result, Err(SyncError::CorpusNotFound(_))));
}

#[test]
fn test_scan_empty_directory() {
    let temp = TempDir::new().unwrap();
    let result = scanner_for(temp.path()).scan().unwrap();
    assert!(result.files.is_empty());
    assert!(result.skipped.is_empty());
}

#[test]
fn test_scan_categorizes_and_hashes() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "faq/sleep.md", "# Sleep");
    write(temp.path(), "faq/deep/nested.txt", "nested");
    write(temp.path(), "guides/breathing.txt", "breathe");
    write(temp.path(), "readme.txt", "root file");

    let result = scanner_for(temp.path()).scan().unwrap();
    let paths: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "faq/deep/nested.txt",
            "faq/sleep.md",
            "guides/breathing.txt",
            "readme.txt"
        ]
    );

    let categories: Vec<&str> = result.files.iter().map(|f| f.category.as_str()).collect();
    assert_eq!(categories, vec!["faq", "faq", "guides", "general"]);

    let sleep = &result.files[1];
    assert_eq!(sleep.format, Format::Markdown);
    assert_eq!(sleep.hash, hash_bytes(b"# Sleep"));
    assert_eq!(sleep.size, 7);
    assert!(sleep.modified.is_some());
}

#[test]
fn test_unknown_extension_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "faq/a.txt", "a");
    write(temp.path(), "img/logo.png", "not really a png");

    let result = scanner_for(temp.path()).scan().unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].path, "img/logo.png");
    assert_eq!(result.skipped[0].reason, SkipReason::UnknownFormat);
}

#[test]
fn test_unavailable_format_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "docs/manual.md", "text");

    let scanner = CorpusScanner::new(
        &config_for(temp.path()),
        ExtractorRegistry::new(&[Format::Markdown]),
    )
    .unwrap();
    let result = scanner.scan().unwrap();

    assert!(result.files.is_empty());
    assert_eq!(
        result.skipped[0].reason,
        SkipReason::FormatUnavailable {
            format: Format::Markdown
        }
    );
}

#[test]
fn test_large_file_skipped() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "big.txt", &"x".repeat(2048));
    write(temp.path(), "small.txt", "x");

    let mut config = config_for(temp.path());
    config.max_file_size = 1024;
    let result = CorpusScanner::new(&config, ExtractorRegistry::default())
        .unwrap()
        .scan()
        .unwrap();

    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, "small.txt");
    assert_eq!(
        result.skipped[0].reason,
        SkipReason::TooLarge {
            size: 2048,
            limit: 1024
        }
    );
}

#[test]
fn test_patterns_filter_paths() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "faq/a.txt", "a");
    write(temp.path(), "drafts/b.txt", "b");
    write(temp.path(), "faq/c.json", "{}");

    let mut config = config_for(temp.path());
    config.include_patterns = vec!["**/*.txt".to_string()];
    config.exclude_patterns = vec!["drafts/**".to_string()];
    let result = CorpusScanner::new(&config, ExtractorRegistry::default())
        .unwrap()
        .scan()
        .unwrap();

    let paths: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["faq/a.txt"]);
    assert!(result.skipped.is_empty());
}

#[test]
fn test_hidden_files_are_scanned() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".hidden.txt", "secret");
    write(temp.path(), "faq/.notes.md", "notes");
    write(temp.path(), "faq/visible.md", "ok");

    let result = scanner_for(temp.path()).scan().unwrap();
    let paths: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec![".hidden.txt", "faq/.notes.md", "faq/visible.md"]);
    assert_eq!(result.files[1].category, "faq");
}

#[test]
fn test_ignore_files_do_not_hide_content() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".gitignore", "*.txt\n");
    write(temp.path(), "faq/.ignore", "*.md\n");
    write(temp.path(), "faq/a.txt", "a");
    write(temp.path(), "faq/b.md", "b");

    let result = scanner_for(temp.path()).scan().unwrap();
    let paths: Vec<&str> = result.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["faq/a.txt", "faq/b.md"]);

    // The ignore files themselves have no known format
    let skipped: Vec<&str> = result.skipped.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(skipped, vec![".gitignore", "faq/.ignore"]);
}

#[test]
fn test_git_directory_not_scanned() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), ".git/description", "repo");
    write(temp.path(), ".git/info/notes.txt", "internal");
    write(temp.path(), "faq/a.txt", "a");

    let result = scanner_for(temp.path()).scan().unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, "faq/a.txt");
    assert!(result.skipped.is_empty());
}

fn walk_error(path: PathBuf) -> ignore::Error {
    ignore::Error::WithDepth {
        depth: 1,
        err: Box::new(ignore::Error::WithPath {
            path,
            err: Box::new(ignore::Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Permission denied",
            ))),
        }),
    }
}

#[test]
fn test_walk_error_attributed_to_directory() {
    let temp = TempDir::new().unwrap();
    let scanner = scanner_for(temp.path());

    let dir = scanner
        .unreadable_from(walk_error(temp.path().join("faq").join("private")))
        .unwrap()
        .unwrap();
    assert_eq!(dir.path, "faq/private");
    assert!(dir.cause.contains("Permission denied"));
}

#[test]
fn test_walk_error_on_root_fails_scan() {
    let temp = TempDir::new().unwrap();
    let scanner = scanner_for(temp.path());

    let result = scanner.unreadable_from(walk_error(temp.path().to_path_buf()));
    assert!(matches!(result, Err(SyncError::ScanFailed { .. })));

    let pathless = ignore::Error::Io(std::io::Error::other("boom"));
    assert!(matches!(
        scanner.unreadable_from(pathless),
        Err(SyncError::ScanFailed { .. })
    ));
}

#[test]
fn test_unreadable_cause_matches_whole_components() {
    let result = ScanResult {
        unreadable: vec![UnreadablePath {
            path: "faq".to_string(),
            cause: "denied".to_string(),
        }],
        ..ScanResult::default()
    };
    assert_eq!(result.unreadable_cause("faq/a.txt"), Some("denied"));
    assert_eq!(result.unreadable_cause("faq/deep/b.txt"), Some("denied"));
    assert_eq!(result.unreadable_cause("faq"), Some("denied"));
    assert_eq!(result.unreadable_cause("faqs/a.txt"), None);
    assert_eq!(result.unreadable_cause("top.txt"), None);
}

/// Lock `dir` against reading; false when permissions are not enforced (root)
#[cfg(unix)]
fn make_unreadable(dir: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(dir, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(dir).is_ok() {
        fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
        return false;
    }
    true
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_reported() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "faq/a.txt", "a");
    write(temp.path(), "top.txt", "top");

    let faq = temp.path().join("faq");
    if !make_unreadable(&faq) {
        return;
    }
    let result = scanner_for(temp.path()).scan();

    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(&faq, fs::Permissions::from_mode(0o755)).unwrap();

    let result = result.unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, "top.txt");
    assert_eq!(result.unreadable.len(), 1);
    assert_eq!(result.unreadable[0].path, "faq");
    assert!(result.unreadable_cause("faq/a.txt").is_some());
}

#[test]
fn test_ignored_path_not_scanned() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "sync_state.json", "{}");
    write(temp.path(), "data.json", "{}");

    let scanner = scanner_for(temp.path()).with_ignored_path(temp.path().join("sync_state.json"));
    let result = scanner.scan().unwrap();
    assert_eq!(result.files.len(), 1);
    assert_eq!(result.files[0].path, "data.json");
}

#[test]
fn test_same_content_same_hash_across_paths() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a/x.txt", "same");
    write(temp.path(), "b/y.txt", "same");

    let result = scanner_for(temp.path()).with_threads(2).scan().unwrap();
    assert_eq!(result.files[0].hash, result.files[1].hash);
}

#[test]
fn test_category_of() {
    let scanner = scanner_for(Path::new("/tmp"));
    assert_eq!(scanner.category_of("faq/a.txt"), "faq");
    assert_eq!(scanner.category_of("faq/deep/a.txt"), "faq");
    assert_eq!(scanner.category_of("a.txt"), "general");
}
