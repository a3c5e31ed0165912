use std::process::Command;

fn main() {
    // Capture build timestamp
    let now = chrono::Utc::now();
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    // Try to capture git commit hash
    let git_hash = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", git_hash);

    // Record which optional extractors this binary was built with
    let mut formats = vec!["text", "markdown", "json"];
    if std::env::var_os("CARGO_FEATURE_PDF").is_some() {
        formats.push("pdf");
    }
    if std::env::var_os("CARGO_FEATURE_DOCX").is_some() {
        formats.push("docx");
    }
    if std::env::var_os("CARGO_FEATURE_HTML").is_some() {
        formats.push("html");
    }
    if std::env::var_os("CARGO_FEATURE_TABULAR").is_some() {
        formats.push("csv");
    }
    println!("cargo:rustc-env=BUILT_FORMATS={}", formats.join(","));

    // Rerun if git HEAD changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
