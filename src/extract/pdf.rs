//! Page-oriented documents: page texts separated by blank lines

use anyhow::{Context, Result};

pub fn extract(bytes: &[u8]) -> Result<String> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).context("Failed to extract text from PDF")?;
    Ok(join_pages(&text))
}

/// pdf-extract separates pages with form feeds; normalize each page and join
fn join_pages(text: &str) -> String {
    text.split('\u{c}')
        .map(normalize_page)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn normalize_page(page: &str) -> String {
    let mut out = String::new();
    let mut blank_run = 0;
    for line in page.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_run += 1;
            continue;
        }
        if !out.is_empty() {
            out.push_str(if blank_run > 0 { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        blank_run = 0;
    }
    out
}
