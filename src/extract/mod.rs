//! Format extractors: turn one source file into plain text
//!
//! Formats are a closed set dispatched through an explicit [`ExtractorRegistry`]
//! value. Optional formats are compiled in through cargo features and can be
//! switched off per deployment through `sync.disabled_formats`.

mod structured;
mod text;

#[cfg(feature = "docx")]
mod docx;
#[cfg(feature = "html")]
mod html;
#[cfg(feature = "pdf")]
mod pdf;
#[cfg(feature = "tabular")]
mod tabular;

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// Document format, inferred from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "text")]
    PlainText,
    #[serde(rename = "markdown")]
    Markdown,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "tabular")]
    Tabular,
    #[serde(rename = "structured")]
    Structured,
    #[serde(rename = "pdf")]
    PageDoc,
    #[serde(rename = "docx")]
    FlowDoc,
}

impl Format {
    pub const ALL: [Format; 7] = [
        Format::PlainText,
        Format::Markdown,
        Format::Html,
        Format::Tabular,
        Format::Structured,
        Format::PageDoc,
        Format::FlowDoc,
    ];

    /// Stable short name, as stored in state and index metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::PlainText => "text",
            Format::Markdown => "markdown",
            Format::Html => "html",
            Format::Tabular => "tabular",
            Format::Structured => "structured",
            Format::PageDoc => "pdf",
            Format::FlowDoc => "docx",
        }
    }

    /// Human-readable label for reports
    pub fn label(&self) -> &'static str {
        match self {
            Format::PlainText => "Text files (.txt)",
            Format::Markdown => "Markdown (.md, .markdown)",
            Format::Html => "HTML pages (.html, .htm)",
            Format::Tabular => "Tabular data (.csv, .tsv)",
            Format::Structured => "JSON data (.json)",
            Format::PageDoc => "PDF documents (.pdf)",
            Format::FlowDoc => "Word documents (.docx)",
        }
    }

    /// Map a file extension (without the dot, any case) to a format
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_ascii_lowercase().as_str() {
            "txt" => Some(Format::PlainText),
            "md" | "markdown" => Some(Format::Markdown),
            "html" | "htm" => Some(Format::Html),
            "csv" | "tsv" => Some(Format::Tabular),
            "json" => Some(Format::Structured),
            "pdf" => Some(Format::PageDoc),
            "docx" => Some(Format::FlowDoc),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Format> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Format::from_extension)
    }

    /// Whether this binary was built with the extractor for this format
    pub fn is_compiled_in(&self) -> bool {
        match self {
            Format::PlainText | Format::Markdown | Format::Structured => true,
            Format::Html => cfg!(feature = "html"),
            Format::Tabular => cfg!(feature = "tabular"),
            Format::PageDoc => cfg!(feature = "pdf"),
            Format::FlowDoc => cfg!(feature = "docx"),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown format '{}'", s))
    }
}

/// Why a format cannot be extracted in this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// Built without the cargo feature
    NotCompiled,
    /// Listed in `sync.disabled_formats`
    Disabled,
}

/// Availability of one format, for status reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatSupport {
    pub format: Format,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Unavailable>,
}

/// Registry of extractors available for one run
#[derive(Debug, Clone, Default)]
pub struct ExtractorRegistry {
    disabled: BTreeSet<Format>,
}

impl ExtractorRegistry {
    /// Registry with every compiled-in format enabled except `disabled`
    pub fn new(disabled: &[Format]) -> Self {
        Self {
            disabled: disabled.iter().copied().collect(),
        }
    }

    pub fn unavailable_reason(&self, format: Format) -> Option<Unavailable> {
        if !format.is_compiled_in() {
            Some(Unavailable::NotCompiled)
        } else if self.disabled.contains(&format) {
            Some(Unavailable::Disabled)
        } else {
            None
        }
    }

    pub fn is_available(&self, format: Format) -> bool {
        self.unavailable_reason(format).is_none()
    }

    pub fn support(&self) -> Vec<FormatSupport> {
        Format::ALL
            .into_iter()
            .map(|format| {
                let reason = self.unavailable_reason(format);
                FormatSupport {
                    format,
                    available: reason.is_none(),
                    reason,
                }
            })
            .collect()
    }

    /// Extract text from `path`, inferring the format from its extension
    pub fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let format = Format::from_path(path).ok_or_else(|| ExtractionError::Failed {
            path: path.display().to_string(),
            cause: "unrecognized file extension".to_string(),
        })?;
        self.extract_as(format, path)
    }

    /// Extract text from `path` as `format`
    pub fn extract_as(&self, format: Format, path: &Path) -> Result<String, ExtractionError> {
        if !self.is_available(format) {
            return Err(ExtractionError::FormatUnavailable { format });
        }

        let bytes = std::fs::read(path).map_err(|e| ExtractionError::Failed {
            path: path.display().to_string(),
            cause: e.to_string(),
        })?;

        dispatch(format, path, &bytes).map_err(|e| ExtractionError::Failed {
            path: path.display().to_string(),
            cause: format!("{:#}", e),
        })
    }
}

fn dispatch(format: Format, path: &Path, bytes: &[u8]) -> anyhow::Result<String> {
    match format {
        Format::PlainText | Format::Markdown => text::extract(bytes),
        Format::Structured => structured::extract(bytes),
        #[cfg(feature = "html")]
        Format::Html => html::extract(bytes),
        #[cfg(feature = "tabular")]
        Format::Tabular => {
            let is_tsv = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("tsv"));
            tabular::extract(bytes, if is_tsv { b'\t' } else { b',' })
        }
        #[cfg(feature = "pdf")]
        Format::PageDoc => pdf::extract(bytes),
        #[cfg(feature = "docx")]
        Format::FlowDoc => docx::extract(bytes),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("no extractor compiled in for {} ({})", other, path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_extension() {
        assert_eq!(Format::from_extension("txt"), Some(Format::PlainText));
        assert_eq!(Format::from_extension("MD"), Some(Format::Markdown));
        assert_eq!(Format::from_extension("markdown"), Some(Format::Markdown));
        assert_eq!(Format::from_extension("htm"), Some(Format::Html));
        assert_eq!(Format::from_extension("tsv"), Some(Format::Tabular));
        assert_eq!(Format::from_extension("json"), Some(Format::Structured));
        assert_eq!(Format::from_extension("PDF"), Some(Format::PageDoc));
        assert_eq!(Format::from_extension("docx"), Some(Format::FlowDoc));
        assert_eq!(Format::from_extension("exe"), None);
        assert_eq!(Format::from_extension(""), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            Format::from_path(Path::new("docs/guide.Md")),
            Some(Format::Markdown)
        );
        assert_eq!(Format::from_path(Path::new("README")), None);
    }

    #[test]
    fn test_format_serde_names() {
        let json = serde_json::to_string(&Format::PageDoc).unwrap();
        assert_eq!(json, "\"pdf\"");
        let parsed: Format = serde_json::from_str("\"docx\"").unwrap();
        assert_eq!(parsed, Format::FlowDoc);
        for format in Format::ALL {
            let s = serde_json::to_string(&format).unwrap();
            assert_eq!(s, format!("\"{}\"", format));
            assert_eq!(format.as_str().parse::<Format>().unwrap(), format);
        }
    }

    #[test]
    fn test_builtin_formats_always_available() {
        let registry = ExtractorRegistry::default();
        assert!(registry.is_available(Format::PlainText));
        assert!(registry.is_available(Format::Markdown));
        assert!(registry.is_available(Format::Structured));
    }

    #[test]
    fn test_disabled_format_unavailable() {
        let registry = ExtractorRegistry::new(&[Format::Markdown]);
        assert!(!registry.is_available(Format::Markdown));
        assert_eq!(
            registry.unavailable_reason(Format::Markdown),
            Some(Unavailable::Disabled)
        );

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.md");
        fs::write(&path, "# Notes").unwrap();
        let err = registry.extract(&path).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::FormatUnavailable {
                format: Format::Markdown
            }
        ));
    }

    #[test]
    fn test_support_lists_every_format() {
        let registry = ExtractorRegistry::new(&[Format::PageDoc]);
        let support = registry.support();
        assert_eq!(support.len(), Format::ALL.len());
        let pdf = support.iter().find(|s| s.format == Format::PageDoc).unwrap();
        assert!(!pdf.available);
        assert!(pdf.reason.is_some());
    }

    #[test]
    fn test_extract_plain_text_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hello\n\nworld").unwrap();

        let registry = ExtractorRegistry::default();
        assert_eq!(registry.extract(&path).unwrap(), "hello\n\nworld");
    }

    #[test]
    fn test_extract_missing_file_fails() {
        let registry = ExtractorRegistry::default();
        let err = registry
            .extract(Path::new("/nonexistent/dir/file.txt"))
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Failed { .. }));
    }

    #[test]
    fn test_extract_unknown_extension_fails() {
        let registry = ExtractorRegistry::default();
        let err = registry.extract(Path::new("image.png")).unwrap_err();
        assert!(err.to_string().contains("unrecognized"));
    }

    #[test]
    fn test_malformed_json_is_extraction_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let registry = ExtractorRegistry::default();
        let err = registry.extract(&path).unwrap_err();
        match err {
            ExtractionError::Failed { path: p, .. } => assert!(p.ends_with("bad.json")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(feature = "tabular")]
    #[test]
    fn test_extract_file_tsv() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("people.tsv");
        fs::write(&path, "name\tage\nAda\t36\n").unwrap();

        let registry = ExtractorRegistry::default();
        let text = registry.extract(&path).unwrap();
        assert_eq!(text, "name: Ada\nage: 36");
    }
}
