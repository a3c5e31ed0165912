//! Plain text and Markdown (syntax preserved)

use anyhow::Result;

/// Invalid UTF-8 sequences become U+FFFD rather than failing the file
pub fn extract(bytes: &[u8]) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if let std::borrow::Cow::Owned(_) = text {
        tracing::debug!("Replaced invalid UTF-8 sequences in text file");
    }
    Ok(text.replace("\r\n", "\n"))
}
