//! Flow-text documents (.docx): paragraph text in document order

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::{Cursor, Read};

const DOCUMENT_XML: &str = "word/document.xml";
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

pub fn extract(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("not a valid .docx archive")?;
    let entry = archive
        .by_name(DOCUMENT_XML)
        .with_context(|| format!("{} not found", DOCUMENT_XML))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .with_context(|| format!("failed to read {}", DOCUMENT_XML))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!("{} exceeds size limit", DOCUMENT_XML);
    }

    paragraphs_from_xml(&xml)
}

/// Concatenate `w:t` runs per `w:p` paragraph; paragraphs joined by blank lines
fn paragraphs_from_xml(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                // A nested paragraph (text box, table cell) ends the text before it
                b"p" => flush_paragraph(&mut current, &mut paragraphs),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().context("invalid text escape in document")?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => flush_paragraph(&mut current, &mut paragraphs),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => bail!(
                "malformed document XML at position {}: {}",
                reader.buffer_position(),
                e
            ),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs.join("\n\n"))
}

fn flush_paragraph(current: &mut String, paragraphs: &mut Vec<String>) {
    let text = current.trim();
    if !text.is_empty() {
        paragraphs.push(text.to_string());
    }
    current.clear();
}
