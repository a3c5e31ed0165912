//! HTML pages: drop script/style, one paragraph per block-level element

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Node};

const SKIPPED: &[&str] = &["script", "style", "noscript", "template", "svg"];

const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "details",
    "div", "dl", "dt", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5",
    "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "td", "th", "title", "tr", "ul",
];

pub fn extract(bytes: &[u8]) -> Result<String> {
    let source = std::str::from_utf8(bytes).context("HTML is not valid UTF-8")?;
    let document = Html::parse_document(source);

    let mut collector = BlockCollector::default();
    collector.walk(document.root_element());
    collector.flush();

    Ok(collector.blocks.join("\n\n"))
}

#[derive(Default)]
struct BlockCollector {
    blocks: Vec<String>,
    current: String,
}

impl BlockCollector {
    fn walk(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }

        let is_block = BLOCKS.contains(&name);
        if is_block {
            self.flush();
        }

        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.current.push_str(text),
                Node::Element(_) => {
                    if let Some(child_element) = ElementRef::wrap(child) {
                        self.walk(child_element);
                    }
                }
                _ => {}
            }
        }

        if is_block {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let text = self.current.split_whitespace().collect::<Vec<_>>().join(" ");
        if !text.is_empty() {
            self.blocks.push(text);
        }
        self.current.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_joined_with_blank_lines() {
        let html = "<html><body><h1>Coping</h1><p>Take a <b>slow</b> breath.</p><p>Then rest.</p></body></html>";
        assert_eq!(
            extract(html.as_bytes()).unwrap(),
            "Coping\n\nTake a slow breath.\n\nThen rest."
        );
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = "<html><head><style>p { color: red }</style><script>alert('x')</script></head>\
                    <body><p>Visible</p><script>var hidden = 1;</script></body></html>";
        assert_eq!(extract(html.as_bytes()).unwrap(), "Visible");
    }

    #[test]
    fn test_title_and_list_items() {
        let html = "<html><head><title>Guide</title></head><body><ul><li>One</li><li>Two</li></ul></body></html>";
        assert_eq!(extract(html.as_bytes()).unwrap(), "Guide\n\nOne\n\nTwo");
    }

    #[test]
    fn test_whitespace_collapsed() {
        let html = "<p>\n   spread\n\n   out   text  </p>";
        assert_eq!(extract(html.as_bytes()).unwrap(), "spread out text");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(extract(b"<html><body></body></html>").unwrap(), "");
    }
}
