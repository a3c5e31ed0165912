//! Delimited records (CSV/TSV) rendered as `field: value` blocks

use anyhow::{Context, Result};

pub fn extract(bytes: &[u8], delimiter: u8) -> Result<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .context("failed to read header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut blocks = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed record {}", row + 1))?;
        let lines: Vec<String> = record
            .iter()
            .enumerate()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(i, value)| {
                let field = headers
                    .get(i)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                format!("{}: {}", field, value.trim())
            })
            .collect();

        if !lines.is_empty() {
            blocks.push(lines.join("\n"));
        }
    }

    Ok(blocks.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_become_blocks() {
        let csv = "question,answer\nWhat is CBT?,A talk therapy\nHow long?,12 weeks\n";
        assert_eq!(
            extract(csv.as_bytes(), b',').unwrap(),
            "question: What is CBT?\nanswer: A talk therapy\n\nquestion: How long?\nanswer: 12 weeks"
        );
    }

    #[test]
    fn test_quoted_fields_and_blank_cells() {
        let csv = "name,note\n\"Smith, J\",\nLee,\"line one\"\n";
        assert_eq!(
            extract(csv.as_bytes(), b',').unwrap(),
            "name: Smith, J\n\nname: Lee\nnote: line one"
        );
    }

    #[test]
    fn test_extra_columns_get_positional_names() {
        let csv = "a\n1,2\n";
        assert_eq!(extract(csv.as_bytes(), b',').unwrap(), "a: 1\ncolumn_2: 2");
    }

    #[test]
    fn test_header_only_is_empty() {
        assert_eq!(extract(b"a,b\n", b',').unwrap(), "");
    }

    #[test]
    fn test_tab_delimiter() {
        assert_eq!(extract(b"k\tv\nx\ty\n", b'\t').unwrap(), "k: x\nv: y");
    }
}
