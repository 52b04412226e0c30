//! Markdown table and heading writers.

/// Escape a value for use inside a table cell.
///
/// Pipes would split the cell and newlines would end the row.
pub fn escape_cell(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace('\n', " ")
}

/// Escape a value for inline use in a heading or emphasis span.
///
/// Backslash-escapes the characters that open emphasis, code, links, HTML
/// or a closing heading sequence. Newlines become spaces.
pub fn escape_inline(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            '\r' => {}
            '\n' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// An ATX heading line (with terminator) at `level`, clamped to 1..=6.
pub fn heading(level: u8, text: &str) -> String {
    let level = level.clamp(1, 6) as usize;
    format!("{} {text}\n", "#".repeat(level))
}

/// Render a pipe table.
///
/// Rows shorter than the header are padded with empty cells; longer rows are
/// truncated. Cells are escaped.
pub fn table(header: &[&str], rows: &[Vec<String>]) -> String {
    let col_count = header.len();
    let mut md = String::new();

    // Header row
    md.push_str("| ");
    md.push_str(&header.join(" | "));
    md.push_str(" |\n");

    // Separator row
    md.push_str("| ");
    md.push_str(
        &(0..col_count)
            .map(|_| "---")
            .collect::<Vec<_>>()
            .join(" | "),
    );
    md.push_str(" |\n");

    for row in rows {
        let cells: Vec<String> = (0..col_count)
            .map(|i| row.get(i).map(|c| escape_cell(c)).unwrap_or_default())
            .collect();
        md.push('|');
        for cell in &cells {
            if cell.is_empty() {
                md.push_str("  |");
            } else {
                md.push(' ');
                md.push_str(cell);
                md.push_str(" |");
            }
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_separator_and_rows() {
        let md = table(
            &["Name", "Value"],
            &[
                vec!["foo".into(), "bar".into()],
                vec!["baz".into(), "qux".into()],
            ],
        );
        assert_eq!(
            md,
            "| Name | Value |\n| --- | --- |\n| foo | bar |\n| baz | qux |\n"
        );
    }

    #[test]
    fn short_rows_are_padded() {
        let md = table(&["A", "B", "C"], &[vec!["x".into(), String::new()]]);
        assert!(md.ends_with("| x |  |  |\n"), "got: {md}");
    }

    #[test]
    fn pipes_and_newlines_are_escaped() {
        assert_eq!(escape_cell("a|b"), "a\\|b");
        assert_eq!(escape_cell("line1\nline2"), "line1 line2");
        assert_eq!(escape_cell("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn heading_levels_are_clamped() {
        assert_eq!(heading(3, "prod"), "### prod\n");
        assert_eq!(escape_inline("eu_west*1"), "eu\\_west\\*1");
        assert_eq!(escape_inline("a#\r\nb"), "a\\# b");
        assert_eq!(escape_inline("prod"), "prod");
        assert_eq!(heading(9, "deep"), "###### deep\n");
        assert_eq!(heading(0, "top"), "# top\n");
    }
}
