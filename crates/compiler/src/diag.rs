//! Caret diagnostics.
//!
//! Every fatal error in the pipeline is rendered the same way: the offending
//! source line, a caret under the offending column, and a one-line message.
//! The rendered string travels up through `Result` and is printed to stderr
//! at the CLI boundary.

/// Render a three-line diagnostic for the byte position `offset` in `source`.
///
/// `offset` may point one past the end of the source (end-of-input errors);
/// the caret then lands just after the last character of the last line.
pub fn render(source: &str, offset: usize, msg: &str) -> String {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |p| p + 1);
    let line_end = source[offset..]
        .find('\n')
        .map_or(source.len(), |p| offset + p);
    let line = &source[line_start..line_end];
    let column = source[line_start..offset].chars().count();

    let mut out = String::new();
    out.push_str(line);
    out.push('\n');
    for _ in 0..column {
        out.push(' ');
    }
    out.push('^');
    out.push('\n');
    out.push_str(msg);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_points_at_column() {
        let rendered = render("int a; int a;", 11, "duplicate declaration: a");
        assert_eq!(
            rendered,
            "int a; int a;\n           ^\nduplicate declaration: a"
        );
    }

    #[test]
    fn test_only_offending_line_is_shown() {
        let src = "int g;\nint main() { return x; }\n";
        let rendered = render(src, src.find('x').unwrap(), "undeclared identifier: x");
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "int main() { return x; }");
        assert_eq!(lines[1], "                    ^");
        assert_eq!(lines[2], "undeclared identifier: x");
    }

    #[test]
    fn test_column_counts_characters_not_bytes() {
        // Multi-byte scalars before the offset must advance the caret by one
        // column each, not one per byte.
        let src = "int a\u{3042}\u{3044} = $;";
        let offset = src.find('$').unwrap();
        let rendered = render(src, offset, "Unexpected char: $");
        let caret_line = rendered.lines().nth(1).unwrap();
        assert_eq!(caret_line.len(), src[..offset].chars().count() + 1);
    }

    #[test]
    fn test_offset_past_end_is_clamped() {
        let rendered = render("int main(", 1000, "unexpected end of input");
        assert!(rendered.ends_with("unexpected end of input"));
        assert!(rendered.starts_with("int main(\n"));
    }
}
