//! Indentation-aware text builder for generated Swift.

const INDENT: &str = "    ";

/// Builds generated source line by line.
///
/// ```ignore
/// let mut w = CodeWriter::new();
/// w.open("var count: Int");
/// w.line("feature.count");
/// w.close();
/// assert_eq!(w.finish(), "var count: Int {\n    feature.count\n}");
/// ```
#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    depth: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current depth.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{}", INDENT.repeat(self.depth), text));
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// `header {` and indent. An empty header opens a bare `{`.
    pub fn open(&mut self, header: impl AsRef<str>) {
        match header.as_ref() {
            "" => self.line("{"),
            header => self.line(format!("{header} {{")),
        }
        self.depth += 1;
    }

    /// Dedent and `}`.
    pub fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Write a raw multi-line block (a user body, a nested declaration)
    /// re-indented to the current depth.
    pub fn block(&mut self, text: &str) {
        for line in reindent(text) {
            self.line(line);
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Strip the common leading whitespace of `text` and drop leading and
/// trailing blank lines. Whitespace-only lines become empty.
pub fn reindent(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_end()).collect();
    let first = lines.iter().position(|l| !l.is_empty());
    let last = lines.iter().rposition(|l| !l.is_empty());
    let (Some(first), Some(last)) = (first, last) else {
        return Vec::new();
    };
    let lines = &lines[first..=last];

    let common = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.get(common..).unwrap_or("").to_string())
        .collect()
}

/// Prefix every non-empty line of `text` with `indent`.
pub fn indent_lines(text: &str, indent: &str) -> String {
    text.lines()
        .map(|l| {
            if l.is_empty() {
                String::new()
            } else {
                format!("{indent}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_blocks() {
        let mut w = CodeWriter::new();
        w.open("class A");
        w.open("init()");
        w.line("x = 1");
        w.close();
        w.blank();
        w.line("let y = 2");
        w.close();
        assert_eq!(
            w.finish(),
            "class A {\n    init() {\n        x = 1\n    }\n\n    let y = 2\n}"
        );
    }

    #[test]
    fn test_reindent_strips_common_prefix() {
        let body = "\n        counter += 1\n        if counter > 3 {\n            reset()\n        }\n    ";
        assert_eq!(
            reindent(body),
            vec!["counter += 1", "if counter > 3 {", "    reset()", "}"]
        );
    }

    #[test]
    fn test_reindent_single_line_body() {
        assert_eq!(reindent(" counter "), vec!["counter"]);
        assert!(reindent("   \n  ").is_empty());
    }

    #[test]
    fn test_block_at_depth() {
        let mut w = CodeWriter::new();
        w.open("func f()");
        w.block("\n    a()\n\n    b()\n");
        w.close();
        assert_eq!(w.finish(), "func f() {\n    a()\n\n    b()\n}");
    }

    #[test]
    fn test_indent_lines_skips_empty() {
        assert_eq!(indent_lines("a\n\nb", "  "), "  a\n\n  b");
    }
}
