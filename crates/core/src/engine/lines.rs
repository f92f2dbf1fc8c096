//! Best-effort line lookup over raw document text.
//!
//! YAML values lose their positions once deserialized, so item diagnostics
//! re-scan the source. Lookups are lexical (indentation-based) and return
//! `None` rather than guessing when the text does not match the expected
//! shape. All line numbers are 1-based.

pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
        }
    }

    /// Line of a top-level section key.
    pub fn section_line(&self, section: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| is_key_at_indent(line, section, 0))
            .map(|idx| idx + 1)
    }

    /// Line of `key:` inside `section`, scanning until the next top-level key.
    pub fn key_line(&self, section: &str, key: &str) -> Option<usize> {
        let (start, end) = self.section_span(section)?;
        self.lines[start..end]
            .iter()
            .position(|line| {
                let trimmed = line.trim_start();
                indent_of(line) > 0 && is_key_at_indent(trimmed, key, 0)
            })
            .map(|idx| start + idx + 1)
    }

    /// Line of the `index`-th `- ` list item under `key` inside `section`.
    pub fn list_item_line(&self, section: &str, key: &str, index: usize) -> Option<usize> {
        let (start, end) = self.section_span(section)?;
        let key_offset = self.lines[start..end].iter().position(|line| {
            let trimmed = line.trim_start();
            indent_of(line) > 0 && is_key_at_indent(trimmed, key, 0)
        })?;
        let key_abs = start + key_offset;
        let key_indent = indent_of(self.lines[key_abs]);

        let mut seen = 0;
        for (offset, line) in self.lines[key_abs + 1..end].iter().enumerate() {
            if !line.trim().is_empty() && indent_of(line) <= key_indent {
                break;
            }
            if line.trim_start().starts_with("- ") || line.trim_start() == "-" {
                if seen == index {
                    return Some(key_abs + offset + 2);
                }
                seen += 1;
            }
        }
        None
    }

    /// Half-open line range `[start, end)` of a section's body, section key
    /// line included.
    fn section_span(&self, section: &str) -> Option<(usize, usize)> {
        let start = self
            .lines
            .iter()
            .position(|line| is_key_at_indent(line, section, 0))?;
        let end = self.lines[start + 1..]
            .iter()
            .position(|line| !line.trim().is_empty() && indent_of(line) == 0)
            .map(|offset| start + 1 + offset)
            .unwrap_or(self.lines.len());
        Some((start, end))
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_key_at_indent(line: &str, key: &str, indent: usize) -> bool {
    if indent_of(line) != indent {
        return false;
    }
    let trimmed = line.trim_start();
    trimmed
        .strip_prefix(key)
        .map(|rest| rest.starts_with(':'))
        .unwrap_or(false)
}
