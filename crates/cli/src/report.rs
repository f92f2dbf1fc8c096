//! Plain-text rendering of engine diagnostics.

use sprout_core::error::ParseError;

/// Multi-part remediation report: what failed, where, and the ordered list
/// of things to try.
pub fn render(err: &ParseError) -> String {
    let mut out = String::new();
    out.push_str("Seed document error\n");
    if let Some(source) = &err.source_id {
        out.push_str(&format!("File: {source}\n"));
    }
    match (err.line, err.column) {
        (Some(line), Some(column)) => {
            out.push_str(&format!("Location: line {line}, column {column}\n"));
        }
        (Some(line), None) => out.push_str(&format!("Location: line {line}\n")),
        _ => {}
    }
    out.push_str(&format!("Problem: {}\n", err.message));
    if !err.suggestions.is_empty() {
        out.push_str("\nHow to fix this:\n");
        for (index, suggestion) in err.suggestions.iter().enumerate() {
            out.push_str(&format!("  {}. {suggestion}\n", index + 1));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprout_core::error::ErrorKind;

    #[test]
    fn renders_all_parts() {
        let err = ParseError::new(ErrorKind::ReferenceNotFound, "Reference '@x' not found.")
            .with_source("demo.yml")
            .with_line(12)
            .with_suggestions(["Define '@x' earlier", "Check the spelling"]);

        let report = render(&err);
        assert!(report.starts_with("Seed document error\n"));
        assert!(report.contains("File: demo.yml"));
        assert!(report.contains("Location: line 12"));
        assert!(report.contains("Problem: Reference '@x' not found."));
        assert!(report.contains("How to fix this:"));
        assert!(report.contains("1. Define '@x' earlier"));
        assert!(report.contains("2. Check the spelling"));
    }

    #[test]
    fn omits_missing_parts() {
        let err = ParseError::new(ErrorKind::Unexpected, "boom");
        let report = render(&err);
        assert!(!report.contains("File:"));
        assert!(!report.contains("Location:"));
        assert!(!report.contains("How to fix this:"));
    }
}
