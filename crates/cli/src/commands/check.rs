//! `sprout check`: structural validation without creating anything.

use std::path::Path;

use sprout_core::engine::validate_document;
use sprout_core::error::{ErrorKind, ParseError};

pub fn problems(file: &Path) -> Vec<ParseError> {
    let source_id = file.display().to_string();
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            let kind = if err.kind() == std::io::ErrorKind::NotFound {
                ErrorKind::FileNotFound
            } else {
                ErrorKind::ReadError
            };
            return vec![ParseError::new(kind, format!("Could not read {source_id}: {err}"))
                .with_source(&source_id)
                .with_suggestions(["Check the file path and permissions"])];
        }
    };
    validate_document(&text, &source_id)
}

/// Prints each problem as a report; returns whether the document is clean.
pub fn run(file: &Path) -> bool {
    let problems = problems(file);
    if problems.is_empty() {
        println!("{} looks structurally valid", file.display());
        return true;
    }
    for problem in &problems {
        println!("{}", crate::report::render(problem));
    }
    false
}
