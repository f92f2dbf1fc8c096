//! Named suite loading on top of the engine.
//!
//! A suite is a `<name>.yml` document inside a fixed directory. The loader
//! adds discovery, existence checks, and structural validation; everything
//! else delegates to [`Core`].

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::engine::{validate_document, Core, ParseOptions};
use crate::error::{ErrorKind, ParseError};
use crate::object::SharedObject;

pub struct Loader {
    directory: PathBuf,
}

impl Loader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Load and run one suite by name.
    pub fn load_suite(
        &self,
        name: &str,
        core: &mut Core,
        options: ParseOptions,
    ) -> Result<Vec<SharedObject>, ParseError> {
        let path = self.suite_path(name);
        if !path.is_file() {
            return Err(self.suite_not_found(name));
        }
        let started = Instant::now();
        let ledger = core.parse_file(&path, options)?;
        info!(
            suite = name,
            created = ledger.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "suite loaded"
        );
        Ok(ledger)
    }

    /// Load several suites in the given order; stops at the first failure.
    pub fn load_multiple(
        &self,
        names: &[&str],
        core: &mut Core,
        options: ParseOptions,
    ) -> Result<Vec<(String, Vec<SharedObject>)>, ParseError> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            let ledger = self.load_suite(name, core, options)?;
            results.push((name.to_string(), ledger));
        }
        Ok(results)
    }

    /// Run document text directly, bypassing the suite directory.
    pub fn load_from_content(
        &self,
        text: &str,
        core: &mut Core,
        options: ParseOptions,
    ) -> Result<Vec<SharedObject>, ParseError> {
        core.parse(text, "<inline>", options)
    }

    /// Sorted stem names of every `.yml` file in the suite directory.
    pub fn list_available(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.directory) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("yml"))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn suite_exists(&self, name: &str) -> bool {
        self.suite_path(name).is_file()
    }

    /// Structural shape check without creating anything; returns the list of
    /// problems found (empty means the suite parses and has data sections).
    pub fn validate_suite(&self, name: &str) -> Result<Vec<ParseError>, ParseError> {
        let path = self.suite_path(name);
        if !path.is_file() {
            return Err(self.suite_not_found(name));
        }
        let source_id = path.display().to_string();
        let text = std::fs::read_to_string(&path).map_err(|err| {
            ParseError::new(
                ErrorKind::ReadError,
                format!("Could not read {source_id}: {err}"),
            )
            .with_source(&source_id)
            .with_suggestions(["Check file permissions", "Verify the file is valid UTF-8"])
        })?;
        Ok(validate_document(&text, &source_id))
    }

    fn suite_path(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{name}.yml"))
    }

    fn suite_not_found(&self, name: &str) -> ParseError {
        let available = self.list_available();
        let listed = if available.is_empty() {
            format!("No suites found in {}", self.directory.display())
        } else {
            format!("Available suites: {}", available.join(", "))
        };
        ParseError::new(
            ErrorKind::SuiteNotFound,
            format!("Suite '{name}' not found in {}.", self.directory.display()),
        )
        .with_suggestions([
            "Check the suite name for typos".to_string(),
            format!("Suites are .yml files inside {}", self.directory.display()),
            listed,
        ])
    }
}
