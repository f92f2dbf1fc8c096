//! `sprout list`: discover suite documents under a directory.

use std::path::Path;

use walkdir::WalkDir;

/// Relative paths (without the `.yml` extension) of every suite under `dir`,
/// sorted. Nested directories are included.
pub fn suites(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("yml"))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(dir)
                .ok()
                .map(|rel| rel.with_extension(""))
        })
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .collect();
    names.sort();
    names
}

pub fn run(dir: &Path) {
    let names = suites(dir);
    if names.is_empty() {
        println!("No suites found in {}", dir.display());
        return;
    }
    for name in names {
        println!("{name}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nested_suites_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("beta.yml"), "data: {}\n").unwrap();
        std::fs::write(dir.path().join("alpha.yml"), "data: {}\n").unwrap();
        std::fs::write(dir.path().join("nested/gamma.yml"), "data: {}\n").unwrap();
        std::fs::write(dir.path().join("readme.md"), "not a suite").unwrap();

        assert_eq!(suites(dir.path()), vec!["alpha", "beta", "nested/gamma"]);
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(suites(Path::new("/nonexistent/suites")).is_empty());
    }
}
