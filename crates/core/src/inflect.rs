//! Minimal singularization for default factory names and registry types.
//!
//! A closed suffix table, not a full inflector: good enough for the plural
//! section names seed documents actually use (`accounts`, `entries`,
//! `branches`, `statuses`).

pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{stem}y");
        }
    }
    for suffix in ["ches", "shes", "sses", "xes", "zes", "ses"] {
        if let Some(stem) = word.strip_suffix("es") {
            if word.ends_with(suffix) && !stem.is_empty() {
                return stem.to_string();
            }
        }
    }
    if word.len() > 1 && word.ends_with('s') && !word.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

#[cfg(test)]
mod tests {
    use super::singularize;

    #[test]
    fn common_plural_forms() {
        assert_eq!(singularize("accounts"), "account");
        assert_eq!(singularize("entries"), "entry");
        assert_eq!(singularize("branches"), "branch");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("classes"), "class");
        assert_eq!(singularize("statuses"), "status");
    }

    #[test]
    fn already_singular_passes_through() {
        assert_eq!(singularize("account"), "account");
        assert_eq!(singularize("address"), "address");
        assert_eq!(singularize("s"), "s");
    }
}
