//! Resolved attribute values.
//!
//! Raw document values are `serde_yaml::Value`; resolution turns them into
//! `ResolvedValue`, which can additionally hold computed dates and handles to
//! already-created objects.

use chrono::NaiveDate;

use crate::object::{describe, SharedObject};

/// A document value after reference resolution.
#[derive(Debug, Clone)]
pub enum ResolvedValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Sequence(Vec<ResolvedValue>),
    Mapping(Attributes),
    Object(SharedObject),
}

impl ResolvedValue {
    /// Convert a raw YAML value without applying any resolution rules.
    pub fn from_yaml(value: &serde_yaml::Value) -> Self {
        match value {
            serde_yaml::Value::Null => ResolvedValue::Null,
            serde_yaml::Value::Bool(b) => ResolvedValue::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ResolvedValue::Integer(i)
                } else {
                    ResolvedValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_yaml::Value::String(s) => ResolvedValue::String(s.clone()),
            serde_yaml::Value::Sequence(items) => {
                ResolvedValue::Sequence(items.iter().map(Self::from_yaml).collect())
            }
            serde_yaml::Value::Mapping(map) => {
                let mut attributes = Attributes::new();
                for (key, entry) in map {
                    attributes.insert(yaml_key_to_string(key), Self::from_yaml(entry));
                }
                ResolvedValue::Mapping(attributes)
            }
            serde_yaml::Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// String form used for textual interpolation. Dates render as ISO-8601.
    pub fn render(&self) -> String {
        match self {
            ResolvedValue::Null => String::new(),
            ResolvedValue::Bool(b) => b.to_string(),
            ResolvedValue::Integer(i) => i.to_string(),
            ResolvedValue::Float(f) => f.to_string(),
            ResolvedValue::String(s) => s.clone(),
            ResolvedValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            ResolvedValue::Sequence(items) => {
                let parts: Vec<String> = items.iter().map(ResolvedValue::render).collect();
                format!("[{}]", parts.join(", "))
            }
            ResolvedValue::Mapping(attributes) => {
                let parts: Vec<String> = attributes
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.render()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            ResolvedValue::Object(object) => describe(object),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON projection for machine-readable output; object handles collapse
    /// to their display form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ResolvedValue::Null => serde_json::Value::Null,
            ResolvedValue::Bool(b) => serde_json::Value::Bool(*b),
            ResolvedValue::Integer(i) => serde_json::Value::from(*i),
            ResolvedValue::Float(f) => serde_json::Value::from(*f),
            ResolvedValue::String(s) => serde_json::Value::String(s.clone()),
            ResolvedValue::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
            ResolvedValue::Sequence(items) => {
                serde_json::Value::Array(items.iter().map(ResolvedValue::to_json).collect())
            }
            ResolvedValue::Mapping(attributes) => {
                let mut map = serde_json::Map::with_capacity(attributes.len());
                for (key, value) in attributes.iter() {
                    map.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(map)
            }
            ResolvedValue::Object(object) => serde_json::Value::String(describe(object)),
        }
    }
}

impl PartialEq for ResolvedValue {
    fn eq(&self, other: &Self) -> bool {
        use ResolvedValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Date(a), Date(b)) => a == b,
            (Sequence(a), Sequence(b)) => a == b,
            (Mapping(a), Mapping(b)) => a == b,
            (Object(a), Object(b)) => std::rc::Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

fn yaml_key_to_string(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Insertion-ordered name/value map. Declared order is load-bearing for the
/// engine, so this never reorders entries; inserting an existing name
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(Vec<(String, ResolvedValue)>);

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ResolvedValue) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedValue> {
        self.0
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, ResolvedValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a (String, ResolvedValue);
    type IntoIter = std::slice::Iter<'a, (String, ResolvedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<(String, ResolvedValue)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, ResolvedValue)>>(iter: T) -> Self {
        let mut attributes = Attributes::new();
        for (name, value) in iter {
            attributes.insert(name, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_yaml_preserves_scalar_types() {
        let value: serde_yaml::Value = serde_yaml::from_str("42").unwrap();
        assert_eq!(ResolvedValue::from_yaml(&value), ResolvedValue::Integer(42));

        let value: serde_yaml::Value = serde_yaml::from_str("2.5").unwrap();
        assert_eq!(ResolvedValue::from_yaml(&value), ResolvedValue::Float(2.5));

        let value: serde_yaml::Value = serde_yaml::from_str("true").unwrap();
        assert_eq!(ResolvedValue::from_yaml(&value), ResolvedValue::Bool(true));
    }

    #[test]
    fn from_yaml_keeps_mapping_order() {
        let value: serde_yaml::Value = serde_yaml::from_str("z: 1\na: 2\nm: 3\n").unwrap();
        let ResolvedValue::Mapping(attributes) = ResolvedValue::from_yaml(&value) else {
            panic!("expected mapping");
        };
        assert_eq!(attributes.names(), vec!["z", "a", "m"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut attributes = Attributes::new();
        attributes.insert("name", ResolvedValue::String("first".into()));
        attributes.insert("count", ResolvedValue::Integer(1));
        attributes.insert("name", ResolvedValue::String("second".into()));

        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes.names(), vec!["name", "count"]);
        assert_eq!(
            attributes.get("name"),
            Some(&ResolvedValue::String("second".into()))
        );
    }

    #[test]
    fn render_formats_dates_iso() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(ResolvedValue::Date(date).render(), "2025-01-31");
    }

    #[test]
    fn to_json_round_trips_scalars() {
        let value = ResolvedValue::Sequence(vec![
            ResolvedValue::Integer(1),
            ResolvedValue::String("x".into()),
            ResolvedValue::Null,
        ]);
        assert_eq!(value.to_json(), serde_json::json!([1, "x", null]));
    }
}
