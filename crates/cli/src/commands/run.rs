//! `sprout run`: execute a document against the in-memory backend.

use std::path::Path;

use sprout_core::engine::ParseOptions;
use sprout_core::error::ParseError;
use sprout_core::inflect::singularize;
use test_seed::backend;

#[derive(Debug)]
pub struct Outcome {
    /// One entry per created object, in creation order.
    pub created: Vec<serde_json::Value>,
    /// Registry contents after the run: key, identity, context.
    pub registered: Vec<(String, String, String)>,
}

pub fn execute(file: &Path, read_only: bool) -> Result<Outcome, ParseError> {
    let names = match std::fs::read_to_string(file) {
        Ok(text) => factory_names(&text),
        Err(_) => Vec::new(), // parse_file reports the read failure
    };
    let mut backend = backend(&names);

    let ledger = backend
        .core
        .parse_file(file, ParseOptions { read_only })?;

    let created = ledger
        .iter()
        .map(|object| {
            let object = object.borrow();
            let mut attributes = serde_json::Map::new();
            for name in object.attribute_names() {
                if let Some(value) = object.attribute(&name) {
                    attributes.insert(name, value.to_json());
                }
            }
            serde_json::json!({
                "type": object.type_name(),
                "id": object.identity().map(|i| i.id.to_string()),
                "attributes": attributes,
            })
        })
        .collect();

    let registered = backend
        .registry
        .borrow()
        .entries()
        .into_iter()
        .map(|entry| (entry.key, entry.identity.to_string(), entry.context))
        .collect();

    Ok(Outcome {
        created,
        registered,
    })
}

pub fn run(file: &Path, read_only: bool, json: bool) -> bool {
    match execute(file, read_only) {
        Ok(outcome) => {
            if json {
                let payload = serde_json::json!({
                    "created": outcome.created,
                    "registered": outcome
                        .registered
                        .iter()
                        .map(|(key, identity, context)| serde_json::json!({
                            "key": key,
                            "identity": identity,
                            "context": context,
                        }))
                        .collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload).expect("ledger is valid json"));
            } else {
                println!("Created {} object(s){}:", outcome.created.len(), if read_only { " (read-only, reverted)" } else { "" });
                for entry in &outcome.created {
                    let type_name = entry["type"].as_str().unwrap_or("?");
                    let id = entry["id"].as_str().unwrap_or("(unsaved)");
                    println!("  {type_name}#{id}");
                }
                if !outcome.registered.is_empty() {
                    println!("Registry:");
                    for (key, identity, context) in &outcome.registered {
                        println!("  {key} -> {identity} [{context}]");
                    }
                }
            }
            true
        }
        Err(err) => {
            println!("{}", crate::report::render(&err));
            false
        }
    }
}

/// Factory names a document needs: the singularized model type of every item
/// group plus every explicit `factory:` value.
fn factory_names(text: &str) -> Vec<String> {
    let Ok(serde_yaml::Value::Mapping(root)) = serde_yaml::from_str::<serde_yaml::Value>(text)
    else {
        return Vec::new();
    };
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: String, names: &mut Vec<String>| {
        if !names.contains(&name) {
            names.push(name);
        }
    };
    for (section_key, section) in &root {
        if section_key.as_str() == Some("metadata") {
            continue;
        }
        let Some(section) = section.as_mapping() else {
            continue;
        };
        for (type_key, items) in section {
            if let Some(model_type) = type_key.as_str() {
                push(singularize(model_type), &mut names);
            }
            collect_explicit_factories(items, &mut names, &mut push);
        }
    }
    names
}

fn collect_explicit_factories<F>(
    value: &serde_yaml::Value,
    names: &mut Vec<String>,
    push: &mut F,
) where
    F: FnMut(String, &mut Vec<String>),
{
    match value {
        serde_yaml::Value::Mapping(map) => {
            if let Some(factory) = map.get("factory").and_then(|v| v.as_str()) {
                push(factory.to_string(), names);
            }
            for (_, entry) in map {
                collect_explicit_factories(entry, names, push);
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_explicit_factories(item, names, push);
            }
        }
        _ => {}
    }
}
