//! Document orchestrator.
//!
//! `Core::parse` drives the full pipeline: syntax parse, structural checks,
//! section walk in declared order, per-item strategy dispatch, reference
//! bookkeeping, and the transaction scope around the whole call. Every
//! failure leaves as a `ParseError`; internal faults never escape raw.

pub mod lines;
pub mod strategy;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, ParseError};
use crate::inflect::singularize;
use crate::object::{describe, SharedObject};
use crate::registry::Registry;
use crate::resolver::expression::{evaluate, Scope};
use crate::resolver::{ExecutionContext, ReferenceResolver};
use crate::transaction::{NoopTransaction, TransactionScope};
use crate::value::{Attributes, ResolvedValue};

pub use lines::LineIndex;
pub use strategy::{CapabilityProvider, Factory, FactoryRegistry};

static TEMPLATE_EXPR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("invalid template regex"));
static METHOD_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("invalid method-name regex"));

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Run the document normally, then revert every side effect before
    /// returning. The created-object ledger is still returned.
    pub read_only: bool,
}

pub struct Core {
    providers: Vec<Box<dyn CapabilityProvider>>,
    factories: FactoryRegistry,
    registry: Rc<RefCell<Registry>>,
    resolver: ReferenceResolver,
    transaction: Box<dyn TransactionScope>,
    default_context: String,
}

impl Core {
    pub fn new(registry: Rc<RefCell<Registry>>) -> Self {
        Self {
            providers: Vec::new(),
            factories: FactoryRegistry::new(),
            resolver: ReferenceResolver::new(registry.clone()),
            registry,
            transaction: Box::new(NoopTransaction),
            default_context: "Seed Data".to_string(),
        }
    }

    /// Providers are consulted in the order added; the first one claiming a
    /// method name wins.
    pub fn with_provider(mut self, provider: Box<dyn CapabilityProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_factory(mut self, name: impl Into<String>, factory: Box<dyn Factory>) -> Self {
        self.factories.insert(name, factory);
        self
    }

    pub fn with_transaction(mut self, transaction: Box<dyn TransactionScope>) -> Self {
        self.transaction = transaction;
        self
    }

    pub fn with_default_context(mut self, context: impl Into<String>) -> Self {
        self.default_context = context.into();
        self
    }

    /// Pin the reference date for `registry.dates.*` resolution.
    pub fn with_today(mut self, today: chrono::NaiveDate) -> Self {
        self.resolver = self.resolver.with_today(today);
        self
    }

    pub fn registry(&self) -> Rc<RefCell<Registry>> {
        self.registry.clone()
    }

    pub fn parse_file(
        &mut self,
        path: &Path,
        options: ParseOptions,
    ) -> Result<Vec<SharedObject>, ParseError> {
        let source_id = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ParseError::new(
                    ErrorKind::FileNotFound,
                    format!("File not found: {source_id}"),
                )
                .with_source(&source_id)
                .with_suggestions([
                    "Check the file path for typos",
                    "Make sure the file exists and is readable",
                ])
            } else {
                ParseError::new(
                    ErrorKind::ReadError,
                    format!("Could not read {source_id}: {err}"),
                )
                .with_source(&source_id)
                .with_suggestions(["Check file permissions", "Verify the file is valid UTF-8"])
            }
        })?;
        self.parse(&text, &source_id, options)
    }

    /// Process one document. Side effects run inside a transaction scope:
    /// commit on success, rollback on error, and unconditional rollback when
    /// `read_only` is set.
    pub fn parse(
        &mut self,
        text: &str,
        source_id: &str,
        options: ParseOptions,
    ) -> Result<Vec<SharedObject>, ParseError> {
        self.transaction
            .begin()
            .map_err(|err| unexpected(source_id, &err))?;

        let result = self.process_document(text, source_id);

        if options.read_only {
            if let Err(err) = self.transaction.rollback() {
                warn!(source = source_id, error = %err, "read-only rollback failed");
            }
        } else {
            match &result {
                Ok(_) => self
                    .transaction
                    .commit()
                    .map_err(|err| unexpected(source_id, &err))?,
                Err(_) => {
                    if let Err(err) = self.transaction.rollback() {
                        warn!(source = source_id, error = %err, "rollback failed");
                    }
                }
            }
        }

        if let Ok(ledger) = &result {
            info!(
                source = source_id,
                created = ledger.len(),
                read_only = options.read_only,
                "document processed"
            );
        }
        result
    }

    fn process_document(
        &self,
        text: &str,
        source_id: &str,
    ) -> Result<Vec<SharedObject>, ParseError> {
        let root: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|err| syntax_error(source_id, &err))?;
        let serde_yaml::Value::Mapping(root) = root else {
            return Err(ParseError::new(
                ErrorKind::InvalidStructure,
                "Document root must be a mapping of sections.",
            )
            .with_source(source_id)
            .with_line(1)
            .with_suggestions([
                "Start the document with a section key such as 'data:'",
                "Lists and plain scalars are not valid at the top level",
            ]));
        };

        let context_label = root
            .get("metadata")
            .and_then(|m| m.get("context"))
            .and_then(|c| c.as_str())
            .unwrap_or(&self.default_context)
            .to_string();

        let mut section_names: Vec<String> = Vec::new();
        for (key, _) in &root {
            let Some(name) = key.as_str() else { continue };
            if name != "metadata" {
                section_names.push(name.to_string());
            }
        }
        if section_names.is_empty() {
            return Err(ParseError::new(
                ErrorKind::NoDataSections,
                "Document contains no data sections.",
            )
            .with_source(source_id)
            .with_suggestions([
                "Add at least one section other than 'metadata'",
                "Each section maps model types to the items to create",
                "Example: data: { accounts: [ { name: Main } ] }",
            ]));
        }
        // The data section always runs first; everything else keeps its
        // declared order.
        section_names.sort_by_key(|name| name != "data");

        let lines = LineIndex::new(text);
        let mut ctx = ExecutionContext::new();
        let mut ledger: Vec<SharedObject> = Vec::new();

        for section_name in &section_names {
            let section = root
                .get(section_name.as_str())
                .expect("section key came from the root mapping");
            let serde_yaml::Value::Mapping(section) = section else {
                return Err(ParseError::new(
                    ErrorKind::InvalidStructure,
                    format!("Section '{section_name}' must map model types to items."),
                )
                .with_source(source_id)
                .with_line(lines.section_line(section_name).unwrap_or(1))
                .with_suggestions([
                    "Each section entry is a model type with a list or mapping of items",
                    "Example: accounts: [ { name: Main } ]",
                ]));
            };

            for (type_key, items) in section {
                let Some(model_type) = type_key.as_str() else {
                    return Err(ParseError::new(
                        ErrorKind::InvalidStructure,
                        format!("Model type keys in section '{section_name}' must be strings."),
                    )
                    .with_source(source_id)
                    .with_line(lines.section_line(section_name).unwrap_or(1))
                    .with_suggestions(["Use plain string keys for model types"]));
                };
                self.process_model_type(
                    section_name,
                    model_type,
                    items,
                    &mut ctx,
                    &mut ledger,
                    &context_label,
                    source_id,
                    &lines,
                )?;
            }
        }

        Ok(ledger)
    }

    #[allow(clippy::too_many_arguments)]
    fn process_model_type(
        &self,
        section: &str,
        model_type: &str,
        items: &serde_yaml::Value,
        ctx: &mut ExecutionContext,
        ledger: &mut Vec<SharedObject>,
        context_label: &str,
        source_id: &str,
        lines: &LineIndex<'_>,
    ) -> Result<(), ParseError> {
        match items {
            serde_yaml::Value::Sequence(entries) => {
                for (index, entry) in entries.iter().enumerate() {
                    let line = lines.list_item_line(section, model_type, index);
                    let object = self
                        .process_item(model_type, entry, ctx, context_label)
                        .map_err(|err| err.fill_location(source_id, line))?;
                    ledger.push(object);
                }
                Ok(())
            }
            serde_yaml::Value::Mapping(map) => {
                let line = lines.key_line(section, model_type);
                if map.contains_key("bulk_create") {
                    self.process_bulk(model_type, map, ctx, ledger, context_label)
                        .map_err(|err| err.fill_location(source_id, line))
                } else {
                    let object = self
                        .process_item(model_type, items, ctx, context_label)
                        .map_err(|err| err.fill_location(source_id, line))?;
                    ledger.push(object);
                    Ok(())
                }
            }
            _ => Err(ParseError::new(
                ErrorKind::InvalidConfig,
                format!("Items under '{model_type}' must be a list or a mapping."),
            )
            .with_source(source_id)
            .with_line(lines.key_line(section, model_type).unwrap_or(1))
            .with_suggestions([
                "Use a list of item mappings to create several objects",
                "Use a single mapping to create one object",
            ])),
        }
    }

    fn process_bulk(
        &self,
        model_type: &str,
        config: &serde_yaml::Mapping,
        ctx: &mut ExecutionContext,
        ledger: &mut Vec<SharedObject>,
        context_label: &str,
    ) -> Result<(), ParseError> {
        let count = config
            .get("count")
            .and_then(|v| v.as_i64())
            .filter(|n| *n > 0)
            .ok_or_else(|| {
                ParseError::new(
                    ErrorKind::MissingCount,
                    format!("Bulk creation of '{model_type}' requires a positive 'count'."),
                )
                .with_suggestions([
                    "Add 'count: <n>' next to 'bulk_create: true'",
                    "The count must be a positive integer",
                ])
            })?;
        let template = config
            .get("template")
            .and_then(|v| v.as_mapping())
            .ok_or_else(|| {
                ParseError::new(
                    ErrorKind::MissingTemplate,
                    format!("Bulk creation of '{model_type}' requires a 'template' mapping."),
                )
                .with_suggestions([
                    "Add 'template:' with the item configuration to repeat",
                    "Use {{ index }} inside the template for per-item values",
                ])
            })?;

        for index in 0..count {
            let rendered = render_template(&serde_yaml::Value::Mapping(template.clone()), index)?;
            let object = self.process_item(model_type, &rendered, ctx, context_label)?;
            ledger.push(object);
        }
        debug!(model_type, count, "bulk creation complete");
        Ok(())
    }

    fn process_item(
        &self,
        model_type: &str,
        item: &serde_yaml::Value,
        ctx: &mut ExecutionContext,
        context_label: &str,
    ) -> Result<SharedObject, ParseError> {
        let serde_yaml::Value::Mapping(item) = item else {
            return Err(ParseError::new(
                ErrorKind::InvalidConfig,
                format!("Each item under '{model_type}' must be a mapping."),
            )
            .with_suggestions([
                "Write items as key/value mappings",
                "Example: - name: Main Account",
            ]));
        };

        let object = self.create_object(model_type, item, ctx)?;

        if let Some(reference) = item.get("ref") {
            self.record_reference(model_type, reference, object.clone(), item, ctx, context_label)?;
        }
        if let Some(after) = item.get("after_create") {
            self.run_after_create(model_type, after, &object, ctx)?;
        }

        debug!(model_type, object = %describe(&object), "created");
        Ok(object)
    }

    /// Strategy precedence: factory, method, custom_method, then the default
    /// factory named after the singularized model type.
    fn create_object(
        &self,
        model_type: &str,
        item: &serde_yaml::Mapping,
        ctx: &ExecutionContext,
    ) -> Result<SharedObject, ParseError> {
        let traits = self.resolve_traits(item, ctx)?;
        let attributes = self.resolve_section(item, "attributes", ctx)?;
        let arguments = self.resolve_section(item, "arguments", ctx)?;

        if let Some(factory) = item.get("factory") {
            let name = factory.as_str().ok_or_else(|| {
                ParseError::new(
                    ErrorKind::InvalidStrategy,
                    format!("Factory name for '{model_type}' must be a string."),
                )
                .with_suggestions(["Example: factory: savings_account"])
            })?;
            return self.create_via_factory(model_type, name, &traits, &attributes);
        }

        if let Some(method) = item.get("method") {
            let name = match method {
                serde_yaml::Value::Null => format!("create_{model_type}"),
                serde_yaml::Value::String(s) => s.clone(),
                _ => {
                    return Err(invalid_method_name(model_type, &format!("{method:?}")));
                }
            };
            return self.create_via_method(model_type, &name, &arguments);
        }

        if let Some(method) = item.get("custom_method") {
            let Some(name) = method.as_str() else {
                return Err(invalid_method_name(model_type, &format!("{method:?}")));
            };
            return self.create_via_method(model_type, name, &arguments);
        }

        self.create_via_factory(model_type, &singularize(model_type), &traits, &attributes)
    }

    fn create_via_factory(
        &self,
        model_type: &str,
        factory_name: &str,
        traits: &[String],
        attributes: &Attributes,
    ) -> Result<SharedObject, ParseError> {
        let Some(factory) = self.factories.get(factory_name) else {
            let known = self.factories.names();
            let listed = if known.is_empty() {
                "No factories are configured".to_string()
            } else {
                format!("Known factories: {}", known.join(", "))
            };
            return Err(ParseError::new(
                ErrorKind::InvalidStrategy,
                format!("No factory named '{factory_name}' for '{model_type}'."),
            )
            .with_suggestions([
                "Check the factory name for typos".to_string(),
                "Register the factory before parsing documents that use it".to_string(),
                listed,
            ]));
        };
        factory
            .create(traits, attributes)
            .map_err(|err| creation_failed(model_type, &err))
    }

    fn create_via_method(
        &self,
        model_type: &str,
        name: &str,
        arguments: &Attributes,
    ) -> Result<SharedObject, ParseError> {
        if !METHOD_NAME.is_match(name) {
            return Err(invalid_method_name(model_type, name));
        }
        let Some(provider) = self.providers.iter().find(|p| p.has(name)) else {
            return Err(ParseError::new(
                ErrorKind::MethodNotFound,
                format!("No creation method named '{name}' for '{model_type}'."),
            )
            .with_suggestions([
                "Check the method name for typos",
                "Make sure a capability provider defines this method",
                "Use 'factory:' if the object is built by a factory instead",
            ]));
        };
        provider
            .invoke(name, arguments)
            .map_err(|err| creation_failed(model_type, &err))
    }

    fn record_reference(
        &self,
        model_type: &str,
        reference: &serde_yaml::Value,
        object: SharedObject,
        item: &serde_yaml::Mapping,
        ctx: &mut ExecutionContext,
        context_label: &str,
    ) -> Result<(), ParseError> {
        let Some(name) = reference.as_str() else {
            return Err(ParseError::new(
                ErrorKind::InvalidConfig,
                format!("The 'ref' of a '{model_type}' item must be a string."),
            )
            .with_suggestions([
                "Use '@name' for a document-local reference",
                "Use 'type.key' to register in the shared registry",
            ]));
        };

        if name.starts_with('@') {
            ctx.insert(name, object);
            return Ok(());
        }

        let description = item
            .get("description")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        self.registry
            .borrow_mut()
            .register(name, object, description, context_label)
            .map(|_| ())
            .map_err(|err| creation_failed(model_type, &anyhow::Error::new(err)))
    }

    fn run_after_create(
        &self,
        model_type: &str,
        after: &serde_yaml::Value,
        object: &SharedObject,
        ctx: &ExecutionContext,
    ) -> Result<(), ParseError> {
        let Some(after) = after.as_mapping() else {
            return Err(ParseError::new(
                ErrorKind::InvalidConfig,
                format!("'after_create' on '{model_type}' must be a mapping."),
            )
            .with_suggestions(["Supported keys: 'call' and 'set'"]));
        };

        if let Some(calls) = after.get("call") {
            let names: Vec<String> = match calls {
                serde_yaml::Value::String(s) => vec![s.clone()],
                serde_yaml::Value::Sequence(items) => items
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            invalid_method_name(model_type, &format!("{v:?}"))
                        })
                    })
                    .collect::<Result<_, _>>()?,
                other => return Err(invalid_method_name(model_type, &format!("{other:?}"))),
            };
            for name in &names {
                if !METHOD_NAME.is_match(name) {
                    return Err(invalid_method_name(model_type, name));
                }
                object.borrow_mut().call(name).map_err(|err| {
                    ParseError::new(
                        ErrorKind::CreationFailed,
                        format!("Object method '{name}' failed on '{model_type}': {err}"),
                    )
                    .with_suggestions([
                        "Check the method name for typos",
                        "Verify the object supports this post-creation method",
                    ])
                })?;
            }
        }

        if let Some(set) = after.get("set") {
            let Some(set) = set.as_mapping() else {
                return Err(ParseError::new(
                    ErrorKind::InvalidConfig,
                    format!("'after_create.set' on '{model_type}' must be a mapping."),
                )
                .with_suggestions(["Example: set: { status: active }"]));
            };
            let resolved = self.resolver.resolve_attributes(set, ctx)?;
            for (name, value) in &resolved {
                object
                    .borrow_mut()
                    .set_attribute(name, value.clone())
                    .map_err(|err| creation_failed(model_type, &err))?;
            }
            object
                .borrow_mut()
                .save()
                .map_err(|err| creation_failed(model_type, &err))?;
        }

        Ok(())
    }

    fn resolve_traits(
        &self,
        item: &serde_yaml::Mapping,
        ctx: &ExecutionContext,
    ) -> Result<Vec<String>, ParseError> {
        let Some(traits) = item.get("traits") else {
            return Ok(Vec::new());
        };
        let Some(traits) = traits.as_sequence() else {
            return Err(ParseError::new(
                ErrorKind::InvalidConfig,
                "'traits' must be a list of trait names.",
            )
            .with_suggestions(["Example: traits: [active, verified]"]));
        };
        traits
            .iter()
            .map(|t| self.resolver.resolve(t, ctx).map(|value| value.render()))
            .collect()
    }

    fn resolve_section(
        &self,
        item: &serde_yaml::Mapping,
        key: &str,
        ctx: &ExecutionContext,
    ) -> Result<Attributes, ParseError> {
        let Some(value) = item.get(key) else {
            return Ok(Attributes::new());
        };
        let Some(map) = value.as_mapping() else {
            return Err(ParseError::new(
                ErrorKind::InvalidConfig,
                format!("'{key}' must be a mapping of names to values."),
            )
            .with_suggestions([format!("Example: {key}: {{ name: Main }}")]));
        };
        self.resolver.resolve_attributes(map, ctx)
    }
}

/// Structural validation without creating anything: syntax, root shape, and
/// the presence of at least one data section.
pub fn validate_document(text: &str, source_id: &str) -> Vec<ParseError> {
    let root: serde_yaml::Value = match serde_yaml::from_str(text) {
        Ok(value) => value,
        Err(err) => return vec![syntax_error(source_id, &err)],
    };
    let serde_yaml::Value::Mapping(root) = root else {
        return vec![ParseError::new(
            ErrorKind::InvalidStructure,
            "Document root must be a mapping of sections.",
        )
        .with_source(source_id)
        .with_line(1)
        .with_suggestions(["Start the document with a section key such as 'data:'"])];
    };
    let has_data = root
        .iter()
        .any(|(key, _)| key.as_str().map(|k| k != "metadata").unwrap_or(false));
    if !has_data {
        return vec![ParseError::new(
            ErrorKind::NoDataSections,
            "Document contains no data sections.",
        )
        .with_source(source_id)
        .with_suggestions(["Add at least one section other than 'metadata'"])];
    }
    Vec::new()
}

/// Substitute `{{ expr }}` template expressions with `index` in scope. A
/// string that is exactly one expression takes the computed value's native
/// type; mixed text interpolates string forms.
fn render_template(value: &serde_yaml::Value, index: i64) -> Result<serde_yaml::Value, ParseError> {
    match value {
        serde_yaml::Value::String(raw) => render_template_string(raw, index),
        serde_yaml::Value::Sequence(items) => {
            let rendered = items
                .iter()
                .map(|item| render_template(item, index))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(serde_yaml::Value::Sequence(rendered))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut rendered = serde_yaml::Mapping::with_capacity(map.len());
            for (key, entry) in map {
                rendered.insert(key.clone(), render_template(entry, index)?);
            }
            Ok(serde_yaml::Value::Mapping(rendered))
        }
        other => Ok(other.clone()),
    }
}

fn render_template_string(raw: &str, index: i64) -> Result<serde_yaml::Value, ParseError> {
    if !TEMPLATE_EXPR.is_match(raw) {
        return Ok(serde_yaml::Value::String(raw.to_string()));
    }
    let scope = Scope::with_index(index);
    let matches: Vec<_> = TEMPLATE_EXPR.captures_iter(raw).collect();

    if matches.len() == 1 {
        let full = matches[0].get(0).map(|m| (m.start(), m.end()));
        if full == Some((0, raw.len())) {
            let snippet = matches[0][1].trim().to_string();
            let value =
                evaluate(&snippet, &scope).map_err(|err| template_error(&snippet, &err))?;
            return Ok(match value {
                ResolvedValue::Integer(i) => serde_yaml::Value::Number(i.into()),
                ResolvedValue::Float(f) => serde_yaml::Value::Number(f.into()),
                other => serde_yaml::Value::String(other.render()),
            });
        }
    }

    let mut output = String::with_capacity(raw.len());
    let mut cursor = 0;
    for captures in &matches {
        let whole = captures.get(0).expect("match always has group 0");
        output.push_str(&raw[cursor..whole.start()]);
        let snippet = captures[1].trim().to_string();
        let value = evaluate(&snippet, &scope).map_err(|err| template_error(&snippet, &err))?;
        output.push_str(&value.render());
        cursor = whole.end();
    }
    output.push_str(&raw[cursor..]);
    Ok(serde_yaml::Value::String(output))
}

fn syntax_error(source_id: &str, err: &serde_yaml::Error) -> ParseError {
    let mut parsed = ParseError::new(ErrorKind::Syntax, format!("YAML syntax error: {err}"))
        .with_source(source_id)
        .with_suggestions([
            "Check indentation (YAML uses spaces, not tabs)",
            "Quote strings that contain special characters like ':' or '@'",
            "Make sure list items start with '- '",
        ]);
    if let Some(location) = err.location() {
        parsed = parsed.with_line(location.line()).with_column(location.column());
    }
    parsed
}

fn creation_failed(model_type: &str, err: &anyhow::Error) -> ParseError {
    ParseError::new(
        ErrorKind::CreationFailed,
        format!("Failed to create '{model_type}': {err}"),
    )
    .with_suggestions([
        "Check that all required attributes are provided",
        "Verify referenced objects are created earlier in the document",
        "Check the factory or method accepts these attributes",
    ])
}

fn invalid_method_name(model_type: &str, name: &str) -> ParseError {
    ParseError::new(
        ErrorKind::InvalidMethodName,
        format!("Invalid method name {name} for '{model_type}'."),
    )
    .with_suggestions([
        "Method names must be plain identifiers (letters, digits, underscores)",
        "Example: custom_method: create_premium_account",
    ])
}

fn template_error(snippet: &str, err: &crate::resolver::expression::EvalError) -> ParseError {
    ParseError::new(
        ErrorKind::TemplateExpressionError,
        format!("Error in template expression '{snippet}': {err}"),
    )
    .with_suggestions([
        "Only 'index' and arithmetic are allowed in {{ }} templates",
        "Example: \"user-{{ index + 1 }}\"",
    ])
}

fn unexpected(source_id: &str, err: &anyhow::Error) -> ParseError {
    ParseError::new(
        ErrorKind::Unexpected,
        format!("Unexpected failure while processing {source_id}: {err}"),
    )
    .with_source(source_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{DomainObject, ObjectIdentity, ObjectSource};
    use std::collections::HashMap;
    use uuid::Uuid;

    #[derive(Debug)]
    struct TestRecord {
        type_name: String,
        identity: ObjectIdentity,
        attributes: Attributes,
        calls: Vec<String>,
    }

    impl DomainObject for TestRecord {
        fn type_name(&self) -> &str {
            &self.type_name
        }
        fn identity(&self) -> Option<ObjectIdentity> {
            Some(self.identity.clone())
        }
        fn attribute(&self, name: &str) -> Option<ResolvedValue> {
            self.attributes.get(name).cloned()
        }
        fn attribute_names(&self) -> Vec<String> {
            self.attributes.names()
        }
        fn set_attribute(&mut self, name: &str, value: ResolvedValue) -> anyhow::Result<()> {
            self.attributes.insert(name, value);
            Ok(())
        }
        fn call(&mut self, method: &str) -> anyhow::Result<()> {
            if method == "explode" {
                anyhow::bail!("unknown method '{method}'");
            }
            self.calls.push(method.to_string());
            Ok(())
        }
        fn save(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct TestFactory {
        type_name: &'static str,
    }

    impl Factory for TestFactory {
        fn create(
            &self,
            traits: &[String],
            attributes: &Attributes,
        ) -> anyhow::Result<SharedObject> {
            let mut merged = Attributes::new();
            for t in traits {
                merged.insert(t.clone(), ResolvedValue::Bool(true));
            }
            for (name, value) in attributes {
                merged.insert(name.clone(), value.clone());
            }
            Ok(Rc::new(RefCell::new(TestRecord {
                type_name: self.type_name.to_string(),
                identity: ObjectIdentity::new(self.type_name, Uuid::new_v4()),
                attributes: merged,
                calls: Vec::new(),
            })))
        }
    }

    struct TestProvider {
        methods: HashMap<String, &'static str>,
    }

    impl CapabilityProvider for TestProvider {
        fn has(&self, name: &str) -> bool {
            self.methods.contains_key(name)
        }
        fn invoke(&self, name: &str, arguments: &Attributes) -> anyhow::Result<SharedObject> {
            let type_name = self.methods.get(name).copied().unwrap_or("Unknown");
            Ok(Rc::new(RefCell::new(TestRecord {
                type_name: type_name.to_string(),
                identity: ObjectIdentity::new(type_name, Uuid::new_v4()),
                attributes: arguments.clone(),
                calls: Vec::new(),
            })))
        }
    }

    struct NullSource;

    impl ObjectSource for NullSource {
        fn find(&self, identity: &ObjectIdentity) -> Option<SharedObject> {
            Some(Rc::new(RefCell::new(TestRecord {
                type_name: identity.type_name.clone(),
                identity: identity.clone(),
                attributes: Attributes::new(),
                calls: Vec::new(),
            })))
        }
    }

    fn core() -> Core {
        let registry = Rc::new(RefCell::new(Registry::in_memory(Rc::new(NullSource))));
        Core::new(registry)
            .with_factory("account", Box::new(TestFactory { type_name: "Account" }))
            .with_factory("branch", Box::new(TestFactory { type_name: "Branch" }))
            .with_provider(Box::new(TestProvider {
                methods: HashMap::from([
                    ("create_accounts".to_string(), "Account"),
                    ("open_branch".to_string(), "Branch"),
                ]),
            }))
    }

    fn attr(object: &SharedObject, name: &str) -> ResolvedValue {
        object.borrow().attribute(name).unwrap()
    }

    #[test]
    fn root_must_be_a_mapping() {
        let err = core()
            .parse("- just\n- a list\n", "doc.yml", ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStructure);
    }

    #[test]
    fn metadata_only_document_is_rejected() {
        let err = core()
            .parse("metadata:\n  context: Demo\n", "doc.yml", ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NoDataSections);
    }

    #[test]
    fn syntax_errors_carry_location() {
        let err = core()
            .parse("data:\n  accounts: [\n", "doc.yml", ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
        assert!(err.line.is_some());
    }

    #[test]
    fn default_factory_is_the_singularized_model_type() {
        let doc = "data:\n  accounts:\n    - attributes:\n        name: Main\n";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].borrow().type_name(), "Account");
        assert_eq!(attr(&ledger[0], "name"), ResolvedValue::String("Main".into()));
    }

    #[test]
    fn local_reference_resolves_across_items() {
        let doc = "\
data:
  accounts:
    - ref: \"@main\"
      attributes:
        name: Main
  branches:
    - attributes:
        account: \"@main\"
        owner_name: \"@main.name\"
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(
            attr(&ledger[1], "account"),
            ResolvedValue::Object(ledger[0].clone())
        );
        assert_eq!(
            attr(&ledger[1], "owner_name"),
            ResolvedValue::String("Main".into())
        );
    }

    #[test]
    fn dotted_ref_registers_with_the_metadata_context() {
        let doc = "\
metadata:
  context: Demo Seed
data:
  accounts:
    - ref: account.main
      description: primary account
      attributes:
        name: Main
";
        let mut core = core();
        core.parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        let registry = core.registry();
        let registry = registry.borrow();
        let entries = registry.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "account.main");
        assert_eq!(entries[0].context, "Demo Seed");
        assert_eq!(entries[0].description.as_deref(), Some("primary account"));
    }

    #[test]
    fn data_section_runs_before_earlier_declared_sections() {
        let doc = "\
extras:
  branches:
    - attributes:
        account: \"@seed\"
data:
  accounts:
    - ref: \"@seed\"
      attributes:
        name: Seed
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(ledger[0].borrow().type_name(), "Account");
        assert_eq!(ledger[1].borrow().type_name(), "Branch");
    }

    #[test]
    fn explicit_factory_and_traits() {
        let doc = "\
data:
  things:
    - factory: branch
      traits: [active]
      attributes:
        name: HQ
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(ledger[0].borrow().type_name(), "Branch");
        assert_eq!(attr(&ledger[0], "active"), ResolvedValue::Bool(true));
    }

    #[test]
    fn traits_pass_through_the_resolver() {
        let doc = "\
data:
  accounts:
    - ref: \"@tier\"
      attributes:
        level: premium
    - traits:
        - \"[[ 'act' + 'ive' ]]\"
        - \"@tier.level\"
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(attr(&ledger[1], "active"), ResolvedValue::Bool(true));
        assert_eq!(attr(&ledger[1], "premium"), ResolvedValue::Bool(true));
    }

    #[test]
    fn unknown_factory_lists_known_names() {
        let doc = "data:\n  things:\n    - factory: rocket\n";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStrategy);
        assert!(err.suggestions.iter().any(|s| s.contains("account")));
        assert!(err.line.is_some());
    }

    #[test]
    fn method_defaults_to_create_model_type() {
        let doc = "\
data:
  accounts:
    - method:
      arguments:
        name: ViaMethod
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(attr(&ledger[0], "name"), ResolvedValue::String("ViaMethod".into()));
    }

    #[test]
    fn custom_method_requires_a_string_name() {
        let doc = "data:\n  accounts:\n    - custom_method: 42\n";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidMethodName);
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let doc = "data:\n  accounts:\n    - custom_method: conjure\n";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MethodNotFound);
    }

    #[test]
    fn after_create_calls_and_sets() {
        let doc = "\
data:
  accounts:
    - attributes:
        name: Main
      after_create:
        call: [activate, verify]
        set:
          status: active
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(attr(&ledger[0], "status"), ResolvedValue::String("active".into()));
    }

    #[test]
    fn failing_after_create_call_is_creation_failed() {
        let doc = "\
data:
  accounts:
    - attributes:
        name: Main
      after_create:
        call: explode
";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CreationFailed);
        assert!(err.message.contains("explode"));
    }

    #[test]
    fn bulk_create_cycles_template_expressions() {
        let doc = "\
data:
  accounts:
    bulk_create: true
    count: 6
    template:
      attributes:
        name: \"batch-{{ index + 1 }}\"
        group: \"{{ index % 3 + 1 }}\"
";
        let ledger = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap();
        assert_eq!(ledger.len(), 6);
        let groups: Vec<ResolvedValue> = ledger.iter().map(|o| attr(o, "group")).collect();
        assert_eq!(
            groups,
            vec![
                ResolvedValue::Integer(1),
                ResolvedValue::Integer(2),
                ResolvedValue::Integer(3),
                ResolvedValue::Integer(1),
                ResolvedValue::Integer(2),
                ResolvedValue::Integer(3),
            ]
        );
        assert_eq!(attr(&ledger[0], "name"), ResolvedValue::String("batch-1".into()));
        assert_eq!(attr(&ledger[5], "name"), ResolvedValue::String("batch-6".into()));
    }

    #[test]
    fn bulk_create_requires_count_and_template() {
        let doc = "data:\n  accounts:\n    bulk_create: true\n    template:\n      attributes: {}\n";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCount);

        let doc = "data:\n  accounts:\n    bulk_create: true\n    count: 3\n";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingTemplate);
    }

    #[test]
    fn malformed_template_expression_is_reported() {
        let doc = "\
data:
  accounts:
    bulk_create: true
    count: 1
    template:
      attributes:
        name: \"{{ index + }}\"
";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TemplateExpressionError);
    }

    #[test]
    fn item_errors_carry_list_item_lines() {
        let doc = "\
data:
  accounts:
    - attributes:
        name: ok
    - attributes:
        name: \"@missing.name\"
";
        let err = core().parse(doc, "doc.yml", ParseOptions::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReferenceNotFound);
        assert_eq!(err.source_id.as_deref(), Some("doc.yml"));
        assert_eq!(err.line, Some(5));
    }

    #[test]
    fn validate_document_reports_structure_only() {
        assert!(validate_document("data:\n  accounts: []\n", "doc.yml").is_empty());
        let problems = validate_document("- nope\n", "doc.yml");
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].kind, ErrorKind::InvalidStructure);
    }
}
