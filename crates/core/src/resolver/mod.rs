//! Reference resolution for document values.
//!
//! Scalar strings are classified by whole-string pattern match against
//! exactly one grammar, in strict priority order: local reference, local
//! attribute projection, registry reference, embedded expression, literal
//! passthrough. Classification never retries another rule on failure, which
//! keeps resolution deterministic and maps each failure mode to exactly one
//! diagnostic kind.

pub mod expression;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::dates;
use crate::error::{ErrorKind, ParseError};
use crate::inflect::singularize;
use crate::registry::{Registry, RegistryError};
use crate::resolver::expression::{evaluate, Scope};
use crate::object::SharedObject;
use crate::value::{Attributes, ResolvedValue};

static LOCAL_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(\w+)$").expect("invalid local-ref regex"));
static ATTRIBUTE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@(\w+)\.(\w+)$").expect("invalid attribute-ref regex"));
static REGISTRY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^registry\.(\w+)\.(\w+)$").expect("invalid registry-ref regex"));
static EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.+?)\]\]").expect("invalid expression regex"));

/// Call-scoped mapping from local alias (`@name`) to created object.
/// Created at parse start, discarded at parse end, never shared across calls.
#[derive(Default)]
pub struct ExecutionContext {
    refs: Vec<(String, SharedObject)>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` includes the leading `@`.
    pub fn insert(&mut self, name: impl Into<String>, object: SharedObject) {
        let name = name.into();
        if let Some(slot) = self.refs.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = object;
        } else {
            self.refs.push((name, object));
        }
    }

    pub fn get(&self, name: &str) -> Option<SharedObject> {
        self.refs
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, object)| object.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.refs.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

pub struct ReferenceResolver {
    registry: Rc<RefCell<Registry>>,
    today: NaiveDate,
}

impl ReferenceResolver {
    pub fn new(registry: Rc<RefCell<Registry>>) -> Self {
        Self {
            registry,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Pin the reference date used by `registry.dates.*` lookups.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Resolve one raw document value. Mappings resolve per value (keys
    /// untouched), sequences per element; scalars are classified as above.
    pub fn resolve(
        &self,
        value: &serde_yaml::Value,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedValue, ParseError> {
        match value {
            serde_yaml::Value::String(raw) => self.resolve_scalar(raw, ctx),
            serde_yaml::Value::Sequence(items) => {
                let resolved = items
                    .iter()
                    .map(|item| self.resolve(item, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ResolvedValue::Sequence(resolved))
            }
            serde_yaml::Value::Mapping(map) => {
                let mut attributes = Attributes::new();
                for (key, entry) in map {
                    let name = key
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| ResolvedValue::from_yaml(key).render());
                    attributes.insert(name, self.resolve(entry, ctx)?);
                }
                Ok(ResolvedValue::Mapping(attributes))
            }
            serde_yaml::Value::Tagged(tagged) => self.resolve(&tagged.value, ctx),
            other => Ok(ResolvedValue::from_yaml(other)),
        }
    }

    /// Resolve a mapping of named attributes/arguments.
    pub fn resolve_attributes(
        &self,
        map: &serde_yaml::Mapping,
        ctx: &ExecutionContext,
    ) -> Result<Attributes, ParseError> {
        let mut attributes = Attributes::new();
        for (key, entry) in map {
            let name = key
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| ResolvedValue::from_yaml(key).render());
            attributes.insert(name, self.resolve(entry, ctx)?);
        }
        Ok(attributes)
    }

    fn resolve_scalar(
        &self,
        raw: &str,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedValue, ParseError> {
        if LOCAL_REF.is_match(raw) {
            return self
                .resolve_local(raw, ctx)
                .map(ResolvedValue::Object);
        }
        if let Some(captures) = ATTRIBUTE_REF.captures(raw) {
            let name = format!("@{}", &captures[1]);
            let attribute = captures[2].to_string();
            return self.resolve_projection(&name, &attribute, ctx);
        }
        if let Some(captures) = REGISTRY_REF.captures(raw) {
            let registry_type = captures[1].to_string();
            let key = captures[2].to_string();
            return self.resolve_registry(&registry_type, &key);
        }
        if EXPRESSION.is_match(raw) {
            return self.resolve_expression_string(raw);
        }
        Ok(ResolvedValue::String(raw.to_string()))
    }

    fn resolve_local(
        &self,
        name: &str,
        ctx: &ExecutionContext,
    ) -> Result<SharedObject, ParseError> {
        ctx.get(name).ok_or_else(|| {
            let known = ctx.names();
            let available = if known.is_empty() {
                "No references are currently available.".to_string()
            } else {
                format!("Available references: {}", known.join(", "))
            };
            ParseError::new(
                ErrorKind::ReferenceNotFound,
                format!("Reference '{name}' not found in the current context."),
            )
            .with_suggestions([
                format!("Check that you've defined the reference with 'ref: {name}' in an earlier item"),
                "Make sure the spelling matches exactly (references are case-sensitive)".to_string(),
                "Verify the item with this reference is created before it's used".to_string(),
                available,
            ])
        })
    }

    fn resolve_projection(
        &self,
        name: &str,
        attribute: &str,
        ctx: &ExecutionContext,
    ) -> Result<ResolvedValue, ParseError> {
        let object = self.resolve_local(name, ctx)?;
        let value = object.borrow().attribute(attribute);
        value.ok_or_else(|| {
            let mut readable = object.borrow().attribute_names();
            readable.truncate(10);
            ParseError::new(
                ErrorKind::AttributeNotFound,
                format!("Attribute '{attribute}' not found on object '{name}'."),
            )
            .with_suggestions([
                "Check the spelling of the attribute name".to_string(),
                "Verify the object has this attribute".to_string(),
                format!("Readable attributes on this object include: {}", readable.join(", ")),
            ])
        })
    }

    fn resolve_registry(&self, registry_type: &str, key: &str) -> Result<ResolvedValue, ParseError> {
        // Dates are computed, never stored.
        if registry_type == "dates" {
            return dates::resolve_date_key(key, self.today).map(ResolvedValue::Date);
        }

        let singular = singularize(registry_type);
        let mut candidates = vec![format!("{singular}.{key}"), key.to_string()];
        if registry_type != singular {
            candidates.push(format!("{registry_type}.{key}"));
        }

        let mut registry = self.registry.borrow_mut();
        for candidate in &candidates {
            if registry.exists(candidate) {
                return registry
                    .get(candidate)
                    .map(ResolvedValue::Object)
                    .map_err(|err| self.registry_lookup_error(registry_type, key, &registry, err));
            }
        }
        Err(self.registry_not_found(registry_type, key, &registry))
    }

    fn registry_lookup_error(
        &self,
        registry_type: &str,
        key: &str,
        registry: &Registry,
        err: RegistryError,
    ) -> ParseError {
        match err {
            RegistryError::Orphaned { key: orphaned } => ParseError::new(
                ErrorKind::RegistryKeyNotFound,
                format!(
                    "Registry reference 'registry.{registry_type}.{key}' points at a deleted object (entry '{orphaned}' removed)."
                ),
            )
            .with_suggestions([
                "Re-run the document that seeds this reference data".to_string(),
                "Run an orphan cleanup to drop stale registry entries".to_string(),
            ]),
            _ => self.registry_not_found(registry_type, key, registry),
        }
    }

    fn registry_not_found(
        &self,
        registry_type: &str,
        key: &str,
        registry: &Registry,
    ) -> ParseError {
        let mut sample = registry.all_keys();
        sample.truncate(10);
        let available = if sample.is_empty() {
            "No registry keys are available".to_string()
        } else {
            format!("Some available keys: {}", sample.join(", "))
        };
        ParseError::new(
            ErrorKind::RegistryKeyNotFound,
            format!("Registry reference 'registry.{registry_type}.{key}' not found."),
        )
        .with_suggestions([
            "Check the spelling of the registry type and key".to_string(),
            "Make sure reference data has been loaded first".to_string(),
            format!(
                "Try using 'registry.{}.{key}' instead",
                singularize(registry_type)
            ),
            available,
        ])
    }

    /// `[[ expr ]]` spanning the whole string returns the computed value
    /// directly; expressions mixed with literal text interpolate each
    /// result's string form.
    fn resolve_expression_string(&self, raw: &str) -> Result<ResolvedValue, ParseError> {
        let scope = Scope::empty();
        let matches: Vec<_> = EXPRESSION.captures_iter(raw).collect();

        if matches.len() == 1 {
            let full = matches[0].get(0).map(|m| (m.start(), m.end()));
            if full == Some((0, raw.len())) {
                let snippet = matches[0][1].trim().to_string();
                return evaluate(&snippet, &scope)
                    .map_err(|err| expression_error(&snippet, &err));
            }
        }

        let mut output = String::with_capacity(raw.len());
        let mut cursor = 0;
        for captures in &matches {
            let whole = captures.get(0).expect("match always has group 0");
            output.push_str(&raw[cursor..whole.start()]);
            let snippet = captures[1].trim().to_string();
            let value =
                evaluate(&snippet, &scope).map_err(|err| expression_error(&snippet, &err))?;
            output.push_str(&value.render());
            cursor = whole.end();
        }
        output.push_str(&raw[cursor..]);
        Ok(ResolvedValue::String(output))
    }
}

fn expression_error(snippet: &str, err: &expression::EvalError) -> ParseError {
    ParseError::new(
        ErrorKind::ExpressionEvaluationError,
        format!("Error evaluating expression '{snippet}': {err}"),
    )
    .with_suggestions([
        "Check the expression syntax inside the [[ ]] block".to_string(),
        "Only arithmetic on numbers and quoted strings is supported".to_string(),
        "Consider using a pre-defined reference instead".to_string(),
    ])
}
