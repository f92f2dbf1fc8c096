//! Plain in-memory domain object.

use sprout_core::object::{DomainObject, ObjectIdentity};
use sprout_core::value::{Attributes, ResolvedValue};

/// A record with an ordered attribute map and an explicit set of zero-arg
/// handler names. Calling a registered handler records the call and flips a
/// `<name>_called` attribute; anything else fails.
#[derive(Debug)]
pub struct Record {
    type_name: String,
    identity: Option<ObjectIdentity>,
    attributes: Attributes,
    handlers: Vec<String>,
    calls: Vec<String>,
}

impl Record {
    /// An unsaved record; identity is assigned when a store persists it.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            identity: None,
            attributes: Attributes::new(),
            handlers: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_handlers<I, S>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handlers = handlers.into_iter().map(Into::into).collect();
        self
    }

    /// Handler names invoked so far, in call order.
    pub fn calls(&self) -> &[String] {
        &self.calls
    }

    pub(crate) fn assign_identity(&mut self, identity: ObjectIdentity) {
        self.identity = Some(identity);
    }
}

impl DomainObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn identity(&self) -> Option<ObjectIdentity> {
        self.identity.clone()
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
        if !self.handlers.iter().any(|h| h == method) {
            anyhow::bail!(
                "record '{}' has no handler named '{method}'",
                self.type_name
            );
        }
        self.calls.push(method.to_string());
        self.attributes
            .insert(format!("{method}_called"), ResolvedValue::Bool(true));
        Ok(())
    }

    fn save(&mut self) -> anyhow::Result<()> {
        // Attribute writes land directly in the shared record.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_handler_records_the_call() {
        let mut record = Record::new("Account").with_handlers(["activate"]);
        record.call("activate").unwrap();
        assert_eq!(record.calls(), ["activate"]);
        assert_eq!(
            record.attribute("activate_called"),
            Some(ResolvedValue::Bool(true))
        );
    }

    #[test]
    fn unregistered_handler_fails() {
        let mut record = Record::new("Account");
        let err = record.call("explode").unwrap_err();
        assert!(err.to_string().contains("explode"));
    }

    #[test]
    fn unsaved_record_has_no_identity() {
        let record = Record::new("Account");
        assert!(record.identity().is_none());
    }
}
