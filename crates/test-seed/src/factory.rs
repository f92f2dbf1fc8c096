//! Record-producing factory.

use std::rc::Rc;

use sprout_core::engine::Factory;
use sprout_core::object::SharedObject;
use sprout_core::value::{Attributes, ResolvedValue};

use crate::record::Record;
use crate::store::RecordStore;

/// Builds persisted [`Record`]s of one type. Traits become boolean
/// attributes; explicit attributes override defaults and traits.
pub struct RecordFactory {
    type_name: String,
    store: Rc<RecordStore>,
    defaults: Attributes,
    handlers: Vec<String>,
}

impl RecordFactory {
    pub fn new(type_name: impl Into<String>, store: Rc<RecordStore>) -> Self {
        Self {
            type_name: type_name.into(),
            store,
            defaults: Attributes::new(),
            handlers: Vec::new(),
        }
    }

    pub fn with_defaults(mut self, defaults: Attributes) -> Self {
        self.defaults = defaults;
        self
    }

    /// Zero-arg handler names every produced record accepts.
    pub fn with_handlers<I, S>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handlers = handlers.into_iter().map(Into::into).collect();
        self
    }
}

impl Factory for RecordFactory {
    fn create(&self, traits: &[String], attributes: &Attributes) -> anyhow::Result<SharedObject> {
        let mut merged = self.defaults.clone();
        for name in traits {
            merged.insert(name.clone(), ResolvedValue::Bool(true));
        }
        for (name, value) in attributes {
            merged.insert(name.clone(), value.clone());
        }
        let record = Record::new(&self.type_name)
            .with_attributes(merged)
            .with_handlers(self.handlers.clone());
        Ok(self.store.persist(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_become_boolean_attributes() {
        let store = RecordStore::new();
        let factory = RecordFactory::new("Account", store.clone());
        let object = factory
            .create(&["active".to_string()], &Attributes::new())
            .unwrap();

        assert_eq!(
            object.borrow().attribute("active"),
            Some(ResolvedValue::Bool(true))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn attributes_override_defaults_and_traits() {
        let store = RecordStore::new();
        let mut defaults = Attributes::new();
        defaults.insert("tier", ResolvedValue::String("basic".into()));
        let factory = RecordFactory::new("Account", store).with_defaults(defaults);

        let mut attributes = Attributes::new();
        attributes.insert("tier", ResolvedValue::String("premium".into()));
        attributes.insert("active", ResolvedValue::Bool(false));
        let object = factory
            .create(&["active".to_string()], &attributes)
            .unwrap();

        assert_eq!(
            object.borrow().attribute("tier"),
            Some(ResolvedValue::String("premium".into()))
        );
        assert_eq!(
            object.borrow().attribute("active"),
            Some(ResolvedValue::Bool(false))
        );
    }

    #[test]
    fn produced_records_are_persisted() {
        let store = RecordStore::new();
        let factory = RecordFactory::new("Account", store.clone());
        let object = factory.create(&[], &Attributes::new()).unwrap();
        assert!(object.borrow().identity().is_some());
    }
}
