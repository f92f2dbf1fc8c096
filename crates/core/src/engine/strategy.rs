//! Creation strategy seams: named factories and capability providers.
//!
//! Dispatch is by name against explicit handler sets. A factory builds an
//! object from traits plus attributes; a capability provider exposes named
//! creation methods behind a has/invoke contract. Providers are consulted in
//! registration order and the first one claiming a name wins.

use crate::object::SharedObject;
use crate::value::Attributes;

/// Builds one object from trait names and resolved attributes. The factory
/// persists the object before returning it.
pub trait Factory {
    fn create(&self, traits: &[String], attributes: &Attributes) -> anyhow::Result<SharedObject>;
}

/// Named creation methods supplied by the embedding application. `invoke` on
/// a name `has` rejected is a programmer error and may fail arbitrarily.
pub trait CapabilityProvider {
    fn has(&self, name: &str) -> bool;
    fn invoke(&self, name: &str, arguments: &Attributes) -> anyhow::Result<SharedObject>;
}

/// Name-keyed factory table. Insertion order is preserved so diagnostics can
/// list known factories the way they were configured.
#[derive(Default)]
pub struct FactoryRegistry {
    factories: Vec<(String, Box<dyn Factory>)>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering an existing name replaces the factory in place.
    pub fn insert(&mut self, name: impl Into<String>, factory: Box<dyn Factory>) {
        let name = name.into();
        if let Some(slot) = self.factories.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = factory;
        } else {
            self.factories.push((name, factory));
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Factory> {
        self.factories
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, factory)| factory.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(existing, _)| existing == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
