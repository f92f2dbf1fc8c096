//! Closure-backed capability provider.

use std::collections::HashMap;

use sprout_core::engine::CapabilityProvider;
use sprout_core::object::SharedObject;
use sprout_core::value::Attributes;

type Helper = Box<dyn Fn(&Attributes) -> anyhow::Result<SharedObject>>;

/// Maps creation method names to closures. The engine checks `has` before
/// `invoke`, so invoking an unknown name is a programmer error.
#[derive(Default)]
pub struct HelperProvider {
    helpers: HashMap<String, Helper>,
}

impl HelperProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_helper<F>(mut self, name: impl Into<String>, helper: F) -> Self
    where
        F: Fn(&Attributes) -> anyhow::Result<SharedObject> + 'static,
    {
        self.helpers.insert(name.into(), Box::new(helper));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.helpers.keys().cloned().collect()
    }
}

impl CapabilityProvider for HelperProvider {
    fn has(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    fn invoke(&self, name: &str, arguments: &Attributes) -> anyhow::Result<SharedObject> {
        let Some(helper) = self.helpers.get(name) else {
            anyhow::bail!("no helper named '{name}'");
        };
        helper(arguments)
    }
}
