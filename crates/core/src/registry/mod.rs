//! Durable directory of created objects.
//!
//! Keys are globally unique dotted strings (`account.facility_1`). Entries
//! record the object's durable identity, not the object itself; lookup and
//! orphan detection go through an [`ObjectSource`]. The backing store is
//! pluggable: the in-memory implementation lives in [`memory`], a durable
//! table belongs to the embedding application and must satisfy the same
//! semantics.

pub mod memory;

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::object::{ObjectIdentity, ObjectSource, SharedObject};

pub use memory::InMemoryStore;

/// One registered key: identity plus bookkeeping.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegistryEntry {
    pub key: String,
    pub identity: ObjectIdentity,
    pub description: Option<String>,
    pub context: String,
    pub registered_at: DateTime<Utc>,
}

/// Registry failures. `EmptyKey` and `Unpersisted` are precondition
/// violations (programmer errors), deliberately distinct from the
/// document-author-facing `ParseError` diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry key must be a non-empty string")]
    EmptyKey,

    #[error("object of type '{type_name}' must be persisted before registration")]
    Unpersisted { type_name: String },

    #[error("registry key '{key}' not found")]
    KeyNotFound { key: String, available: Vec<String> },

    #[error("registry key '{key}' references an object that no longer exists; entry removed")]
    Orphaned { key: String },
}

/// Pluggable entry storage. Implementations must preserve insertion order in
/// `keys`/`entries` and replace in place on duplicate-key insert.
pub trait RegistryStore {
    fn insert(&mut self, entry: RegistryEntry);
    fn get(&self, key: &str) -> Option<RegistryEntry>;
    fn remove(&mut self, key: &str) -> bool;
    fn keys(&self) -> Vec<String>;
    fn entries(&self) -> Vec<RegistryEntry>;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Registry {
    store: Box<dyn RegistryStore>,
    source: Rc<dyn ObjectSource>,
}

impl Registry {
    pub fn new(store: Box<dyn RegistryStore>, source: Rc<dyn ObjectSource>) -> Self {
        Self { store, source }
    }

    pub fn in_memory(source: Rc<dyn ObjectSource>) -> Self {
        Self::new(Box::new(InMemoryStore::new()), source)
    }

    /// Register `object` under `key`. Re-registering an existing key
    /// overwrites the prior entry (logged), never errors.
    pub fn register(
        &mut self,
        key: &str,
        object: SharedObject,
        description: Option<String>,
        context: &str,
    ) -> Result<SharedObject, RegistryError> {
        if key.trim().is_empty() {
            return Err(RegistryError::EmptyKey);
        }
        let identity = object.borrow().identity().ok_or_else(|| {
            RegistryError::Unpersisted {
                type_name: object.borrow().type_name().to_string(),
            }
        })?;

        if let Some(existing) = self.store.get(key) {
            info!(
                key,
                was = %existing.identity,
                now = %identity,
                "overwriting existing registry key"
            );
        }

        // insert replaces an existing key in place, preserving its position
        self.store.insert(RegistryEntry {
            key: key.to_string(),
            identity: identity.clone(),
            description,
            context: context.to_string(),
            registered_at: Utc::now(),
        });
        debug!(key, object = %identity, context, "registered");
        Ok(object)
    }

    /// Look up the object registered under `key`. An entry whose identity no
    /// longer resolves is removed on the spot and reported as orphaned.
    pub fn get(&mut self, key: &str) -> Result<SharedObject, RegistryError> {
        let Some(entry) = self.store.get(key) else {
            return Err(RegistryError::KeyNotFound {
                key: key.to_string(),
                available: self.store.keys(),
            });
        };
        match self.source.find(&entry.identity) {
            Some(object) => Ok(object),
            None => {
                self.store.remove(key);
                Err(RegistryError::Orphaned {
                    key: key.to_string(),
                })
            }
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.store.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.store.remove(key)
    }

    pub fn all_keys(&self) -> Vec<String> {
        self.store.keys()
    }

    pub fn entries(&self) -> Vec<RegistryEntry> {
        self.store.entries()
    }

    pub fn clear(&mut self) {
        self.store.clear();
        info!("cleared all registry entries");
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Remove every entry whose identity no longer resolves; returns the
    /// number removed.
    pub fn clean_orphaned(&mut self) -> usize {
        let mut removed = 0;
        for entry in self.store.entries() {
            if self.source.find(&entry.identity).is_none() {
                self.store.remove(&entry.key);
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "cleaned orphaned registry entries");
        }
        removed
    }

    /// Replace the full entry set. Supports snapshot-based transaction
    /// rollback; not part of the document-facing surface.
    pub fn restore(&mut self, entries: Vec<RegistryEntry>) {
        self.store.clear();
        for entry in entries {
            self.store.insert(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ResolvedValue;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use uuid::Uuid;

    #[derive(Debug)]
    struct StubObject {
        type_name: String,
        identity: Option<ObjectIdentity>,
    }

    impl crate::object::DomainObject for StubObject {
        fn type_name(&self) -> &str {
            &self.type_name
        }
        fn identity(&self) -> Option<ObjectIdentity> {
            self.identity.clone()
        }
        fn attribute(&self, _name: &str) -> Option<ResolvedValue> {
            None
        }
        fn attribute_names(&self) -> Vec<String> {
            Vec::new()
        }
        fn set_attribute(&mut self, _name: &str, _value: ResolvedValue) -> anyhow::Result<()> {
            Ok(())
        }
        fn call(&mut self, method: &str) -> anyhow::Result<()> {
            anyhow::bail!("unknown method '{method}'")
        }
        fn save(&mut self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Object source that "deletes" identities by id.
    #[derive(Default)]
    struct StubSource {
        deleted: RefCell<HashSet<Uuid>>,
    }

    impl ObjectSource for StubSource {
        fn find(&self, identity: &ObjectIdentity) -> Option<SharedObject> {
            if self.deleted.borrow().contains(&identity.id) {
                return None;
            }
            Some(Rc::new(RefCell::new(StubObject {
                type_name: identity.type_name.clone(),
                identity: Some(identity.clone()),
            })))
        }
    }

    fn persisted(type_name: &str) -> SharedObject {
        Rc::new(RefCell::new(StubObject {
            type_name: type_name.to_string(),
            identity: Some(ObjectIdentity::new(type_name, Uuid::new_v4())),
        }))
    }

    fn setup() -> (Registry, Rc<StubSource>) {
        let source = Rc::new(StubSource::default());
        let registry = Registry::in_memory(source.clone());
        (registry, source)
    }

    #[test]
    fn register_and_get() {
        let (mut registry, _) = setup();
        let account = persisted("Account");
        registry
            .register("account.main", account.clone(), None, "Reference Data")
            .unwrap();

        assert!(registry.exists("account.main"));
        assert_eq!(registry.count(), 1);
        let fetched = registry.get("account.main").unwrap();
        assert_eq!(
            fetched.borrow().identity(),
            account.borrow().identity()
        );
    }

    #[test]
    fn register_rejects_empty_key_and_unpersisted_object() {
        let (mut registry, _) = setup();
        let err = registry
            .register("  ", persisted("Account"), None, "Reference Data")
            .unwrap_err();
        assert_eq!(err, RegistryError::EmptyKey);

        let unsaved: SharedObject = Rc::new(RefCell::new(StubObject {
            type_name: "Account".to_string(),
            identity: None,
        }));
        let err = registry
            .register("account.x", unsaved, None, "Reference Data")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Unpersisted { .. }));
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn duplicate_key_overwrites_silently() {
        let (mut registry, _) = setup();
        let first = persisted("Account");
        let second = persisted("Account");
        registry
            .register("account.main", first, None, "Reference Data")
            .unwrap();
        registry
            .register("account.main", second.clone(), None, "Reference Data")
            .unwrap();

        assert_eq!(registry.count(), 1);
        let fetched = registry.get("account.main").unwrap();
        assert_eq!(
            fetched.borrow().identity(),
            second.borrow().identity()
        );
    }

    #[test]
    fn overwriting_a_key_keeps_its_position() {
        let (mut registry, _) = setup();
        registry
            .register("account.a", persisted("Account"), None, "Reference Data")
            .unwrap();
        registry
            .register("account.b", persisted("Account"), None, "Reference Data")
            .unwrap();
        registry
            .register("account.a", persisted("Account"), None, "Reference Data")
            .unwrap();

        assert_eq!(registry.all_keys(), vec!["account.a", "account.b"]);
    }

    #[test]
    fn missing_key_lists_available() {
        let (mut registry, _) = setup();
        registry
            .register("account.a", persisted("Account"), None, "Reference Data")
            .unwrap();

        let err = registry.get("account.b").unwrap_err();
        let RegistryError::KeyNotFound { available, .. } = err else {
            panic!("expected KeyNotFound");
        };
        assert_eq!(available, vec!["account.a"]);
    }

    #[test]
    fn get_removes_orphaned_entry() {
        let (mut registry, source) = setup();
        let account = persisted("Account");
        let identity = account.borrow().identity().unwrap();
        registry
            .register("account.gone", account, None, "Reference Data")
            .unwrap();

        source.deleted.borrow_mut().insert(identity.id);
        let err = registry.get("account.gone").unwrap_err();
        assert!(matches!(err, RegistryError::Orphaned { .. }));
        assert!(!registry.exists("account.gone"));
    }

    #[test]
    fn clean_orphaned_removes_exactly_the_dead_entries() {
        let (mut registry, source) = setup();
        let live = persisted("Account");
        let dead_a = persisted("Account");
        let dead_b = persisted("Branch");
        let dead_ids = [
            dead_a.borrow().identity().unwrap().id,
            dead_b.borrow().identity().unwrap().id,
        ];
        registry
            .register("account.live", live, None, "Reference Data")
            .unwrap();
        registry
            .register("account.dead", dead_a, None, "Reference Data")
            .unwrap();
        registry
            .register("branch.dead", dead_b, None, "Reference Data")
            .unwrap();

        for id in dead_ids {
            source.deleted.borrow_mut().insert(id);
        }

        assert_eq!(registry.clean_orphaned(), 2);
        assert_eq!(registry.all_keys(), vec!["account.live"]);
        assert_eq!(registry.clean_orphaned(), 0);
    }

    #[test]
    fn restore_replaces_entry_set() {
        let (mut registry, _) = setup();
        registry
            .register("account.a", persisted("Account"), None, "Reference Data")
            .unwrap();
        let snapshot = registry.entries();

        registry
            .register("account.b", persisted("Account"), None, "Reference Data")
            .unwrap();
        assert_eq!(registry.count(), 2);

        registry.restore(snapshot);
        assert_eq!(registry.all_keys(), vec!["account.a"]);
    }
}
