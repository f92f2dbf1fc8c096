//! Domain object seam: what the engine creates, registers, and mutates.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::ResolvedValue;

/// Durable identity of a created object: type name plus persisted id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ObjectIdentity {
    pub type_name: String,
    pub id: Uuid,
}

impl ObjectIdentity {
    pub fn new(type_name: impl Into<String>, id: Uuid) -> Self {
        Self {
            type_name: type_name.into(),
            id,
        }
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_name, self.id)
    }
}

/// A created domain object.
///
/// Post-creation behavior is dispatched by name against the object's own
/// handler set (`call`), never by reflection. `identity` is `None` until the
/// object has been persisted by its backing store.
pub trait DomainObject: fmt::Debug {
    fn type_name(&self) -> &str;

    fn identity(&self) -> Option<ObjectIdentity>;

    fn attribute(&self, name: &str) -> Option<ResolvedValue>;

    fn attribute_names(&self) -> Vec<String>;

    fn set_attribute(&mut self, name: &str, value: ResolvedValue) -> anyhow::Result<()>;

    /// Invoke a zero-argument post-creation method.
    fn call(&mut self, method: &str) -> anyhow::Result<()>;

    /// Persist pending attribute writes.
    fn save(&mut self) -> anyhow::Result<()>;
}

/// Shared handle to a created object. Parsing is single-threaded per call, so
/// `Rc<RefCell<_>>` is the ownership model throughout.
pub type SharedObject = Rc<RefCell<dyn DomainObject>>;

/// Resolves durable identities back to live objects. The registry uses this
/// for lookup and orphan detection; an identity that no longer resolves marks
/// its entry as orphaned.
pub trait ObjectSource {
    fn find(&self, identity: &ObjectIdentity) -> Option<SharedObject>;
}

/// Human-readable handle for log lines and diagnostics.
pub fn describe(object: &SharedObject) -> String {
    let object = object.borrow();
    match object.identity() {
        Some(identity) => identity.to_string(),
        None => format!("{}#(unsaved)", object.type_name()),
    }
}
