//! Declarative seed document engine.
//!
//! Documents are YAML mappings of sections; each section maps model types to
//! the items to create. The engine resolves cross-references (`@name`,
//! `@name.attribute`, `registry.<type>.<key>`, `[[ expr ]]`), dispatches
//! creation through pluggable factories and capability providers, records
//! durable identities in a registry, and reports failures as rich,
//! remediation-oriented diagnostics.
//!
//! The crate ships no object backend of its own: embedders implement
//! [`object::DomainObject`], [`object::ObjectSource`],
//! [`engine::Factory`] / [`engine::CapabilityProvider`], and optionally
//! [`transaction::TransactionScope`] and [`registry::RegistryStore`].

pub mod dates;
pub mod engine;
pub mod error;
pub mod inflect;
pub mod loader;
pub mod object;
pub mod registry;
pub mod resolver;
pub mod transaction;
pub mod value;

pub use engine::{validate_document, CapabilityProvider, Core, Factory, FactoryRegistry, ParseOptions};
pub use error::{ErrorKind, ParseError};
pub use loader::Loader;
pub use object::{DomainObject, ObjectIdentity, ObjectSource, SharedObject};
pub use registry::{Registry, RegistryEntry, RegistryError, RegistryStore};
pub use resolver::{ExecutionContext, ReferenceResolver};
pub use transaction::{NoopTransaction, TransactionScope};
pub use value::{Attributes, ResolvedValue};
