//! Ready-to-use engine assembly over the in-memory backend.

use std::cell::RefCell;
use std::rc::Rc;

use sprout_core::engine::Core;
use sprout_core::registry::Registry;

use crate::factory::RecordFactory;
use crate::store::RecordStore;
use crate::transaction::SnapshotTransaction;

/// An assembled engine plus handles to its store and registry, so tests and
/// the CLI can inspect side effects after a parse.
pub struct Backend {
    pub core: Core,
    pub store: Rc<RecordStore>,
    pub registry: Rc<RefCell<Registry>>,
}

/// Build a [`Core`] wired to a fresh [`RecordStore`], an in-memory registry,
/// a snapshot transaction scope, and one [`RecordFactory`] per name. The
/// record type is the PascalCase form of the factory name.
pub fn backend<I, S>(factory_names: I) -> Backend
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let store = RecordStore::new();
    let registry = Rc::new(RefCell::new(Registry::in_memory(store.clone())));
    let transaction = SnapshotTransaction::new(store.clone(), registry.clone());

    let mut core = Core::new(registry.clone()).with_transaction(Box::new(transaction));
    for name in factory_names {
        let name = name.as_ref();
        core = core.with_factory(
            name,
            Box::new(RecordFactory::new(pascal_case(name), store.clone())),
        );
    }

    Backend {
        core,
        store,
        registry,
    }
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
