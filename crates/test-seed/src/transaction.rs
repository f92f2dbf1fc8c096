//! Snapshot-based transaction scope over the in-memory backend.

use std::cell::RefCell;
use std::rc::Rc;

use sprout_core::object::{ObjectIdentity, SharedObject};
use sprout_core::registry::{Registry, RegistryEntry};
use sprout_core::transaction::TransactionScope;

use crate::store::RecordStore;

/// Captures store membership and registry entries on `begin`, restores both
/// on `rollback`. Attribute writes on surviving objects are not reverted.
pub struct SnapshotTransaction {
    store: Rc<RecordStore>,
    registry: Rc<RefCell<Registry>>,
    snapshot: Option<Snapshot>,
}

struct Snapshot {
    records: Vec<(ObjectIdentity, SharedObject)>,
    entries: Vec<RegistryEntry>,
}

impl SnapshotTransaction {
    pub fn new(store: Rc<RecordStore>, registry: Rc<RefCell<Registry>>) -> Self {
        Self {
            store,
            registry,
            snapshot: None,
        }
    }
}

impl TransactionScope for SnapshotTransaction {
    fn begin(&mut self) -> anyhow::Result<()> {
        self.snapshot = Some(Snapshot {
            records: self.store.snapshot(),
            entries: self.registry.borrow().entries(),
        });
        Ok(())
    }

    fn commit(&mut self) -> anyhow::Result<()> {
        self.snapshot = None;
        Ok(())
    }

    fn rollback(&mut self) -> anyhow::Result<()> {
        let Some(snapshot) = self.snapshot.take() else {
            anyhow::bail!("rollback without an active snapshot");
        };
        self.store.restore(snapshot.records);
        self.registry.borrow_mut().restore(snapshot.entries);
        Ok(())
    }
}
