//! Shared in-memory object store.

use std::cell::RefCell;
use std::rc::Rc;

use uuid::Uuid;

use sprout_core::object::{DomainObject, ObjectIdentity, ObjectSource, SharedObject};

use crate::record::Record;

/// Insertion-ordered store of persisted records. Doubles as the
/// [`ObjectSource`] behind the registry, so deleting a record here is how
/// tests manufacture orphaned registry entries.
#[derive(Default)]
pub struct RecordStore {
    records: RefCell<Vec<(ObjectIdentity, SharedObject)>>,
}

impl RecordStore {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Assign a fresh identity and persist the record.
    pub fn persist(&self, mut record: Record) -> SharedObject {
        let identity = ObjectIdentity::new(record.type_name(), Uuid::new_v4());
        record.assign_identity(identity.clone());
        let object: SharedObject = Rc::new(RefCell::new(record));
        self.records.borrow_mut().push((identity, object.clone()));
        object
    }

    pub fn delete(&self, identity: &ObjectIdentity) -> bool {
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|(existing, _)| existing != identity);
        records.len() != before
    }

    pub fn contains(&self, identity: &ObjectIdentity) -> bool {
        self.records
            .borrow()
            .iter()
            .any(|(existing, _)| existing == identity)
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Membership snapshot for transaction rollback. Attribute state is not
    /// captured; rollback restores which objects exist, not their fields.
    pub fn snapshot(&self) -> Vec<(ObjectIdentity, SharedObject)> {
        self.records.borrow().clone()
    }

    pub fn restore(&self, snapshot: Vec<(ObjectIdentity, SharedObject)>) {
        *self.records.borrow_mut() = snapshot;
    }
}

impl ObjectSource for RecordStore {
    fn find(&self, identity: &ObjectIdentity) -> Option<SharedObject> {
        self.records
            .borrow()
            .iter()
            .find(|(existing, _)| existing == identity)
            .map(|(_, object)| object.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_assigns_identity_and_stores() {
        let store = RecordStore::new();
        let object = store.persist(Record::new("Account"));
        let identity = object.borrow().identity().unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.contains(&identity));
        assert!(store.find(&identity).is_some());
    }

    #[test]
    fn delete_makes_identities_unresolvable() {
        let store = RecordStore::new();
        let object = store.persist(Record::new("Account"));
        let identity = object.borrow().identity().unwrap();

        assert!(store.delete(&identity));
        assert!(store.find(&identity).is_none());
        assert!(!store.delete(&identity));
    }

    #[test]
    fn snapshot_and_restore_track_membership() {
        let store = RecordStore::new();
        store.persist(Record::new("Account"));
        let snapshot = store.snapshot();

        store.persist(Record::new("Branch"));
        assert_eq!(store.len(), 2);

        store.restore(snapshot);
        assert_eq!(store.len(), 1);
    }
}
