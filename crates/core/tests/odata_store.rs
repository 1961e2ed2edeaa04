//! Integration tests for deletes that reach into the OData data store

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use cellbox::lock::LockCategory;
use cellbox::{DavError, NodeType, ODataStore, ResourceNode, Status};

use common::{dav, master, setup_test_env_with_store};

/// Records every emptied collection; reports entities until emptied
#[derive(Debug, Default)]
struct RecordingODataStore {
    has_entities: AtomicBool,
    emptied: Mutex<Vec<Uuid>>,
}

impl ODataStore for RecordingODataStore {
    fn is_empty(&self, _collection: &ResourceNode) -> cellbox::Result<bool> {
        Ok(!self.has_entities.load(Ordering::SeqCst))
    }

    fn make_empty(&self, collection: &ResourceNode) -> cellbox::Result<()> {
        if let Some(id) = collection.id() {
            self.emptied.lock().push(id);
        }
        self.has_entities.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_non_recursive_delete_asks_the_store() {
    let store = Arc::new(RecordingODataStore::default());
    let (facade, _temp_dir) = setup_test_env_with_store(store.clone());
    facade
        .mkcol(&master(), &dav("entities"), NodeType::ODataCollection)
        .unwrap();

    store.has_entities.store(true, Ordering::SeqCst);
    assert!(matches!(
        facade.delete(&master(), &dav("entities"), None, false),
        Err(DavError::HasChildren(_))
    ));
    assert!(store.emptied.lock().is_empty());

    store.has_entities.store(false, Ordering::SeqCst);
    let deleted = facade
        .delete(&master(), &dav("entities"), None, false)
        .unwrap();
    assert_eq!(deleted.status, Status::NoContent);
}

#[test]
fn test_recursive_delete_empties_nested_odata_collections() {
    let store = Arc::new(RecordingODataStore::default());
    let (facade, _temp_dir) = setup_test_env_with_store(store.clone());
    facade
        .mkcol(&master(), &dav("app"), NodeType::WebdavCollection)
        .unwrap();
    facade
        .mkcol(&master(), &dav("app/db"), NodeType::ODataCollection)
        .unwrap();
    let db_id = facade.node(&dav("app/db")).unwrap().id().unwrap();
    store.has_entities.store(true, Ordering::SeqCst);

    facade.delete(&master(), &dav("app"), None, true).unwrap();

    assert_eq!(*store.emptied.lock(), vec![db_id]);
    assert!(!facade.node(&dav("app")).unwrap().exists());
    assert_eq!(facade.tree().locks().held_count(), 0);
}

/// Checks from inside the store that the node lock is held while emptying
#[derive(Debug)]
struct LockProbe {
    tree: Mutex<Option<cellbox::Tree>>,
    saw: AtomicBool,
}

impl ODataStore for LockProbe {
    fn is_empty(&self, _collection: &ResourceNode) -> cellbox::Result<bool> {
        Ok(true)
    }

    fn make_empty(&self, _collection: &ResourceNode) -> cellbox::Result<()> {
        if let Some(tree) = self.tree.lock().as_ref() {
            // the box lock and the odata node lock
            self.saw
                .store(tree.locks().held_count() == 2, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[test]
fn test_odata_emptying_runs_under_node_lock() {
    let probe = Arc::new(LockProbe {
        tree: Mutex::new(None),
        saw: AtomicBool::new(false),
    });
    let (facade, _temp_dir) = setup_test_env_with_store(probe.clone());
    *probe.tree.lock() = Some(facade.tree().clone());
    facade
        .mkcol(&master(), &dav("db"), NodeType::ODataCollection)
        .unwrap();

    let db = facade.node(&dav("db")).unwrap();
    let cell_id = facade
        .node(&db.path().cell_path())
        .unwrap()
        .id()
        .unwrap();
    let box_id = facade
        .node(&db.path().box_path().unwrap())
        .unwrap()
        .id()
        .unwrap();
    let key = cellbox::LockKey::odata(cell_id, box_id, db.id().unwrap());
    assert_eq!(key.category, LockCategory::ODataCollection);

    facade.delete(&master(), &dav("db"), None, true).unwrap();
    assert!(probe.saw.load(Ordering::SeqCst));
    assert!(!facade.tree().locks().is_held(&key));

    // break the reference cycle between the store and the tree
    probe.tree.lock().take();
}
