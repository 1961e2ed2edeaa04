//! Hook into the data store backing OData collections
//!
//! The tree only keeps the directory and sidecar of an OData collection. Its
//! entities live elsewhere, so emptiness checks and recursive deletes are
//! delegated to an [`ODataStore`].

use std::fmt::Debug;

use crate::error::Result;
use crate::node::ResourceNode;

pub trait ODataStore: Send + Sync + Debug {
    /// Whether the collection holds no entities
    ///
    /// # Arguments
    /// * `collection` - A materialized OData collection node
    fn is_empty(&self, collection: &ResourceNode) -> Result<bool>;

    /// Remove every entity of the collection. Called while the collection's
    /// node-granularity lock is held.
    fn make_empty(&self, collection: &ResourceNode) -> Result<()>;
}

/// Store for trees without OData entities; every collection is empty
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopODataStore;

impl ODataStore for NoopODataStore {
    fn is_empty(&self, _collection: &ResourceNode) -> Result<bool> {
        Ok(true)
    }

    fn make_empty(&self, _collection: &ResourceNode) -> Result<()> {
        Ok(())
    }
}
