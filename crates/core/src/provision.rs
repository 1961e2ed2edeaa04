//! Cell and box provisioning
//!
//! Cells and boxes are the fixed upper layers of the tree. They are created
//! here rather than through MKCOL, under cell-granularity locks.

use crate::error::{DavError, Result};
use crate::lock::LockKey;
use crate::metadata::{CellStatus, NodeMetadata};
use crate::node::{create_node_dir, ResourceNode, Tree, BOX_SCHEMA_KEY};
use crate::node_type::NodeType;
use crate::path::NodePath;

pub fn create_cell(tree: &Tree, name: &str) -> Result<ResourceNode> {
    let path = NodePath::cell(name)?;
    // the cell has no id yet, so creation is keyed by name
    let _lock = tree.locks().acquire(LockKey::cell(name));

    let mut node = tree.node(&path)?;
    if node.exists() {
        return Err(DavError::MethodNotAllowed(path.to_string()));
    }
    std::fs::create_dir_all(tree.root())?;
    create_node_dir(node.dir())?;

    let mut metadata = NodeMetadata::new(NodeType::Cell);
    metadata.cell_status = Some(CellStatus::Normal);
    tree.metadata_file(node.dir()).create(&metadata)?;
    node.metadata = Some(metadata);

    tracing::info!(cell = name, "cell created");
    Ok(node)
}

pub fn create_box(
    tree: &Tree,
    cell: &str,
    name: &str,
    schema: Option<&str>,
) -> Result<ResourceNode> {
    let path = NodePath::box_root(cell, name)?;
    let _lock = tree.lock_cell(cell)?;

    let mut node = tree.node(&path)?;
    if node.exists() {
        return Err(DavError::MethodNotAllowed(path.to_string()));
    }
    create_node_dir(node.dir())?;

    let mut metadata = NodeMetadata::new(NodeType::BoxCollection);
    if let Some(schema) = schema.filter(|s| !s.is_empty()) {
        metadata
            .properties
            .insert(BOX_SCHEMA_KEY.to_string(), schema.to_string());
    }
    tree.metadata_file(node.dir()).create(&metadata)?;
    node.metadata = Some(metadata);

    tracing::info!(cell, box_name = name, schema, "box created");
    Ok(node)
}

pub fn set_cell_status(tree: &Tree, cell: &str, status: CellStatus) -> Result<ResourceNode> {
    let _lock = tree.lock_cell(cell)?;
    let mut node = tree.node(&NodePath::cell(cell)?)?;

    let sidecar = tree.metadata_file(node.dir());
    let metadata = node.require_metadata_mut()?;
    metadata.cell_status = Some(status);
    metadata.touch();
    sidecar.save(metadata)?;

    tracing::info!(cell, ?status, "cell status changed");
    Ok(node)
}
