use crate::error::{DavError, Result};
use crate::metadata::NodeMetadata;
use crate::node_type::NodeType;
use crate::response::{DavResponse, Status};

use super::{create_node_dir, ResourceNode, Tree, SERVICE_SOURCE_COLLECTION};

impl ResourceNode {
    /// Materialize this phantom as a collection of `node_type`
    pub fn mkcol(&mut self, tree: &Tree, node_type: NodeType) -> Result<DavResponse> {
        self.require_dav_level()?;
        if !node_type.is_mkcol_type() {
            return Err(DavError::MethodNotAllowed(format!(
                "mkcol of {} at {}",
                node_type, self.path
            )));
        }
        if self.exists() {
            return Err(DavError::MethodNotAllowed(self.path.to_string()));
        }

        let _lock = tree.lock_dav(&self.path)?;

        let parent = tree
            .parent(self)?
            .filter(ResourceNode::exists)
            .ok_or_else(|| DavError::HasNotParent(self.path.to_string()))?;
        self.load(tree)?;
        if self.exists() {
            return Err(DavError::MethodNotAllowed(self.path.to_string()));
        }
        check_parent_accepts(tree, &parent, node_type)?;

        let max_depth = tree.config().max_collection_depth;
        if self.path.depth() > max_depth {
            return Err(DavError::CollectionDepthExceeded(max_depth));
        }
        let max_children = tree.config().max_child_resource_count;
        if tree.child_count(&parent)? >= max_children {
            return Err(DavError::CollectionChildResourceError(max_children));
        }

        create_node_dir(&self.dir)?;
        let metadata = NodeMetadata::new(node_type);
        tree.metadata_file(&self.dir).create(&metadata)?;
        let etag = metadata.etag();
        self.metadata = Some(metadata);

        if node_type == NodeType::ServiceCollection {
            let src_dir = self.dir.join(SERVICE_SOURCE_COLLECTION);
            create_node_dir(&src_dir)?;
            tree.metadata_file(&src_dir)
                .create(&NodeMetadata::new(NodeType::WebdavCollection))?;
        }

        tracing::info!(path = %self.path, node_type = %node_type, "collection created");
        Ok(DavResponse::new(Status::Created, etag))
    }
}

/// Whether a new child of `child_type` may be bound below `parent`
pub(super) fn check_parent_accepts(
    tree: &Tree,
    parent: &ResourceNode,
    child_type: NodeType,
) -> Result<()> {
    if !parent.node_type().accepts_children() {
        return Err(DavError::ResourceProhibitedUnderParent(
            parent.path.to_string(),
        ));
    }
    if child_type.is_collection() {
        if let Some(grandparent) = tree.parent(parent)? {
            if grandparent.node_type() == NodeType::ServiceCollection {
                return Err(DavError::ServiceSourceProhibitedToContainCollection);
            }
        }
    }
    Ok(())
}
