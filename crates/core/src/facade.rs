//! Entry point for every other subsystem
//!
//! [`TreeFacade`] pairs each WebDAV verb with the privilege it needs, checks
//! access and then hands over to the node operations. Nothing outside this
//! crate should call node mutations directly.

use std::io::Read;
use std::sync::Arc;

use url::Url;

use crate::access::{check_access, has_privilege, Caller};
use crate::acl::Acl;
use crate::config::{ConfigError, TreeConfig};
use crate::destination::{self, parse_depth, parse_overwrite, MoveDestination, MoveHeaders};
use crate::error::{DavError, Result};
use crate::metadata::CellStatus;
use crate::node::{ResourceNode, Tree, SERVICE_SOURCE_COLLECTION};
use crate::node_type::NodeType;
use crate::odata::ODataStore;
use crate::path::{NodePath, PathLevel};
use crate::privilege::{box_privilege, cell_privilege, Privilege};
use crate::provision;
use crate::response::{
    DavResponse, FileContent, Multistatus, PropPatch, PropPatchResult, PropfindEntry,
};

/// PROPFIND depth header; `infinity` is refused
fn parse_propfind_depth(depth: Option<&str>) -> Result<u8> {
    match depth.map(str::trim) {
        None | Some("1") => Ok(1),
        Some("0") => Ok(0),
        Some(v) if v.eq_ignore_ascii_case("infinity") => Err(DavError::PropfindInfinityNotAllowed),
        Some(v) => Err(DavError::InvalidHeader {
            header: "Depth",
            value: v.to_string(),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct TreeFacade {
    tree: Tree,
}

impl TreeFacade {
    pub fn new(config: TreeConfig) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            tree: Tree::new(config)?,
        })
    }

    pub fn with_odata_store(
        config: TreeConfig,
        odata: Arc<dyn ODataStore>,
    ) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            tree: Tree::with_odata_store(config, odata)?,
        })
    }

    pub fn from_tree(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn url_of(&self, path: &NodePath) -> Url {
        self.tree.url_of(path)
    }

    /// Load the node at `path` without any access check
    pub fn node(&self, path: &NodePath) -> Result<ResourceNode> {
        self.tree.node(path)
    }

    fn existing(&self, path: &NodePath) -> Result<ResourceNode> {
        let node = self.tree.node(path)?;
        if !node.exists() {
            return Err(DavError::NotFound(path.to_string()));
        }
        Ok(node)
    }

    fn parent_of(&self, node: &ResourceNode) -> Result<ResourceNode> {
        self.tree
            .parent(node)?
            .ok_or_else(|| DavError::MethodNotAllowed(node.path().to_string()))
    }

    /// The `__src` folder lives and dies with its service collection
    fn check_not_service_source(node: &ResourceNode, parent: &ResourceNode) -> Result<()> {
        if parent.node_type() == NodeType::ServiceCollection
            && node.name() == SERVICE_SOURCE_COLLECTION
        {
            return Err(DavError::ServiceSourceProhibitedToMove);
        }
        Ok(())
    }

    /// Privileges for reading properties and the ACL at this node's level
    fn read_privileges(node: &ResourceNode) -> (&'static Privilege, &'static Privilege) {
        match node.path().level() {
            PathLevel::Cell => (&cell_privilege::PROPFIND, &cell_privilege::ACL_READ),
            PathLevel::Box | PathLevel::Dav => {
                (&box_privilege::READ_PROPERTIES, &box_privilege::READ_ACL)
            }
        }
    }

    pub fn create_cell(&self, caller: &Caller, name: &str) -> Result<ResourceNode> {
        if !caller
            .unit_credential
            .is_some_and(|c| c.grants(&cell_privilege::ROOT))
        {
            return Err(DavError::NecessaryPrivilegeLacking(
                cell_privilege::ROOT.name().to_string(),
            ));
        }
        provision::create_cell(&self.tree, name)
    }

    pub fn create_box(
        &self,
        caller: &Caller,
        cell: &str,
        name: &str,
        schema: Option<&str>,
    ) -> Result<ResourceNode> {
        let cell_node = self.existing(&NodePath::cell(cell)?)?;
        check_access(
            &self.tree,
            &cell_node,
            caller,
            &cell_privilege::BOX_INSTALL,
            None,
        )?;
        provision::create_box(&self.tree, cell, name, schema)
    }

    pub fn set_cell_status(
        &self,
        caller: &Caller,
        cell: &str,
        status: CellStatus,
    ) -> Result<ResourceNode> {
        let cell_node = self.existing(&NodePath::cell(cell)?)?;
        check_access(&self.tree, &cell_node, caller, &cell_privilege::ROOT, None)?;
        provision::set_cell_status(&self.tree, cell, status)
    }

    pub fn propfind(
        &self,
        caller: &Caller,
        path: &NodePath,
        depth: Option<&str>,
    ) -> Result<Multistatus> {
        let depth = parse_propfind_depth(depth)?;
        let node = self.existing(path)?;
        let (read, read_acl) = Self::read_privileges(&node);
        check_access(&self.tree, &node, caller, read, None)?;
        let show_acl = caller
            .unit_credential
            .is_some_and(|c| c.grants(read_acl))
            || has_privilege(&self.tree, &node, caller, read_acl, None)?;

        let mut responses = vec![self.propfind_entry(&node, show_acl)?];
        if depth == 1 && node.is_collection() {
            for child in self.tree.children(&node)?.values() {
                responses.push(self.propfind_entry(child, show_acl)?);
            }
        }
        Ok(Multistatus { responses })
    }

    fn propfind_entry(&self, node: &ResourceNode, show_acl: bool) -> Result<PropfindEntry> {
        let metadata = node
            .metadata()
            .ok_or_else(|| DavError::NotFound(node.path().to_string()))?;
        let is_file = metadata.node_type == NodeType::DavFile;
        Ok(PropfindEntry {
            href: self.tree.url_of(node.path()),
            node_type: metadata.node_type,
            id: metadata.id,
            etag: metadata.etag(),
            published: metadata.published,
            updated: metadata.updated,
            content_type: if is_file {
                metadata.content_type.clone()
            } else {
                None
            },
            content_length: is_file.then_some(metadata.content_length),
            properties: metadata.properties.clone(),
            owner_representative_accounts: node.owner_representative_accounts(),
            acl: if show_acl { metadata.acl.clone() } else { None },
        })
    }

    pub fn proppatch(
        &self,
        caller: &Caller,
        path: &NodePath,
        patch: &PropPatch,
    ) -> Result<PropPatchResult> {
        let mut node = self.existing(path)?;
        if path.level() == PathLevel::Cell {
            // only unit users may patch cell properties
            if caller.unit_credential.is_none() {
                return Err(DavError::UnitUserAccessRequired);
            }
            check_access(&self.tree, &node, caller, &cell_privilege::ROOT, None)?;
        } else {
            check_access(
                &self.tree,
                &node,
                caller,
                &box_privilege::WRITE_PROPERTIES,
                None,
            )?;
        }
        node.proppatch(&self.tree, patch)
    }

    pub fn acl(&self, caller: &Caller, path: &NodePath, acl: Acl) -> Result<DavResponse> {
        let mut node = self.existing(path)?;
        let required = match path.level() {
            PathLevel::Cell => &cell_privilege::ACL,
            PathLevel::Box | PathLevel::Dav => &box_privilege::WRITE_ACL,
        };
        check_access(&self.tree, &node, caller, required, None)?;
        node.set_acl(&self.tree, acl)
    }

    pub fn get(&self, caller: &Caller, path: &NodePath, range: Option<&str>) -> Result<FileContent> {
        let node = self.existing(path)?;
        check_access(&self.tree, &node, caller, &box_privilege::READ, None)?;
        node.get(range)
    }

    pub fn put<R: Read>(
        &self,
        caller: &Caller,
        path: &NodePath,
        content_type: Option<&str>,
        body: R,
        if_match: Option<&str>,
    ) -> Result<DavResponse> {
        let mut node = self.tree.node(path)?;
        node.require_dav_level()?;
        if node.exists() {
            if node.is_collection() {
                return Err(DavError::MethodNotAllowed(path.to_string()));
            }
            check_access(
                &self.tree,
                &node,
                caller,
                &box_privilege::WRITE_CONTENT,
                None,
            )?;
            node.put_for_update(&self.tree, content_type, body, if_match)
        } else {
            let parent = self.parent_of(&node)?;
            check_access(&self.tree, &parent, caller, &box_privilege::BIND, None)?;
            node.put_for_create(&self.tree, content_type, body)
        }
    }

    pub fn mkcol(&self, caller: &Caller, path: &NodePath, node_type: NodeType) -> Result<DavResponse> {
        let mut node = self.tree.node(path)?;
        node.require_dav_level()?;
        if node.exists() {
            return Err(DavError::MethodNotAllowed(path.to_string()));
        }
        let parent = self.parent_of(&node)?;
        check_access(&self.tree, &parent, caller, &box_privilege::BIND, None)?;
        node.mkcol(&self.tree, node_type)
    }

    pub fn delete(
        &self,
        caller: &Caller,
        path: &NodePath,
        if_match: Option<&str>,
        recursive: bool,
    ) -> Result<DavResponse> {
        let mut node = self.existing(path)?;
        node.require_dav_level()?;
        let parent = self.parent_of(&node)?;
        Self::check_not_service_source(&node, &parent)?;
        check_access(&self.tree, &parent, caller, &box_privilege::UNBIND, None)?;
        node.delete(&self.tree, if_match, recursive)
    }

    pub fn move_resource(
        &self,
        caller: &Caller,
        path: &NodePath,
        headers: &MoveHeaders,
    ) -> Result<DavResponse> {
        let overwrite = parse_overwrite(headers.overwrite.as_deref())?;
        parse_depth(headers.depth.as_deref())?;

        let mut source = self.existing(path)?;
        source.require_dav_level()?;
        let parent = self.parent_of(&source)?;
        Self::check_not_service_source(&source, &parent)?;
        let mut target = MoveDestination::parse(&self.tree, path, &headers.destination)?;

        check_access(&self.tree, &parent, caller, &box_privilege::UNBIND, None)?;

        destination::execute(
            &self.tree,
            caller,
            &mut source,
            &mut target,
            overwrite,
            headers.if_match.as_deref(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_propfind_depth() {
        assert_eq!(parse_propfind_depth(None).unwrap(), 1);
        assert_eq!(parse_propfind_depth(Some("0")).unwrap(), 0);
        assert!(matches!(
            parse_propfind_depth(Some("Infinity")),
            Err(DavError::PropfindInfinityNotAllowed)
        ));
        assert!(matches!(
            parse_propfind_depth(Some("2")),
            Err(DavError::InvalidHeader { .. })
        ));
    }
}
