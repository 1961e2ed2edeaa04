//! Filesystem-backed resource nodes
//!
//! A [`Tree`] maps [`NodePath`]s onto directories below the configured root.
//! A [`ResourceNode`] is a snapshot of one position: it exists when both its
//! directory and its sidecar are present, otherwise it is a phantom. Node
//! snapshots are cheap and never cached; every mutation reloads its node
//! after taking the lock.

mod content;
mod delete;
mod mkcol;
mod props;
mod put;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use url::Url;
use uuid::Uuid;

use crate::acl::Acl;
use crate::config::{ConfigError, TreeConfig};
use crate::error::{DavError, Result};
use crate::lock::{LockGuard, LockKey, LockTable};
use crate::metadata::{MetadataFile, NodeMetadata};
use crate::node_type::NodeType;
use crate::odata::{NoopODataStore, ODataStore};
use crate::path::{NodePath, PathLevel};

pub use content::ByteRange;

pub const CONTENT_FILE_NAME: &str = "content";
pub const TEMP_FILE_NAME: &str = "tmp";
/// Source collection every service collection carries
pub const SERVICE_SOURCE_COLLECTION: &str = "__src";
pub const OWNER_REPRESENTATIVE_ACCOUNTS_KEY: &str =
    "ownerRepresentativeAccounts@urn:x-personium:xmlns";
/// Box property holding the schema url of the application owning the box
pub const BOX_SCHEMA_KEY: &str = "schema@urn:x-personium:xmlns";

static ACCOUNT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:[\w-]+:)?account>([^<]*)</(?:[\w-]+:)?account>").unwrap());

/// Shared handle on one resource tree
#[derive(Debug, Clone)]
pub struct Tree {
    config: Arc<TreeConfig>,
    unit: Url,
    locks: Arc<LockTable>,
    odata: Arc<dyn ODataStore>,
}

impl Tree {
    pub fn new(config: TreeConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_odata_store(config, Arc::new(NoopODataStore))
    }

    pub fn with_odata_store(
        config: TreeConfig,
        odata: Arc<dyn ODataStore>,
    ) -> std::result::Result<Self, ConfigError> {
        let unit = config.unit()?;
        Ok(Self {
            config: Arc::new(config),
            unit,
            locks: Arc::new(LockTable::new()),
            odata,
        })
    }

    /// Share a lock table with another tree over the same root
    pub fn with_locks(mut self, locks: Arc<LockTable>) -> Self {
        self.locks = locks;
        self
    }

    /* Getters */

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn unit(&self) -> &Url {
        &self.unit
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn odata(&self) -> &dyn ODataStore {
        self.odata.as_ref()
    }

    pub fn metadata_file(&self, dir: &Path) -> MetadataFile {
        MetadataFile::new(dir, self.config.fsync, self.config.retry)
    }

    pub fn url_of(&self, path: &NodePath) -> Url {
        path.url(&self.unit)
    }

    /// Load the node at `path`
    pub fn node(&self, path: &NodePath) -> Result<ResourceNode> {
        let mut node = ResourceNode::phantom(path.clone(), path.fs_dir(self.root()));
        node.load(self)?;
        Ok(node)
    }

    /// Child of `parent`. A phantom parent yields a phantom child without
    /// touching the filesystem.
    pub fn child(&self, parent: &ResourceNode, name: &str) -> Result<ResourceNode> {
        let path = parent.path.join(name)?;
        if !parent.exists() {
            let dir = parent.dir.join(name);
            return Ok(ResourceNode::phantom(path, dir));
        }
        self.node(&path)
    }

    /// Parent of `node`, resolved by path. `None` for a cell.
    pub fn parent(&self, node: &ResourceNode) -> Result<Option<ResourceNode>> {
        node.path.parent().map(|p| self.node(&p)).transpose()
    }

    /// Materialized children, keyed by name
    pub fn children(&self, node: &ResourceNode) -> Result<BTreeMap<String, ResourceNode>> {
        let mut children = BTreeMap::new();
        for name in self.child_names(node)? {
            let child = self.child(node, &name)?;
            if child.exists() {
                children.insert(name, child);
            }
        }
        Ok(children)
    }

    /// Number of child directories, materialized or not
    pub fn child_count(&self, node: &ResourceNode) -> Result<usize> {
        Ok(self.child_names(node)?.len())
    }

    fn child_names(&self, node: &ResourceNode) -> Result<Vec<String>> {
        if !node.exists() {
            return Ok(Vec::new());
        }
        let entries = match fs::read_dir(&node.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Box-granularity lock covering every WebDAV node of the box `path`
    /// lives in
    pub fn lock_dav(&self, path: &NodePath) -> Result<LockGuard<'_>> {
        let (cell_id, box_id) = self.box_ids(path)?;
        Ok(self.locks.acquire(LockKey::dav(cell_id, box_id)))
    }

    /// Node-granularity lock for emptying an OData collection
    pub fn lock_odata(&self, node: &ResourceNode) -> Result<LockGuard<'_>> {
        let (cell_id, box_id) = self.box_ids(&node.path)?;
        let node_id = node
            .id()
            .ok_or_else(|| DavError::NotFound(node.path.to_string()))?;
        Ok(self.locks.acquire(LockKey::odata(cell_id, box_id, node_id)))
    }

    /// Cell-granularity lock for an existing cell
    pub fn lock_cell(&self, cell: &str) -> Result<LockGuard<'_>> {
        let cell = self.node(&NodePath::cell(cell)?)?;
        let cell_id = cell
            .id()
            .ok_or_else(|| DavError::NotFound(cell.path.to_string()))?;
        Ok(self.locks.acquire(LockKey::cell(cell_id.to_string())))
    }

    fn box_ids(&self, path: &NodePath) -> Result<(Uuid, Uuid)> {
        let box_path = path
            .box_path()
            .ok_or_else(|| DavError::MethodNotAllowed(path.to_string()))?;
        let cell = self.node(&path.cell_path())?;
        let bx = self.node(&box_path)?;
        match (cell.id(), bx.id()) {
            (Some(cell_id), Some(box_id)) => Ok((cell_id, box_id)),
            (None, _) => Err(DavError::NotFound(cell.path.to_string())),
            (_, None) => Err(DavError::NotFound(bx.path.to_string())),
        }
    }
}

/// Snapshot of one tree position
#[derive(Debug, Clone)]
pub struct ResourceNode {
    pub(crate) path: NodePath,
    pub(crate) dir: PathBuf,
    pub(crate) metadata: Option<NodeMetadata>,
}

impl ResourceNode {
    pub(crate) fn phantom(path: NodePath, dir: PathBuf) -> Self {
        Self {
            path,
            dir,
            metadata: None,
        }
    }

    /// Re-read the sidecar. A missing directory or sidecar leaves a phantom.
    pub fn load(&mut self, tree: &Tree) -> Result<()> {
        if !self.dir.is_dir() {
            self.metadata = None;
            return Ok(());
        }
        self.metadata = tree.metadata_file(&self.dir).load()?;
        tracing::debug!(path = %self.path, exists = self.metadata.is_some(), "node loaded");
        Ok(())
    }

    /// Directory and sidecar were both present at the last load
    pub fn exists(&self) -> bool {
        self.metadata.is_some()
    }

    pub(crate) fn relocate(&mut self, path: NodePath, dir: PathBuf) {
        self.path = path;
        self.dir = dir;
    }

    /* Getters */

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn metadata(&self) -> Option<&NodeMetadata> {
        self.metadata.as_ref()
    }

    pub fn node_type(&self) -> NodeType {
        self.metadata
            .as_ref()
            .map(|m| m.node_type)
            .unwrap_or(NodeType::Null)
    }

    pub fn id(&self) -> Option<Uuid> {
        self.metadata.as_ref().map(|m| m.id)
    }

    pub fn etag(&self) -> Option<String> {
        self.metadata.as_ref().map(NodeMetadata::etag)
    }

    pub fn version(&self) -> Option<i64> {
        self.metadata.as_ref().map(|m| m.version)
    }

    pub fn acl(&self) -> Option<&Acl> {
        self.metadata.as_ref().and_then(|m| m.acl.as_ref())
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.properties.get(key))
            .map(String::as_str)
    }

    pub fn content_path(&self) -> PathBuf {
        self.dir.join(CONTENT_FILE_NAME)
    }

    pub fn is_collection(&self) -> bool {
        self.node_type().is_collection()
    }

    /// Accounts listed in the owner-representative property, in order
    pub fn owner_representative_accounts(&self) -> Vec<String> {
        let Some(raw) = self.property(OWNER_REPRESENTATIVE_ACCOUNTS_KEY) else {
            return Vec::new();
        };
        ACCOUNT_REGEX
            .captures_iter(raw)
            .map(|c| c[1].trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Metadata of an existing node, or NotFound
    pub(crate) fn require_metadata(&self) -> Result<&NodeMetadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| DavError::NotFound(self.path.to_string()))
    }

    pub(crate) fn require_metadata_mut(&mut self) -> Result<&mut NodeMetadata> {
        let path = &self.path;
        self.metadata
            .as_mut()
            .ok_or_else(|| DavError::NotFound(path.to_string()))
    }

    pub(crate) fn require_dav_level(&self) -> Result<()> {
        if self.path.level() != PathLevel::Dav {
            return Err(DavError::MethodNotAllowed(self.path.to_string()));
        }
        Ok(())
    }

    /// Whether the collection holds nothing that a non-recursive delete
    /// would orphan
    pub fn is_empty(&self, tree: &Tree) -> Result<bool> {
        match self.node_type() {
            NodeType::ODataCollection => tree.odata().is_empty(self),
            NodeType::ServiceCollection => {
                let src = tree.child(self, SERVICE_SOURCE_COLLECTION)?;
                Ok(tree.child_count(&src)? == 0)
            }
            NodeType::WebdavCollection | NodeType::BoxCollection | NodeType::Cell => {
                Ok(tree.child_count(self)? == 0)
            }
            NodeType::DavFile | NodeType::Null => Ok(true),
        }
    }
}

/// Create `dir`, accepting a leftover directory of a phantom
pub(crate) fn create_node_dir(dir: &Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e.into()),
    }
}
