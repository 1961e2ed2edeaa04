//! Filesystem-backed Cell/Box resource tree
//!
//! Cells hold boxes, boxes hold WebDAV collections, OData and service
//! collections, and files. Each node is a directory with a versioned JSON
//! sidecar. Mutations run under keyed locks, and access is decided from ACLs
//! inherited up to the box root.
//!
//! [`TreeFacade`] is the entry point:
//!
//! ```no_run
//! use cellbox::{Caller, NodePath, NodeType, TreeConfig, TreeFacade};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let facade = TreeFacade::new(TreeConfig::new("/srv/cells"))?;
//! let caller = Caller::unit_master();
//! facade.create_cell(&caller, "cellA")?;
//! facade.create_box(&caller, "cellA", "boxA", None)?;
//! facade.mkcol(&caller, &NodePath::parse("/cellA/boxA/col1")?, NodeType::WebdavCollection)?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod acl;
pub mod config;
pub mod destination;
pub mod error;
pub mod facade;
pub mod lock;
pub mod metadata;
pub mod node;
pub mod node_type;
pub mod odata;
pub mod path;
pub mod privilege;
pub mod provision;
pub mod response;

pub use access::{Caller, ContentsRole, UnitCredential};
pub use acl::{Ace, Acl, Principal, SchemaLevel};
pub use config::{ConfigError, RetryPolicy, TreeConfig};
pub use destination::MoveHeaders;
pub use error::{DavError, ErrorKind, Result};
pub use facade::TreeFacade;
pub use lock::{LockGuard, LockKey, LockTable};
pub use metadata::{CellStatus, NodeMetadata};
pub use node::{ResourceNode, Tree};
pub use node_type::NodeType;
pub use odata::{NoopODataStore, ODataStore};
pub use path::NodePath;
pub use privilege::{Privilege, PrivilegeScope};
pub use response::{
    DavResponse, FileContent, Multistatus, PropPatch, PropPatchResult, PropStatus, PropfindEntry,
    Status,
};
