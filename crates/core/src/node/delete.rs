use std::fs;

use crate::error::{DavError, Result};
use crate::metadata::etag_matches;
use crate::node_type::NodeType;
use crate::response::{DavResponse, Status};

use super::{ResourceNode, Tree};

impl ResourceNode {
    /// Remove this node. Collections must be empty unless `recursive`.
    pub fn delete(
        &mut self,
        tree: &Tree,
        if_match: Option<&str>,
        recursive: bool,
    ) -> Result<DavResponse> {
        self.require_dav_level()?;
        self.check_etag(if_match)?;

        let _lock = tree.lock_dav(&self.path)?;
        self.load(tree)?;
        self.check_etag(if_match)?;

        if self.is_collection() {
            if recursive {
                self.make_empty(tree)?;
            } else if !self.is_empty(tree)? {
                return Err(DavError::HasChildren(self.path.to_string()));
            }
        }

        fs::remove_dir_all(&self.dir)?;
        self.metadata = None;

        tracing::info!(path = %self.path, recursive, "resource deleted");
        Ok(DavResponse {
            status: Status::NoContent,
            etag: None,
            location: None,
        })
    }

    fn check_etag(&self, if_match: Option<&str>) -> Result<()> {
        let metadata = self.require_metadata()?;
        if !etag_matches(&metadata.etag(), if_match) {
            return Err(DavError::EtagMismatch);
        }
        Ok(())
    }

    /// Release everything held below this collection that lives outside its
    /// directory. The directory tree itself is removed by the caller.
    fn make_empty(&self, tree: &Tree) -> Result<()> {
        match self.node_type() {
            NodeType::ODataCollection => {
                let _lock = tree.lock_odata(self)?;
                tree.odata().make_empty(self)?;
                tracing::debug!(path = %self.path, "odata collection emptied");
            }
            NodeType::WebdavCollection | NodeType::ServiceCollection | NodeType::BoxCollection => {
                for child in tree.children(self)?.values() {
                    if child.is_collection() {
                        child.make_empty(tree)?;
                    }
                }
            }
            NodeType::DavFile | NodeType::Cell | NodeType::Null => {}
        }
        Ok(())
    }
}
