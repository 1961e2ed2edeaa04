use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use crate::error::{DavError, Result};
use crate::metadata::{etag_matches, now_millis, NodeMetadata};
use crate::node_type::NodeType;
use crate::response::{DavResponse, Status};

use super::mkcol::check_parent_accepts;
use super::{create_node_dir, ResourceNode, Tree, CONTENT_FILE_NAME, TEMP_FILE_NAME};

impl ResourceNode {
    /// Store `body` as this file's content, creating the file if needed
    pub fn put<R: Read>(
        &mut self,
        tree: &Tree,
        content_type: Option<&str>,
        body: R,
        if_match: Option<&str>,
    ) -> Result<DavResponse> {
        if self.exists() {
            self.put_for_update(tree, content_type, body, if_match)
        } else {
            self.put_for_create(tree, content_type, body)
        }
    }

    pub fn put_for_create<R: Read>(
        &mut self,
        tree: &Tree,
        content_type: Option<&str>,
        body: R,
    ) -> Result<DavResponse> {
        self.require_dav_level()?;
        let _lock = tree.lock_dav(&self.path)?;
        self.load(tree)?;
        if self.exists() {
            // created by someone else while we waited for the lock
            return self.update_file_locked(tree, content_type, body, None);
        }
        let parent = tree
            .parent(self)?
            .filter(ResourceNode::exists)
            .ok_or_else(|| DavError::HasNotParent(self.path.to_string()))?;
        self.create_file_locked(tree, &parent, content_type, body)
    }

    pub fn put_for_update<R: Read>(
        &mut self,
        tree: &Tree,
        content_type: Option<&str>,
        body: R,
        if_match: Option<&str>,
    ) -> Result<DavResponse> {
        self.require_dav_level()?;
        let _lock = tree.lock_dav(&self.path)?;
        self.load(tree)?;
        if !self.exists() {
            // removed while we waited; recreate if the parent is still there
            let parent = tree
                .parent(self)?
                .filter(ResourceNode::exists)
                .ok_or_else(|| DavError::NotFound(self.path.to_string()))?;
            return self.create_file_locked(tree, &parent, content_type, body);
        }
        self.update_file_locked(tree, content_type, body, if_match)
    }

    fn create_file_locked<R: Read>(
        &mut self,
        tree: &Tree,
        parent: &ResourceNode,
        content_type: Option<&str>,
        body: R,
    ) -> Result<DavResponse> {
        check_parent_accepts(tree, parent, NodeType::DavFile)?;
        let max_children = tree.config().max_child_resource_count;
        if tree.child_count(parent)? >= max_children {
            return Err(DavError::CollectionChildResourceError(max_children));
        }

        create_node_dir(&self.dir)?;
        let length = write_content(&self.dir, body, tree.config().fsync)?;

        let mut metadata = NodeMetadata::new(NodeType::DavFile);
        metadata.content_type = content_type.map(str::to_string);
        metadata.content_length = length;
        tree.metadata_file(&self.dir).create(&metadata)?;
        let etag = metadata.etag();
        self.metadata = Some(metadata);

        tracing::info!(path = %self.path, length, "file created");
        Ok(DavResponse::new(Status::Created, etag))
    }

    fn update_file_locked<R: Read>(
        &mut self,
        tree: &Tree,
        content_type: Option<&str>,
        body: R,
        if_match: Option<&str>,
    ) -> Result<DavResponse> {
        let current = self.require_metadata()?;
        if current.node_type != NodeType::DavFile {
            return Err(DavError::MethodNotAllowed(self.path.to_string()));
        }
        if !etag_matches(&current.etag(), if_match) {
            return Err(DavError::EtagMismatch);
        }

        let length = write_content(&self.dir, body, tree.config().fsync)?;

        let sidecar = tree.metadata_file(&self.dir);
        let metadata = self.require_metadata_mut()?;
        metadata.content_length = length;
        if let Some(content_type) = content_type {
            metadata.content_type = Some(content_type.to_string());
        }
        metadata.updated = now_millis();
        sidecar.save(metadata)?;
        let etag = metadata.etag();

        tracing::info!(path = %self.path, length, "file updated");
        Ok(DavResponse::new(Status::NoContent, etag))
    }
}

/// Write `body` to the temp file and rename it over the content file
fn write_content<R: Read>(dir: &Path, mut body: R, fsync: bool) -> Result<u64> {
    let tmp = dir.join(TEMP_FILE_NAME);
    let mut file = File::create(&tmp)?;
    let length = io::copy(&mut body, &mut file)?;
    if fsync {
        file.sync_all()?;
    }
    drop(file);
    fs::rename(&tmp, dir.join(CONTENT_FILE_NAME))?;
    Ok(length)
}
