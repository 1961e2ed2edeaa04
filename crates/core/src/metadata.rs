//! Versioned JSON sidecar metadata
//!
//! Every materialized node keeps one sidecar file inside its directory. The
//! sidecar carries the node id, type, ACL, dead properties and content
//! attributes. Its `version` grows by exactly one on every save, and together
//! with `updated` forms the node's ETag.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::acl::Acl;
use crate::config::RetryPolicy;
use crate::error::{DavError, Result};
use crate::node_type::NodeType;

pub const METADATA_FILE_NAME: &str = ".pmeta";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "AES/CBC/PKCS5Padding")]
    AesCbcPkcs5,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellStatus {
    #[default]
    Normal,
    Disabled,
}

/// Current time in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub id: Uuid,
    pub node_type: NodeType,
    #[serde(default)]
    pub acl: Option<Acl>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    pub published: i64,
    pub updated: i64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_length: u64,
    #[serde(default)]
    pub encryption_type: EncryptionType,
    pub version: i64,
    #[serde(default)]
    pub cell_status: Option<CellStatus>,
}

impl NodeMetadata {
    /// Fresh record with a new id, saved at version 0
    pub fn new(node_type: NodeType) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4(),
            node_type,
            acl: None,
            properties: BTreeMap::new(),
            published: now,
            updated: now,
            content_type: None,
            content_length: 0,
            encryption_type: EncryptionType::None,
            version: 0,
            cell_status: None,
        }
    }

    pub fn etag(&self) -> String {
        format!("\"{}-{}\"", self.version, self.updated)
    }

    pub fn touch(&mut self) {
        self.updated = now_millis();
    }
}

/// Does `if_match` accept a node whose current ETag is `current`?
///
/// Absent header accepts anything, `*` accepts any existing node, otherwise
/// any listed tag must match after dropping a weak `W/` prefix.
pub fn etag_matches(current: &str, if_match: Option<&str>) -> bool {
    let Some(if_match) = if_match else {
        return true;
    };
    let strip = |tag: &str| -> String { tag.trim().trim_start_matches("W/").to_string() };
    let current = strip(current);
    if_match
        .split(',')
        .map(str::trim)
        .any(|tag| tag == "*" || strip(tag) == current)
}

/// Handle to the sidecar file of one node directory
#[derive(Debug, Clone)]
pub struct MetadataFile {
    path: PathBuf,
    fsync: bool,
    retry: RetryPolicy,
}

impl MetadataFile {
    pub fn new(dir: &Path, fsync: bool, retry: RetryPolicy) -> Self {
        Self {
            path: dir.join(METADATA_FILE_NAME),
            fsync,
            retry,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the sidecar. `Ok(None)` means there is no sidecar at all.
    ///
    /// Read and decode failures are retried per the retry policy and end in
    /// [`DavError::Inconsistent`]; a corrupt sidecar is never defaulted.
    pub fn load(&self) -> Result<Option<NodeMetadata>> {
        let attempts = self.retry.attempts();
        let mut reason = String::new();
        for attempt in 1..=attempts {
            match self.read_once() {
                Ok(metadata) => return Ok(metadata),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        attempt,
                        error = %e,
                        "failed to load metadata"
                    );
                    reason = e.to_string();
                    if attempt < attempts {
                        thread::sleep(self.retry.backoff());
                    }
                }
            }
        }
        Err(DavError::Inconsistent {
            path: self.path.display().to_string(),
            reason,
        })
    }

    fn read_once(&self) -> Result<Option<NodeMetadata>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Write a fresh record as-is
    pub fn create(&self, metadata: &NodeMetadata) -> Result<()> {
        self.write(metadata)
    }

    /// Bump the version and write. `metadata` is only updated once the write
    /// succeeded.
    pub fn save(&self, metadata: &mut NodeMetadata) -> Result<()> {
        let mut next = metadata.clone();
        next.version += 1;
        self.write(&next)?;
        *metadata = next;
        Ok(())
    }

    fn write(&self, metadata: &NodeMetadata) -> Result<()> {
        let json = serde_json::to_vec_pretty(metadata)?;
        let mut file = File::create(&self.path)?;
        file.write_all(&json)?;
        if self.fsync {
            file.sync_all()?;
        }
        tracing::debug!(path = %self.path.display(), version = metadata.version, "metadata written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sidecar(dir: &Path) -> MetadataFile {
        MetadataFile::new(dir, false, RetryPolicy::immediate(3))
    }

    #[test]
    fn test_missing_sidecar_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sidecar(dir.path()).load().unwrap().is_none());
    }

    #[test]
    fn test_create_then_save_bumps_version() {
        let dir = tempfile::tempdir().unwrap();
        let file = sidecar(dir.path());
        let mut metadata = NodeMetadata::new(NodeType::WebdavCollection);
        file.create(&metadata).unwrap();
        assert_eq!(file.load().unwrap().unwrap().version, 0);

        file.save(&mut metadata).unwrap();
        file.save(&mut metadata).unwrap();
        let loaded = file.load().unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_corrupt_sidecar_is_inconsistent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(METADATA_FILE_NAME), b"{ not json").unwrap();
        let err = sidecar(dir.path()).load().unwrap_err();
        assert!(matches!(err, DavError::Inconsistent { .. }));
    }

    #[test]
    fn test_wire_format() {
        let mut metadata = NodeMetadata::new(NodeType::DavFile);
        metadata.content_type = Some("text/plain".into());
        metadata.content_length = 2;
        let json: serde_json::Value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["nodeType"], "dav.file");
        assert_eq!(json["encryptionType"], "none");
        assert_eq!(json["contentLength"], 2);
        assert_eq!(json["version"], 0);
        assert!(json.get("cellStatus").is_some());
    }

    #[test]
    fn test_etag_format() {
        let mut metadata = NodeMetadata::new(NodeType::DavFile);
        metadata.version = 3;
        metadata.updated = 1700000000000;
        assert_eq!(metadata.etag(), "\"3-1700000000000\"");
    }

    #[test]
    fn test_etag_matches() {
        let current = "\"3-17\"";
        assert!(etag_matches(current, None));
        assert!(etag_matches(current, Some("*")));
        assert!(etag_matches(current, Some("\"3-17\"")));
        assert!(etag_matches(current, Some("W/\"3-17\"")));
        assert!(etag_matches(current, Some("\"1-1\", \"3-17\"")));
        assert!(!etag_matches(current, Some("\"2-17\"")));
    }
}
