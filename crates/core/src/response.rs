//! Results returned by tree operations

use std::collections::BTreeMap;

use url::Url;
use uuid::Uuid;

use crate::acl::Acl;
use crate::node_type::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Created,
    NoContent,
    MultiStatus,
    PartialContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    pub status: Status,
    pub etag: Option<String>,
    pub location: Option<Url>,
}

impl DavResponse {
    pub fn new(status: Status, etag: impl Into<String>) -> Self {
        Self {
            status,
            etag: Some(etag.into()),
            location: None,
        }
    }

    pub fn with_location(mut self, location: Url) -> Self {
        self.location = Some(location);
        self
    }
}

/// Body and headers of a GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub status: Status,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub etag: String,
    /// Full length of the stored content
    pub content_length: u64,
    /// `bytes a-b/total` for partial responses
    pub content_range: Option<String>,
}

/// One node in a PROPFIND answer
#[derive(Debug, Clone, PartialEq)]
pub struct PropfindEntry {
    pub href: Url,
    pub node_type: NodeType,
    pub id: Uuid,
    pub etag: String,
    pub published: i64,
    pub updated: i64,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub properties: BTreeMap<String, String>,
    pub owner_representative_accounts: Vec<String>,
    /// Present only when the caller may read the ACL
    pub acl: Option<Acl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Multistatus {
    pub responses: Vec<PropfindEntry>,
}

impl Multistatus {
    pub fn status(&self) -> Status {
        Status::MultiStatus
    }
}

/// Requested property changes, keys are `localName@namespace`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropPatch {
    pub set: BTreeMap<String, String>,
    pub remove: Vec<String>,
}

impl PropPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set.insert(key.into(), value.into());
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.remove.push(key.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropStatus {
    Ok,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropPatchResult {
    pub etag: String,
    pub results: Vec<(String, PropStatus)>,
}

impl PropPatchResult {
    pub fn status_of(&self, key: &str) -> Option<PropStatus> {
        self.results
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, status)| *status)
    }
}
