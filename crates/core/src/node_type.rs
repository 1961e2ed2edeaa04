use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of node stored at a tree position
///
/// `Null` marks a phantom (nothing materialized at the path) and is never
/// written to a sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "null")]
    Null,
    #[serde(rename = "col.webdav")]
    WebdavCollection,
    #[serde(rename = "col.odata")]
    ODataCollection,
    #[serde(rename = "col.box")]
    BoxCollection,
    #[serde(rename = "col.svc")]
    ServiceCollection,
    #[serde(rename = "dav.file")]
    DavFile,
    #[serde(rename = "cell")]
    Cell,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Null => "null",
            NodeType::WebdavCollection => "col.webdav",
            NodeType::ODataCollection => "col.odata",
            NodeType::BoxCollection => "col.box",
            NodeType::ServiceCollection => "col.svc",
            NodeType::DavFile => "dav.file",
            NodeType::Cell => "cell",
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            NodeType::WebdavCollection
                | NodeType::ODataCollection
                | NodeType::BoxCollection
                | NodeType::ServiceCollection
        )
    }

    /// Types a client may create with MKCOL
    pub fn is_mkcol_type(&self) -> bool {
        matches!(
            self,
            NodeType::WebdavCollection | NodeType::ODataCollection | NodeType::ServiceCollection
        )
    }

    /// Whether clients may bind new children directly below this type.
    /// Service collections only ever hold their source collection.
    pub fn accepts_children(&self) -> bool {
        matches!(self, NodeType::WebdavCollection | NodeType::BoxCollection)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "col.webdav" => Ok(NodeType::WebdavCollection),
            "col.odata" => Ok(NodeType::ODataCollection),
            "col.box" => Ok(NodeType::BoxCollection),
            "col.svc" => Ok(NodeType::ServiceCollection),
            "dav.file" => Ok(NodeType::DavFile),
            "cell" => Ok(NodeType::Cell),
            other => Err(format!("unknown node type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_strings_match_as_str() {
        for t in [
            NodeType::WebdavCollection,
            NodeType::ODataCollection,
            NodeType::BoxCollection,
            NodeType::ServiceCollection,
            NodeType::DavFile,
            NodeType::Cell,
        ] {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(t.as_str().parse::<NodeType>().unwrap(), t);
        }
    }

    #[test]
    fn test_null_does_not_parse() {
        assert!("null".parse::<NodeType>().is_err());
    }

    #[test]
    fn test_collection_flags() {
        assert!(NodeType::ServiceCollection.is_collection());
        assert!(!NodeType::DavFile.is_collection());
        assert!(!NodeType::BoxCollection.is_mkcol_type());
        assert!(!NodeType::ODataCollection.accepts_children());
        assert!(!NodeType::ServiceCollection.accepts_children());
        assert!(NodeType::BoxCollection.accepts_children());
    }
}
