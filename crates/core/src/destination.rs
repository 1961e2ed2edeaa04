//! MOVE destination resolution, validation and execution
//!
//! Destinations are absolute urls that must stay inside the source's box, so
//! the box lock taken for the source covers the destination too. The
//! destination hierarchy is loaded and validated again after the lock is
//! taken; anything observed before that is only advisory.

use std::fs;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::access::{check_access, Caller};
use crate::error::{DavError, Result};
use crate::metadata::etag_matches;
use crate::node::{ResourceNode, Tree, SERVICE_SOURCE_COLLECTION};
use crate::node_type::NodeType;
use crate::path::NodePath;
use crate::privilege::box_privilege;
use crate::response::{DavResponse, Status};

/// Request headers a MOVE carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveHeaders {
    pub destination: String,
    pub overwrite: Option<String>,
    pub depth: Option<String>,
    pub if_match: Option<String>,
}

impl MoveHeaders {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    pub fn overwrite(mut self, value: impl Into<String>) -> Self {
        self.overwrite = Some(value.into());
        self
    }

    pub fn depth(mut self, value: impl Into<String>) -> Self {
        self.depth = Some(value.into());
        self
    }

    pub fn if_match(mut self, value: impl Into<String>) -> Self {
        self.if_match = Some(value.into());
        self
    }
}

/// `Overwrite` is `T` or `F` in any case; absent means `F`
pub fn parse_overwrite(value: Option<&str>) -> Result<bool> {
    match value.map(str::trim) {
        None => Ok(false),
        Some(v) if v.eq_ignore_ascii_case("t") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("f") => Ok(false),
        Some(v) => Err(DavError::InvalidHeader {
            header: "Overwrite",
            value: v.to_string(),
        }),
    }
}

/// A MOVE always moves the whole subtree
pub fn parse_depth(value: Option<&str>) -> Result<()> {
    match value.map(str::trim) {
        None => Ok(()),
        Some(v) if v.eq_ignore_ascii_case("infinity") => Ok(()),
        Some(v) => Err(DavError::InvalidHeader {
            header: "Depth",
            value: v.to_string(),
        }),
    }
}

fn decoded_segments(url: &Url) -> Result<Vec<String>> {
    let Some(segments) = url.path_segments() else {
        return Err(DavError::InvalidDestination(url.to_string()));
    };
    let mut decoded = Vec::new();
    for segment in segments {
        let segment = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| DavError::InvalidDestination(url.to_string()))?;
        decoded.push(segment.into_owned());
    }
    while decoded.last().is_some_and(String::is_empty) {
        decoded.pop();
    }
    Ok(decoded)
}

/// Resolved target of a MOVE
#[derive(Debug, Clone)]
pub struct MoveDestination {
    url: Url,
    path: NodePath,
    resolved: usize,
    destination: Option<ResourceNode>,
    parent: Option<ResourceNode>,
}

impl MoveDestination {
    /// Resolve `destination` to a path inside the box of `source`
    pub fn parse(tree: &Tree, source: &NodePath, destination: &str) -> Result<Self> {
        let invalid = |reason: &str| DavError::InvalidDestination(format!("{destination}: {reason}"));

        let url = Url::parse(destination).map_err(|e| invalid(&e.to_string()))?;
        let unit = tree.unit();
        if url.scheme() != unit.scheme()
            || url.host_str() != unit.host_str()
            || url.port_or_known_default() != unit.port_or_known_default()
        {
            return Err(invalid("different host"));
        }

        let box_path = source.box_path().ok_or_else(|| invalid("source is not in a box"))?;
        let box_segments = decoded_segments(&tree.url_of(&box_path))?;
        let segments = decoded_segments(&url)?;
        if segments.len() <= box_segments.len() || !segments.starts_with(&box_segments) {
            return Err(invalid("outside of the source box"));
        }

        let mut path = box_path;
        for segment in &segments[box_segments.len()..] {
            path = path.join(segment).map_err(|_| invalid("bad segment"))?;
        }
        if path == *source {
            return Err(invalid("same as source"));
        }
        if source.is_ancestor_of(&path) {
            return Err(invalid("inside the source"));
        }

        Ok(Self {
            url: tree.url_of(&path),
            path,
            resolved: 0,
            destination: None,
            parent: None,
        })
    }

    /// Walk from the box root and stop at the first missing segment
    pub fn load_hierarchy(&mut self, tree: &Tree) -> Result<()> {
        let Some(box_path) = self.path.box_path() else {
            return Err(DavError::InvalidDestination(self.path.to_string()));
        };
        let mut current = tree.node(&box_path)?;
        let mut parent = current.clone();
        let mut resolved = 0;
        for segment in self.path.segments() {
            parent = current;
            current = tree.child(&parent, segment)?;
            if current.exists() {
                resolved += 1;
            }
        }
        self.resolved = resolved;
        self.parent = Some(parent);
        self.destination = Some(current);
        Ok(())
    }

    /// Structural checks against the loaded hierarchy
    pub fn validate(&self, tree: &Tree, overwrite: bool, source: &ResourceNode) -> Result<()> {
        let (Some(destination), Some(parent)) = (&self.destination, &self.parent) else {
            return Err(DavError::InvalidDestination(self.path.to_string()));
        };
        let segments = self.path.segments();
        if self.resolved + 1 < segments.len() {
            return Err(DavError::HasNotParent(segments[self.resolved].clone()));
        }

        if destination.exists() {
            if !overwrite {
                return Err(DavError::DestinationAlreadyExists);
            }
            if parent.node_type() == NodeType::ServiceCollection
                && destination.name() == SERVICE_SOURCE_COLLECTION
            {
                return Err(DavError::ServiceSourceProhibitedToOverwrite);
            }
            if destination.node_type() != NodeType::DavFile {
                return Err(DavError::ResourceProhibitedToOverwrite);
            }
        } else {
            match parent.node_type() {
                NodeType::ODataCollection => {
                    return Err(DavError::ProhibitedToMoveIntoODataCollection)
                }
                NodeType::DavFile => return Err(DavError::ProhibitedToMoveIntoFile),
                NodeType::ServiceCollection => {
                    return Err(DavError::ProhibitedToMoveIntoServiceCollection)
                }
                _ => {}
            }
        }

        if source.node_type() != NodeType::DavFile {
            if let Some(grandparent) = tree.parent(parent)? {
                if grandparent.node_type() == NodeType::ServiceCollection {
                    return Err(DavError::ServiceSourceProhibitedToContainCollection);
                }
            }
        }

        let max_children = tree.config().max_child_resource_count;
        if !destination.exists() && tree.child_count(parent)? >= max_children {
            return Err(DavError::CollectionChildResourceError(max_children));
        }

        if destination.exists() && destination.id() == source.id() {
            return Err(DavError::NotFound(source.path().to_string()));
        }
        Ok(())
    }

    /* Getters */

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn resolved(&self) -> usize {
        self.resolved
    }

    pub fn node(&self) -> Option<&ResourceNode> {
        self.destination.as_ref()
    }

    pub fn parent(&self) -> Option<&ResourceNode> {
        self.parent.as_ref()
    }
}

/// Move `source` onto `destination` under the box lock
pub fn execute(
    tree: &Tree,
    caller: &Caller,
    source: &mut ResourceNode,
    destination: &mut MoveDestination,
    overwrite: bool,
    if_match: Option<&str>,
) -> Result<DavResponse> {
    let _lock = tree.lock_dav(source.path())?;

    source.load(tree)?;
    let Some(etag) = source.etag() else {
        return Err(DavError::NotFound(source.path().to_string()));
    };
    if !etag_matches(&etag, if_match) {
        return Err(DavError::EtagMismatch);
    }

    destination.load_hierarchy(tree)?;
    destination.validate(tree, overwrite, source)?;

    let (Some(target), Some(parent)) = (destination.node(), destination.parent()) else {
        return Err(DavError::InvalidDestination(destination.path.to_string()));
    };
    check_access(tree, parent, caller, &box_privilege::BIND, None)?;
    let replacing = target.exists();
    if replacing {
        check_access(tree, parent, caller, &box_privilege::UNBIND, None)?;
    }

    let target_dir = target.dir().to_path_buf();
    let status = if replacing {
        fs::remove_dir_all(&target_dir)?;
        Status::NoContent
    } else {
        Status::Created
    };
    fs::rename(source.dir(), &target_dir)?;

    tracing::info!(
        from = %source.path(),
        to = %destination.path,
        replaced = replacing,
        "resource moved"
    );
    source.relocate(destination.path.clone(), target_dir);

    Ok(DavResponse::new(status, etag).with_location(destination.url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use tempfile::TempDir;

    use crate::config::{RetryPolicy, TreeConfig};
    use crate::provision;

    const UNIT: &str = "https://unit.example/";

    fn tree(temp_dir: &TempDir) -> Tree {
        let config = TreeConfig::new(temp_dir.path().join("cells"))
            .with_unit_url(UNIT)
            .with_retry(RetryPolicy::immediate(1));
        let tree = Tree::new(config).unwrap();
        provision::create_cell(&tree, "c").unwrap();
        provision::create_box(&tree, "c", "b", None).unwrap();
        tree
    }

    fn file(tree: &Tree, path: &str) -> ResourceNode {
        let mut node = tree.node(&NodePath::parse(path).unwrap()).unwrap();
        node.put_for_create(tree, None, Cursor::new(b"x".to_vec()))
            .unwrap();
        node
    }

    #[test]
    fn test_destination_with_source_id_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let tree = tree(&temp_dir);
        let source = file(&tree, "/c/b/src.txt");
        let target = file(&tree, "/c/b/dst.txt");

        // the destination sidecar now names the source's id, as after a
        // move that already went through
        let mut metadata = target.metadata().unwrap().clone();
        metadata.id = source.id().unwrap();
        tree.metadata_file(target.dir()).save(&mut metadata).unwrap();

        let mut destination =
            MoveDestination::parse(&tree, source.path(), &format!("{UNIT}c/b/dst.txt")).unwrap();
        destination.load_hierarchy(&tree).unwrap();
        assert_eq!(destination.node().unwrap().id(), source.id());
        assert!(matches!(
            destination.validate(&tree, true, &source),
            Err(DavError::NotFound(ref p)) if p == "/c/b/src.txt"
        ));
    }

    #[test]
    fn test_overwrite_header() {
        assert!(!parse_overwrite(None).unwrap());
        assert!(parse_overwrite(Some("T")).unwrap());
        assert!(parse_overwrite(Some("t")).unwrap());
        assert!(!parse_overwrite(Some("f")).unwrap());
        assert!(matches!(
            parse_overwrite(Some("yes")),
            Err(DavError::InvalidHeader {
                header: "Overwrite",
                ..
            })
        ));
    }

    #[test]
    fn test_depth_header() {
        assert!(parse_depth(None).is_ok());
        assert!(parse_depth(Some("Infinity")).is_ok());
        assert!(parse_depth(Some("0")).is_err());
        assert!(parse_depth(Some("1")).is_err());
    }
}
