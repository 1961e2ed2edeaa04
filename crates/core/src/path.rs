//! Tree addressing
//!
//! A [`NodePath`] names one position in the tree: a cell, a box inside a
//! cell, or a WebDAV node below a box root. Parents are computed from the
//! path, never stored.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{DavError, Result};
use crate::metadata::METADATA_FILE_NAME;

/// Which layer of the tree a path addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathLevel {
    Cell,
    Box,
    Dav,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodePath {
    cell: String,
    box_name: Option<String>,
    segments: Vec<String>,
}

/// Reject names that cannot be a single directory entry or that collide
/// with the sidecar of the enclosing node
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name == METADATA_FILE_NAME
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(DavError::InvalidName(name.to_string()));
    }
    Ok(())
}

impl NodePath {
    pub fn cell(name: &str) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            cell: name.to_string(),
            box_name: None,
            segments: Vec::new(),
        })
    }

    pub fn box_root(cell: &str, box_name: &str) -> Result<Self> {
        validate_name(box_name)?;
        let mut path = Self::cell(cell)?;
        path.box_name = Some(box_name.to_string());
        Ok(path)
    }

    /// Parse `/cell/box/a/b`. Empty segments from doubled or trailing
    /// slashes are ignored.
    pub fn parse(path: &str) -> Result<Self> {
        let mut parts = path.split('/').filter(|s| !s.is_empty());
        let cell = parts
            .next()
            .ok_or_else(|| DavError::InvalidName(path.to_string()))?;
        let mut node = Self::cell(cell)?;
        for part in parts {
            node = node.join(part)?;
        }
        Ok(node)
    }

    /// Child path. Below a cell the child is a box root.
    pub fn join(&self, name: &str) -> Result<Self> {
        validate_name(name)?;
        let mut child = self.clone();
        if child.box_name.is_none() {
            child.box_name = Some(name.to_string());
        } else {
            child.segments.push(name.to_string());
        }
        Ok(child)
    }

    pub fn parent(&self) -> Option<Self> {
        let mut parent = self.clone();
        if parent.segments.pop().is_some() {
            return Some(parent);
        }
        if parent.box_name.take().is_some() {
            return Some(parent);
        }
        None
    }

    /// Last component of the path
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(String::as_str)
            .or(self.box_name.as_deref())
            .unwrap_or(&self.cell)
    }

    /* Getters */

    pub fn cell_name(&self) -> &str {
        &self.cell
    }

    pub fn box_name(&self) -> Option<&str> {
        self.box_name.as_deref()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn level(&self) -> PathLevel {
        match (&self.box_name, self.segments.is_empty()) {
            (None, _) => PathLevel::Cell,
            (Some(_), true) => PathLevel::Box,
            (Some(_), false) => PathLevel::Dav,
        }
    }

    /// Number of hops below the box root
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn cell_path(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            box_name: None,
            segments: Vec::new(),
        }
    }

    pub fn box_path(&self) -> Option<Self> {
        self.box_name.as_ref().map(|b| Self {
            cell: self.cell.clone(),
            box_name: Some(b.clone()),
            segments: Vec::new(),
        })
    }

    /// True when `other` lies strictly below this path
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        if self.cell != other.cell {
            return false;
        }
        match (&self.box_name, &other.box_name) {
            (None, Some(_)) => true,
            (Some(a), Some(b)) if a == b => {
                other.segments.len() > self.segments.len()
                    && other.segments.starts_with(&self.segments)
            }
            _ => false,
        }
    }

    /// Directory holding this node below the tree root
    pub fn fs_dir(&self, root: &Path) -> PathBuf {
        let mut dir = root.join(&self.cell);
        if let Some(b) = &self.box_name {
            dir.push(b);
        }
        for segment in &self.segments {
            dir.push(segment);
        }
        dir
    }

    /// Absolute url of this node below the unit url. Cell and box roots end
    /// with a slash.
    pub fn url(&self, unit: &Url) -> Url {
        let mut url = unit.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.push(&self.cell);
            if let Some(b) = &self.box_name {
                segments.push(b);
            }
            for segment in &self.segments {
                segments.push(segment);
            }
            if self.segments.is_empty() {
                segments.push("");
            }
        }
        url
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.cell)?;
        if let Some(b) = &self.box_name {
            write!(f, "/{}", b)?;
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}
