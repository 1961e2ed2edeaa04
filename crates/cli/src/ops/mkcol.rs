use std::fmt;

use clap::{Args, ValueEnum};
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath, NodeType};

use crate::op::OpContext;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum CollectionKind {
    /// Plain WebDAV collection
    #[default]
    Webdav,
    /// OData entity collection
    Odata,
    /// Service collection with a `__src` source folder
    Service,
}

impl From<CollectionKind> for NodeType {
    fn from(kind: CollectionKind) -> Self {
        match kind {
            CollectionKind::Webdav => NodeType::WebdavCollection,
            CollectionKind::Odata => NodeType::ODataCollection,
            CollectionKind::Service => NodeType::ServiceCollection,
        }
    }
}

/// Create a collection
#[derive(Args, Debug, Clone)]
pub struct Mkcol {
    /// Path of the new collection, `/cell/box/...`
    pub path: String,

    #[arg(long = "type", value_enum, default_value_t = CollectionKind::Webdav)]
    pub kind: CollectionKind,
}

#[derive(Debug)]
pub struct MkcolOutput {
    pub path: NodePath,
    pub node_type: NodeType,
    pub etag: Option<String>,
}

impl fmt::Display for MkcolOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            "Created".green().bold(),
            self.path.to_string().bold(),
            self.node_type
        )?;
        if let Some(etag) = &self.etag {
            write!(f, " {}", etag.dimmed())?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MkcolError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Mkcol {
    type Error = MkcolError;
    type Output = MkcolOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        let node_type = NodeType::from(self.kind);
        let response = facade.mkcol(&ctx.caller, &path, node_type)?;
        Ok(MkcolOutput {
            path,
            node_type,
            etag: response.etag,
        })
    }
}
