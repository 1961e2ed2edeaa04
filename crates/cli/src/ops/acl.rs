use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath};

use crate::op::OpContext;

/// Replace the ACL of a cell, box or collection from a JSON file
#[derive(Args, Debug, Clone)]
pub struct Acl {
    /// Node path, `/cell` or `/cell/box/...`
    pub path: String,

    /// JSON document, e.g. `{"aces":[{"principal":{"href":"reader"},"grantedPrivileges":["read"]}]}`
    #[arg(long)]
    pub file: PathBuf,
}

#[derive(Debug)]
pub struct AclOutput {
    pub path: NodePath,
    pub aces: usize,
    pub etag: Option<String>,
}

impl fmt::Display for AclOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ACL on {} ({} entries)",
            "Set".green().bold(),
            self.path.to_string().bold(),
            self.aces
        )?;
        if let Some(etag) = &self.etag {
            write!(f, " {}", etag.dimmed())?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AclError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid ACL document: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Acl {
    type Error = AclError;
    type Output = AclOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let raw = std::fs::read_to_string(&self.file).map_err(|source| AclError::Read {
            path: self.file.clone(),
            source,
        })?;
        let acl: cellbox::Acl = serde_json::from_str(&raw)?;
        let aces = acl.aces.len();

        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        let response = facade.acl(&ctx.caller, &path, acl)?;
        Ok(AclOutput {
            path,
            aces,
            etag: response.etag,
        })
    }
}
