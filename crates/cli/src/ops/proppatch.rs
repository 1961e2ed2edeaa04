use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath, PropPatch, PropStatus};

use crate::op::OpContext;

/// Set or remove dead properties, keys are `localName@namespace`
#[derive(Args, Debug, Clone)]
pub struct Proppatch {
    /// Node path, `/cell/box/...`
    pub path: String,

    /// Property to set, `key=value`
    #[arg(long = "set", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Property to remove
    #[arg(long = "remove")]
    pub remove: Vec<String>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}

#[derive(Debug)]
pub struct ProppatchOutput {
    pub etag: String,
    pub results: Vec<(String, PropStatus)>,
}

impl fmt::Display for ProppatchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Patched".green().bold(), self.etag.dimmed())?;
        for (key, status) in &self.results {
            match status {
                PropStatus::Ok => write!(f, "\n  {} {}", "ok".green(), key)?,
                PropStatus::NotFound => write!(f, "\n  {} {}", "not found".yellow(), key)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProppatchError {
    #[error("nothing to patch, pass --set or --remove")]
    Empty,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Proppatch {
    type Error = ProppatchError;
    type Output = ProppatchOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        if self.set.is_empty() && self.remove.is_empty() {
            return Err(ProppatchError::Empty);
        }
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;

        let mut patch = PropPatch::new();
        for (key, value) in &self.set {
            patch = patch.set(key, value);
        }
        for key in &self.remove {
            patch = patch.remove(key);
        }

        let result = facade.proppatch(&ctx.caller, &path, &patch)?;
        Ok(ProppatchOutput {
            etag: result.etag,
            results: result.results,
        })
    }
}
