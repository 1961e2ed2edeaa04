use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath};

use crate::op::OpContext;

/// Delete a file or collection
#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Path to delete, `/cell/box/...`
    pub path: String,

    /// Delete a collection together with everything below it
    #[arg(long, short)]
    pub recursive: bool,

    /// Only delete if the ETag matches
    #[arg(long)]
    pub if_match: Option<String>,
}

#[derive(Debug)]
pub struct RmOutput {
    pub path: NodePath,
}

impl fmt::Display for RmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", "Deleted".red().bold(), self.path.to_string().bold())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Rm {
    type Error = RmError;
    type Output = RmOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        facade.delete(
            &ctx.caller,
            &path,
            self.if_match.as_deref(),
            self.recursive,
        )?;
        Ok(RmOutput { path })
    }
}
