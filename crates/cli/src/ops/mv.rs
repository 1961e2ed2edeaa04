use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, MoveHeaders, NodePath, Status};

use crate::op::OpContext;

/// Move a file or collection within its box
#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// Source path, `/cell/box/...`
    pub from: String,

    /// Destination path in the same box
    pub to: String,

    /// Replace an existing destination
    #[arg(long)]
    pub overwrite: bool,

    /// Only move if the source ETag matches
    #[arg(long)]
    pub if_match: Option<String>,
}

#[derive(Debug)]
pub struct MvOutput {
    pub from: NodePath,
    pub location: Option<String>,
    pub replaced: bool,
}

impl fmt::Display for MvOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.replaced { "Replaced" } else { "Moved" };
        write!(f, "{} {}", action.green().bold(), self.from.to_string().bold())?;
        if let Some(location) = &self.location {
            write!(f, " -> {location}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Mv {
    type Error = MvError;
    type Output = MvOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let from = NodePath::parse(&self.from)?;
        let to = NodePath::parse(&self.to)?;

        let mut headers = MoveHeaders::new(facade.url_of(&to).to_string())
            .overwrite(if self.overwrite { "T" } else { "F" });
        if let Some(etag) = &self.if_match {
            headers = headers.if_match(etag.clone());
        }

        let response = facade.move_resource(&ctx.caller, &from, &headers)?;
        Ok(MvOutput {
            from,
            location: response.location.map(|url| url.to_string()),
            replaced: response.status == Status::NoContent,
        })
    }
}
