use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError};

use crate::op::OpContext;

/// Install a box in a cell
#[derive(Args, Debug, Clone)]
pub struct Boxes {
    /// Cell the box belongs to
    pub cell: String,

    /// Box name
    pub name: String,

    /// Application schema url bound to the box
    #[arg(long)]
    pub schema: Option<String>,
}

#[derive(Debug)]
pub struct BoxOutput {
    pub name: String,
    pub url: String,
    pub schema: Option<String>,
}

impl fmt::Display for BoxOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} box {} at {}",
            "Created".green().bold(),
            self.name.bold(),
            self.url
        )?;
        if let Some(schema) = &self.schema {
            write!(f, "\n  {} {}", "Schema:".dimmed(), schema)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BoxError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Boxes {
    type Error = BoxError;
    type Output = BoxOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let node = facade.create_box(
            &ctx.caller,
            &self.cell,
            &self.name,
            self.schema.as_deref(),
        )?;
        Ok(BoxOutput {
            name: node.name().to_string(),
            url: facade.url_of(node.path()).to_string(),
            schema: self.schema.clone(),
        })
    }
}
