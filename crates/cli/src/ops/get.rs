use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath};

use crate::op::OpContext;

/// Download a file
#[derive(Args, Debug, Clone)]
pub struct Get {
    /// File path, `/cell/box/...`
    pub path: String,

    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Byte range, e.g. `bytes=0-99`
    #[arg(long)]
    pub range: Option<String>,
}

#[derive(Debug)]
pub enum GetOutput {
    Written {
        path: PathBuf,
        bytes: usize,
        content_range: Option<String>,
    },
    Body(String),
}

impl fmt::Display for GetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GetOutput::Written {
                path,
                bytes,
                content_range,
            } => {
                write!(
                    f,
                    "{} {} bytes to {}",
                    "Wrote".green().bold(),
                    bytes,
                    path.display()
                )?;
                if let Some(range) = content_range {
                    write!(f, " ({})", range.dimmed())?;
                }
                Ok(())
            }
            GetOutput::Body(body) => write!(f, "{body}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Get {
    type Error = GetError;
    type Output = GetOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        let content = facade.get(&ctx.caller, &path, self.range.as_deref())?;

        match &self.output {
            Some(out) => {
                let mut file = std::fs::File::create(out)?;
                file.write_all(&content.body)?;
                Ok(GetOutput::Written {
                    path: out.clone(),
                    bytes: content.body.len(),
                    content_range: content.content_range,
                })
            }
            None => Ok(GetOutput::Body(
                String::from_utf8_lossy(&content.body).into_owned(),
            )),
        }
    }
}
