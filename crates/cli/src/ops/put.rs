use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::{ConfigError, DavError, NodePath, Status};

use crate::op::OpContext;

/// Upload a local file
#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Local file to upload
    pub file: PathBuf,

    /// Target path, `/cell/box/...`
    pub path: String,

    /// Content type (guessed from the file extension if omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Only replace the file if its ETag matches
    #[arg(long)]
    pub if_match: Option<String>,
}

#[derive(Debug)]
pub struct PutOutput {
    pub path: NodePath,
    pub created: bool,
    pub etag: Option<String>,
}

impl fmt::Display for PutOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.created { "Created" } else { "Updated" };
        write!(f, "{} {}", action.green().bold(), self.path.to_string().bold())?;
        if let Some(etag) = &self.etag {
            write!(f, " {}", etag.dimmed())?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Put {
    type Error = PutError;
    type Output = PutOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        let file = File::open(&self.file).map_err(|source| PutError::Read {
            path: self.file.clone(),
            source,
        })?;
        let content_type = self.content_type.clone().or_else(|| {
            mime_guess::from_path(&self.file)
                .first()
                .map(|mime| mime.to_string())
        });

        let response = facade.put(
            &ctx.caller,
            &path,
            content_type.as_deref(),
            BufReader::new(file),
            self.if_match.as_deref(),
        )?;
        Ok(PutOutput {
            path,
            created: response.status == Status::Created,
            etag: response.etag,
        })
    }
}
