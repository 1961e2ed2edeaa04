use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use cellbox::config::DEFAULT_UNIT_URL;
use cellbox::{ConfigError, TreeConfig};

use crate::op::OpContext;

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Directory holding the cell tree (defaults to `cells` next to the config)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Base url the tree is served under
    #[arg(long, default_value = DEFAULT_UNIT_URL)]
    pub unit_url: String,

    /// Sync sidecar and content writes to disk before returning
    #[arg(long)]
    pub fsync: bool,
}

#[derive(Debug)]
pub struct InitOutput {
    pub config_path: PathBuf,
    pub root: PathBuf,
    pub unit_url: String,
}

impl fmt::Display for InitOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} cellbox config at {}",
            "Initialized".green().bold(),
            self.config_path.display().to_string().bold()
        )?;
        writeln!(f, "  {} {}", "Root:".dimmed(), self.root.display())?;
        write!(f, "  {} {}", "Unit url:".dimmed(), self.unit_url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("config already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to create root: {0}")]
    Io(#[from] std::io::Error),
}

impl crate::op::Op for Init {
    type Error = InitError;
    type Output = InitOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        if ctx.config_path.exists() {
            return Err(InitError::AlreadyInitialized(ctx.config_path.clone()));
        }
        let root = self
            .root
            .clone()
            .unwrap_or_else(|| OpContext::default_root(&ctx.config_path));
        let mut config = TreeConfig::new(&root).with_unit_url(&self.unit_url);
        config.fsync = self.fsync;
        config.unit().map_err(ConfigError::from)?;

        config.save(&ctx.config_path)?;
        std::fs::create_dir_all(&root)?;
        tracing::info!(config = %ctx.config_path.display(), "initialized");

        Ok(InitOutput {
            config_path: ctx.config_path.clone(),
            root,
            unit_url: config.unit_url,
        })
    }
}
