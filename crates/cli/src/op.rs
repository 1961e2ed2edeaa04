use std::path::{Path, PathBuf};

use cellbox::{Caller, ConfigError, TreeConfig, TreeFacade};

pub const CONFIG_DIR_NAME: &str = ".cellbox";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CELLS_DIR_NAME: &str = "cells";

/// Shared state handed to every command
#[derive(Debug, Clone)]
pub struct OpContext {
    pub config_path: PathBuf,
    pub config: TreeConfig,
    /// The CLI acts with the unit master credential
    pub caller: Caller,
}

impl OpContext {
    /// Default config location, `~/.cellbox/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Load the config at `config_path`, falling back to defaults rooted next
    /// to it when the file does not exist yet
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);
        let config = if config_path.exists() {
            TreeConfig::load(&config_path)?
        } else {
            TreeConfig::new(Self::default_root(&config_path))
        };
        Ok(Self {
            config_path,
            config,
            caller: Caller::unit_master(),
        })
    }

    pub fn default_root(config_path: &Path) -> PathBuf {
        config_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(CELLS_DIR_NAME)
    }

    pub fn facade(&self) -> Result<TreeFacade, ConfigError> {
        TreeFacade::new(self.config.clone())
    }
}

pub trait Op: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(clap::Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(OpOutput::$variant(output) => write!(f, "{}", output),)*
                }
            }
        }

        impl $crate::op::Op for Command {
            type Error = OpError;
            type Output = OpOutput;

            fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => op
                            .execute(ctx)
                            .map(OpOutput::$variant)
                            .map_err(OpError::$variant),
                    )*
                }
            }
        }
    };
}
