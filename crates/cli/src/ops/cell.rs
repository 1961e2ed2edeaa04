use std::fmt;

use clap::{Args, Subcommand, ValueEnum};
use owo_colors::OwoColorize;

use cellbox::{CellStatus, ConfigError, DavError};

use crate::op::OpContext;

#[derive(Args, Debug, Clone)]
pub struct Cell {
    #[command(subcommand)]
    pub command: CellCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CellCommand {
    /// Create a new cell
    Create {
        /// Cell name
        name: String,
    },
    /// Enable or disable a cell
    Status {
        /// Cell name
        name: String,

        #[arg(value_enum)]
        status: StatusArg,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Normal,
    Disabled,
}

impl From<StatusArg> for CellStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Normal => CellStatus::Normal,
            StatusArg::Disabled => CellStatus::Disabled,
        }
    }
}

#[derive(Debug)]
pub struct CellOutput {
    pub name: String,
    pub action: &'static str,
    pub url: String,
}

impl fmt::Display for CellOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cell {} at {}",
            self.action.green().bold(),
            self.name.bold(),
            self.url
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CellError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Cell {
    type Error = CellError;
    type Output = CellOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let (node, action) = match &self.command {
            CellCommand::Create { name } => (facade.create_cell(&ctx.caller, name)?, "Created"),
            CellCommand::Status { name, status } => (
                facade.set_cell_status(&ctx.caller, name, (*status).into())?,
                match status {
                    StatusArg::Normal => "Enabled",
                    StatusArg::Disabled => "Disabled",
                },
            ),
        };
        Ok(CellOutput {
            name: node.name().to_string(),
            action,
            url: facade.url_of(node.path()).to_string(),
        })
    }
}
