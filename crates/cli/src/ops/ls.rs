use std::fmt;

use chrono::DateTime;
use clap::Args;
use comfy_table::Table;

use cellbox::{ConfigError, DavError, NodePath, PropfindEntry};

use crate::op::OpContext;

/// List a node and its children
#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Path to list, `/cell` or `/cell/box/...`
    pub path: String,

    /// Only show the node itself
    #[arg(long, short)]
    pub directory: bool,

    /// Print the entries as JSON, ACLs and properties included
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub struct LsOutput {
    pub entries: Vec<PropfindEntry>,
    pub json: Option<String>,
}

fn format_millis(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(json) = &self.json {
            return write!(f, "{json}");
        }
        if self.entries.is_empty() {
            return write!(f, "No items found");
        }

        let mut table = Table::new();
        table.set_header(vec!["TYPE", "NAME", "ETAG", "LENGTH", "UPDATED"]);
        for entry in &self.entries {
            let name = entry
                .href
                .path_segments()
                .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
                .unwrap_or("/")
                .to_string();
            table.add_row(vec![
                entry.node_type.to_string(),
                name,
                entry.etag.clone(),
                entry
                    .content_length
                    .map(|len| len.to_string())
                    .unwrap_or_default(),
                format_millis(entry.updated),
            ]);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("failed to encode entries: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dav(#[from] DavError),
}

impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let facade = ctx.facade()?;
        let path = NodePath::parse(&self.path)?;
        let depth = if self.directory { "0" } else { "1" };
        let multistatus = facade.propfind(&ctx.caller, &path, Some(depth))?;

        let json = if self.json {
            let values: Vec<_> = multistatus
                .responses
                .iter()
                .map(|entry| {
                    serde_json::json!({
                        "href": entry.href.as_str(),
                        "type": entry.node_type,
                        "id": entry.id,
                        "etag": entry.etag,
                        "published": entry.published,
                        "updated": entry.updated,
                        "contentType": entry.content_type,
                        "contentLength": entry.content_length,
                        "properties": entry.properties,
                        "ownerRepresentativeAccounts": entry.owner_representative_accounts,
                        "acl": entry.acl,
                    })
                })
                .collect();
            Some(serde_json::to_string_pretty(&values)?)
        } else {
            None
        };

        Ok(LsOutput {
            entries: multistatus.responses,
            json,
        })
    }
}
