//! Access control lists stored on nodes

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DavError, Result};
use crate::privilege::{Privilege, PrivilegeScope};

/// Confidentiality level a box (or a node inside it) demands of callers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaLevel {
    #[default]
    None,
    Public,
    Confidential,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Principal {
    /// Every caller, authenticated or not
    All,
    /// A role url, absolute or relative to the ACL base
    Href(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ace {
    #[serde(default)]
    pub principal: Option<Principal>,
    #[serde(default)]
    pub granted_privileges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acl {
    /// Base for resolving relative role hrefs
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub require_schema_authz: Option<SchemaLevel>,
    #[serde(default)]
    pub aces: Vec<Ace>,
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn require_schema_authz(mut self, level: SchemaLevel) -> Self {
        self.require_schema_authz = Some(level);
        self
    }

    pub fn grant_all(self, privileges: &[&str]) -> Self {
        self.with_ace(Some(Principal::All), privileges)
    }

    pub fn grant(self, href: impl Into<String>, privileges: &[&str]) -> Self {
        self.with_ace(Some(Principal::Href(href.into())), privileges)
    }

    fn with_ace(mut self, principal: Option<Principal>, privileges: &[&str]) -> Self {
        self.aces.push(Ace {
            principal,
            granted_privileges: privileges.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// An ACL that grants nothing
    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    /// Check that every granted name exists in `scope` and hrefs are usable
    pub fn validate(&self, scope: PrivilegeScope) -> Result<()> {
        if let Some(base) = &self.base {
            Url::parse(base).map_err(|e| DavError::InvalidAcl(format!("base {base}: {e}")))?;
        }
        for ace in &self.aces {
            if let Some(Principal::Href(href)) = &ace.principal {
                if href.trim().is_empty() {
                    return Err(DavError::InvalidAcl("empty principal href".to_string()));
                }
            }
            for name in &ace.granted_privileges {
                if Privilege::lookup(scope, name).is_none() {
                    return Err(DavError::InvalidAcl(format!("unknown privilege {name}")));
                }
            }
        }
        Ok(())
    }
}
