//! Access evaluation
//!
//! A [`Caller`] arrives already authenticated, carrying its resolved role
//! urls. Access to a node is decided in this order:
//!
//! 1. a unit credential that grants the privilege outright passes;
//! 2. the confidentiality gate of the enclosing box must pass;
//! 3. an ACL on the node or one of its ancestors up to the box root must
//!    grant the privilege to one of the caller's roles.

use url::Url;

use crate::acl::{Acl, Ace, Principal, SchemaLevel};
use crate::error::{DavError, Result};
use crate::node::{ResourceNode, Tree, BOX_SCHEMA_KEY};
use crate::path::PathLevel;
use crate::privilege::{cell_privilege, AccessType, Privilege};

/// Cell-contents role attached to a unit credential
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentsRole {
    #[default]
    None,
    CellContentsReader,
    CellContentsAdmin,
}

impl ContentsRole {
    fn grants(&self, privilege: &Privilege) -> bool {
        match self {
            ContentsRole::None => false,
            ContentsRole::CellContentsAdmin => true,
            ContentsRole::CellContentsReader => privilege.access_type() == AccessType::Read,
        }
    }
}

/// Credential issued by the unit rather than by a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCredential {
    Master,
    Admin {
        contents_role: ContentsRole,
    },
    User {
        /// The target cell is owned by this user
        owns_cell: bool,
        contents_role: ContentsRole,
    },
}

impl UnitCredential {
    /// Skips the confidentiality gate
    pub fn bypasses_schema(&self) -> bool {
        match self {
            UnitCredential::Master | UnitCredential::Admin { .. } => true,
            UnitCredential::User { owns_cell, .. } => *owns_cell,
        }
    }

    /// Grants `privilege` without consulting any ACL
    pub fn grants(&self, privilege: &Privilege) -> bool {
        match self {
            UnitCredential::Master => true,
            UnitCredential::Admin { contents_role } => contents_role.grants(privilege),
            UnitCredential::User {
                owns_cell,
                contents_role,
            } => *owns_cell && contents_role.grants(privilege),
        }
    }
}

/// Authenticated principal issuing a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub subject: Option<String>,
    /// Canonical role urls
    pub roles: Vec<String>,
    pub confidentiality: SchemaLevel,
    /// Schema url of the application the caller authenticated through
    pub schema: Option<String>,
    pub unit_credential: Option<UnitCredential>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn unit_master() -> Self {
        Self {
            unit_credential: Some(UnitCredential::Master),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(subject: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: Some(subject.into()),
            roles: roles.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>, level: SchemaLevel) -> Self {
        self.schema = Some(schema.into());
        self.confidentiality = level;
        self
    }

    pub fn with_unit_credential(mut self, credential: UnitCredential) -> Self {
        self.unit_credential = Some(credential);
        self
    }

    fn unit_grants(&self, privilege: &Privilege) -> bool {
        self.unit_credential
            .as_ref()
            .is_some_and(|c| c.grants(privilege))
    }

    fn bypasses_schema(&self) -> bool {
        self.unit_credential
            .as_ref()
            .is_some_and(UnitCredential::bypasses_schema)
    }
}

/// Resolve an ACE href against the ACL base. An empty base leaves the href
/// as written.
fn resolve_href(base: Option<&str>, href: &str) -> Option<Url> {
    match base.filter(|b| !b.is_empty()) {
        Some(base) => Url::parse(base).ok()?.join(href).ok(),
        None => Url::parse(href).ok(),
    }
}

fn ace_grants(ace: &Ace, required: &Privilege) -> bool {
    ace.granted_privileges.iter().any(|name| {
        Privilege::lookup(required.scope(), name).is_some_and(|granted| granted.includes(required))
    })
}

/// Does `acl` grant `required` to one of the caller's roles?
pub fn require_privilege(acl: Option<&Acl>, required: &Privilege, caller: &Caller) -> bool {
    let Some(acl) = acl else {
        return false;
    };
    let roles: Vec<Url> = caller
        .roles
        .iter()
        .filter_map(|r| Url::parse(r).ok())
        .collect();

    for ace in &acl.aces {
        match &ace.principal {
            None => continue,
            Some(Principal::All) => {
                if ace_grants(ace, required) {
                    return true;
                }
            }
            Some(Principal::Href(href)) => {
                let Some(resolved) = resolve_href(acl.base.as_deref(), href) else {
                    continue;
                };
                if !roles.contains(&resolved) {
                    continue;
                }
                if ace
                    .granted_privileges
                    .iter()
                    .any(|p| p == cell_privilege::ROOT.name())
                {
                    return true;
                }
                if ace_grants(ace, required) {
                    return true;
                }
            }
        }
    }
    false
}

/// Check `privilege` on `node`, then `parent_privilege` (or `privilege`
/// again) on each ancestor up to the box root. Cell nodes only consult their
/// own ACL.
pub fn has_privilege(
    tree: &Tree,
    node: &ResourceNode,
    caller: &Caller,
    privilege: &Privilege,
    parent_privilege: Option<&Privilege>,
) -> Result<bool> {
    if node.exists() && require_privilege(node.acl(), privilege, caller) {
        return Ok(true);
    }
    let ancestor_privilege = parent_privilege.unwrap_or(privilege);
    let mut current = node.clone();
    while current.path().level() == PathLevel::Dav {
        let Some(parent) = tree.parent(&current)? else {
            break;
        };
        if parent.exists() && require_privilege(parent.acl(), ancestor_privilege, caller) {
            return Ok(true);
        }
        current = parent;
    }
    Ok(false)
}

/// Nearest `requireSchemaAuthz` declared from `node` up to its box root
pub fn required_schema_level(tree: &Tree, node: &ResourceNode) -> Result<SchemaLevel> {
    let mut current = Some(node.clone());
    while let Some(n) = current {
        if let Some(level) = n.acl().and_then(|a| a.require_schema_authz) {
            return Ok(level);
        }
        if n.path().level() != PathLevel::Dav {
            break;
        }
        current = tree.parent(&n)?;
    }
    Ok(SchemaLevel::None)
}

fn strip_confidential_suffix(schema: &str) -> &str {
    schema.strip_suffix("#c").unwrap_or(schema)
}

/// Confidentiality gate of the box enclosing `node`
pub fn check_schema_access(tree: &Tree, node: &ResourceNode, caller: &Caller) -> Result<()> {
    if caller.bypasses_schema() {
        return Ok(());
    }
    let level = required_schema_level(tree, node)?;
    if level == SchemaLevel::None {
        return Ok(());
    }

    let box_schema = match node.path().box_path() {
        Some(box_path) => tree
            .node(&box_path)?
            .property(BOX_SCHEMA_KEY)
            .map(str::to_string),
        None => None,
    };
    if let Some(box_schema) = box_schema.filter(|s| !s.is_empty()) {
        let Some(caller_schema) = caller.schema.as_deref() else {
            return Err(DavError::SchemaAuthRequired);
        };
        if strip_confidential_suffix(caller_schema) != strip_confidential_suffix(&box_schema) {
            return Err(DavError::SchemaMismatch);
        }
    }

    let sufficient = match level {
        SchemaLevel::None => true,
        SchemaLevel::Public => caller.confidentiality >= SchemaLevel::Public,
        SchemaLevel::Confidential => caller.confidentiality == SchemaLevel::Confidential,
    };
    if !sufficient {
        return Err(DavError::InsufficientSchemaAuthzLevel);
    }
    Ok(())
}

/// Full access decision used by the facade
pub fn check_access(
    tree: &Tree,
    node: &ResourceNode,
    caller: &Caller,
    privilege: &Privilege,
    parent_privilege: Option<&Privilege>,
) -> Result<()> {
    if caller.unit_grants(privilege) {
        return Ok(());
    }
    check_schema_access(tree, node, caller)?;
    if has_privilege(tree, node, caller, privilege, parent_privilege)? {
        return Ok(());
    }
    tracing::warn!(
        path = %node.path(),
        privilege = %privilege,
        subject = caller.subject.as_deref().unwrap_or("anonymous"),
        "access denied"
    );
    Err(DavError::NecessaryPrivilegeLacking(privilege.name().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privilege::box_privilege;

    const BASE: &str = "https://unit/cellA/__role/box1/";
    const READER: &str = "https://unit/cellA/__role/box1/reader";

    #[test]
    fn test_absent_or_empty_acl_denies() {
        let caller = Caller::with_roles("alice", [READER]);
        assert!(!require_privilege(None, &box_privilege::READ, &caller));
        assert!(!require_privilege(
            Some(&Acl::new()),
            &box_privilege::READ,
            &caller
        ));
    }

    #[test]
    fn test_relative_href_resolves_against_base() {
        let acl = Acl::new().with_base(BASE).grant("reader", &["read"]);
        let caller = Caller::with_roles("alice", [READER]);
        assert!(require_privilege(Some(&acl), &box_privilege::READ, &caller));
        assert!(require_privilege(
            Some(&acl),
            &box_privilege::READ_PROPERTIES,
            &caller
        ));
        assert!(!require_privilege(Some(&acl), &box_privilege::WRITE, &caller));

        let other = Caller::with_roles("bob", ["https://unit/cellA/__role/box1/writer"]);
        assert!(!require_privilege(Some(&acl), &box_privilege::READ, &other));
    }

    #[test]
    fn test_absolute_href_without_base() {
        let acl = Acl::new().grant(READER, &["all"]);
        let caller = Caller::with_roles("alice", [READER]);
        assert!(require_privilege(
            Some(&acl),
            &box_privilege::WRITE_CONTENT,
            &caller
        ));
    }

    #[test]
    fn test_principal_all() {
        let acl = Acl::new().grant_all(&["read"]);
        assert!(require_privilege(
            Some(&acl),
            &box_privilege::READ,
            &Caller::anonymous()
        ));
        assert!(!require_privilege(
            Some(&acl),
            &box_privilege::BIND,
            &Caller::anonymous()
        ));
    }

    #[test]
    fn test_root_grant_short_circuits() {
        let acl = Acl::new().with_base(BASE).grant("reader", &["root"]);
        let caller = Caller::with_roles("alice", [READER]);
        assert!(require_privilege(Some(&acl), &box_privilege::WRITE_ACL, &caller));
    }

    #[test]
    fn test_unknown_names_never_match() {
        let acl = Acl::new().grant_all(&["Read", "everything"]);
        assert!(!require_privilege(
            Some(&acl),
            &box_privilege::READ,
            &Caller::anonymous()
        ));
    }

    #[test]
    fn test_unit_credentials() {
        assert!(UnitCredential::Master.grants(&box_privilege::WRITE_ACL));
        let admin = UnitCredential::Admin {
            contents_role: ContentsRole::None,
        };
        assert!(!admin.grants(&box_privilege::READ));
        assert!(admin.bypasses_schema());

        let reader = UnitCredential::User {
            owns_cell: true,
            contents_role: ContentsRole::CellContentsReader,
        };
        assert!(reader.grants(&box_privilege::READ));
        assert!(!reader.grants(&box_privilege::WRITE_CONTENT));

        let stranger = UnitCredential::User {
            owns_cell: false,
            contents_role: ContentsRole::CellContentsAdmin,
        };
        assert!(!stranger.grants(&box_privilege::READ));
        assert!(!stranger.bypasses_schema());
    }

    #[test]
    fn test_schema_suffix() {
        assert_eq!(
            strip_confidential_suffix("https://app/#c"),
            "https://app/"
        );
        assert_eq!(strip_confidential_suffix("https://app/"), "https://app/");
    }
}
