//! Static privilege forests
//!
//! Privileges form two separate forests, one for cell-level resources and
//! one for box contents. A granted privilege covers every privilege below it
//! in its forest.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessType {
    Read,
    Write,
    Exec,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivilegeScope {
    Cell,
    Box,
}

#[derive(Debug)]
pub struct Privilege {
    name: &'static str,
    access_type: AccessType,
    scope: PrivilegeScope,
    parent: Option<&'static Privilege>,
}

impl Privilege {
    const fn new(
        name: &'static str,
        access_type: AccessType,
        scope: PrivilegeScope,
        parent: Option<&'static Privilege>,
    ) -> Self {
        Self {
            name,
            access_type,
            scope,
            parent,
        }
    }

    /* Getters */

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn access_type(&self) -> AccessType {
        self.access_type
    }

    pub fn scope(&self) -> PrivilegeScope {
        self.scope
    }

    pub fn parent(&self) -> Option<&'static Privilege> {
        self.parent
    }

    /// True if holding `self` is enough for `required`, i.e. `self` is
    /// `required` or one of its ancestors.
    pub fn includes(&self, required: &Privilege) -> bool {
        let mut current = Some(required);
        while let Some(p) = current {
            if p == self {
                return true;
            }
            current = p.parent;
        }
        false
    }

    pub fn lookup(scope: PrivilegeScope, name: &str) -> Option<&'static Privilege> {
        let table: &[&'static Privilege] = match scope {
            PrivilegeScope::Cell => cell_privilege::ALL_PRIVILEGES,
            PrivilegeScope::Box => box_privilege::ALL_PRIVILEGES,
        };
        table.iter().copied().find(|p| p.name == name)
    }
}

impl PartialEq for Privilege {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.scope == other.scope
    }
}

impl Eq for Privilege {}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Privileges on cell-level resources, rooted at `root`
pub mod cell_privilege {
    use super::{AccessType::*, Privilege, PrivilegeScope::Cell};

    pub static ROOT: Privilege = Privilege::new("root", All, Cell, None);
    pub static AUTH: Privilege = Privilege::new("auth", All, Cell, Some(&ROOT));
    pub static AUTH_READ: Privilege = Privilege::new("auth-read", Read, Cell, Some(&AUTH));
    pub static MESSAGE: Privilege = Privilege::new("message", All, Cell, Some(&ROOT));
    pub static MESSAGE_READ: Privilege =
        Privilege::new("message-read", Read, Cell, Some(&MESSAGE));
    pub static EVENT: Privilege = Privilege::new("event", All, Cell, Some(&ROOT));
    pub static EVENT_READ: Privilege = Privilege::new("event-read", Read, Cell, Some(&EVENT));
    pub static SOCIAL: Privilege = Privilege::new("social", All, Cell, Some(&ROOT));
    pub static SOCIAL_READ: Privilege = Privilege::new("social-read", Read, Cell, Some(&SOCIAL));
    pub static BOX: Privilege = Privilege::new("box", All, Cell, Some(&ROOT));
    pub static BOX_READ: Privilege = Privilege::new("box-read", Read, Cell, Some(&BOX));
    pub static BOX_INSTALL: Privilege = Privilege::new("box-install", Write, Cell, Some(&BOX));
    pub static BOX_BAR_EXPORT: Privilege =
        Privilege::new("box-bar-export", Read, Cell, Some(&BOX));
    pub static ACL: Privilege = Privilege::new("acl", All, Cell, Some(&ROOT));
    pub static ACL_READ: Privilege = Privilege::new("acl-read", Read, Cell, Some(&ACL));
    pub static PROPFIND: Privilege = Privilege::new("propfind", Read, Cell, Some(&ROOT));
    pub static LOG: Privilege = Privilege::new("log", All, Cell, Some(&ROOT));
    pub static LOG_READ: Privilege = Privilege::new("log-read", Read, Cell, Some(&LOG));
    pub static RULE: Privilege = Privilege::new("rule", All, Cell, Some(&ROOT));
    pub static RULE_READ: Privilege = Privilege::new("rule-read", Read, Cell, Some(&RULE));

    pub static ALL_PRIVILEGES: &[&Privilege] = &[
        &ROOT,
        &AUTH,
        &AUTH_READ,
        &MESSAGE,
        &MESSAGE_READ,
        &EVENT,
        &EVENT_READ,
        &SOCIAL,
        &SOCIAL_READ,
        &BOX,
        &BOX_READ,
        &BOX_INSTALL,
        &BOX_BAR_EXPORT,
        &ACL,
        &ACL_READ,
        &PROPFIND,
        &LOG,
        &LOG_READ,
        &RULE,
        &RULE_READ,
    ];
}

/// Privileges on box contents, rooted at `all`
pub mod box_privilege {
    use super::{AccessType::*, Privilege, PrivilegeScope::Box};

    pub static ALL: Privilege = Privilege::new("all", All, Box, None);
    pub static READ: Privilege = Privilege::new("read", Read, Box, Some(&ALL));
    pub static READ_PROPERTIES: Privilege =
        Privilege::new("read-properties", Read, Box, Some(&READ));
    pub static READ_ACL: Privilege = Privilege::new("read-acl", Read, Box, Some(&ALL));
    pub static WRITE: Privilege = Privilege::new("write", Write, Box, Some(&ALL));
    pub static WRITE_PROPERTIES: Privilege =
        Privilege::new("write-properties", Write, Box, Some(&WRITE));
    pub static WRITE_CONTENT: Privilege =
        Privilege::new("write-content", Write, Box, Some(&WRITE));
    pub static BIND: Privilege = Privilege::new("bind", Write, Box, Some(&WRITE));
    pub static UNBIND: Privilege = Privilege::new("unbind", Write, Box, Some(&WRITE));
    pub static WRITE_ACL: Privilege = Privilege::new("write-acl", Write, Box, Some(&ALL));
    pub static EXEC: Privilege = Privilege::new("exec", Exec, Box, Some(&ALL));
    pub static ALTER_SCHEMA: Privilege = Privilege::new("alter-schema", Write, Box, Some(&ALL));
    pub static STREAM_SEND: Privilege = Privilege::new("stream-send", Write, Box, Some(&ALL));
    pub static STREAM_RECEIVE: Privilege =
        Privilege::new("stream-receive", Read, Box, Some(&ALL));

    pub static ALL_PRIVILEGES: &[&Privilege] = &[
        &ALL,
        &READ,
        &READ_PROPERTIES,
        &READ_ACL,
        &WRITE,
        &WRITE_PROPERTIES,
        &WRITE_CONTENT,
        &BIND,
        &UNBIND,
        &WRITE_ACL,
        &EXEC,
        &ALTER_SCHEMA,
        &STREAM_SEND,
        &STREAM_RECEIVE,
    ];
}
