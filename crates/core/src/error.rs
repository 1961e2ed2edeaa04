//! Error taxonomy for resource tree operations
//!
//! Every fallible engine operation returns [`DavError`]. Callers that need to
//! decide how to react (retry, report a precondition, deny) should match on
//! [`DavError::kind`] rather than on individual variants.

use std::io;

/// Coarse classification of a [`DavError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retried internally, never surfaced on its own
    Transient,
    /// The request conflicts with the current state of the tree
    Precondition,
    /// The request would produce a tree shape that is not allowed
    Structural,
    /// The caller lacks a privilege or schema authorization
    Authorization,
    /// The addressed node does not exist
    NotFound,
    /// Storage is unusable or corrupt
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum DavError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("parent of {0} does not exist")]
    HasNotParent(String),

    #[error("method not allowed on {0}")]
    MethodNotAllowed(String),

    #[error("etag does not match")]
    EtagMismatch,

    #[error("collection {0} is not empty")]
    HasChildren(String),

    #[error("destination already exists")]
    DestinationAlreadyExists,

    #[error("collection depth exceeds the limit of {0}")]
    CollectionDepthExceeded(usize),

    #[error("collection already holds the maximum of {0} children")]
    CollectionChildResourceError(usize),

    #[error("service source collection cannot be overwritten")]
    ServiceSourceProhibitedToOverwrite,

    #[error("only files can be overwritten")]
    ResourceProhibitedToOverwrite,

    #[error("resources cannot be moved into an odata collection")]
    ProhibitedToMoveIntoODataCollection,

    #[error("resources cannot be moved into a file")]
    ProhibitedToMoveIntoFile,

    #[error("resources cannot be moved into a service collection")]
    ProhibitedToMoveIntoServiceCollection,

    #[error("service source collection cannot contain collections")]
    ServiceSourceProhibitedToContainCollection,

    #[error("service source collection cannot be moved or deleted")]
    ServiceSourceProhibitedToMove,

    #[error("resource of this type is not allowed under {0}")]
    ResourceProhibitedUnderParent(String),

    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    #[error("invalid {header} header: {value}")]
    InvalidHeader { header: &'static str, value: String },

    #[error("invalid acl: {0}")]
    InvalidAcl(String),

    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    #[error("propfind with depth infinity is not allowed")]
    PropfindInfinityNotAllowed,

    #[error("requested range not satisfiable")]
    RangeNotSatisfiable,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("necessary privilege lacking: {0}")]
    NecessaryPrivilegeLacking(String),

    #[error("schema authorization required")]
    SchemaAuthRequired,

    #[error("a unit user credential is required")]
    UnitUserAccessRequired,

    #[error("caller schema does not match box schema")]
    SchemaMismatch,

    #[error("insufficient schema authorization level")]
    InsufficientSchemaAuthzLevel,

    #[error("inconsistent metadata at {path}: {reason}")]
    Inconsistent { path: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DavError {
    pub fn kind(&self) -> ErrorKind {
        use DavError::*;
        match self {
            NotFound(_) => ErrorKind::NotFound,
            HasNotParent(_)
            | MethodNotAllowed(_)
            | EtagMismatch
            | HasChildren(_)
            | DestinationAlreadyExists
            | InvalidDestination(_)
            | InvalidHeader { .. }
            | InvalidAcl(_)
            | InvalidName(_)
            | PropfindInfinityNotAllowed
            | RangeNotSatisfiable
            | NotImplemented(_) => ErrorKind::Precondition,
            CollectionDepthExceeded(_)
            | CollectionChildResourceError(_)
            | ServiceSourceProhibitedToOverwrite
            | ResourceProhibitedToOverwrite
            | ProhibitedToMoveIntoODataCollection
            | ProhibitedToMoveIntoFile
            | ProhibitedToMoveIntoServiceCollection
            | ServiceSourceProhibitedToContainCollection
            | ServiceSourceProhibitedToMove
            | ResourceProhibitedUnderParent(_) => ErrorKind::Structural,
            NecessaryPrivilegeLacking(_)
            | UnitUserAccessRequired
            | SchemaAuthRequired
            | SchemaMismatch
            | InsufficientSchemaAuthzLevel => ErrorKind::Authorization,
            Inconsistent { .. } | Io(_) => ErrorKind::Fatal,
            // A sidecar that fails to decode is retried before surfacing as Inconsistent
            Serialization(_) => ErrorKind::Transient,
        }
    }
}

pub type Result<T> = std::result::Result<T, DavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_fatal() {
        let err: DavError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(DavError::NotFound("/a".into()).kind(), ErrorKind::NotFound);
        assert_eq!(DavError::EtagMismatch.kind(), ErrorKind::Precondition);
        assert_eq!(
            DavError::ProhibitedToMoveIntoFile.kind(),
            ErrorKind::Structural
        );
        assert_eq!(DavError::SchemaMismatch.kind(), ErrorKind::Authorization);
        assert_eq!(
            DavError::Inconsistent {
                path: "/a".into(),
                reason: "bad".into()
            }
            .kind(),
            ErrorKind::Fatal
        );
    }
}
