pub mod acl;
pub mod boxes;
pub mod cell;
pub mod get;
pub mod init;
pub mod ls;
pub mod mkcol;
pub mod mv;
pub mod proppatch;
pub mod put;
pub mod rm;

pub use acl::Acl;
pub use boxes::Boxes;
pub use cell::Cell;
pub use get::Get;
pub use init::Init;
pub use ls::Ls;
pub use mkcol::Mkcol;
pub use mv::Mv;
pub use proppatch::Proppatch;
pub use put::Put;
pub use rm::Rm;
