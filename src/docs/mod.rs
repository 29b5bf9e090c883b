//! Documents: storage, access evaluation, version ledger, sharing and trash.

pub mod access;
pub mod service;
pub mod sharing;
pub mod storage;
pub mod trash;
pub mod types;
pub mod versions;

pub use access::{resolve_permission, LinkAccess};
pub use trash::TrashSweeper;
pub use types::*;
