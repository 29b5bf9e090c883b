pub mod password;
pub mod service;
pub mod storage;
pub mod tokens;
pub mod types;

pub use tokens::TokenService;
pub use types::*;
