pub mod storage;
pub mod types;
pub mod workflow;

pub use types::*;
pub use workflow::{list_collaborated_documents, list_pending_requests, respond, send_request};
