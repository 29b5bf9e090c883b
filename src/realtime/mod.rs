//! Presence and change relay between clients editing the same document.

pub mod relay;
pub mod types;

pub use relay::{Relay, RoomEvent, Session};
pub use types::{ClientEvent, ServerEvent};
