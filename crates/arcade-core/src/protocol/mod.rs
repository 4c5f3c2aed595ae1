//! Wire protocol: tagged JSON messages and constants

pub mod constants;
pub mod message;

pub use constants::*;
pub use message::{ClientMessage, CloseReason, ErrorKind, ServerMessage, WsRole};
