//! # gara-shared
//!
//! Protocol and domain types shared by every Gara client crate: the
//! server/client event unions, the connect-time parameter snapshot, room
//! identifiers, and the constants that fix the wire and storage layout.

pub mod constants;
pub mod protocol;
pub mod types;

mod error;

pub use error::ProtocolError;
pub use protocol::{ClientEvent, ConnectParams, ServerEvent};
pub use types::RoomId;
