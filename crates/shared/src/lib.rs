//! Types exchanged between the game server and its clients.

pub mod protocol;

pub use protocol::*;
