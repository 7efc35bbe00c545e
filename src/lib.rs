//! Relay server for a two-player online chess game.
//!
//! Two clients find each other through a short numeric room code and
//! exchange game messages over WebSocket. The server never interprets game
//! rules; it owns room membership and the authoritative chess clock, and
//! relays everything else between the two members of a room.

pub mod common;
pub mod domain;
pub mod protocol;
pub mod server;
