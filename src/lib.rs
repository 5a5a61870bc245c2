//! slide48: a server-authoritative sliding-block puzzle played over TCP.
//!
//! The server owns all game state and persistence; clients send framed
//! commands, replay the reported results against a local board mirror and
//! render it. See the `protocol` module for the wire format.

pub mod auth;
pub mod client;
pub mod config;
pub mod game;
pub mod protocol;
pub mod server;
pub mod stats;
pub mod storage;
