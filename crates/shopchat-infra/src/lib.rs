//! Infrastructure layer for shopchat.
//!
//! Contains implementations of the port traits defined in `shopchat-core`:
//! the `reqwest` chat server client, the `tokio-tungstenite` channel
//! connector, the JSON-file session store, and the configuration loader.

pub mod api;
pub mod channel;
pub mod config;
pub mod filesystem;
