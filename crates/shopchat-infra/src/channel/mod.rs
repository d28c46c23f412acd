//! WebSocket adapter for the real-time chat channel.
//!
//! Implements the `ChannelConnector` trait from `shopchat-core` with
//! `tokio-tungstenite`.

pub mod ws;

pub use ws::{channel_url, WsConnector};
