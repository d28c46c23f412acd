//! Chat session and message-delivery logic for shopchat.
//!
//! This crate defines the "ports" (`ChatApi`, `ChannelConnector`,
//! `SessionStore`, `RenderSink`) that the infrastructure layer and front-ends
//! implement, plus the components built on them. It depends only on
//! `shopchat-types` -- never on `shopchat-infra` or any HTTP/WebSocket/IO crate.

pub mod chat;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;
