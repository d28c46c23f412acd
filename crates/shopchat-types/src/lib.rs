//! Shared domain types for shopchat.
//!
//! This crate contains the types used across the chat client: the session
//! identity and lifecycle state, render-surface messages, the server's JSON
//! wire shapes, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod wire;
