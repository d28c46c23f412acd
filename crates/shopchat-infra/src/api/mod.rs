//! HTTP adapter for the chat server's request/response endpoints.
//!
//! Implements the `ChatApi` trait from `shopchat-core` with `reqwest`.

pub mod client;

pub use client::HttpChatApi;
