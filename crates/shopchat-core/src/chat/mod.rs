//! Chat conversation: server API port, render surface, outbound delivery,
//! reconciliation polling, and the `ChatClient` that ties them together.
//!
//! This module defines the `ChatApi` trait that the infrastructure layer
//! implements and the `RenderSink` trait that front-ends implement.

pub mod api;
pub mod client;
pub mod delivery;
pub mod poller;
pub mod render;
