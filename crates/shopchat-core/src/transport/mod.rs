//! Real-time channel abstractions.
//!
//! This module defines the `ChannelConnector` trait that the infrastructure
//! layer implements, and the `TransportManager` that keeps one connection
//! alive per active session.

pub mod connector;
pub mod manager;
