//! Session identity, durable mirror, and lifecycle state.
//!
//! This module defines the `SessionStore` trait that the infrastructure
//! layer implements, and the `SessionLifecycle` state machine owned by the
//! chat client.

pub mod lifecycle;
pub mod store;
