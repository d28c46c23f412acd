//! Observability setup for shopchat: structured logging and optional
//! OpenTelemetry trace export.

pub mod tracing_setup;
