//! Shared service plumbing for Test24: config loading, tracing, HTTP middleware
//! and typed request validation.

pub mod config;
pub mod middleware;
pub mod tracing;
pub mod validation;
