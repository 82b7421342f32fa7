//! Auth types shared across Test24 services.
//!
//! Provides the JWT claim layout and access-token validation.

pub mod token;
