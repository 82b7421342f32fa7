//! Domain vocabulary shared across Test24 services.

pub mod phone;
pub mod platform;
