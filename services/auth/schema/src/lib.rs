//! sea-orm entities owned by the auth service.

pub mod otp_sessions;
pub mod users;
