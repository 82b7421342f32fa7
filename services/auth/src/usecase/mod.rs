pub mod login;
pub mod otp;
