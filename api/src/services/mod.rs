//! External service integrations.
//!
//! Currently just email delivery for check-in OTPs.

pub mod email;
