//! API authentication

pub mod authenticator;
pub mod token;
