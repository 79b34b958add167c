//! Entity Module

pub mod refresh_token;
pub mod user;
pub mod verification_code;
