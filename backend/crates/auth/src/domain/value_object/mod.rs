//! Value Object Module

pub mod email;
pub mod provider;
pub mod purpose;
pub mod user_role;
