//! Port definitions (trait interfaces) for adapter crates.

pub mod directory_provider;
pub mod notification;
