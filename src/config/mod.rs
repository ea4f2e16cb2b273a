//! Configuration module
//!
//! User settings and where they are persisted.

pub mod settings;
pub mod settings_store;
