//! Core types for the App Service tunnel relay:
//! - remote target identity and credential derivation
//! - bearer token acquisition for the management scope
//! - relay engine configuration
//! - common error types

pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod target;

pub use config::RelayConfig;
pub use error::{Error, Result};
