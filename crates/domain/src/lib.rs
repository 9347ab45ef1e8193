//! Shared types for ZapGate: configuration and the common error taxonomy.

pub mod config;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};
