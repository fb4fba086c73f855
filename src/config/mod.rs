//! Layered runtime configuration.
//!
//! Values come from a discovered settings file, then the process
//! environment, then built-in defaults; credentials come from the OS
//! keychain. Everything is resolved and validated once at startup and the
//! resulting [`Config`] is shared read-only.

pub mod error;
pub mod resolver;
pub mod settings;

pub use error::ConfigError;
pub use resolver::{Config, ExecutionMode, LogLevel, PushoverConfig};
pub use settings::SettingsSource;
