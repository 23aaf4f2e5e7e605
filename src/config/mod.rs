//! Configuration resolution for collector loggers.
//!
//! A logger owns one resolved [`Config`]. Callers describe changes through
//! [`ConfigOverrides`], either typed or decoded from JSON, and
//! [`resolve`] merges them onto a base snapshot and the library defaults.

mod build;
mod overrides;
mod types;

pub use build::{resolve, resolve_value};
pub(crate) use build::revalidate;
pub use overrides::{ConfigOverrides, PortValue};
pub use types::{
    Config, ConfigError, DEFAULT_HOST, DEFAULT_LEVEL, DEFAULT_NAME, DEFAULT_PATH, DEFAULT_PORT,
    MAX_PORT, MIN_PORT, Protocol,
};

#[cfg(test)]
mod config_tests;
