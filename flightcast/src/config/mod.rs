//! Configuration module for Flightcast
//!
//! Configuration is read from an optional TOML file and then overridden by
//! `FLIGHTCAST_*` environment variables. Every section has defaults, so an
//! empty configuration is the zero-credential demo setup.

pub mod types;

pub use types::*;
