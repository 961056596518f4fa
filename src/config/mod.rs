//! Configuration module
//!
//! TOML settings for the API client, the book store and logging.

pub mod config;

pub use config::Config;
