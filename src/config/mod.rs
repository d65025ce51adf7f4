//! Configuration management for the scraper
//!
//! This module handles loading and managing configuration settings
//! from defaults, TOML files and environment variables.

pub mod loader;
pub mod settings;

pub use loader::ConfigLoader;
pub use settings::{Settings, TargetSettings};
