//! Configuration module for waymap
//!
//! This module handles:
//! - The user config file (config.toml)
//! - Environment overrides
//! - Default database location

mod user_config;

pub use user_config::{
    default_db_path,
    LogConfig,
    OutputConfig,
    StoreConfig,
    UserConfig,
    DEFAULT_FORMAT,
    DEFAULT_LOG_LEVEL,
};
