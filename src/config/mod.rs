//! Configuration management
//!
//! This module handles node settings: listen address, genesis block,
//! signature policy and connection mode, layered from defaults, an optional
//! TOML file and environment variables.

pub mod settings;

pub use settings::{Config, Settings, SignaturePolicy, DEFAULT_NODE_ADDR, GLOBAL_CONFIG};
