// ABOUTME: Configuration module organization for server runtime settings
// ABOUTME: Re-exports the environment-backed configuration types

//! Configuration management

pub mod environment;

pub use environment::{
    AnthropicConfig, AuthConfig, DatabaseConfig, Environment, ServerConfig, StorageConfig,
};
