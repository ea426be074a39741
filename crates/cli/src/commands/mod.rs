//! CLI command implementations.

pub mod agent;
pub mod config_cmd;
pub mod gateway;
