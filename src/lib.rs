// This file exposes the modules as public modules in the crate

pub mod config;
pub mod jira;
pub mod logging;
pub mod mcp;
