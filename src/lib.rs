pub mod analysis;
pub mod config;
pub mod errors;
pub mod logging;
pub mod mcp;
pub mod ports;
pub mod project;
pub mod types;
