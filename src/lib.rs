// Library root — exposes internals for integration tests.
// The binary entry point is src/main.rs.

pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod records;
pub mod subsystems;
