//! I/O adapters for harness commands.

pub mod config;
pub mod process;
pub mod prompt;
pub mod provider;
pub mod shipper;
pub mod store;
pub mod tester;
