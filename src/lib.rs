//! Library crate for arjun-mcp-rs: runs the Arjun scanner behind an MCP tool.
pub mod args;
pub mod config;
pub mod error;
pub mod invoker;
pub mod mcp;
pub mod policy;
pub mod runner;
pub mod server;
pub mod types;

pub use error::ScanError;
pub use invoker::CommandInvoker;
pub use types::{ScanRequest, ScanResult};
