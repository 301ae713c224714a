use std::time::Duration;

use crate::invoker::{CommandInvoker, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
use crate::policy::{Lenient, Strict};

/// Fixed RPC endpoint path.
pub const MCP_PATH: &str = "/mcp";

/// Process-wide settings, fixed at startup and handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    /// Scanner executable, resolved through `PATH` when not absolute.
    pub program: String,
    pub timeout: Duration,
    /// Reject out-of-range method/rateLimit/chunkSize before spawning.
    pub strict: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            path: MCP_PATH.into(),
            program: DEFAULT_PROGRAM.into(),
            timeout: DEFAULT_TIMEOUT,
            strict: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the invoker these settings describe.
    pub fn invoker(&self) -> CommandInvoker {
        let invoker = CommandInvoker::new()
            .with_program(self.program.clone())
            .with_timeout(self.timeout);
        if self.strict {
            invoker.with_policy(Strict)
        } else {
            invoker.with_policy(Lenient)
        }
    }
}
