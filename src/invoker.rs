use std::sync::Arc;
use std::time::{Duration, Instant};

use ::time::{format_description::well_known, OffsetDateTime};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::build_args;
use crate::error::ScanError;
use crate::policy::{Lenient, ValidationPolicy};
use crate::runner::{ProcessRunner, TokioProcessRunner};
use crate::types::{ScanRequest, ScanResult};

pub const DEFAULT_PROGRAM: &str = "arjun";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Validates a [`ScanRequest`], runs the scanner once and classifies the outcome.
///
/// Holds no per-call state; share one instance across concurrent requests.
#[derive(Debug, Clone)]
pub struct CommandInvoker<R = TokioProcessRunner> {
    program: String,
    timeout: Duration,
    policy: Arc<dyn ValidationPolicy>,
    runner: R,
}

impl Default for CommandInvoker<TokioProcessRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInvoker<TokioProcessRunner> {
    pub fn new() -> Self {
        Self::with_runner(TokioProcessRunner)
    }
}

impl<R: ProcessRunner> CommandInvoker<R> {
    pub fn with_runner(runner: R) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            timeout: DEFAULT_TIMEOUT,
            policy: Arc::new(Lenient),
            runner,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: impl ValidationPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the scanner and return its trimmed combined output.
    pub async fn invoke(&self, req: &ScanRequest) -> Result<String, ScanError> {
        self.invoke_with_cancel(req, &CancellationToken::new()).await
    }

    /// Like [`invoke`](Self::invoke), but the child is killed if `cancel` fires first.
    pub async fn invoke_with_cancel(
        &self,
        req: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<String, ScanError> {
        let result = self.execute(req, cancel).await?;
        if result.succeeded() {
            Ok(result.combined_output)
        } else {
            warn!(
                program = %self.program,
                exit_code = result.exit_code,
                "scanner exited with failure"
            );
            Err(ScanError::ExternalToolError {
                program: self.program.clone(),
                exit_code: result.exit_code,
                output: result.combined_output,
            })
        }
    }

    /// Validate, spawn and wait. A non-zero exit is still `Ok` here.
    pub async fn execute(
        &self,
        req: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        self.policy.validate(req)?;

        let argv = build_args(&self.program, req);
        info!(program = %self.program, args = argv.len() - 1, "starting scan");

        let start = Instant::now();
        let out = self.runner.run(&argv, self.timeout, cancel).await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&out.stderr));

        info!(
            program = %self.program,
            exit_code = out.exit_code,
            duration_ms,
            "scan finished"
        );
        Ok(ScanResult {
            exit_code: out.exit_code,
            combined_output: combined.trim().to_string(),
            duration_ms,
            finished_at: now_rfc3339(),
        })
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
