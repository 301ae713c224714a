use crate::error::ScanError;
use crate::types::ScanRequest;

/// Methods the scanner understands via `-m`.
pub const KNOWN_METHODS: &[&str] = &["GET", "POST", "JSON", "HEADERS"];

/// Decides whether a request may be handed to the scanner.
pub trait ValidationPolicy: Send + Sync + std::fmt::Debug {
    fn validate(&self, req: &ScanRequest) -> Result<(), ScanError>;
}

/// Only checks that a target was given; everything else is passed through.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lenient;

impl ValidationPolicy for Lenient {
    fn validate(&self, req: &ScanRequest) -> Result<(), ScanError> {
        require_target(req)
    }
}

/// Lenient checks plus method, rate limit and chunk size bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Strict;

impl ValidationPolicy for Strict {
    fn validate(&self, req: &ScanRequest) -> Result<(), ScanError> {
        require_target(req)?;

        if let Some(m) = req.method() {
            if !KNOWN_METHODS.iter().any(|k| k.eq_ignore_ascii_case(m)) {
                return Err(ScanError::InvalidArgument(format!(
                    "unsupported method '{m}', expected one of {}",
                    KNOWN_METHODS.join(", ")
                )));
            }
        }
        if let Some(r) = req.rate_limit {
            if r < 0 {
                return Err(ScanError::InvalidArgument(format!(
                    "rateLimit must be non-negative, got {r}"
                )));
            }
        }
        if let Some(c) = req.chunk_size {
            if c <= 0 {
                return Err(ScanError::InvalidArgument(format!(
                    "chunkSize must be positive, got {c}"
                )));
            }
        }
        Ok(())
    }
}

fn require_target(req: &ScanRequest) -> Result<(), ScanError> {
    if req.has_target() {
        Ok(())
    } else {
        Err(ScanError::InvalidArgument(
            "either 'url' or 'textFile' must be provided".into(),
        ))
    }
}
