use std::time::Duration;

use thiserror::Error;

/// Failure kinds for one scanner invocation.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{program} binary not found in PATH: {source}")]
    BinaryNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {after:?} and was terminated")]
    Timeout { program: String, after: Duration },

    #[error("{program} exited with code {exit_code}: {output}")]
    ExternalToolError {
        program: String,
        exit_code: i32,
        output: String,
    },

    #[error("{program} run was cancelled and the process terminated")]
    Cancelled { program: String },

    #[error("i/o error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Stable identifier for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::BinaryNotFound { .. } => "binary_not_found",
            Self::Timeout { .. } => "timeout",
            Self::ExternalToolError { .. } => "external_tool_error",
            Self::Cancelled { .. } => "cancelled",
            Self::Io { .. } => "io",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExternalToolError { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_tool_message_carries_code_and_output() {
        let err = ScanError::ExternalToolError {
            program: "arjun".into(),
            exit_code: 2,
            output: "bad flag".into(),
        };
        assert_eq!(err.to_string(), "arjun exited with code 2: bad flag");
        assert_eq!(err.kind(), "external_tool_error");
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn timeout_message_names_bound() {
        let err = ScanError::Timeout {
            program: "arjun".into(),
            after: Duration::from_secs(600),
        };
        assert!(err.to_string().contains("600s"));
        assert_eq!(err.kind(), "timeout");
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn sub_second_timeout_is_not_rounded_to_zero() {
        let err = ScanError::Timeout {
            program: "arjun".into(),
            after: Duration::from_millis(500),
        };
        assert_eq!(
            err.to_string(),
            "arjun timed out after 500ms and was terminated"
        );
    }

    #[test]
    fn missing_binary_is_distinct_from_tool_failure() {
        let err = ScanError::BinaryNotFound {
            program: "arjun".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.kind(), "binary_not_found");
        assert!(err.to_string().contains("not found in PATH"));
    }
}
