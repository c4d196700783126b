//! Error types for the p4bridge core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    P4(#[from] P4Error),

    #[error(transparent)]
    Move(#[from] MoveError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Perforce errors
// ---------------------------------------------------------------------------

/// Errors from Perforce CLI operations.
#[derive(Debug, Error)]
pub enum P4Error {
    /// The `p4` binary was not found on `$PATH`.
    #[error("p4 binary not found: {0}")]
    BinaryNotFound(String),

    /// A `p4` command exited with a non-zero status or reported errors.
    #[error("p4 command failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// `p4` exited cleanly but reported a message of error severity.
    #[error("p4 reported {severity}: {message}")]
    Reported { severity: String, message: String },

    /// Generic I/O wrapper.
    #[error("p4 I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Move request errors
// ---------------------------------------------------------------------------

/// Errors that reject a move request before any backend command runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoveError {
    /// Assets are consumed as (source, destination) pairs.
    #[error("uneven number of assets during move ({0})")]
    UnevenAssetCount(usize),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = P4Error::CommandFailed {
            exit_code: 1,
            stderr: "//depot/a.txt - no permission".into(),
        };
        assert_eq!(
            err.to_string(),
            "p4 command failed (exit 1): //depot/a.txt - no permission"
        );

        let err = P4Error::Reported {
            severity: "error".into(),
            message: "Perforce password (P4PASSWD) invalid or unset.".into(),
        };
        assert_eq!(
            err.to_string(),
            "p4 reported error: Perforce password (P4PASSWD) invalid or unset."
        );

        let err = MoveError::UnevenAssetCount(3);
        assert!(err.to_string().contains("uneven number of assets"));

        let err = ConfigError::InvalidValue {
            field: "p4.port".into(),
            detail: "must not be empty".into(),
        };
        assert!(err.to_string().contains("p4.port"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = MoveError::UnevenAssetCount(1).into();
        assert!(matches!(core_err, CoreError::Move(_)));

        let core_err: CoreError = P4Error::BinaryNotFound("p4".into()).into();
        assert!(matches!(core_err, CoreError::P4(_)));
    }
}
