//! TOML-based configuration system for p4bridge.
//!
//! The Perforce password is never stored in the file. `p4.password_env`
//! names an environment variable that is resolved at runtime via
//! [`BridgeConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;
use crate::p4::parser::MOVE_REJECTED;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Perforce connection settings.
    #[serde(default)]
    pub p4: P4Config,

    /// Move command behaviour.
    #[serde(default, rename = "move")]
    pub moves: MoveConfig,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Perforce
// ---------------------------------------------------------------------------

/// Perforce server connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct P4Config {
    /// Path or name of the `p4` executable.
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Server address (`P4PORT`), e.g. `ssl:perforce.example.com:1666`.
    #[serde(default)]
    pub port: String,

    /// Perforce user (`P4USER`).
    #[serde(default)]
    pub user: String,

    /// Client workspace (`P4CLIENT`).
    #[serde(default)]
    pub client: String,

    /// Environment variable holding the password or ticket.
    #[serde(default)]
    pub password_env: Option<String>,

    /// Character set for unicode servers (`P4CHARSET`).
    #[serde(default)]
    pub charset: Option<String>,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_binary() -> String {
    "p4".into()
}

impl Default for P4Config {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            port: String::new(),
            user: String::new(),
            client: String::new(),
            password_env: None,
            charset: None,
            password: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// How the server's "move is disabled" rejection is recognised, and the
/// default for keeping local files in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveConfig {
    /// Unique error codes (low 16 bits of `code0`) meaning the server
    /// rejects `p4 move`.
    #[serde(default = "default_rejected_codes")]
    pub rejected_codes: Vec<u32>,

    /// Case-insensitive message fragments with the same meaning, for
    /// servers that do not report a code.
    #[serde(default = "default_rejected_patterns")]
    pub rejected_patterns: Vec<String>,

    /// Pass `-k` to `p4 move` unless a request says otherwise.
    #[serde(default)]
    pub no_local_file_move: bool,
}

fn default_rejected_codes() -> Vec<u32> {
    vec![MOVE_REJECTED]
}

fn default_rejected_patterns() -> Vec<String> {
    vec!["move command is disabled".into()]
}

impl Default for MoveConfig {
    fn default() -> Self {
        Self {
            rejected_codes: default_rejected_codes(),
            rejected_patterns: default_rejected_patterns(),
            no_local_file_move: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl BridgeConfig {
    /// Load a [`BridgeConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: BridgeConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve `p4.password_env` into `p4.password`.
    ///
    /// A missing variable logs a warning but does not fail: servers with
    /// ticket-based login need no password here.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref env_name) = self.p4.password_env {
            self.p4.password = resolve_optional_env(env_name, "p4.password_env");
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("p4.binary", &self.p4.binary),
            ("p4.port", &self.p4.port),
            ("p4.user", &self.p4.user),
            ("p4.client", &self.p4.client),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.into(),
                    detail: "must not be empty".into(),
                });
            }
        }

        if self.moves.rejected_codes.is_empty()
            && self.moves.rejected_patterns.iter().all(|p| p.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "move.rejected_patterns".into(),
                detail: "at least one rejected code or pattern is required".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Starter configuration written by `p4bridge init`.
    pub fn default_toml() -> &'static str {
        r#"[logging]
level = "info"

[p4]
binary = "p4"
port = "ssl:perforce.example.com:1666"
user = "builder"
client = "builder-workspace"
password_env = "P4PASSWD"

[move]
# Unique error codes meaning the server has 'p4 move' disabled
# (7859 is the server's MoveRejected message).
rejected_codes = [7859]
rejected_patterns = ["move command is disabled"]
no_local_file_move = false
"#
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}
