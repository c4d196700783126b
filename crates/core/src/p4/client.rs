//! Asynchronous Perforce CLI client.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use super::parser::{parse_error_codes, parse_error_severity, severity_name, E_FAILED};
use super::paths::{resolve_path_list, PathFlags};
use crate::config::{MoveConfig, P4Config};
use crate::errors::P4Error;
use crate::models::VersionedAsset;

// ---------------------------------------------------------------------------
// Commands and outcomes
// ---------------------------------------------------------------------------

/// One backend invocation: `<verb> [<flags>] <paths>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct P4Command {
    pub verb: String,
    pub flags: Vec<String>,
    /// Resolved file arguments, unquoted.
    pub paths: Vec<String>,
}

impl P4Command {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            flags: Vec::new(),
            paths: Vec::new(),
        }
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn flag_if(self, enabled: bool, flag: impl Into<String>) -> Self {
        if enabled {
            self.flag(flag)
        } else {
            self
        }
    }

    pub fn paths(mut self, assets: &[VersionedAsset], flags: PathFlags) -> Self {
        self.paths.extend(resolve_path_list(assets, flags));
        self
    }

    /// Arguments after the global options, without any shell quoting.
    pub fn args(&self) -> Vec<&str> {
        std::iter::once(self.verb.as_str())
            .chain(self.flags.iter().map(String::as_str))
            .chain(self.paths.iter().map(String::as_str))
            .collect()
    }
}

impl std::fmt::Display for P4Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb)?;
        for flag in &self.flags {
            write!(f, " {flag}")?;
        }
        for path in &self.paths {
            write!(f, " \"{path}\"")?;
        }
        Ok(())
    }
}

/// Result of running one [`P4Command`].
#[derive(Debug)]
pub enum CommandOutcome {
    /// Completed; carries stdout.
    Ok(String),
    /// The server has this operation disabled by configuration.
    RejectedByServer(String),
    Failed(P4Error),
}

/// Executes backend commands one at a time.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &P4Command) -> CommandOutcome;
}

// ---------------------------------------------------------------------------
// Rejection matching
// ---------------------------------------------------------------------------

/// Recognises the server's "move is disabled" error.
#[derive(Debug, Clone, Default)]
pub struct RejectionMatcher {
    codes: Vec<u32>,
    patterns: Vec<String>,
}

impl RejectionMatcher {
    pub fn new(config: &MoveConfig) -> Self {
        Self {
            codes: config.rejected_codes.clone(),
            patterns: config
                .rejected_patterns
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn matches(&self, output: &str) -> bool {
        if parse_error_codes(output)
            .iter()
            .any(|code| self.codes.contains(code))
        {
            return true;
        }
        let lowered = output.to_lowercase();
        self.patterns.iter().any(|p| lowered.contains(p.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// [`CommandRunner`] that shells out to the `p4` binary.
#[derive(Debug, Clone)]
pub struct P4Client {
    config: P4Config,
    rejection: RejectionMatcher,
}

impl P4Client {
    pub fn new(config: P4Config, rejection: RejectionMatcher) -> Self {
        debug!(port = %config.port, user = %config.user, client = %config.client, "created P4Client");
        Self { config, rejection }
    }

    pub fn port(&self) -> &str {
        &self.config.port
    }

    /// Global options placed before the command verb.
    fn global_args(&self) -> Vec<String> {
        let mut args = vec!["-ztag".to_string(), "-e".to_string()];
        let options = [
            ("-p", Some(&self.config.port)),
            ("-u", Some(&self.config.user)),
            ("-c", Some(&self.config.client)),
            ("-P", self.config.password.as_ref()),
            ("-C", self.config.charset.as_ref()),
        ];
        for (flag, value) in options {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                args.push(flag.to_string());
                args.push(value.clone());
            }
        }
        args
    }

    async fn run_p4(&self, command: &P4Command) -> CommandOutcome {
        let mut cmd = Command::new(&self.config.binary);
        cmd.args(self.global_args())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = %command, "running p4 command");
        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return CommandOutcome::Failed(P4Error::BinaryNotFound(self.config.binary.clone()))
            }
            Err(e) => return CommandOutcome::Failed(P4Error::IoError(e)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        // `-e` error dictionaries usually land on stderr, but some commands
        // report them inline with their tagged output.
        let diagnostics = format!("{stderr}\n{stdout}");

        if self.rejection.matches(&diagnostics) {
            warn!(cmd = %command, "command rejected by server configuration");
            return CommandOutcome::RejectedByServer(stderr.trim().to_string());
        }

        let exit_code = output.status.code().unwrap_or(-1);
        let failed = match parse_error_severity(&diagnostics) {
            Some(severity) => severity >= E_FAILED,
            None => !output.status.success(),
        };

        if !failed {
            if !stderr.trim().is_empty() {
                debug!(cmd = %command, stderr = %stderr.trim(), "p4 reported warnings");
            }
            return CommandOutcome::Ok(stdout);
        }

        warn!(cmd = %command, exit_code, stderr = %stderr.trim(), "p4 command failed");
        let message = stderr.trim().to_string();
        let error = if exit_code == 0 {
            let severity = parse_error_severity(&diagnostics).unwrap_or(E_FAILED);
            P4Error::Reported {
                severity: severity_name(severity).to_string(),
                message,
            }
        } else {
            P4Error::CommandFailed {
                exit_code,
                stderr: message,
            }
        };
        CommandOutcome::Failed(error)
    }
}

#[async_trait]
impl CommandRunner for P4Client {
    #[instrument(skip(self, command), fields(port = %self.config.port, verb = %command.verb))]
    async fn run(&self, command: &P4Command) -> CommandOutcome {
        self.run_p4(command).await
    }
}
