//! Domain model types used throughout p4bridge.
//!
//! These types bridge the state classifier, the move engine, and the JSON
//! response handed back to the version-control client.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// File state
// ---------------------------------------------------------------------------

/// A single synchronization flag. A file's [`FileState`] is a set of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StateFlag {
    AddedLocal,
    CheckedOutLocal,
    LockedLocal,
    DeletedLocal,
    MovedLocal,
    OutOfSync,
    AddedRemote,
    MovedRemote,
    DeletedRemote,
    Synced,
}

impl StateFlag {
    pub const ALL: [StateFlag; 10] = [
        StateFlag::AddedLocal,
        StateFlag::CheckedOutLocal,
        StateFlag::LockedLocal,
        StateFlag::DeletedLocal,
        StateFlag::MovedLocal,
        StateFlag::OutOfSync,
        StateFlag::AddedRemote,
        StateFlag::MovedRemote,
        StateFlag::DeletedRemote,
        StateFlag::Synced,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl std::fmt::Display for StateFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddedLocal => write!(f, "added_local"),
            Self::CheckedOutLocal => write!(f, "checked_out_local"),
            Self::LockedLocal => write!(f, "locked_local"),
            Self::DeletedLocal => write!(f, "deleted_local"),
            Self::MovedLocal => write!(f, "moved_local"),
            Self::OutOfSync => write!(f, "out_of_sync"),
            Self::AddedRemote => write!(f, "added_remote"),
            Self::MovedRemote => write!(f, "moved_remote"),
            Self::DeletedRemote => write!(f, "deleted_remote"),
            Self::Synced => write!(f, "synced"),
        }
    }
}

/// Set of [`StateFlag`]s describing how a file relates to the depot.
///
/// The empty set is the `None` state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<StateFlag>", from = "Vec<StateFlag>")]
pub struct FileState(u16);

impl FileState {
    pub const NONE: FileState = FileState(0);

    pub fn of(flags: &[StateFlag]) -> Self {
        flags.iter().fold(Self::NONE, |state, flag| state.with(*flag))
    }

    pub fn with(mut self, flag: StateFlag) -> Self {
        self.insert(flag);
        self
    }

    pub fn insert(&mut self, flag: StateFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: StateFlag) {
        self.0 &= !flag.bit();
    }

    pub fn contains(&self, flag: StateFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// True if any of `flags` is set.
    pub fn contains_any(&self, flags: &[StateFlag]) -> bool {
        flags.iter().any(|flag| self.contains(*flag))
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub fn flags(&self) -> impl Iterator<Item = StateFlag> + '_ {
        StateFlag::ALL.into_iter().filter(|flag| self.contains(*flag))
    }

    /// A file can be renamed without opening it for edit first.
    pub fn is_editable(&self) -> bool {
        self.contains_any(&[
            StateFlag::CheckedOutLocal,
            StateFlag::AddedLocal,
            StateFlag::LockedLocal,
        ])
    }
}

impl From<Vec<StateFlag>> for FileState {
    fn from(flags: Vec<StateFlag>) -> Self {
        Self::of(&flags)
    }
}

impl From<FileState> for Vec<StateFlag> {
    fn from(state: FileState) -> Self {
        state.flags().collect()
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        let names: Vec<String> = self.flags().map(|flag| flag.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

// ---------------------------------------------------------------------------
// Versioned asset
// ---------------------------------------------------------------------------

/// One file or folder taking part in a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionedAsset {
    /// Local (unescaped) path.
    pub path: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub state: FileState,
    /// Other half of a pending move, as reported by `fstat` (`movedFile`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moved_path: Option<String>,
}

impl VersionedAsset {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_folder: false,
            state: FileState::NONE,
            moved_path: None,
        }
    }

    pub fn folder(path: impl Into<String>) -> Self {
        Self {
            is_folder: true,
            ..Self::file(path)
        }
    }

    pub fn with_state(mut self, state: FileState) -> Self {
        self.state = state;
        self
    }
}

// ---------------------------------------------------------------------------
// Request status
// ---------------------------------------------------------------------------

/// Severity of a message accumulated while handling a request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

/// Messages accumulated over one request, in the order they were raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestStatus {
    pub messages: Vec<StatusMessage>,
}

impl RequestStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(Severity::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(Severity::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Severity::Error, text);
    }

    fn push(&mut self, severity: Severity, text: impl Into<String>) {
        self.messages.push(StatusMessage {
            severity,
            text: text.into(),
        });
    }

    /// Once true, no further pairs are processed for the request.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages.iter().filter(|m| m.severity == severity).count()
    }
}

// ---------------------------------------------------------------------------
// Move request / response
// ---------------------------------------------------------------------------

/// A batch move request: `assets` alternates source, destination.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveRequest {
    pub assets: Vec<VersionedAsset>,
    /// Rename on the server only, leaving local files where they are.
    #[serde(default)]
    pub no_local_file_move: bool,
}

/// What goes back to the client: the status, then one destination per
/// processed pair with refreshed state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoveResponse {
    pub status: RequestStatus,
    pub assets: Vec<VersionedAsset>,
}
