//! Batch move/rename of versioned assets.
//!
//! [`MoveCommand`] turns a list of (source, destination) pairs into `p4`
//! commands using one of two strategies:
//!
//! 1. **Direct**: open non-editable sources with one batched `edit`, then
//!    `move` each pair.
//! 2. **Integrate/add/delete**: used once the server has rejected `move`.
//!    Each pair is handled according to whether its source is newly added,
//!    checked out, or not opened.
//!
//! After either strategy the local filesystem is reconciled: destinations
//! the server did not create are moved into place and empty source folders
//! are removed.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::MoveError;
use crate::fs::FileSystem;
use crate::models::{MoveRequest, MoveResponse, RequestStatus, StateFlag, VersionedAsset};
use crate::p4::client::{CommandOutcome, CommandRunner, P4Command};
use crate::p4::paths::{resolve_paths, PathFlags};
use crate::p4::status::refresh_states;
use crate::pairs::{asset_pairs, partition, validate_even, AssetPair};

// ---------------------------------------------------------------------------
// Strategy state
// ---------------------------------------------------------------------------

/// Which strategy new requests start with.
///
/// Moves from `Direct` to `IntegrateAddDelete` at most once, when the
/// server rejects `p4 move`, and never back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    #[default]
    Direct,
    IntegrateAddDelete,
}

impl std::fmt::Display for MoveStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::IntegrateAddDelete => write!(f, "integrate_add_delete"),
        }
    }
}

/// How the direct strategy ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectOutcome {
    Completed,
    /// The server has `move` disabled; nothing was recorded as an error.
    Rejected,
    /// A hard error is recorded in the request status.
    Failed,
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// Handles move requests against one server. Reuse an instance across
/// requests so a rejected `move` is not retried.
pub struct MoveCommand<R, F> {
    runner: R,
    fs: F,
    strategy: MoveStrategy,
}

impl<R: CommandRunner, F: FileSystem> MoveCommand<R, F> {
    pub fn new(runner: R, fs: F) -> Self {
        Self::with_strategy(runner, fs, MoveStrategy::Direct)
    }

    pub fn with_strategy(runner: R, fs: F, strategy: MoveStrategy) -> Self {
        Self {
            runner,
            fs,
            strategy,
        }
    }

    pub fn strategy(&self) -> MoveStrategy {
        self.strategy
    }

    pub fn move_disabled_on_server(&self) -> bool {
        self.strategy == MoveStrategy::IntegrateAddDelete
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Handle one move request.
    ///
    /// An odd number of assets rejects the request before any command runs.
    /// Everything else, backend failures included, is reported through the
    /// response status alongside the destinations processed so far.
    pub async fn run(&mut self, request: MoveRequest) -> Result<MoveResponse, MoveError> {
        let MoveRequest {
            mut assets,
            no_local_file_move,
        } = request;

        if assets.is_empty() {
            return Ok(MoveResponse::default());
        }
        validate_even(&assets)?;

        info!(
            pairs = assets.len() / 2,
            strategy = %self.strategy,
            no_local_file_move,
            "handling move request"
        );

        let mut status = RequestStatus::new();
        if !refresh_states(&self.runner, &mut assets, &mut status).await {
            return Ok(MoveResponse {
                status,
                assets: Vec::new(),
            });
        }

        match self.strategy {
            MoveStrategy::Direct => {
                let outcome = {
                    let pairs = asset_pairs(&assets)?;
                    self.move_using_move_command(&pairs, no_local_file_move, &mut status)
                        .await
                };
                if outcome == DirectOutcome::Rejected {
                    self.strategy = MoveStrategy::IntegrateAddDelete;
                    info!("move disabled on server, switching to integrate/add/delete");

                    // Earlier commands (the batched edit) may have changed state.
                    if refresh_states(&self.runner, &mut assets, &mut status).await {
                        let pairs = asset_pairs(&assets)?;
                        self.move_using_integrate_add_delete(&pairs, &mut status)
                            .await;
                    }
                }
            }
            MoveStrategy::IntegrateAddDelete => {
                let pairs = asset_pairs(&assets)?;
                self.move_using_integrate_add_delete(&pairs, &mut status)
                    .await;
            }
        }

        let mut targets = self.reconcile_filesystem(&asset_pairs(&assets)?, &mut status);

        if !targets.is_empty() {
            refresh_states(&self.runner, &mut targets, &mut status).await;
        }

        Ok(MoveResponse {
            status,
            assets: targets,
        })
    }

    // -----------------------------------------------------------------------
    // Direct strategy
    // -----------------------------------------------------------------------

    async fn move_using_move_command(
        &self,
        pairs: &[AssetPair<'_>],
        no_local_file_move: bool,
        status: &mut RequestStatus,
    ) -> DirectOutcome {
        // Everything is opened for edit before the first rename, so a failure
        // part-way leaves fewer half-moved pairs behind.
        let (editable, needs_edit) =
            partition(pairs.iter().copied(), |pair| pair.source().state.is_editable());
        for pair in &editable {
            debug!(path = %pair.source().path, "already editable source");
        }

        if !needs_edit.is_empty() {
            let edit = needs_edit.iter().fold(P4Command::new("edit"), |cmd, pair| {
                cmd.paths(pair.source_slice(), PathFlags::WILD_RECURSIVE)
            });
            if self.run_command(&edit, status).await.is_none() {
                return DirectOutcome::Failed;
            }
        }

        for pair in pairs {
            let command = P4Command::new("move")
                .flag_if(no_local_file_move, "-k")
                .paths(pair.as_slice(), PathFlags::WILD_RECURSIVE);

            match self.runner.run(&command).await {
                CommandOutcome::Ok(_) => {
                    debug!(cmd = %command, "moved");
                }
                CommandOutcome::RejectedByServer(message) => {
                    warn!(cmd = %command, %message, "move rejected by server");
                    return DirectOutcome::Rejected;
                }
                CommandOutcome::Failed(e) => {
                    status.error(e.to_string());
                    return DirectOutcome::Failed;
                }
            }
        }

        DirectOutcome::Completed
    }

    // -----------------------------------------------------------------------
    // Integrate/add/delete strategy
    // -----------------------------------------------------------------------

    async fn move_using_integrate_add_delete(
        &self,
        pairs: &[AssetPair<'_>],
        status: &mut RequestStatus,
    ) {
        for pair in pairs {
            if status.has_errors() {
                break;
            }

            let (src, dest) = (pair.source(), pair.destination());
            let revert_src =
                P4Command::new("revert").paths(pair.source_slice(), PathFlags::WILD_RECURSIVE);
            let delete_src =
                P4Command::new("delete").paths(pair.source_slice(), PathFlags::WILD_RECURSIVE);
            let integrate = P4Command::new("integrate")
                .flag("-Di")
                .paths(pair.as_slice(), PathFlags::WILD_RECURSIVE);

            debug!(
                paths = %resolve_paths(pair.as_slice(), PathFlags::WILD_RECURSIVE, " ", ""),
                state = %src.state,
                "moving without p4 move"
            );

            if src.state.contains(StateFlag::AddedLocal) {
                // Nothing on the server to integrate from: move on disk, then
                // swap which path is opened for add.
                status.info(format!("{} added locally.", src.path));

                if self.move_on_disk(src, dest, status) {
                    let add_dest = P4Command::new("add")
                        .paths(pair.destination_slice(), PathFlags::WILD_RECURSIVE);
                    if self.run_command(&add_dest, status).await.is_none() {
                        break;
                    }
                    if self.run_command(&revert_src, status).await.is_none() {
                        break;
                    }
                }
            } else if src.state.contains(StateFlag::CheckedOutLocal) {
                // Integrate reads the working file, so it must run before the
                // local move or the edits are lost.
                status.info(format!("{} checked out locally.", src.path));

                if self.run_command(&integrate, status).await.is_none() {
                    break;
                }
                if self.move_on_disk(src, dest, status) {
                    if self.run_command(&revert_src, status).await.is_none() {
                        break;
                    }
                    if self.run_command(&delete_src, status).await.is_none() {
                        break;
                    }
                }
            } else {
                status.info(format!("{} not opened locally.", src.path));

                if self.run_command(&integrate, status).await.is_none() {
                    break;
                }
                if self.run_command(&delete_src, status).await.is_none() {
                    break;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Filesystem reconciliation
    // -----------------------------------------------------------------------

    /// Finish each pair on disk and collect its destination.
    ///
    /// Stops at the first pair once the request has errors. Nested moves
    /// (a pair inside a folder moved by the same request) are not handled.
    fn reconcile_filesystem(
        &self,
        pairs: &[AssetPair<'_>],
        status: &mut RequestStatus,
    ) -> Vec<VersionedAsset> {
        let mut targets = Vec::new();

        for pair in pairs {
            if status.has_errors() {
                break;
            }
            let (src, dest) = (pair.source(), pair.destination());
            targets.push(dest.clone());

            // Empty folders and unversioned files are not moved by the server.
            if !self.fs.path_exists(&dest.path) {
                self.move_on_disk(src, dest, status);
            }

            // p4 leaves the emptied source folder behind.
            if src.is_folder && self.fs.is_directory(&src.path) {
                if let Err(e) = self.fs.delete_recursive(&src.path) {
                    warn!(path = %src.path, error = %e, "failed to remove source folder");
                    status.warn(format!("Error deleting folder {}: {}", src.path, e));
                }
            }
        }

        targets
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Move on disk; a failure is only a warning.
    fn move_on_disk(
        &self,
        src: &VersionedAsset,
        dest: &VersionedAsset,
        status: &mut RequestStatus,
    ) -> bool {
        match self.fs.move_file(&src.path, &dest.path) {
            Ok(()) => true,
            Err(e) => {
                warn!(src = %src.path, dest = %dest.path, error = %e, "filesystem move failed");
                status.warn(format!("Error moving file {} to {}.", src.path, dest.path));
                false
            }
        }
    }

    /// Run a command that has no fallback. Any outcome but `Ok` is recorded
    /// as a request error and yields `None`.
    async fn run_command(&self, command: &P4Command, status: &mut RequestStatus) -> Option<String> {
        match self.runner.run(command).await {
            CommandOutcome::Ok(output) => Some(output),
            CommandOutcome::RejectedByServer(message) => {
                warn!(cmd = %command, %message, "command rejected by server");
                status.error(message);
                None
            }
            CommandOutcome::Failed(e) => {
                warn!(cmd = %command, error = %e, "command failed");
                status.error(e.to_string());
                None
            }
        }
    }
}
