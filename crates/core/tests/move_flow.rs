//! End-to-end move requests against a real temporary directory.
//!
//! The Perforce server is played by [`DiskRunner`], which answers `fstat`
//! from a fixed table and performs `move` on disk the way `p4 move` does
//! for a folder: files are moved, the emptied source folder stays behind.
//! `move -k` leaves the disk alone.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use p4bridge_core::errors::MoveError;
use p4bridge_core::models::{MoveRequest, Severity, StateFlag, VersionedAsset};
use p4bridge_core::config::{MoveConfig, P4Config};
use p4bridge_core::p4::{CommandOutcome, CommandRunner, P4Client, P4Command, RejectionMatcher};
use p4bridge_core::{LocalFileSystem, MoveCommand, MoveStrategy};

// ===========================================================================
// Helpers
// ===========================================================================

struct DiskRunner {
    commands: Mutex<Vec<String>>,
    /// client path -> tagged fstat fields
    depot: HashMap<String, Vec<(&'static str, &'static str)>>,
    reject_move: bool,
}

impl DiskRunner {
    fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            depot: HashMap::new(),
            reject_move: false,
        }
    }

    fn issued(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn move_on_disk(src: &str, dest: &str) {
        match (src.strip_suffix("..."), dest.strip_suffix("...")) {
            (Some(src_dir), Some(dest_dir)) => {
                std::fs::create_dir_all(dest_dir).unwrap();
                for entry in std::fs::read_dir(src_dir).unwrap() {
                    let entry = entry.unwrap();
                    std::fs::rename(entry.path(), Path::new(dest_dir).join(entry.file_name()))
                        .unwrap();
                }
            }
            _ => std::fs::rename(src, dest).unwrap(),
        }
    }
}

#[async_trait]
impl CommandRunner for DiskRunner {
    async fn run(&self, command: &P4Command) -> CommandOutcome {
        self.commands.lock().unwrap().push(command.to_string());
        match command.verb.as_str() {
            "move" if self.reject_move => {
                CommandOutcome::RejectedByServer("The move command is disabled.".into())
            }
            "move" => {
                if !command.flags.iter().any(|f| f == "-k") {
                    Self::move_on_disk(&command.paths[0], &command.paths[1]);
                }
                CommandOutcome::Ok(String::new())
            }
            "fstat" => {
                let mut out = String::new();
                for path in &command.paths {
                    if let Some(fields) = self.depot.get(path) {
                        out.push_str(&format!("... clientFile {path}\n"));
                        for (key, value) in fields {
                            out.push_str(&format!("... {key} {value}\n"));
                        }
                        out.push('\n');
                    }
                }
                CommandOutcome::Ok(out)
            }
            _ => CommandOutcome::Ok(String::new()),
        }
    }
}

fn path_str(dir: &TempDir, rel: &str) -> String {
    dir.path().join(rel).to_string_lossy().to_string()
}

fn write_file(dir: &TempDir, rel: &str, content: &str) -> String {
    let path = dir.path().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

// ===========================================================================
// Tests
// ===========================================================================

#[tokio::test]
async fn test_folder_rename_cleans_up_husk() {
    let dir = TempDir::new().unwrap();
    write_file(&dir, "Assets/Old/a.txt", "a");
    write_file(&dir, "Assets/Old/b.txt", "b");
    let src = format!("{}/", path_str(&dir, "Assets/Old"));
    let dest = format!("{}/", path_str(&dir, "Assets/New"));

    let mut cmd = MoveCommand::new(DiskRunner::new(), LocalFileSystem);
    let response = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::folder(&src), VersionedAsset::folder(&dest)],
            no_local_file_move: false,
        })
        .await
        .unwrap();

    assert!(!response.status.has_errors());
    assert!(!dir.path().join("Assets/Old").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Assets/New/a.txt")).unwrap(),
        "a"
    );
    assert!(dir.path().join("Assets/New/b.txt").exists());
    assert_eq!(response.assets.len(), 1);
    assert_eq!(response.assets[0].path, dest);
}

#[tokio::test]
async fn test_unversioned_empty_folder_is_moved_locally() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("Empty")).unwrap();
    let src = path_str(&dir, "Empty");
    let dest = path_str(&dir, "Renamed");

    let mut cmd = MoveCommand::new(DiskRunner::new(), LocalFileSystem);
    let response = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::folder(&src), VersionedAsset::folder(&dest)],
            no_local_file_move: true,
        })
        .await
        .unwrap();

    // `-k` keeps the server off the disk; reconciliation does the move.
    assert_eq!(
        cmd.runner().issued()[1],
        format!("move -k \"{src}...\" \"{dest}...\"")
    );
    assert!(!response.status.has_errors());
    assert!(dir.path().join("Renamed").is_dir());
    assert!(!dir.path().join("Empty").exists());
}

#[tokio::test]
async fn test_fallback_preserves_checked_out_content() {
    let dir = TempDir::new().unwrap();
    let src = write_file(&dir, "Assets/script.cs", "// local edits");
    let dest = path_str(&dir, "Assets/Scripts/script.cs");

    let mut runner = DiskRunner::new();
    runner.reject_move = true;
    runner.depot.insert(
        src.clone(),
        vec![
            ("action", "edit"),
            ("headAction", "edit"),
            ("haveRev", "2"),
            ("headRev", "2"),
        ],
    );
    let mut cmd = MoveCommand::new(runner, LocalFileSystem);

    let response = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::file(&src), VersionedAsset::file(&dest)],
            no_local_file_move: false,
        })
        .await
        .unwrap();

    assert_eq!(cmd.strategy(), MoveStrategy::IntegrateAddDelete);
    let issued = cmd.runner().issued();
    let integrate_at = issued
        .iter()
        .position(|c| c.starts_with("integrate -Di"))
        .expect("integrate issued");
    assert_eq!(issued[integrate_at + 1], format!("revert \"{src}\""));
    assert_eq!(issued[integrate_at + 2], format!("delete \"{src}\""));
    assert!(!issued.iter().any(|c| c.starts_with("edit")));

    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "// local edits");
    assert!(!Path::new(&src).exists());
    assert_eq!(response.status.count(Severity::Error), 0);
    assert_eq!(
        response.status.messages[0].text,
        format!("{src} checked out locally.")
    );
}

#[tokio::test]
async fn test_destination_state_is_refreshed() {
    let dir = TempDir::new().unwrap();
    let src = write_file(&dir, "a.txt", "a");
    let dest = path_str(&dir, "b.txt");

    let mut runner = DiskRunner::new();
    runner.depot.insert(
        dest.clone(),
        vec![("action", "move/add"), ("movedFile", "//depot/a.txt")],
    );
    let mut cmd = MoveCommand::new(runner, LocalFileSystem);

    let response = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::file(&src), VersionedAsset::file(&dest)],
            no_local_file_move: false,
        })
        .await
        .unwrap();

    let target = &response.assets[0];
    assert!(target.state.contains(StateFlag::AddedLocal));
    assert!(target.state.contains(StateFlag::MovedLocal));
    assert_eq!(target.moved_path.as_deref(), Some("//depot/a.txt"));
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "a");
}

#[tokio::test]
async fn test_uneven_request_touches_nothing() {
    let dir = TempDir::new().unwrap();
    let src = write_file(&dir, "a.txt", "a");

    let mut cmd = MoveCommand::new(DiskRunner::new(), LocalFileSystem);
    let result = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::file(&src)],
            no_local_file_move: false,
        })
        .await;

    assert_eq!(result.unwrap_err(), MoveError::UnevenAssetCount(1));
    assert!(cmd.runner().issued().is_empty());
    assert!(Path::new(&src).exists());
}

/// A real `P4Client` against a shell stand-in for `p4` that answers every
/// command about an unversioned file with warnings, as the server does.
#[cfg(unix)]
#[tokio::test]
async fn test_unversioned_file_is_moved_despite_server_warnings() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let src = write_file(&dir, "loose.txt", "loose");
    let dest = path_str(&dir, "moved.txt");

    let stub = write_file(
        &dir,
        "bin/p4",
        r#"#!/bin/sh
shift 2
warn() { printf '... code0 554768795\n... severity 2\n... fmt0 %s\n' "$1" >&2; }
case "$1" in
  fstat) warn "no such file(s)." ;;
  edit) warn "file(s) not on client." ;;
  move) warn "file(s) not opened for edit." ;;
esac
exit 0
"#,
    );
    std::fs::set_permissions(&stub, std::fs::Permissions::from_mode(0o755)).unwrap();

    let config = P4Config {
        binary: stub,
        ..P4Config::default()
    };
    let client = P4Client::new(config, RejectionMatcher::new(&MoveConfig::default()));
    let mut cmd = MoveCommand::new(client, LocalFileSystem);

    let response = cmd
        .run(MoveRequest {
            assets: vec![VersionedAsset::file(&src), VersionedAsset::file(&dest)],
            no_local_file_move: false,
        })
        .await
        .unwrap();

    assert!(!response.status.has_errors(), "{:?}", response.status);
    assert_eq!(cmd.strategy(), MoveStrategy::Direct);
    assert!(!Path::new(&src).exists());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "loose");
    assert_eq!(response.assets.len(), 1);
    assert!(response.assets[0].state.is_none());
}
