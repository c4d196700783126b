//! Refreshing asset state from `p4 fstat`.

use std::collections::HashMap;

use tracing::{debug, warn};

use super::client::{CommandOutcome, CommandRunner, P4Command};
use super::parser::parse_ztag_fstat;
use super::paths::PathFlags;
use super::state::classify;
use crate::models::{FileState, RequestStatus, VersionedAsset};

/// Re-classify every asset from one `fstat` over the files among them.
///
/// Folders are not tracked by the server and always come back as `None`,
/// as do files the server has no record of. Returns `false` (with an error
/// recorded in `status`) when the query itself fails.
pub async fn refresh_states<R>(
    runner: &R,
    assets: &mut [VersionedAsset],
    status: &mut RequestStatus,
) -> bool
where
    R: CommandRunner + ?Sized,
{
    let command = P4Command::new("fstat").paths(assets, PathFlags::WILD_FILES_ONLY);

    let records = if command.paths.is_empty() {
        Vec::new()
    } else {
        match runner.run(&command).await {
            CommandOutcome::Ok(output) => parse_ztag_fstat(&output),
            CommandOutcome::RejectedByServer(message) => {
                warn!(%message, "fstat rejected by server");
                status.error(message);
                return false;
            }
            CommandOutcome::Failed(e) => {
                warn!(error = %e, "fstat failed");
                status.error(e.to_string());
                return false;
            }
        }
    };

    let by_client_path: HashMap<&str, _> = records
        .iter()
        .map(|record| (record.client_path.as_str(), record))
        .collect();

    for asset in assets.iter_mut() {
        let record = if asset.is_folder {
            None
        } else {
            by_client_path.get(asset.path.as_str())
        };
        match record {
            Some(r) => {
                asset.state = classify(&r.action, &r.head_action, &r.have_rev, &r.head_rev);
                asset.moved_path = r.moved_file.clone();
            }
            None => {
                asset.state = FileState::NONE;
                asset.moved_path = None;
            }
        }
        debug!(path = %asset.path, state = %asset.state, "classified");
    }
    true
}
