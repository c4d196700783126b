//! Derives a file's [`FileState`] from raw `fstat` action and revision fields.

use crate::models::{FileState, StateFlag};

/// Classify a file from its opened action, head action, have revision and
/// head revision, exactly as reported by `p4 fstat`.
///
/// Pure and total: unknown action strings contribute no flags.
pub fn classify(action: &str, head_action: &str, have_rev: &str, head_rev: &str) -> FileState {
    let mut state = match action {
        "add" | "branch" => FileState::of(&[StateFlag::AddedLocal]),
        "move/add" => FileState::of(&[StateFlag::AddedLocal, StateFlag::MovedLocal]),
        "edit" => FileState::of(&[StateFlag::CheckedOutLocal]),
        "delete" => FileState::of(&[StateFlag::DeletedLocal]),
        "move/delete" => FileState::of(&[StateFlag::DeletedLocal, StateFlag::MovedLocal]),
        _ => FileState::NONE,
    };

    if !head_rev.is_empty() {
        if have_rev != head_rev {
            state.insert(StateFlag::OutOfSync);
            match head_action {
                "add" => state.insert(StateFlag::AddedRemote),
                "move/add" => {
                    state.insert(StateFlag::AddedRemote);
                    state.insert(StateFlag::MovedRemote);
                }
                // Deleted in the depot and never synced here: nothing to catch up on.
                "delete" if have_rev.is_empty() => state.remove(StateFlag::OutOfSync),
                "delete" => state.insert(StateFlag::DeletedRemote),
                "move/delete" => {
                    state.insert(StateFlag::DeletedRemote);
                    state.insert(StateFlag::MovedRemote);
                }
                _ => {}
            }
        } else {
            state.insert(StateFlag::Synced);
        }
    } else if !have_rev.is_empty() {
        state.insert(StateFlag::Synced);
    }

    state
}
