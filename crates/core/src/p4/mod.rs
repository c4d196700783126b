//! Perforce CLI wrapper for p4bridge.

pub mod client;
pub mod parser;
pub mod paths;
pub mod state;
pub mod status;

pub use client::{CommandOutcome, CommandRunner, P4Client, P4Command, RejectionMatcher};
pub use parser::*;
pub use paths::PathFlags;
pub use state::classify;
