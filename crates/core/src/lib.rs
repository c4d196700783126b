//! p4bridge core library.
//!
//! This crate provides the pieces behind a version-control client's move
//! request against a Perforce server: configuration, file state
//! classification, path escaping, the `p4` CLI client, and the move engine
//! with its integrate/add/delete fallback.

pub mod config;
pub mod errors;
pub mod fs;
pub mod models;
pub mod move_engine;
pub mod p4;
pub mod pairs;

// Re-exports for convenience.
pub use config::BridgeConfig;
pub use fs::{FileSystem, LocalFileSystem};
pub use move_engine::{MoveCommand, MoveStrategy};
pub use p4::P4Client;
