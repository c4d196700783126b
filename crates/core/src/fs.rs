//! Local filesystem side effects of a move.
//!
//! The move engine only sees the [`FileSystem`] trait, so tests can record
//! the order of filesystem calls relative to backend commands.

use std::io;
use std::path::Path;

use tracing::debug;

pub trait FileSystem: Send + Sync {
    fn path_exists(&self, path: &str) -> bool;

    fn is_directory(&self, path: &str) -> bool;

    fn move_file(&self, src: &str, dest: &str) -> io::Result<()>;

    fn delete_recursive(&self, path: &str) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn path_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }

    fn is_directory(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn move_file(&self, src: &str, dest: &str) -> io::Result<()> {
        let (src, dest) = (Path::new(src), Path::new(dest));
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match std::fs::rename(src, dest) {
            Ok(()) => {
                debug!(src = %src.display(), dest = %dest.display(), "renamed");
                Ok(())
            }
            // Cross-device renames fail; files can still be copied over.
            Err(e) if src.is_file() => {
                debug!(error = %e, src = %src.display(), "rename failed, copying instead");
                std::fs::copy(src, dest)?;
                std::fs::remove_file(src)
            }
            Err(e) => Err(e),
        }
    }

    fn delete_recursive(&self, path: &str) -> io::Result<()> {
        debug!(path, "removing directory tree");
        std::fs::remove_dir_all(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(path: &Path) -> String {
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_move_file_creates_destination_parent() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("old.txt");
        std::fs::write(&src, "content").unwrap();
        let dest = dir.path().join("nested").join("new.txt");

        let fs = LocalFileSystem;
        fs.move_file(&s(&src), &s(&dest)).unwrap();

        assert!(!fs.path_exists(&s(&src)));
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "content");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem;
        let result = fs.move_file(
            &s(&dir.path().join("missing.txt")),
            &s(&dir.path().join("new.txt")),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let husk = dir.path().join("husk");
        std::fs::create_dir_all(husk.join("inner")).unwrap();

        let fs = LocalFileSystem;
        assert!(fs.is_directory(&s(&husk)));
        fs.delete_recursive(&s(&husk)).unwrap();
        assert!(!fs.path_exists(&s(&husk)));
    }
}
