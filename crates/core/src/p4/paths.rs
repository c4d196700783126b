//! Wildcard escaping and argument expansion for asset paths.
//!
//! Perforce reserves `@`, `#`, `*` and `%` in file arguments. Local paths
//! containing them must be hex-escaped before they are handed to `p4`.

use crate::models::VersionedAsset;

/// How an asset path is turned into a `p4` file argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathFlags {
    /// Escape wildcard characters.
    pub wild: bool,
    /// Folders expand to `dir...` instead of `dir*`.
    pub recursive: bool,
    /// Leave folders out entirely (only when not recursive).
    pub skip_folders: bool,
}

impl PathFlags {
    /// Escaped, folders recursive. What every move-related command uses.
    pub const WILD_RECURSIVE: PathFlags = PathFlags {
        wild: true,
        recursive: true,
        skip_folders: false,
    };

    /// Escaped, files only.
    pub const WILD_FILES_ONLY: PathFlags = PathFlags {
        wild: true,
        recursive: false,
        skip_folders: true,
    };

    fn omits_folders(&self) -> bool {
        self.skip_folders && !self.recursive
    }
}

pub fn escape_wildcards(path: &str) -> String {
    // `%` first so the escapes below are not escaped again.
    path.replace('%', "%25")
        .replace('#', "%23")
        .replace('@', "%40")
        .replace('*', "%2A")
}

pub fn unescape_wildcards(path: &str) -> String {
    // `%25` last, or a literal "%2523" would come back as "#".
    path.replace("%23", "#")
        .replace("%40", "@")
        .replace("%2A", "*")
        .replace("%25", "%")
}

/// Resolve one asset into a `p4` file argument.
pub fn resolve_path(asset: &VersionedAsset, flags: PathFlags) -> String {
    let mut path = if flags.wild {
        escape_wildcards(&asset.path)
    } else {
        asset.path.clone()
    };

    if asset.is_folder {
        path.push_str(if flags.recursive { "..." } else { "*" });
    }
    path
}

/// Resolve a run of assets into unquoted arguments, ready for an argv.
pub fn resolve_path_list(assets: &[VersionedAsset], flags: PathFlags) -> Vec<String> {
    assets
        .iter()
        .filter(|asset| !(flags.omits_folders() && asset.is_folder))
        .map(|asset| resolve_path(asset, flags))
        .collect()
}

/// Resolve a run of assets into one string of quoted arguments, each with
/// `postfix` appended inside the quotes and separated by `delimiter`.
pub fn resolve_paths(
    assets: &[VersionedAsset],
    flags: PathFlags,
    delimiter: &str,
    postfix: &str,
) -> String {
    resolve_path_list(assets, flags)
        .iter()
        .map(|path| format!("\"{path}{postfix}\""))
        .collect::<Vec<_>>()
        .join(delimiter)
}
