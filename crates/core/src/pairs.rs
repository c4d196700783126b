//! Splitting a flat asset list into (source, destination) pairs.

use crate::errors::MoveError;
use crate::models::VersionedAsset;

/// One source/destination pair borrowed from a request's asset list.
#[derive(Debug, Clone, Copy)]
pub struct AssetPair<'a> {
    both: &'a [VersionedAsset],
}

impl<'a> AssetPair<'a> {
    pub fn source(&self) -> &'a VersionedAsset {
        &self.both[0]
    }

    pub fn destination(&self) -> &'a VersionedAsset {
        &self.both[1]
    }

    /// Source then destination, for commands that take both.
    pub fn as_slice(&self) -> &'a [VersionedAsset] {
        self.both
    }

    pub fn source_slice(&self) -> &'a [VersionedAsset] {
        &self.both[..1]
    }

    pub fn destination_slice(&self) -> &'a [VersionedAsset] {
        &self.both[1..]
    }
}

pub fn validate_even(assets: &[VersionedAsset]) -> Result<(), MoveError> {
    if assets.len() % 2 != 0 {
        return Err(MoveError::UnevenAssetCount(assets.len()));
    }
    Ok(())
}

/// Element `2i` is the source and `2i + 1` the destination of pair `i`.
pub fn asset_pairs(assets: &[VersionedAsset]) -> Result<Vec<AssetPair<'_>>, MoveError> {
    validate_even(assets)?;
    Ok(assets
        .chunks_exact(2)
        .map(|both| AssetPair { both })
        .collect())
}

/// Stable partition: both halves keep the input's relative order.
pub fn partition<T, F>(items: impl IntoIterator<Item = T>, predicate: F) -> (Vec<T>, Vec<T>)
where
    F: Fn(&T) -> bool,
{
    items.into_iter().partition(|item| predicate(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FileState, StateFlag};

    fn assets(paths: &[&str]) -> Vec<VersionedAsset> {
        paths.iter().map(|p| VersionedAsset::file(*p)).collect()
    }

    #[test]
    fn test_validate_even() {
        assert!(validate_even(&[]).is_ok());
        assert!(validate_even(&assets(&["/a", "/b"])).is_ok());
        assert_eq!(
            validate_even(&assets(&["/a", "/b", "/c"])),
            Err(MoveError::UnevenAssetCount(3))
        );
    }

    #[test]
    fn test_asset_pairs_follow_list_positions() {
        let list = assets(&["/s1", "/d1", "/s2", "/d2"]);
        let pairs = asset_pairs(&list).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].source().path, "/s1");
        assert_eq!(pairs[0].destination().path, "/d1");
        assert_eq!(pairs[1].source().path, "/s2");
        assert_eq!(pairs[1].destination_slice()[0].path, "/d2");
        assert_eq!(pairs[1].as_slice().len(), 2);
    }

    #[test]
    fn test_asset_pairs_rejects_odd_list() {
        let list = assets(&["/s1", "/d1", "/s2"]);
        assert!(matches!(
            asset_pairs(&list),
            Err(MoveError::UnevenAssetCount(3))
        ));
    }

    #[test]
    fn test_partition_is_stable() {
        let mut list = assets(&["/s1", "/d1", "/s2", "/d2", "/s3", "/d3"]);
        list[0].state = FileState::of(&[StateFlag::CheckedOutLocal]);
        list[4].state = FileState::of(&[StateFlag::AddedLocal]);

        let pairs = asset_pairs(&list).unwrap();
        let (editable, needs_edit) = partition(pairs, |pair| pair.source().state.is_editable());

        let editable: Vec<&str> = editable.iter().map(|p| p.source().path.as_str()).collect();
        let needs_edit: Vec<&str> = needs_edit.iter().map(|p| p.source().path.as_str()).collect();
        assert_eq!(editable, vec!["/s1", "/s3"]);
        assert_eq!(needs_edit, vec!["/s2"]);
    }

    #[test]
    fn test_partition_plain_values() {
        let (even, odd) = partition(vec![1, 2, 3, 4, 5, 6], |n| n % 2 == 0);
        assert_eq!(even, vec![2, 4, 6]);
        assert_eq!(odd, vec![1, 3, 5]);
    }
}
