//! Per-asset sync decisions. The checks run in a fixed order so cheaper
//! filters win and the download cap only counts assets that passed them all.

use std::collections::HashSet;

use crate::config::Config;
use crate::remote::types::{AlbumKind, RemoteAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlbumExcluded,
    PreviouslyDeleted,
    AlreadyLocal,
    TooLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Download,
    Skip(SkipReason),
    /// The download cap is reached; enumeration should end entirely.
    Stop,
}

pub fn decide(
    config: &Config,
    asset: &RemoteAsset,
    already_deleted: bool,
    local_files: &HashSet<String>,
    accepted_so_far: u64,
) -> Decision {
    if !album_included(config, asset) {
        return Decision::Skip(SkipReason::AlbumExcluded);
    }
    if already_deleted {
        return Decision::Skip(SkipReason::PreviouslyDeleted);
    }
    if local_files.contains(&asset.filename) {
        return Decision::Skip(SkipReason::AlreadyLocal);
    }
    if config.max_file_size_mb > 0 && asset.size > config.max_file_size_mb.saturating_mul(1024 * 1024) {
        return Decision::Skip(SkipReason::TooLarge);
    }
    if config.max_downloads > 0 && accepted_so_far >= config.max_downloads {
        return Decision::Stop;
    }
    Decision::Download
}

fn album_included(config: &Config, asset: &RemoteAsset) -> bool {
    match asset.kind {
        AlbumKind::Personal => {
            config.include_personal_albums
                && (config.personal_album_names.is_empty()
                    || config.personal_album_names.contains(&asset.album))
        }
        AlbumKind::Shared => {
            config.include_shared_albums
                && (config.shared_album_names.is_empty()
                    || config.shared_album_names.contains(&asset.album))
        }
    }
}
