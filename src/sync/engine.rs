//! One sync pass: authenticate, reconcile the tracker with the local
//! directory, enumerate albums, and download what the decision rules accept.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::remote::client::RemoteClient;
use crate::remote::stream::{enumerate_assets, EnumerationPlan};
use crate::remote::types::{Album, AlbumKind, AuthOutcome, RemoteAsset, ALL_PHOTOS_ALBUM};
use crate::sync::decision::{decide, Decision, SkipReason};
use crate::sync::error::{AlbumsNotFound, SyncError};
use crate::sync::local::scan_local_filenames;
use crate::sync::stats::SyncStats;
use crate::tracker::DeletionTracker;

const PROGRESS_EVERY: u64 = 50;

pub struct SyncEngine {
    config: Arc<Config>,
    client: Arc<dyn RemoteClient>,
    tracker: Arc<dyn DeletionTracker>,
    shutdown: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        config: Arc<Config>,
        client: Arc<dyn RemoteClient>,
        tracker: Arc<dyn DeletionTracker>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            client,
            tracker,
            shutdown,
        }
    }

    pub async fn run(&self) -> Result<SyncStats, SyncError> {
        self.config.ensure_sync_directory()?;

        if !self.client.is_authenticated().await {
            match self.client.authenticate().await? {
                AuthOutcome::Authenticated => {}
                AuthOutcome::SecondFactorRequired => return Err(SyncError::SecondFactorRequired),
            }
        }

        self.verify_album_filters().await?;

        let mut local_files = self.scan_local().await?;
        self.tracker.mark_missing_as_deleted(&local_files).await?;

        let plan = self.build_plan().await?;
        let mut stream =
            enumerate_assets(Arc::clone(&self.client), plan, self.shutdown.child_token());

        let mut stats = SyncStats::default();
        let mut accepted: u64 = 0;
        while let Some(item) = stream.next().await {
            if self.shutdown.is_cancelled() {
                info!("Shutdown requested, stopping sync early");
                break;
            }
            let asset = match item {
                Ok(asset) => asset,
                Err(e) => {
                    warn!("Skipping malformed asset: {e}");
                    stats.errors += 1;
                    continue;
                }
            };
            stats.total_assets += 1;

            let already_deleted = self.tracker.is_deleted(&asset.id).await?;
            match decide(&self.config, &asset, already_deleted, &local_files, accepted) {
                Decision::Skip(SkipReason::AlbumExcluded) => {
                    stats.filtered += 1;
                    debug!("Filtered by album settings: {}", asset.filename);
                }
                Decision::Skip(SkipReason::PreviouslyDeleted) => {
                    stats.deleted_skipped += 1;
                    debug!("Skipping locally deleted photo: {}", asset.filename);
                }
                Decision::Skip(SkipReason::AlreadyLocal) => {
                    stats.already_exists += 1;
                }
                Decision::Skip(SkipReason::TooLarge) => {
                    stats.skipped_too_large += 1;
                    info!(
                        "Skipping {} ({:.1} MB exceeds the {} MB limit)",
                        asset.filename,
                        asset.size_mb(),
                        self.config.max_file_size_mb
                    );
                }
                Decision::Stop => {
                    info!(
                        "Reached download limit ({}), stopping",
                        self.config.max_downloads
                    );
                    break;
                }
                Decision::Download => {
                    accepted += 1;
                    self.download(&asset, &mut stats, &mut local_files).await;
                }
            }

            if stats.total_assets % PROGRESS_EVERY == 0 {
                stats.log_progress();
            }
        }

        stats.log_summary(self.config.dry_run);
        Ok(stats)
    }

    /// Checks every configured album name against the service before any
    /// work happens. Kinds with an empty name list are not verified; they
    /// enumerate everything anyway.
    async fn verify_album_filters(&self) -> Result<(), SyncError> {
        let mut report = AlbumsNotFound::default();

        if self.config.include_personal_albums && !self.config.personal_album_names.is_empty() {
            let existing: Vec<String> = self
                .client
                .list_albums(AlbumKind::Personal)
                .await?
                .into_iter()
                .map(|a| a.name)
                .collect();
            for wanted in &self.config.personal_album_names {
                if !existing.contains(wanted) {
                    report.missing_personal.push(wanted.clone());
                }
            }
            report.existing_personal = existing;
        }

        if self.config.include_shared_albums && !self.config.shared_album_names.is_empty() {
            let existing: Vec<String> = self
                .client
                .list_albums(AlbumKind::Shared)
                .await?
                .into_iter()
                .map(|a| a.name)
                .collect();
            for wanted in &self.config.shared_album_names {
                if !existing.contains(wanted) {
                    report.missing_shared.push(wanted.clone());
                }
            }
            report.existing_shared = existing;
        }

        if report.is_empty() {
            Ok(())
        } else {
            Err(report.into())
        }
    }

    async fn scan_local(&self) -> Result<HashSet<String>, SyncError> {
        let root = self.config.sync_directory.clone();
        let names = tokio::task::spawn_blocking(move || scan_local_filenames(&root))
            .await
            .map_err(std::io::Error::other)??;
        debug!("Found {} image files locally", names.len());
        Ok(names)
    }

    async fn build_plan(&self) -> Result<EnumerationPlan, SyncError> {
        let mut albums = Vec::new();

        if self.config.include_personal_albums {
            if self.config.personal_album_names.is_empty() {
                albums.push(Album::new(ALL_PHOTOS_ALBUM, AlbumKind::Personal));
            } else {
                for name in &self.config.personal_album_names {
                    albums.push(Album::new(name.clone(), AlbumKind::Personal));
                }
            }
        }
        if self.config.include_shared_albums {
            if self.config.shared_album_names.is_empty() {
                albums.extend(self.client.list_albums(AlbumKind::Shared).await?);
            } else {
                for name in &self.config.shared_album_names {
                    albums.push(Album::new(name.clone(), AlbumKind::Shared));
                }
            }
        }

        debug!("Enumerating {} albums", albums.len());
        Ok(EnumerationPlan { albums })
    }

    async fn download(
        &self,
        asset: &RemoteAsset,
        stats: &mut SyncStats,
        local_files: &mut HashSet<String>,
    ) {
        if self.config.dry_run {
            info!("[DRY RUN] Would download: {}", asset.filename);
            stats.new_downloads += 1;
            stats.bytes_downloaded += asset.size;
            local_files.insert(asset.filename.clone());
            return;
        }

        let dest = self.config.sync_directory.join(&asset.filename);
        match self.client.download_asset(asset, &dest).await {
            Ok(bytes) => {
                stats.new_downloads += 1;
                stats.bytes_downloaded += bytes;
                local_files.insert(asset.filename.clone());
                if let Err(e) = self
                    .tracker
                    .record_download(&asset.id, &asset.filename)
                    .await
                {
                    warn!("Failed to record download of {}: {e}", asset.filename);
                }
                info!("Downloaded: {}", asset.filename);
            }
            Err(e) => {
                warn!("Failed to download {}: {e}", asset.filename);
                stats.errors += 1;
            }
        }
    }
}
