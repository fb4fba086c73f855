use tracing::info;

/// Counters for one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub total_assets: u64,
    pub new_downloads: u64,
    pub already_exists: u64,
    pub deleted_skipped: u64,
    pub filtered: u64,
    pub skipped_too_large: u64,
    pub errors: u64,
    pub bytes_downloaded: u64,
}

impl SyncStats {
    /// Downloaded volume in megabytes, rounded to two decimals.
    pub fn mb_downloaded(&self) -> f64 {
        let mb = self.bytes_downloaded as f64 / (1024.0 * 1024.0);
        (mb * 100.0).round() / 100.0
    }

    /// Share of processed assets that did not error, in percent. An empty
    /// run counts as fully successful.
    pub fn success_rate(&self) -> f64 {
        if self.total_assets == 0 {
            return 100.0;
        }
        self.total_assets.saturating_sub(self.errors) as f64 / self.total_assets as f64 * 100.0
    }

    pub fn log_progress(&self) {
        info!(
            "Progress: {} processed, {} downloaded, {} existed, {} deleted, {} errors",
            self.total_assets,
            self.new_downloads,
            self.already_exists,
            self.deleted_skipped,
            self.errors
        );
    }

    pub fn log_summary(&self, dry_run: bool) {
        info!("── Sync Summary ──");
        info!("Total photos seen: {}", self.total_assets);
        info!("New downloads: {}", self.new_downloads);
        info!("Already existed: {}", self.already_exists);
        info!("Skipped (deleted locally): {}", self.deleted_skipped);
        info!("Skipped (album filter): {}", self.filtered);
        info!("Skipped (too large): {}", self.skipped_too_large);
        info!("Errors: {}", self.errors);
        info!("Downloaded: {:.2} MB", self.mb_downloaded());
        info!("Success rate: {:.1}%", self.success_rate());
        if dry_run {
            info!("DRY RUN MODE - No files were actually downloaded");
        }
    }
}
