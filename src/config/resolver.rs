//! Resolution and validation of the runtime configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::error::ConfigError;
use crate::config::settings::SettingsSource;
use crate::credentials::{CredentialStore, NOTIFY_SERVICE, PHOTO_SERVICE};

/// File name of the deletion tracker database.
pub const DATABASE_FILE_NAME: &str = "deletion_tracker.db";

/// Verbosity from `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARNING" => Some(LogLevel::Warning),
            "ERROR" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Directive for the tracing `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Single,
    Continuous,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Single => "single",
            ExecutionMode::Continuous => "continuous",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "single" => Some(ExecutionMode::Single),
            "continuous" => Some(ExecutionMode::Continuous),
            _ => None,
        }
    }
}

/// Notification settings, assembled only when Pushover is enabled and both
/// credentials resolved.
#[derive(Clone)]
pub struct PushoverConfig {
    pub user_key: String,
    pub api_token: String,
    pub device: Option<String>,
}

impl fmt::Debug for PushoverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushoverConfig")
            .field("user_key", &"<redacted>")
            .field("api_token", &"<redacted>")
            .field("device", &self.device)
            .finish()
    }
}

/// Immutable runtime configuration, shared read-only after resolve.
#[derive(Clone)]
pub struct Config {
    // Fields are ordered for optimal memory layout: heap-allocated types
    // first, then 8-byte integers, then small enums, with booleans grouped
    // at the end.
    pub sync_directory: PathBuf,
    pub settings_path: PathBuf,
    pub icloud_username: String,
    pub icloud_password: String,
    pub pushover_user_key: Option<String>,
    pub pushover_api_token: Option<String>,
    pub pushover_device: Option<String>,
    pub personal_album_names: Vec<String>,
    pub shared_album_names: Vec<String>,
    database_parent: String,
    pub max_downloads: u64,
    pub max_file_size_mb: u64,
    pub sync_interval_minutes: u64,
    pub maintenance_interval_hours: u64,
    pub log_level: LogLevel,
    pub execution_mode: ExecutionMode,
    pub enable_pushover: bool,
    pub include_personal_albums: bool,
    pub include_shared_albums: bool,
    pub dry_run: bool,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("sync_directory", &self.sync_directory)
            .field("settings_path", &self.settings_path)
            .field("icloud_username", &self.icloud_username)
            .field("icloud_password", &"<redacted>")
            .field(
                "pushover_user_key",
                &self.pushover_user_key.as_ref().map(|_| "<redacted>"),
            )
            .field(
                "pushover_api_token",
                &self.pushover_api_token.as_ref().map(|_| "<redacted>"),
            )
            .field("pushover_device", &self.pushover_device)
            .field("personal_album_names", &self.personal_album_names)
            .field("shared_album_names", &self.shared_album_names)
            .field("database_parent", &self.database_parent)
            .field("max_downloads", &self.max_downloads)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("sync_interval_minutes", &self.sync_interval_minutes)
            .field("maintenance_interval_hours", &self.maintenance_interval_hours)
            .field("log_level", &self.log_level)
            .field("execution_mode", &self.execution_mode)
            .field("enable_pushover", &self.enable_pushover)
            .field("include_personal_albums", &self.include_personal_albums)
            .field("include_shared_albums", &self.include_shared_albums)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Discovers the settings file and resolves everything, credentials
    /// included. All validation failures are collected and reported in one
    /// aggregate error.
    pub fn resolve(store: &dyn CredentialStore) -> Result<Self, ConfigError> {
        let source = SettingsSource::discover()?;
        Self::from_source(&source, store)
    }

    pub(crate) fn from_source(
        source: &SettingsSource,
        store: &dyn CredentialStore,
    ) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();

        let sync_directory = expand_tilde(&source.get_or("SYNC_DIRECTORY", "./photos"));
        let dry_run = parse_bool(&source.get_or("DRY_RUN", "false"));

        let log_level_raw = source.get_or("LOG_LEVEL", "INFO");
        let log_level = LogLevel::from_str(&log_level_raw).unwrap_or_else(|| {
            errors.push(format!("Invalid LOG_LEVEL: {log_level_raw}"));
            LogLevel::Info
        });

        let max_downloads = parse_u64(source, "MAX_DOWNLOADS", 0, &mut errors);
        let max_file_size_mb = parse_u64(source, "MAX_FILE_SIZE_MB", 0, &mut errors);
        let sync_interval_minutes = parse_u64(source, "SYNC_INTERVAL_MINUTES", 2, &mut errors);
        let maintenance_interval_hours =
            parse_u64(source, "MAINTENANCE_INTERVAL_HOURS", 1, &mut errors);

        let enable_pushover = parse_bool(&source.get_or("ENABLE_PUSHOVER", "true"));
        let pushover_device = non_empty(source.get_or("PUSHOVER_DEVICE", ""));

        let include_personal_albums =
            parse_bool(&source.get_or("INCLUDE_PERSONAL_ALBUMS", "true"));
        let include_shared_albums = parse_bool(&source.get_or("INCLUDE_SHARED_ALBUMS", "true"));
        let personal_album_names =
            split_names(&source.get_or("PERSONAL_ALBUM_NAMES_TO_INCLUDE", ""));
        let shared_album_names = split_names(&source.get_or("SHARED_ALBUM_NAMES_TO_INCLUDE", ""));

        let execution_mode_raw = source.get_or("EXECUTION_MODE", "single");
        let execution_mode = ExecutionMode::from_str(&execution_mode_raw).unwrap_or_else(|| {
            errors.push(format!(
                "Invalid EXECUTION_MODE: {execution_mode_raw}. Must be 'single' or 'continuous'"
            ));
            ExecutionMode::Single
        });

        let database_parent = source.get_or("DATABASE_PARENT_DIRECTORY", ".data");

        // Credentials resolve exactly once, here. Both stages of the photo
        // pair are required; the notification pair only when enabled.
        let mut icloud_username = None;
        let mut icloud_password = None;
        match PHOTO_SERVICE.load(store) {
            Ok((identity, secret)) => {
                if identity.is_none() {
                    errors.push("ICLOUD_USERNAME is required (store in keyring)".to_string());
                }
                if secret.is_none() {
                    errors.push("ICLOUD_PASSWORD is required (store in keyring)".to_string());
                }
                icloud_username = identity;
                icloud_password = secret;
            }
            Err(e) => errors.push(format!("Failed to read icloud-photo-sync credentials: {e}")),
        }

        let mut pushover_user_key = None;
        let mut pushover_api_token = None;
        match NOTIFY_SERVICE.load(store) {
            Ok((identity, secret)) => {
                if enable_pushover {
                    if identity.is_none() {
                        errors.push(
                            "PUSHOVER_USER_KEY is required when ENABLE_PUSHOVER=true".to_string(),
                        );
                    }
                    if secret.is_none() {
                        errors.push(
                            "PUSHOVER_API_TOKEN is required when ENABLE_PUSHOVER=true".to_string(),
                        );
                    }
                }
                pushover_user_key = identity;
                pushover_api_token = secret;
            }
            Err(e) => {
                if enable_pushover {
                    errors.push(format!("Failed to read pushover-photo-sync credentials: {e}"));
                }
            }
        }

        if !include_personal_albums && !include_shared_albums {
            errors.push(
                "At least one of INCLUDE_PERSONAL_ALBUMS or INCLUDE_SHARED_ALBUMS must be true"
                    .to_string(),
            );
        }
        if sync_interval_minutes == 0 {
            errors.push("SYNC_INTERVAL_MINUTES must be bigger than 0 minutes".to_string());
        }
        if maintenance_interval_hours == 0 {
            errors.push("MAINTENANCE_INTERVAL_HOURS must be bigger than 0 hours".to_string());
        }
        if sync_interval_minutes > 0
            && maintenance_interval_hours > 0
            && maintenance_interval_hours.saturating_mul(60) <= sync_interval_minutes
        {
            errors.push(
                "MAINTENANCE_INTERVAL_HOURS * 60 must be bigger than SYNC_INTERVAL_MINUTES"
                    .to_string(),
            );
        }

        match prepare_database_dir(&database_parent, &sync_directory) {
            Ok(dir) => {
                if is_readonly(&dir) {
                    errors.push(format!("Database directory is not writable: {}", dir.display()));
                }
            }
            Err(e) => errors.push(format!("Cannot create database directory: {e}")),
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }
        // An absent stage above always pushed an error, so both are present
        // past this point.
        let (Some(icloud_username), Some(icloud_password)) = (icloud_username, icloud_password)
        else {
            return Err(ConfigError::Invalid(vec![
                "credential resolution incomplete".to_string(),
            ]));
        };

        debug!(settings = %source.path().display(), "configuration resolved");
        Ok(Config {
            sync_directory,
            settings_path: source.path().to_path_buf(),
            icloud_username,
            icloud_password,
            pushover_user_key,
            pushover_api_token,
            pushover_device,
            personal_album_names,
            shared_album_names,
            database_parent,
            max_downloads,
            max_file_size_mb,
            sync_interval_minutes,
            maintenance_interval_hours,
            log_level,
            execution_mode,
            enable_pushover,
            include_personal_albums,
            include_shared_albums,
            dry_run,
        })
    }

    /// Path of the deletion tracker database. The parent directory setting
    /// may carry a `%LOCALAPPDATA%` token or a leading tilde, and resolves
    /// against the sync directory when still relative. Creation is
    /// idempotent.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        let dir = prepare_database_dir(&self.database_parent, &self.sync_directory).map_err(
            |source| ConfigError::DatabaseDir {
                path: PathBuf::from(&self.database_parent),
                source,
            },
        )?;
        Ok(dir.join(DATABASE_FILE_NAME))
    }

    /// Creates the sync directory if needed.
    pub fn ensure_sync_directory(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.sync_directory)
    }

    pub fn pushover_config(&self) -> Option<PushoverConfig> {
        if !self.enable_pushover {
            return None;
        }
        let user_key = self.pushover_user_key.clone()?;
        let api_token = self.pushover_api_token.clone()?;
        Some(PushoverConfig {
            user_key,
            api_token,
            device: self.pushover_device.clone(),
        })
    }
}

fn prepare_database_dir(raw: &str, sync_directory: &Path) -> std::io::Result<PathBuf> {
    let expanded = expand_tilde(&expand_local_app_data(raw));
    let dir = if expanded.is_absolute() {
        expanded
    } else {
        sync_directory.join(expanded)
    };
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn is_readonly(dir: &Path) -> bool {
    fs::metadata(dir)
        .map(|m| m.permissions().readonly())
        .unwrap_or(false)
}

/// Expands the `%LOCALAPPDATA%` token: the real environment variable on
/// Windows, `~/.local/share` everywhere else.
fn expand_local_app_data(raw: &str) -> String {
    const TOKEN: &str = "%LOCALAPPDATA%";
    if !raw.contains(TOKEN) {
        return raw.to_string();
    }
    raw.replace(TOKEN, &local_app_data_base())
}

#[cfg(windows)]
fn local_app_data_base() -> String {
    std::env::var("LOCALAPPDATA").unwrap_or_else(|_| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("AppData")
            .join("Local")
            .to_string_lossy()
            .into_owned()
    })
}

#[cfg(not(windows))]
fn local_app_data_base() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .to_string_lossy()
        .into_owned()
}

pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

pub(crate) fn parse_bool(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

fn parse_u64(source: &SettingsSource, key: &str, default: u64, errors: &mut Vec<String>) -> u64 {
    match source.get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            errors.push(format!("Invalid {key}: {raw}"));
            default
        }),
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty(raw: String) -> Option<String> {
    if raw.trim().is_empty() {
        None
    } else {
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryStore;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("foto_pool_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn store_with_photo_creds() -> MemoryStore {
        let store = MemoryStore::new();
        PHOTO_SERVICE
            .store(&store, "user@example.com", "hunter2")
            .unwrap();
        store
    }

    fn resolve(
        sync_dir: &Path,
        overrides: &[(&str, &str)],
        store: &MemoryStore,
    ) -> Result<Config, ConfigError> {
        let sync = sync_dir.to_string_lossy().into_owned();
        let mut pairs: Vec<(&str, &str)> = vec![("SYNC_DIRECTORY", sync.as_str())];
        pairs.extend_from_slice(overrides);
        let source = SettingsSource::from_pairs(&pairs);
        Config::from_source(&source, store)
    }

    fn invalid_messages(result: Result<Config, ConfigError>) -> Vec<String> {
        match result {
            Err(ConfigError::Invalid(errors)) => errors,
            other => panic!("expected aggregate error, got {other:?}"),
        }
    }

    #[test]
    fn resolves_defaults() {
        let dir = test_dir("resolver_defaults");
        let store = store_with_photo_creds();
        let config = resolve(&dir, &[("ENABLE_PUSHOVER", "false")], &store).unwrap();

        assert_eq!(config.sync_directory, dir);
        assert_eq!(config.icloud_username, "user@example.com");
        assert_eq!(config.icloud_password, "hunter2");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.execution_mode, ExecutionMode::Single);
        assert_eq!(config.max_downloads, 0);
        assert_eq!(config.max_file_size_mb, 0);
        assert_eq!(config.sync_interval_minutes, 2);
        assert_eq!(config.maintenance_interval_hours, 1);
        assert!(config.include_personal_albums);
        assert!(config.include_shared_albums);
        assert!(config.personal_album_names.is_empty());
        assert!(config.shared_album_names.is_empty());
        assert!(!config.dry_run);
        assert!(!config.enable_pushover);
    }

    #[test]
    fn missing_photo_credentials_report_both_stages() {
        let dir = test_dir("resolver_no_creds");
        let store = MemoryStore::new();
        let errors = invalid_messages(resolve(&dir, &[("ENABLE_PUSHOVER", "false")], &store));

        assert!(errors.contains(&"ICLOUD_USERNAME is required (store in keyring)".to_string()));
        assert!(errors.contains(&"ICLOUD_PASSWORD is required (store in keyring)".to_string()));
    }

    #[test]
    fn both_album_kinds_disabled_is_invalid() {
        let dir = test_dir("resolver_no_albums");
        let store = store_with_photo_creds();
        let errors = invalid_messages(resolve(
            &dir,
            &[
                ("ENABLE_PUSHOVER", "false"),
                ("INCLUDE_PERSONAL_ALBUMS", "false"),
                ("INCLUDE_SHARED_ALBUMS", "false"),
            ],
            &store,
        ));

        assert!(errors.contains(
            &"At least one of INCLUDE_PERSONAL_ALBUMS or INCLUDE_SHARED_ALBUMS must be true"
                .to_string()
        ));
    }

    #[test]
    fn aggregate_collects_every_failure_at_once() {
        let dir = test_dir("resolver_aggregate");
        let store = MemoryStore::new();
        let errors = invalid_messages(resolve(
            &dir,
            &[
                ("ENABLE_PUSHOVER", "false"),
                ("LOG_LEVEL", "verbose"),
                ("EXECUTION_MODE", "sometimes"),
                ("SYNC_INTERVAL_MINUTES", "0"),
                ("MAINTENANCE_INTERVAL_HOURS", "0"),
            ],
            &store,
        ));

        assert!(errors.len() >= 6, "expected every failure collected: {errors:?}");
        assert!(errors.iter().any(|e| e == "Invalid LOG_LEVEL: verbose"));
        assert!(errors
            .iter()
            .any(|e| e == "Invalid EXECUTION_MODE: sometimes. Must be 'single' or 'continuous'"));
        assert!(errors
            .iter()
            .any(|e| e == "SYNC_INTERVAL_MINUTES must be bigger than 0 minutes"));
        assert!(errors
            .iter()
            .any(|e| e == "MAINTENANCE_INTERVAL_HOURS must be bigger than 0 hours"));
        assert!(errors
            .iter()
            .any(|e| e == "ICLOUD_USERNAME is required (store in keyring)"));
    }

    #[test]
    fn pushover_credentials_required_only_when_enabled() {
        let dir = test_dir("resolver_pushover_required");
        let store = store_with_photo_creds();

        let errors = invalid_messages(resolve(&dir, &[("ENABLE_PUSHOVER", "true")], &store));
        assert!(errors
            .contains(&"PUSHOVER_USER_KEY is required when ENABLE_PUSHOVER=true".to_string()));
        assert!(errors
            .contains(&"PUSHOVER_API_TOKEN is required when ENABLE_PUSHOVER=true".to_string()));

        let dir = test_dir("resolver_pushover_disabled");
        assert!(resolve(&dir, &[("ENABLE_PUSHOVER", "false")], &store).is_ok());
    }

    #[test]
    fn pushover_config_assembles_when_complete() {
        let dir = test_dir("resolver_pushover_full");
        let store = store_with_photo_creds();
        NOTIFY_SERVICE.store(&store, "ukey123", "token456").unwrap();

        let config = resolve(
            &dir,
            &[("ENABLE_PUSHOVER", "true"), ("PUSHOVER_DEVICE", "phone")],
            &store,
        )
        .unwrap();
        let pushover = config.pushover_config().unwrap();
        assert_eq!(pushover.user_key, "ukey123");
        assert_eq!(pushover.api_token, "token456");
        assert_eq!(pushover.device.as_deref(), Some("phone"));

        let dir = test_dir("resolver_pushover_off");
        let config = resolve(&dir, &[("ENABLE_PUSHOVER", "false")], &store).unwrap();
        assert!(config.pushover_config().is_none());
    }

    #[test]
    fn unparseable_integer_joins_the_aggregate() {
        let dir = test_dir("resolver_bad_int");
        let store = store_with_photo_creds();
        let errors = invalid_messages(resolve(
            &dir,
            &[("ENABLE_PUSHOVER", "false"), ("MAX_DOWNLOADS", "plenty")],
            &store,
        ));
        assert!(errors.contains(&"Invalid MAX_DOWNLOADS: plenty".to_string()));
    }

    #[test]
    fn album_lists_split_trim_and_drop_empties() {
        let dir = test_dir("resolver_album_lists");
        let store = store_with_photo_creds();
        let config = resolve(
            &dir,
            &[
                ("ENABLE_PUSHOVER", "false"),
                ("PERSONAL_ALBUM_NAMES_TO_INCLUDE", " Vacation , ,Family ,"),
            ],
            &store,
        )
        .unwrap();
        assert_eq!(config.personal_album_names, vec!["Vacation", "Family"]);
    }

    #[test]
    fn maintenance_must_outlast_sync_interval() {
        let dir = test_dir("resolver_intervals_bad");
        let store = store_with_photo_creds();
        let errors = invalid_messages(resolve(
            &dir,
            &[("ENABLE_PUSHOVER", "false"), ("SYNC_INTERVAL_MINUTES", "60")],
            &store,
        ));
        assert!(errors.contains(
            &"MAINTENANCE_INTERVAL_HOURS * 60 must be bigger than SYNC_INTERVAL_MINUTES"
                .to_string()
        ));

        let dir = test_dir("resolver_intervals_ok");
        let result = resolve(
            &dir,
            &[("ENABLE_PUSHOVER", "false"), ("SYNC_INTERVAL_MINUTES", "59")],
            &store,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn database_path_resolves_relative_to_sync_dir() {
        let dir = test_dir("resolver_db_path");
        let store = store_with_photo_creds();
        let config = resolve(&dir, &[("ENABLE_PUSHOVER", "false")], &store).unwrap();

        let path = config.database_path().unwrap();
        assert_eq!(path, dir.join(".data").join(DATABASE_FILE_NAME));
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn database_path_accepts_absolute_parent() {
        let dir = test_dir("resolver_db_absolute");
        let parent = dir.join("elsewhere");
        let store = store_with_photo_creds();
        let parent_raw = parent.to_string_lossy().into_owned();
        let config = resolve(
            &dir,
            &[
                ("ENABLE_PUSHOVER", "false"),
                ("DATABASE_PARENT_DIRECTORY", parent_raw.as_str()),
            ],
            &store,
        )
        .unwrap();

        assert_eq!(config.database_path().unwrap(), parent.join(DATABASE_FILE_NAME));
    }

    #[cfg(not(windows))]
    #[test]
    fn local_app_data_token_maps_to_local_share() {
        let home = dirs::home_dir().unwrap();
        let expanded = expand_local_app_data("%LOCALAPPDATA%/foto_pool");
        assert_eq!(
            PathBuf::from(expanded),
            home.join(".local").join("share").join("foto_pool")
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let dir = test_dir("resolver_debug");
        let store = store_with_photo_creds();
        NOTIFY_SERVICE.store(&store, "ukey123", "token456").unwrap();
        let config = resolve(&dir, &[("ENABLE_PUSHOVER", "true")], &store).unwrap();

        let printed = format!("{config:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("token456"));
        assert!(printed.contains("user@example.com"));
    }

    #[test]
    fn log_level_parsing() {
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::from_str("INFO"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("verbose"), None);
        assert_eq!(LogLevel::Warning.as_filter(), "warn");
    }

    #[test]
    fn execution_mode_parsing_is_case_insensitive() {
        assert_eq!(ExecutionMode::from_str("Continuous"), Some(ExecutionMode::Continuous));
        assert_eq!(ExecutionMode::from_str("SINGLE"), Some(ExecutionMode::Single));
        assert_eq!(ExecutionMode::from_str("both"), None);
    }

    #[test]
    fn booleans_accept_only_true() {
        assert!(parse_bool("true"));
        assert!(parse_bool("TRUE"));
        assert!(parse_bool(" True "));
        assert!(!parse_bool("yes"));
        assert!(!parse_bool("1"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn tilde_expansion() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_tilde("~/photos"), home.join("photos"));
        assert_eq!(expand_tilde("~"), home);
        assert_eq!(expand_tilde("/absolute"), PathBuf::from("/absolute"));
    }
}
