//! Settings file discovery and layered key lookup.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::error::ConfigError;

/// Directory name under the platform config base.
pub const APP_DIR_NAME: &str = "foto_pool";
/// Settings file name inside that directory.
pub const SETTINGS_FILE_NAME: &str = "settings.ini";
/// Dotenv-style file checked in the working directory first.
const CWD_FILE_NAME: &str = ".env";

/// Parsed settings file plus fallbacks. Lookup order per key: file value,
/// then process environment, then the caller's default.
#[derive(Debug)]
pub struct SettingsSource {
    values: HashMap<String, String>,
    path: PathBuf,
}

impl SettingsSource {
    /// Locates and parses the settings file. At least one candidate
    /// location must exist; a candidate that is a directory is an error.
    pub fn discover() -> Result<Self, ConfigError> {
        Self::discover_from(candidate_paths())
    }

    fn discover_from(candidates: Vec<PathBuf>) -> Result<Self, ConfigError> {
        for path in &candidates {
            if path.is_dir() {
                return Err(ConfigError::NotAFile(path.clone()));
            }
            if path.is_file() {
                return Self::from_file(path.clone());
            }
        }
        Err(ConfigError::NoConfigFile(candidates))
    }

    /// Parses one dotenv-style file. The process environment is left
    /// untouched; file values live only in this source.
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let iter = dotenv::from_path_iter(&path).map_err(|e| ConfigError::Settings {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| ConfigError::Settings {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            values.insert(key, value);
        }
        debug!(path = %path.display(), keys = values.len(), "settings file parsed");
        Ok(SettingsSource { values, path })
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SettingsSource {
            values,
            path: PathBuf::from("<test>"),
        }
    }

    /// File value, else process environment, else `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.values.get(key) {
            return Some(value.clone());
        }
        env::var(key).ok()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut options = vec![PathBuf::from(CWD_FILE_NAME)];
    if let Some(base) = platform_config_base() {
        options.push(base.join(APP_DIR_NAME).join(SETTINGS_FILE_NAME));
    }
    options
}

#[cfg(windows)]
fn platform_config_base() -> Option<PathBuf> {
    env::var_os("LOCALAPPDATA").map(PathBuf::from)
}

#[cfg(not(windows))]
fn platform_config_base() -> Option<PathBuf> {
    if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Some(PathBuf::from(xdg));
        }
    }
    dirs::home_dir().map(|home| home.join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("foto_pool_tests").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn file_values_parse() {
        let dir = test_dir("settings_file_values");
        let path = dir.join("settings.ini");
        std::fs::write(&path, "SYNC_DIRECTORY=/photos\nDRY_RUN=true\n").unwrap();

        let source = SettingsSource::from_file(path).unwrap();
        assert_eq!(source.get("SYNC_DIRECTORY").as_deref(), Some("/photos"));
        assert_eq!(source.get("DRY_RUN").as_deref(), Some("true"));
    }

    #[test]
    fn file_value_shadows_process_env() {
        let dir = test_dir("settings_shadow");
        let path = dir.join("settings.ini");
        std::fs::write(&path, "FOTO_POOL_SHADOW_TEST=from_file\n").unwrap();
        env::set_var("FOTO_POOL_SHADOW_TEST", "from_env");

        let source = SettingsSource::from_file(path).unwrap();
        assert_eq!(
            source.get("FOTO_POOL_SHADOW_TEST").as_deref(),
            Some("from_file")
        );
        env::remove_var("FOTO_POOL_SHADOW_TEST");
    }

    #[test]
    fn process_env_fills_missing_keys() {
        let dir = test_dir("settings_env_fallback");
        let path = dir.join("settings.ini");
        std::fs::write(&path, "UNRELATED=1\n").unwrap();
        env::set_var("FOTO_POOL_FALLBACK_TEST", "from_env");

        let source = SettingsSource::from_file(path).unwrap();
        assert_eq!(
            source.get("FOTO_POOL_FALLBACK_TEST").as_deref(),
            Some("from_env")
        );
        env::remove_var("FOTO_POOL_FALLBACK_TEST");
    }

    #[test]
    fn default_applies_when_key_is_nowhere() {
        let source = SettingsSource::from_pairs(&[]);
        assert_eq!(source.get_or("FOTO_POOL_ABSENT_TEST", "fallback"), "fallback");
    }

    #[test]
    fn discovery_prefers_earlier_candidates() {
        let dir = test_dir("settings_discover_order");
        let first = dir.join(".env");
        let second = dir.join("settings.ini");
        std::fs::write(&first, "WHICH=first\n").unwrap();
        std::fs::write(&second, "WHICH=second\n").unwrap();

        let source = SettingsSource::discover_from(vec![first, second]).unwrap();
        assert_eq!(source.get("WHICH").as_deref(), Some("first"));
    }

    #[test]
    fn discovery_rejects_directory_candidate() {
        let dir = test_dir("settings_discover_dir");
        let bogus = dir.join(".env");
        std::fs::create_dir_all(&bogus).unwrap();

        let err = SettingsSource::discover_from(vec![bogus.clone()]).unwrap_err();
        assert!(matches!(err, ConfigError::NotAFile(p) if p == bogus));
    }

    #[test]
    fn discovery_without_any_candidate_lists_options() {
        let dir = test_dir("settings_discover_none");
        let a = dir.join(".env");
        let b = dir.join("settings.ini");

        let err = SettingsSource::discover_from(vec![a.clone(), b.clone()]).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("No configuration file found"));
        assert!(message.contains(&a.display().to_string()));
        assert!(message.contains(&b.display().to_string()));
    }
}
