use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// None of the candidate settings locations exist. Startup cannot
    /// continue without one.
    #[error("No configuration file found. Options are: {}", join_paths(.0))]
    NoConfigFile(Vec<PathBuf>),

    #[error("Expected file but found directory: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to load settings from {}: {detail}", .path.display())]
    Settings { path: PathBuf, detail: String },

    #[error("cannot prepare database directory {}: {source}", .path.display())]
    DatabaseDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Everything wrong with the configuration, reported at once.
    #[error("Configuration errors: {}", .0.join(", "))]
    Invalid(Vec<String>),
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
