use chrono::{DateTime, Utc};

use crate::remote::error::RemoteError;

/// Name of the built-in library album that holds every personal photo.
pub const ALL_PHOTOS_ALBUM: &str = "All Photos";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlbumKind {
    Personal,
    Shared,
}

impl AlbumKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumKind::Personal => "personal",
            AlbumKind::Shared => "shared",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub name: String,
    pub kind: AlbumKind,
}

impl Album {
    pub fn new(name: impl Into<String>, kind: AlbumKind) -> Self {
        Album {
            name: name.into(),
            kind,
        }
    }
}

/// Result of an authentication attempt against the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    SecondFactorRequired,
}

/// One photo as reported by the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteAsset {
    pub id: String,
    pub filename: String,
    pub album: String,
    pub download_url: String,
    pub size: u64,
    pub created: Option<DateTime<Utc>>,
    pub kind: AlbumKind,
}

impl RemoteAsset {
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// One page of an album enumeration. Items keep per-record parse failures
/// inline so a malformed record never ends the page.
#[derive(Debug, Default)]
pub struct AssetPage {
    pub items: Vec<Result<RemoteAsset, RemoteError>>,
    pub next: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_mb_converts_bytes() {
        let asset = RemoteAsset {
            id: "a1".to_string(),
            filename: "a.jpg".to_string(),
            album: ALL_PHOTOS_ALBUM.to_string(),
            download_url: "https://example.test/a.jpg".to_string(),
            size: 5 * 1024 * 1024,
            created: None,
            kind: AlbumKind::Personal,
        };
        assert!((asset.size_mb() - 5.0).abs() < f64::EPSILON);
    }
}
