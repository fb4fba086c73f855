//! Client for the cloud photo service: one authenticated session, album
//! listing, paged asset enumeration, and file downloads.

pub mod client;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{HttpRemoteClient, RemoteClient};
pub use error::RemoteError;
pub use stream::{enumerate_assets, AssetStream, EnumerationPlan};
pub use types::{Album, AlbumKind, AssetPage, AuthOutcome, RemoteAsset, ALL_PHOTOS_ALBUM};
