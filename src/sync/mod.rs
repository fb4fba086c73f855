//! The sync engine: decides per asset whether to download, skip, or stop,
//! and keeps the deletion tracker reconciled with the local directory.

pub mod decision;
pub mod engine;
pub mod error;
pub mod local;
pub mod stats;

pub use decision::{decide, Decision, SkipReason};
pub use engine::SyncEngine;
pub use error::{AlbumsNotFound, SyncError};
pub use stats::SyncStats;
