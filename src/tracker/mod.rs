//! Deletion tracking. Photos the user removed locally are remembered here
//! so a later sync never restores them.

pub mod db;
pub mod error;
pub mod schema;

pub use db::{DeletionTracker, SqliteTracker, TrackerStats};
pub use error::TrackerError;
