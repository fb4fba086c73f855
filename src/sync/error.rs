use std::fmt;

use thiserror::Error;

use crate::remote::RemoteError;
use crate::tracker::TrackerError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("authentication requires a second factor")]
    SecondFactorRequired,

    #[error("{0}")]
    AlbumsNotFound(#[from] AlbumsNotFound),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Every configured album name that the service does not know, reported in
/// one shot together with the names that do exist.
#[derive(Debug, Default)]
pub struct AlbumsNotFound {
    pub missing_personal: Vec<String>,
    pub missing_shared: Vec<String>,
    pub existing_personal: Vec<String>,
    pub existing_shared: Vec<String>,
}

impl AlbumsNotFound {
    pub fn is_empty(&self) -> bool {
        self.missing_personal.is_empty() && self.missing_shared.is_empty()
    }
}

impl fmt::Display for AlbumsNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut missing = Vec::new();
        for name in &self.missing_personal {
            missing.push(format!("Personal: {name}"));
        }
        for name in &self.missing_shared {
            missing.push(format!("Shared: {name}"));
        }
        write!(
            f,
            "The following specified albums do not exist: {}",
            missing.join(", ")
        )?;
        if !self.existing_personal.is_empty() {
            write!(
                f,
                " (Note: existing personal albums: {})",
                self.existing_personal.join(", ")
            )?;
        }
        if !self.existing_shared.is_empty() {
            write!(
                f,
                " (Note: existing shared albums: {})",
                self.existing_shared.join(", ")
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for AlbumsNotFound {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reports_both_kinds_and_existing_albums() {
        let err = AlbumsNotFound {
            missing_personal: vec!["Holidays".to_string()],
            missing_shared: vec!["Club".to_string()],
            existing_personal: vec!["Family".to_string(), "Pets".to_string()],
            existing_shared: vec!["Trips".to_string()],
        };
        let message = err.to_string();
        assert_eq!(
            message,
            "The following specified albums do not exist: Personal: Holidays, Shared: Club \
             (Note: existing personal albums: Family, Pets) \
             (Note: existing shared albums: Trips)"
        );
    }

    #[test]
    fn display_omits_empty_notes() {
        let err = AlbumsNotFound {
            missing_personal: vec!["Holidays".to_string()],
            ..Default::default()
        };
        let message = err.to_string();
        assert_eq!(
            message,
            "The following specified albums do not exist: Personal: Holidays"
        );
    }
}
