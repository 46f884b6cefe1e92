//! Error types for bore detection.

use borescan_stl::StlError;
use thiserror::Error;

/// Errors that can occur during analysis.
///
/// Running out of data is not an error: detectors return empty results or
/// a "not helical" classification instead.
#[derive(Error, Debug)]
pub enum DetectError {
    /// The mesh could not be read.
    #[error(transparent)]
    Stl(#[from] StlError),

    /// A threshold or parameter is out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// A grid search would visit more cells than the configured budget.
    #[error("search budget exceeded: {cells} cells requested, budget is {budget}")]
    SearchBudgetExceeded {
        /// Cells the search would visit.
        cells: usize,
        /// Configured maximum.
        budget: usize,
    },

    /// Settings file could not be parsed.
    #[error("settings parse error: {0}")]
    SettingsParse(#[from] toml::de::Error),
}

/// Result type for detection operations.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Fail with [`DetectError::InvalidSettings`] unless `cond` holds.
pub(crate) fn ensure(cond: bool, message: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(DetectError::InvalidSettings(message.to_string()))
    }
}
