//! Error types for STL reading.

use thiserror::Error;

/// Errors that can occur while reading an STL file.
#[derive(Error, Debug)]
pub enum StlError {
    /// I/O error reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The data is neither a valid binary layout nor valid ASCII grammar.
    #[error("Format error{}: {message}", facet.map(|i| format!(" in facet {}", i)).unwrap_or_default())]
    Format {
        /// Index of the facet where the problem was found, if known.
        facet: Option<usize>,
        /// Error message.
        message: String,
    },

    /// The declared triangle count needs more bytes than the file holds.
    #[error("Truncated file: header declares {declared} triangles, data holds {available}")]
    Truncated {
        /// Triangle count from the binary header.
        declared: u32,
        /// Number of complete triangle records present.
        available: usize,
    },
}

impl StlError {
    /// Create a format error not tied to a facet.
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format {
            facet: None,
            message: message.into(),
        }
    }

    /// Create a format error for the facet at `index`.
    pub fn facet(index: usize, message: impl Into<String>) -> Self {
        Self::Format {
            facet: Some(index),
            message: message.into(),
        }
    }
}

/// Result type for STL operations.
pub type Result<T> = std::result::Result<T, StlError>;
