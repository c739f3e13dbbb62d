//! Catalog Error Types

use thiserror::Error;

/// Catalog-specific result type alias
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog-specific error variants
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request never produced a usable response
    #[error("Data service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The data service answered with an error status
    #[error("Data service rejected the query ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Response body did not match the expected row shape
    #[error("Invalid data service response: {0}")]
    Decode(String),
}
