use thiserror::Error;

/// Batch-level failures of a catalog fetch. Per-item detail lookup failures
/// are not represented here; those drop the affected item only.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("video search API key is not configured")]
    MissingCredential,
    #[error("video search access denied; check your API key configuration or quota limits")]
    AccessDenied,
    /// Non-success provider status with the provider's own message carried
    /// through verbatim.
    #[error("{message}")]
    Provider { status: u16, message: String },
    #[error("video not found")]
    NotFound,
    #[error("video search request failed: {0}")]
    Network(String),
}
