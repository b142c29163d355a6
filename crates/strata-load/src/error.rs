use strata_flatten::FlattenError;
use strata_store::StoreError;
use thiserror::Error;

/// Everything that can go wrong with a single report document. Each variant
/// is recoverable: the batch records it and moves to the next input.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("malformed report: {0}")]
    Malformed(#[from] FlattenError),
    #[error("persist error: {0}")]
    Persist(#[from] StoreError),
}
