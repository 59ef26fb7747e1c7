use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Boundary-level errors. Everything that can go wrong *inside* the
/// pipeline is converted into a state transition instead; only malformed
/// requests and store-level referential mistakes surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or invalid request metadata, rejected before the pipeline
    /// runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("store error: {0}")]
    Store(#[from] mend_store::StoreError),
}
