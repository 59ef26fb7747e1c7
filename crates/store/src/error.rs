use crate::fragment::{FragmentId, ValidatorStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unknown fragment: {0}")]
    UnknownFragment(FragmentId),

    #[error("invalid validator transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ValidatorStatus,
        to: ValidatorStatus,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
