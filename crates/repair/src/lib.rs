//! # Mend Repair
//!
//! The repair pipeline: a bounded state machine that turns broken source
//! fragments back into syntactically plausible code.
//!
//! ```text
//! Received -> Parsing
//! Parsing  -> Parsed | ParseFailed
//! Parsed   -> AutoFixing
//! AutoFixing -> Fixed(Success) | Unchanged
//! Unchanged -> SimilaritySearch
//! SimilaritySearch -> Found(Success) | NotFound(Failure)
//! ParseFailed -> SyntaxRecovery
//! SyntaxRecovery -> Recovered | NotRecovered
//! Recovered -> Parsing        [exactly one retry]
//! NotRecovered -> SimilaritySearch (permissive partial fingerprint)
//! ```
//!
//! Every stage is bounded (single-pass transforms, one parse retry, a
//! wall-clock budget on parsing and fingerprinting), so the pipeline never
//! loops on pathological input. Internal failures become state
//! transitions, never errors: [`RepairEngine::repair_code`] always returns
//! a structured [`RepairOutcome`] and only rejects malformed requests at
//! the boundary.

mod config;
mod diff;
mod engine;
mod error;
mod pipeline;
mod recovery;
mod similarity;

pub use config::RepairConfig;
pub use diff::line_diff;
pub use engine::{FragmentMeta, RepairEngine};
pub use error::{EngineError, Result};
pub use pipeline::{FailureReason, RepairOutcome, RepairPipeline};
pub use recovery::recover_line;
pub use similarity::{best_match, jaccard, rank_candidates, RankedCandidate, ACCEPT_THRESHOLD};
