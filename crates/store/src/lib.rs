//! # Mend Store
//!
//! Append-only, content-addressed fragment history with lineage.
//!
//! Every submitted or repaired piece of code becomes an immutable
//! [`CodeFragment`]: hashed, fingerprinted, timestamped, and linked to the
//! fragment it was derived from. The [`FragmentStore`] indexes fragments by
//! id, filename, and fingerprint; writes are strictly additive, so reads
//! run concurrently with writes without exclusive locks. Recorded
//! fragments fan out to an optional [`FragmentSink`] (event bus, external
//! store, vector store) whose failures are logged and never propagate.

mod error;
mod fragment;
mod sink;
mod store;

pub use error::{Result, StoreError};
pub use fragment::{content_hash, CodeFragment, FragmentDraft, FragmentId, ValidatorStatus};
pub use sink::{fingerprint_embedding, FragmentSink, NoopSink, SinkError, RECORD_TOPIC};
pub use store::FragmentStore;
