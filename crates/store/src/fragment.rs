use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Store-assigned fragment identifier, unique within one store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FragmentId(pub u64);

impl std::fmt::Display for FragmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frag-{:06}", self.0)
    }
}

/// External-validator verdict on a fragment. Transitions are forward-only:
/// pending may become approved or rejected, terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidatorStatus {
    Pending,
    Approved,
    Rejected,
}

impl ValidatorStatus {
    pub fn can_transition_to(self, next: ValidatorStatus) -> bool {
        matches!(
            (self, next),
            (ValidatorStatus::Pending, ValidatorStatus::Approved)
                | (ValidatorStatus::Pending, ValidatorStatus::Rejected)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ValidatorStatus::Pending => "pending",
            ValidatorStatus::Approved => "approved",
            ValidatorStatus::Rejected => "rejected",
        }
    }
}

/// One immutable record of submitted or repaired code.
///
/// Fragments are never edited in place: any change produces a new fragment
/// whose `parent_id` points at the previous one, and `lineage` carries the
/// full ancestor chain oldest-first. The serialized shape uses camelCase
/// field names (`hash` for the content hash) to match the persisted record
/// format consumed by external collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFragment {
    pub id: FragmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FragmentId>,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    pub code: String,
    /// SHA-256 of `code`, lowercase hex. Content-addressing key: identical
    /// code always yields an identical hash.
    #[serde(rename = "hash")]
    pub content_hash: String,
    /// Structural signature, computed once at creation and never mutated.
    pub fingerprint: String,
    pub lineage: Vec<FragmentId>,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: u64,
    pub last_good_state: bool,
    pub validator_status: ValidatorStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Caller-supplied fields of a fragment about to be recorded. The store
/// fills in id, hash, lineage, and timestamp.
#[derive(Debug, Clone, Default)]
pub struct FragmentDraft {
    pub filename: String,
    pub function_name: Option<String>,
    pub parent_id: Option<FragmentId>,
    pub code: String,
    pub fingerprint: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Deterministic content hash of a code payload (SHA-256, lowercase hex).
pub fn content_hash(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
