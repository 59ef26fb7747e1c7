use crate::error::{Result, StoreError};
use crate::fragment::{content_hash, CodeFragment, FragmentDraft, FragmentId, ValidatorStatus};
use crate::sink::{fingerprint_embedding, FragmentSink, NoopSink, RECORD_TOPIC};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Append-only fragment store with derived indexes.
///
/// The log only ever grows and existing entries are never mutated (aside
/// from the forward-only validator flags), so concurrent readers need no
/// coordination beyond the interior `RwLock`. Ordering by `created_at`
/// coincides with insertion order; the record path clamps timestamps to
/// keep that true across clock adjustments.
pub struct FragmentStore {
    inner: RwLock<StoreInner>,
    sink: Box<dyn FragmentSink>,
}

#[derive(Default)]
struct StoreInner {
    fragments: Vec<CodeFragment>,
    by_id: HashMap<FragmentId, usize>,
    by_filename: HashMap<String, Vec<usize>>,
    by_fingerprint: HashMap<String, Vec<usize>>,
    next_id: u64,
    last_created_at: u64,
}

impl StoreInner {
    fn index(&mut self, fragment: CodeFragment) {
        let idx = self.fragments.len();
        self.by_id.insert(fragment.id, idx);
        self.by_filename
            .entry(fragment.filename.clone())
            .or_default()
            .push(idx);
        self.by_fingerprint
            .entry(fragment.fingerprint.clone())
            .or_default()
            .push(idx);
        self.next_id = self.next_id.max(fragment.id.0 + 1);
        self.last_created_at = self.last_created_at.max(fragment.created_at);
        self.fragments.push(fragment);
    }
}

impl Default for FragmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentStore {
    pub fn new() -> Self {
        Self::with_sink(Box::new(NoopSink))
    }

    pub fn with_sink(sink: Box<dyn FragmentSink>) -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
            sink,
        }
    }

    /// Record a new fragment: assign its id and timestamp, compute its
    /// content hash and lineage, append, and index. The in-process append
    /// cannot fail; only a dangling `parent_id` is rejected.
    pub fn record(&self, draft: FragmentDraft) -> Result<CodeFragment> {
        let fragment = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

            let lineage = match draft.parent_id {
                Some(parent) => {
                    let idx = *inner
                        .by_id
                        .get(&parent)
                        .ok_or(StoreError::UnknownFragment(parent))?;
                    let mut lineage = inner.fragments[idx].lineage.clone();
                    lineage.push(parent);
                    lineage
                }
                None => Vec::new(),
            };

            let id = FragmentId(inner.next_id);
            let created_at = now_millis().max(inner.last_created_at);

            let fragment = CodeFragment {
                id,
                parent_id: draft.parent_id,
                filename: draft.filename,
                function_name: draft.function_name,
                content_hash: content_hash(&draft.code),
                code: draft.code,
                fingerprint: draft.fingerprint,
                lineage,
                created_at,
                last_good_state: true,
                validator_status: ValidatorStatus::Pending,
                metadata: draft.metadata,
            };
            inner.index(fragment.clone());
            fragment
        };

        log::debug!("recorded {} for {}", fragment.id, fragment.filename);
        self.fan_out(&fragment);
        Ok(fragment)
    }

    /// All fragments recorded for a file, ordered by `created_at`
    /// ascending.
    pub fn query(&self, filename: &str) -> Vec<CodeFragment> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_filename
            .get(filename)
            .map(|idxs| idxs.iter().map(|&i| inner.fragments[i].clone()).collect())
            .unwrap_or_default()
    }

    /// Repair-donor candidates for a file: the known-good subset of
    /// [`FragmentStore::query`], same ordering.
    pub fn query_good_candidates(&self, filename: &str) -> Vec<CodeFragment> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_filename
            .get(filename)
            .map(|idxs| {
                idxs.iter()
                    .map(|&i| &inner.fragments[i])
                    .filter(|f| f.last_good_state)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Fragments sharing an exact fingerprint, ordered by `created_at`
    /// ascending.
    pub fn query_by_fingerprint(&self, fingerprint: &str) -> Vec<CodeFragment> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_fingerprint
            .get(fingerprint)
            .map(|idxs| idxs.iter().map(|&i| inner.fragments[i].clone()).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: FragmentId) -> Option<CodeFragment> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_id
            .get(&id)
            .map(|&idx| inner.fragments[idx].clone())
    }

    /// Most recently recorded fragment for a file, good or not.
    pub fn latest_for_file(&self, filename: &str) -> Option<CodeFragment> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_filename
            .get(filename)
            .and_then(|idxs| idxs.last())
            .map(|&idx| inner.fragments[idx].clone())
    }

    /// Apply an external validator verdict. Transitions are forward-only;
    /// re-asserting the current status is a no-op. A rejection also drops
    /// the fragment out of the candidate pool.
    pub fn set_validator_status(&self, id: FragmentId, status: ValidatorStatus) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let idx = *inner
            .by_id
            .get(&id)
            .ok_or(StoreError::UnknownFragment(id))?;
        let fragment = &mut inner.fragments[idx];

        if fragment.validator_status == status {
            return Ok(());
        }
        if !fragment.validator_status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: fragment.validator_status,
                to: status,
            });
        }

        fragment.validator_status = status;
        if status == ValidatorStatus::Rejected {
            fragment.last_good_state = false;
        }
        Ok(())
    }

    /// One-way demotion out of the candidate pool. The fragment stays in
    /// the log for lineage queries.
    pub fn mark_not_good(&self, id: FragmentId) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let idx = *inner
            .by_id
            .get(&id)
            .ok_or(StoreError::UnknownFragment(id))?;
        inner.fragments[idx].last_good_state = false;
        Ok(())
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the log as pretty-printed JSON. Indexes are derived state
    /// and are rebuilt on load.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let data = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            serde_json::to_string_pretty(&inner.fragments)?
        };
        std::fs::write(path, data)?;
        log::info!("saved fragment store to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_sink(path, Box::new(NoopSink))
    }

    pub fn load_with_sink(path: impl AsRef<Path>, sink: Box<dyn FragmentSink>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let fragments: Vec<CodeFragment> = serde_json::from_str(&data)?;

        let mut inner = StoreInner::default();
        for fragment in fragments {
            inner.index(fragment);
        }
        log::info!(
            "loaded {} fragments from {}",
            inner.fragments.len(),
            path.as_ref().display()
        );

        Ok(Self {
            inner: RwLock::new(inner),
            sink,
        })
    }

    /// Replicate a recorded fragment to the configured sink. Failures are
    /// logged and swallowed: the authoritative response never depends on
    /// external replication.
    fn fan_out(&self, fragment: &CodeFragment) {
        if let Err(err) = self.sink.publish(RECORD_TOPIC, fragment) {
            log::warn!("sink publish failed for {}: {err}", fragment.id);
        }
        if let Err(err) = self.sink.insert(fragment) {
            log::warn!("sink insert failed for {}: {err}", fragment.id);
        }
        let embedding = fingerprint_embedding(&fragment.fingerprint);
        if let Err(err) = self.sink.upsert(fragment.id, &embedding) {
            log::warn!("sink upsert failed for {}: {err}", fragment.id);
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
