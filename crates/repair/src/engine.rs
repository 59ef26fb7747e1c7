use crate::config::RepairConfig;
use crate::error::{EngineError, Result};
use crate::pipeline::{RepairOutcome, RepairPipeline};
use mend_store::{CodeFragment, FragmentDraft, FragmentId, FragmentStore};
use mend_syntax::{fingerprint, Language, SourceParser};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Request metadata for ingestion and repair calls.
#[derive(Debug, Clone, Default)]
pub struct FragmentMeta {
    pub filename: String,
    pub function_name: Option<String>,
    pub parent_id: Option<FragmentId>,
    /// Overrides extension-based language detection when set.
    pub language: Option<Language>,
}

impl FragmentMeta {
    pub fn for_file(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }
}

/// Boundary API over the fragment store and repair pipeline.
///
/// The store is injected and shared; the engine holds no other state, so
/// each call is self-contained.
pub struct RepairEngine {
    store: Arc<FragmentStore>,
    config: RepairConfig,
}

impl RepairEngine {
    pub fn new(store: Arc<FragmentStore>) -> Self {
        Self::with_config(store, RepairConfig::default())
    }

    pub fn with_config(store: Arc<FragmentStore>, config: RepairConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    /// Ingest one piece of code: parse, fingerprint, hash, record. The
    /// fingerprint falls back to a permissive partial parse when strict
    /// parsing fails, and to an empty signature for language families
    /// without a grammar.
    pub fn analyze_code(&self, code: &str, meta: &FragmentMeta) -> Result<CodeFragment> {
        check_meta(meta)?;
        let language = language_for(meta);

        let fragment = self.store.record(FragmentDraft {
            filename: meta.filename.clone(),
            function_name: meta.function_name.clone(),
            parent_id: meta.parent_id,
            code: code.to_string(),
            fingerprint: structural_fingerprint(code, language),
            metadata: BTreeMap::new(),
        })?;

        log::debug!(
            "analyzed {} for {}: fingerprint {:?}",
            fragment.id,
            fragment.filename,
            fragment.fingerprint
        );
        Ok(fragment)
    }

    /// Attempt to repair broken code. `Err` only for boundary
    /// configuration mistakes; "could not repair" is the `fixed: false`
    /// outcome, not an error. A successful repair is recorded as a new
    /// fragment whose parent is the similarity donor when one was used,
    /// otherwise the newest fragment already stored for the file.
    pub fn repair_code(&self, broken: &str, meta: &FragmentMeta) -> Result<RepairOutcome> {
        check_meta(meta)?;
        let language = language_for(meta);

        let pipeline = RepairPipeline::new(&self.store, &self.config);
        let outcome = pipeline.run(broken, &meta.filename, language);

        if let Some(reason) = outcome.reason {
            log::info!("no repair for {}: {reason}", meta.filename);
            return Ok(outcome);
        }

        if let Some(code) = &outcome.repaired_code {
            let parent = outcome
                .donor
                .or_else(|| self.store.latest_for_file(&meta.filename).map(|f| f.id));
            let mut metadata = BTreeMap::new();
            metadata.insert("origin".to_string(), serde_json::Value::from("repair"));

            self.store.record(FragmentDraft {
                filename: meta.filename.clone(),
                function_name: meta.function_name.clone(),
                parent_id: parent,
                code: code.clone(),
                fingerprint: structural_fingerprint(code, language),
                metadata,
            })?;
        }

        Ok(outcome)
    }

    /// Full recorded history for a file, oldest first.
    pub fn fragments_for_file(&self, filename: &str) -> Vec<CodeFragment> {
        self.store.query(filename)
    }
}

fn check_meta(meta: &FragmentMeta) -> Result<()> {
    if meta.filename.trim().is_empty() {
        return Err(EngineError::Configuration(
            "filename is required".to_string(),
        ));
    }
    Ok(())
}

fn language_for(meta: &FragmentMeta) -> Language {
    meta.language
        .unwrap_or_else(|| Language::from_path(&meta.filename))
}

/// Fingerprint of `code`, strict parse first, permissive fallback, empty
/// for language families without a grammar.
fn structural_fingerprint(code: &str, language: Language) -> String {
    let Ok(mut parser) = SourceParser::new(language) else {
        return String::new();
    };
    match parser.parse(code) {
        Ok(tree) => fingerprint(&tree),
        Err(_) => parser
            .parse_permissive(code)
            .map(|tree| fingerprint(&tree))
            .unwrap_or_default(),
    }
}
