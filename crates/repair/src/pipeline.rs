use crate::config::RepairConfig;
use crate::diff::line_diff;
use crate::recovery::recover_line;
use crate::similarity::best_match;
use mend_store::{FragmentId, FragmentStore};
use mend_syntax::{apply_auto_fixes, fingerprint, AutoFixes, Language, ParseError, SourceParser};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Why a repair attempt ended without a fix. Retained for logging; callers
/// branch on [`RepairOutcome::fixed`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Input parsed cleanly and no transformation applied.
    NoTransformApplied,
    /// No stored donor scored above the acceptance threshold.
    NoCandidateFound,
    /// Recovery strategies (or the stage budget) ran out.
    RecoveryExhausted,
}

impl FailureReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            FailureReason::NoTransformApplied => "no-transform-applied",
            FailureReason::NoCandidateFound => "no-candidate-found",
            FailureReason::RecoveryExhausted => "recovery-exhausted",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result of one repair attempt. `repaired_code` and `diff` are
/// present exactly when `fixed` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairOutcome {
    pub fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repaired_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    /// Internal failure reason, kept for logging.
    #[serde(skip)]
    pub reason: Option<FailureReason>,
    /// Donor fragment for similarity repairs; drives repair lineage.
    #[serde(skip)]
    pub donor: Option<FragmentId>,
}

impl RepairOutcome {
    fn repaired(code: String, diff: String, donor: Option<FragmentId>) -> Self {
        Self {
            fixed: true,
            repaired_code: Some(code),
            diff: Some(diff),
            reason: None,
            donor,
        }
    }

    fn unfixed(reason: FailureReason) -> Self {
        Self {
            fixed: false,
            repaired_code: None,
            diff: None,
            reason: Some(reason),
            donor: None,
        }
    }
}

/// Multi-stage repair state machine over a fragment store.
pub struct RepairPipeline<'a> {
    store: &'a FragmentStore,
    config: &'a RepairConfig,
}

impl<'a> RepairPipeline<'a> {
    pub fn new(store: &'a FragmentStore, config: &'a RepairConfig) -> Self {
        Self { store, config }
    }

    /// Run the state machine for one broken input. Never errors: every
    /// internal failure becomes the next state, terminating in either a
    /// repaired output or a reasoned non-fix.
    pub fn run(&self, broken: &str, filename: &str, language: Language) -> RepairOutcome {
        let deadline = Instant::now() + self.config.stage_budget();
        let toggles = AutoFixes {
            elide_duplicates: self.config.elide_duplicate_declarations,
            normalize_markup: self.config.normalize_unterminated_elements,
        };

        let mut parser = match SourceParser::new(language) {
            Ok(parser) => Some(parser.with_budget(self.config.stage_budget())),
            Err(err) => {
                log::debug!("{filename}: {err}; degrading to line-level recovery");
                None
            }
        };

        let mut code = broken.to_string();
        let mut modified = false;
        let mut recovery_spent = false;

        loop {
            // Parsing
            let parsed = match parser.as_mut() {
                Some(p) => p.parse(&code),
                None => Err(ParseError::at_start(format!(
                    "no structural grammar for {language}"
                ))),
            };
            if Instant::now() > deadline {
                log::warn!("{filename}: stage budget exhausted during parse");
                return RepairOutcome::unfixed(FailureReason::RecoveryExhausted);
            }

            match parsed {
                // Parsed -> AutoFixing
                Ok(tree) => {
                    let result = apply_auto_fixes(&tree, &toggles);
                    if Instant::now() > deadline {
                        log::warn!("{filename}: stage budget exhausted during auto-fix");
                        return RepairOutcome::unfixed(FailureReason::RecoveryExhausted);
                    }
                    if result.modified {
                        code = result.code;
                        modified = true;
                    }

                    if modified {
                        // Fixed(Success)
                        log::info!("{filename}: repaired structurally");
                        let diff = line_diff(broken, &code);
                        return RepairOutcome::repaired(code, diff, None);
                    }
                    if tree.is_recovered() {
                        // Unchanged on a partial tree -> SimilaritySearch
                        break;
                    }
                    // Clean input, nothing to do.
                    return RepairOutcome::unfixed(FailureReason::NoTransformApplied);
                }
                // ParseFailed -> SyntaxRecovery
                Err(err) => {
                    log::debug!("{filename}: parse failed: {err}");
                    if recovery_spent {
                        // retry budget used -> SimilaritySearch
                        break;
                    }
                    recovery_spent = true;
                    match recover_line(&code, err.line) {
                        Some(patched) => {
                            // Recovered -> Parsing (the one bounded retry)
                            code = patched;
                            modified = true;
                        }
                        None => break, // NotRecovered -> SimilaritySearch
                    }
                }
            }
        }

        self.similarity_search(broken, &code, filename, parser.as_mut(), deadline)
    }

    /// SimilaritySearch over the known-good fragments for this file, using
    /// a permissive partial fingerprint of the (possibly patched) input.
    fn similarity_search(
        &self,
        broken: &str,
        current: &str,
        filename: &str,
        parser: Option<&mut SourceParser>,
        deadline: Instant,
    ) -> RepairOutcome {
        let query = parser
            .and_then(|p| p.parse_permissive(current))
            .map(|tree| fingerprint(&tree))
            .unwrap_or_default();
        if Instant::now() > deadline {
            log::warn!("{filename}: stage budget exhausted during fingerprint");
            return RepairOutcome::unfixed(FailureReason::RecoveryExhausted);
        }

        let candidates = self.store.query_good_candidates(filename);
        match best_match(&query, candidates, self.config.similarity_threshold) {
            Some(candidate) => {
                log::info!(
                    "{filename}: similarity repair from donor {} (score {:.2})",
                    candidate.fragment.id,
                    candidate.score
                );
                let diff = line_diff(broken, &candidate.fragment.code);
                RepairOutcome::repaired(candidate.fragment.code, diff, Some(candidate.fragment.id))
            }
            None => RepairOutcome::unfixed(FailureReason::NoCandidateFound),
        }
    }
}
