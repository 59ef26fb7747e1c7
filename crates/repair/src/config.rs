use crate::similarity::ACCEPT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the repair pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairConfig {
    /// Similarity score a donor must strictly exceed to be accepted.
    pub similarity_threshold: f32,

    /// Auto-fix toggle: duplicate-declaration elision (last wins).
    pub elide_duplicate_declarations: bool,

    /// Auto-fix toggle: rewrite childless unterminated markup elements as
    /// self-closing.
    pub normalize_unterminated_elements: bool,

    /// Wall-clock budget for parsing and fingerprinting one request, in
    /// milliseconds. Exhaustion resolves to a "recovery-exhausted" failure
    /// instead of hanging on pathological input.
    pub stage_budget_ms: u64,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: ACCEPT_THRESHOLD,
            elide_duplicate_declarations: true,
            normalize_unterminated_elements: true,
            stage_budget_ms: 2_000,
        }
    }
}

impl RepairConfig {
    pub fn stage_budget(&self) -> Duration {
        Duration::from_millis(self.stage_budget_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "similarity_threshold ({}) must be within [0, 1]",
                self.similarity_threshold
            ));
        }
        if self.stage_budget_ms == 0 {
            return Err("stage_budget_ms must be positive".to_string());
        }
        Ok(())
    }
}
