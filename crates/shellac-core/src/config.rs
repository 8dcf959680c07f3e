//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use shellac_error::Result;

/// Re-analysis passes per unit. The first pass learns checkers declared
/// later in file order; the second reports against the complete registry.
pub const DEFAULT_ANALYSIS_PASSES: u32 = 2;

/// Error emitted next to every proof obligation that is not marked done.
pub const INCOMPLETE_PROOF_MESSAGE: &str =
    "One or more proofs need to be completed, or a dynamic checker must be added.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub analysis_passes: u32,
    pub incomplete_proof_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis_passes: DEFAULT_ANALYSIS_PASSES,
            incomplete_proof_message: INCOMPLETE_PROOF_MESSAGE.to_owned(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Passes actually run; never zero.
    #[must_use]
    pub fn passes(&self) -> u32 {
        self.analysis_passes.max(1)
    }
}
