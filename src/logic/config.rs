//! Engine Configuration
//!
//! Everything the engine needs to locate its data, built from the
//! environment-backed defaults in [`crate::constants`].

use std::path::PathBuf;

use crate::constants;
use crate::logic::rules::RuleSourceLayout;
use crate::logic::sandbox::SandboxConfig;
use crate::logic::threat::DecisionThresholds;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Signature database root
    pub data_dir: PathBuf,
    pub rules_dir: PathBuf,
    /// Compiled rule cache and checksum marker
    pub cache_dir: PathBuf,
    pub sandbox: SandboxConfig,
    pub model_path: PathBuf,
    pub signature_repo: String,
    pub watch_settle_secs: u64,
    pub thresholds: DecisionThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: constants::get_data_dir(),
            rules_dir: constants::get_rules_dir(),
            cache_dir: constants::get_cache_dir(),
            sandbox: SandboxConfig::default(),
            model_path: constants::get_model_path(),
            signature_repo: constants::get_signature_repo(),
            watch_settle_secs: constants::get_watch_settle(),
            thresholds: DecisionThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Config rooted entirely below `root`: `root/files`, `root/files/yara`, cache in `root`
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data_dir: root.join(constants::DEFAULT_DATA_DIR),
            rules_dir: root.join(constants::DEFAULT_RULES_DIR),
            cache_dir: root.clone(),
            model_path: root.join(constants::DEFAULT_MODEL_PATH),
            ..Self::default()
        }
    }

    pub fn rule_layout(&self) -> RuleSourceLayout {
        RuleSourceLayout::new(&self.rules_dir, &self.cache_dir)
    }
}
