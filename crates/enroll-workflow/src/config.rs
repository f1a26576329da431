//! Workflow configuration, loadable from YAML.
//!
//! ```yaml
//! history_path: ~/.enroll/applications.json
//! profile_path: ~/.enroll/profile.json
//! synthetic_fallback: true
//! max_payment_proof_bytes: 5242880
//! color_palette: ["#3b82f6", "#8b5cf6"]
//! ```
//!
//! Every field is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use enroll_state::catalog::DEFAULT_PALETTE;

/// Largest payment-proof upload accepted before submission.
pub const DEFAULT_MAX_PAYMENT_PROOF_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowConfig {
    /// JSON file holding submitted application summaries.
    pub history_path: PathBuf,
    /// JSON file holding saved personal details.
    pub profile_path: PathBuf,
    /// Substitute a synthetic grid when the timeslot service fails.
    pub synthetic_fallback: bool,
    pub max_payment_proof_bytes: u64,
    /// Subject colors by catalog position.
    pub color_palette: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(".enroll/applications.json"),
            profile_path: PathBuf::from(".enroll/profile.json"),
            synthetic_fallback: true,
            max_payment_proof_bytes: DEFAULT_MAX_PAYMENT_PROOF_BYTES,
            color_palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl WorkflowConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigLoadError::FileNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ConfigLoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigLoadError::YamlParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("config file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse YAML at {}: {source}", path.display())]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = WorkflowConfig::default();
        assert!(cfg.synthetic_fallback);
        assert_eq!(cfg.max_payment_proof_bytes, 5_242_880);
        assert_eq!(cfg.color_palette.len(), 8);
        assert_eq!(cfg.color_palette[0], "#3b82f6");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enroll.yaml");
        std::fs::write(&path, "synthetic_fallback: false\nhistory_path: /tmp/h.json\n").unwrap();

        let cfg = WorkflowConfig::load(&path).unwrap();
        assert!(!cfg.synthetic_fallback);
        assert_eq!(cfg.history_path, PathBuf::from("/tmp/h.json"));
        assert_eq!(cfg.max_payment_proof_bytes, DEFAULT_MAX_PAYMENT_PROOF_BYTES);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("enroll.yaml");
        std::fs::write(&path, "synthetic_fallbak: false\n").unwrap();
        assert!(matches!(
            WorkflowConfig::load(&path),
            Err(ConfigLoadError::YamlParse { .. })
        ));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            WorkflowConfig::load(Path::new("/nonexistent/enroll.yaml")),
            Err(ConfigLoadError::FileNotFound { .. })
        ));
    }
}
