//! Reload Classifier - Domain Service
//!
//! Maps the captured stderr of a failed reload to a `ReloadFailureKind`.

use crate::domain::value_objects::ReloadFailureKind;

/// Substring nginx prints when `-s reload` finds no master process pid,
/// e.g. `open() "/run/nginx.pid" failed (2: No such file or directory)`.
pub const DEFAULT_NOT_RUNNING_SIGNATURE: &str = "nginx.pid\" failed";

/// Classifies reload failures by a known signature string.
#[derive(Debug, Clone)]
pub struct ReloadClassifier {
    not_running_signature: String,
}

impl ReloadClassifier {
    pub fn new(not_running_signature: impl Into<String>) -> Self {
        Self {
            not_running_signature: not_running_signature.into(),
        }
    }

    /// Classify the stderr of a reload that exited non-zero.
    ///
    /// An empty signature never matches.
    pub fn classify(&self, stderr: &str) -> ReloadFailureKind {
        if !self.not_running_signature.is_empty() && stderr.contains(&self.not_running_signature) {
            ReloadFailureKind::NotRunning
        } else {
            ReloadFailureKind::Other
        }
    }
}

impl Default for ReloadClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_NOT_RUNNING_SIGNATURE)
    }
}
