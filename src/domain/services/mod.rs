mod reload_classifier;

pub use reload_classifier::{ReloadClassifier, DEFAULT_NOT_RUNNING_SIGNATURE};
