//! Configuration options for a conversion run.

use serde::{Deserialize, Serialize};

/// How to treat participants that have no GUID mapping entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubjectStrictness {
    /// Abort the run naming the unmapped participants.
    #[default]
    Strict,
    /// Log the unmapped participants and continue without them.
    Warn,
    /// Continue without the unmapped participants.
    Ignore,
}

/// What to do when a single scan cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScanFailurePolicy {
    /// Abort the whole run on the first failing scan.
    #[default]
    Abort,
    /// Log the failure, leave the scan out of the table and continue.
    ///
    /// Dataset-level problems (unmapped suffix, unknown header units) still
    /// abort.
    Skip,
}

/// Options controlling a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub strictness: SubjectStrictness,
    pub failure_policy: ScanFailurePolicy,
    /// Process scans on a worker pool. Output order is unaffected.
    pub parallel: bool,
}

impl ConversionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_strictness(mut self, strictness: SubjectStrictness) -> Self {
        self.strictness = strictness;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: ScanFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.parallel = enable;
        self
    }
}
