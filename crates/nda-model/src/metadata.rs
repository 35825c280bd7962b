//! Sidecar metadata merged for a single scan.

use serde_json::{Map, Value};

/// Key of the nested block some converters leave unflattened.
pub const GLOBAL_KEY: &str = "global";
/// Key of the constant-parameter map inside [`GLOBAL_KEY`].
pub const CONST_KEY: &str = "const";

/// Specificity of a sidecar relative to a scan, least specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SidecarLevel {
    Dataset,
    Subject,
    Session,
    Scan,
}

impl SidecarLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Subject => "subject",
            Self::Session => "session",
            Self::Scan => "scan",
        }
    }
}

/// Effective parameter set for one scan.
///
/// `primary` is the flat result of applying sidecars in increasing
/// specificity. The `global.const` block is kept as-is inside `primary` and is
/// additionally exposed through [`MergedMetadata::constants`] for the handful
/// of fields that are only ever found there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedMetadata {
    primary: Map<String, Value>,
}

impl MergedMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlays `sidecar` on top of the current values. Keys already present
    /// are replaced wholesale, nested objects included.
    pub fn overlay(&mut self, sidecar: Map<String, Value>) {
        for (key, value) in sidecar {
            self.primary.insert(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.primary.get(key)
    }

    /// String value for `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.primary.get(key).and_then(Value::as_str)
    }

    /// Secondary view over `global.const`, if the merged sidecars carry one.
    pub fn constants(&self) -> ConstantsView<'_> {
        let map = self
            .primary
            .get(GLOBAL_KEY)
            .and_then(Value::as_object)
            .and_then(|global| global.get(CONST_KEY))
            .and_then(Value::as_object);
        ConstantsView { map }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.primary
    }
}

impl From<Map<String, Value>> for MergedMetadata {
    fn from(primary: Map<String, Value>) -> Self {
        Self { primary }
    }
}

/// Read-only view over the `global.const` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantsView<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> ConstantsView<'a> {
    pub fn is_present(&self) -> bool {
        self.map.is_some()
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|map| map.get(key))
    }
}
