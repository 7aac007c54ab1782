use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// Key/value store a reader uses to persist its position between runs.
///
/// Values are counters. The context serializes to JSON so it can be saved by whatever
/// runs the batch and handed back on restart.
///
/// # Examples
///
/// ```
/// use fragment_batch_rs::core::execution::ExecutionContext;
///
/// let mut context = ExecutionContext::new();
/// context.put("reader.read.count", 3);
///
/// let json = context.to_json().unwrap();
/// let restored = ExecutionContext::from_json(&json).unwrap();
/// assert_eq!(restored.get("reader.read.count"), Some(3));
/// ```
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    entries: BTreeMap<String, usize>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<K: Into<String>>(&mut self, key: K, value: usize) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        serde_json::to_string(self)
            .map_err(|e| BatchError::Configuration(format!("Cannot serialize context: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json)
            .map_err(|e| BatchError::Configuration(format!("Cannot deserialize context: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::ExecutionContext;

    #[test]
    fn put_should_overwrite_previous_value() {
        let mut context = ExecutionContext::new();
        assert!(context.is_empty());

        context.put("count", 1);
        context.put("count", 7);

        assert_eq!(context.get("count"), Some(7));
        assert!(context.contains_key("count"));
        assert_eq!(context.get("other"), None);
    }

    #[test]
    fn invalid_json_should_be_rejected() {
        let result = ExecutionContext::from_json("{ not json");
        assert!(result.is_err());
    }
}
