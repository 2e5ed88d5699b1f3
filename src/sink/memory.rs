use super::Sink;
use crate::errors::SinkError;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Latest published value per key, shared with the HTTP API.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<DashMap<String, serde_json::Value>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// All known keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.iter().map(|r| r.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn publish(&self, key: &str, value: &serde_json::Value) -> Result<(), SinkError> {
        self.inner.insert(key.to_string(), value.clone());
        Ok(())
    }
}
