//! In-memory progress store, used in tests and single-replica setups.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::ProgressStore;

#[derive(Debug, Default)]
pub struct MemoryProgressStore {
    markers: Mutex<HashMap<(String, String), String>>,
    set_calls: AtomicUsize,
}

impl MemoryProgressStore {
    /// Number of `set_marker` calls so far
    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn get_marker(&self, name: &str, scope: &str) -> anyhow::Result<Option<String>> {
        let markers = self
            .markers
            .lock()
            .map_err(|e| anyhow::anyhow!("progress store lock poisoned: {e}"))?;
        Ok(markers
            .get(&(name.to_string(), scope.to_string()))
            .cloned())
    }

    async fn set_marker(&self, value: &str, name: &str, scope: &str) -> anyhow::Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        let mut markers = self
            .markers
            .lock()
            .map_err(|e| anyhow::anyhow!("progress store lock poisoned: {e}"))?;
        markers.insert((name.to_string(), scope.to_string()), value.to_string());
        Ok(())
    }
}
