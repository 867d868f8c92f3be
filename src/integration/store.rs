//! Integration persistence
//!
//! Records are keyed by (provider, external id); finishing setup for an
//! already-registered project replaces the stored record.

use std::path::{Path, PathBuf};

use anyhow::Context;
use parking_lot::Mutex;

use super::types::IntegrationRecord;

pub trait IntegrationStore: Send + Sync {
    fn create_or_update(&self, record: IntegrationRecord) -> anyhow::Result<()>;

    fn list(&self) -> Vec<IntegrationRecord>;
}

fn upsert(records: &mut Vec<IntegrationRecord>, record: IntegrationRecord) -> bool {
    match records.iter_mut().find(|r| r.store_key() == record.store_key()) {
        Some(existing) => {
            *existing = record;
            false
        }
        None => {
            records.push(record);
            true
        }
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryIntegrationStore {
    records: Mutex<Vec<IntegrationRecord>>,
}

impl MemoryIntegrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrationStore for MemoryIntegrationStore {
    fn create_or_update(&self, record: IntegrationRecord) -> anyhow::Result<()> {
        upsert(&mut self.records.lock(), record);
        Ok(())
    }

    fn list(&self) -> Vec<IntegrationRecord> {
        self.records.lock().clone()
    }
}

/// Store backed by a pretty-printed JSON array, rewritten on every change
pub struct JsonFileIntegrationStore {
    path: PathBuf,
    records: Mutex<Vec<IntegrationRecord>>,
}

impl JsonFileIntegrationStore {
    /// Open the store; a missing or empty file starts an empty store
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read integration store: {}", path.display()))?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).with_context(|| {
                    format!("Failed to parse integration store: {}", path.display())
                })?
            }
        } else {
            Vec::new()
        };

        tracing::info!(
            "Loaded {} integration(s) from {}",
            records.len(),
            path.display()
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }
}

impl IntegrationStore for JsonFileIntegrationStore {
    fn create_or_update(&self, record: IntegrationRecord) -> anyhow::Result<()> {
        // Hold lock during serialization and write to prevent concurrent corruption
        let mut records = self.records.lock();
        let mut updated = records.clone();
        let created = upsert(&mut updated, record);

        let json = serde_json::to_string_pretty(&updated).context("Failed to serialize integrations")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write integration store: {}", self.path.display()))?;

        *records = updated;
        tracing::debug!(created, "Integration store written");
        Ok(())
    }

    fn list(&self) -> Vec<IntegrationRecord> {
        self.records.lock().clone()
    }
}
