//! Integration artifacts and the provider contract
//!
//! A provider describes itself, supplies the steps of its setup pipeline and
//! turns the accumulated state into the record that gets persisted.

mod store;
pub mod types;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::{PipelineError, PipelineState, Step};

pub use store::{IntegrationStore, JsonFileIntegrationStore, MemoryIntegrationStore};
pub use types::{IntegrationDescriptor, IntegrationRecord};

#[async_trait]
pub trait IntegrationProvider: Send + Sync {
    fn descriptor(&self) -> &IntegrationDescriptor;

    /// Steps of the setup pipeline, in order
    fn pipeline_steps(&self) -> Vec<Arc<dyn Step>>;

    /// Finalizer: build the record from the completed state without mutating it
    async fn build_integration(
        &self,
        state: &PipelineState,
    ) -> Result<IntegrationRecord, PipelineError>;

    /// Account details fetched with a stored record's credential
    async fn account_info(&self, record: &IntegrationRecord) -> Result<Value, PipelineError>;
}
