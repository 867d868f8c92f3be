//! Sub-pipeline exposed as a single step

use std::sync::Arc;

use async_trait::async_trait;

use super::error::PipelineError;
use super::run::{Drive, RunProgress, drive};
use super::state::PipelineState;
use super::step::{Scratch, Step, StepRequest, StepResult};

const PROGRESS_KEY: &str = "progress";

/// Runs its own steps against a private sub-state kept in its scratch area.
/// When they all advance, binds the sub-state under `bind_key` in the parent.
pub struct NestedPipelineStep {
    bind_key: String,
    steps: Vec<Arc<dyn Step>>,
}

impl NestedPipelineStep {
    pub fn new(bind_key: impl Into<String>, steps: Vec<Arc<dyn Step>>) -> Self {
        Self {
            bind_key: bind_key.into(),
            steps,
        }
    }

    fn load_progress(scratch: &Scratch) -> Result<RunProgress, PipelineError> {
        match scratch.get(PROGRESS_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| PipelineError::MissingState(format!("nested progress: {}", e))),
            None => Ok(RunProgress::default()),
        }
    }

    fn save_progress(scratch: &mut Scratch, progress: &RunProgress) -> Result<(), PipelineError> {
        let value = serde_json::to_value(progress)
            .map_err(|e| PipelineError::MissingState(format!("nested progress: {}", e)))?;
        scratch.insert(PROGRESS_KEY.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl Step for NestedPipelineStep {
    fn key(&self) -> &str {
        &self.bind_key
    }

    async fn dispatch(
        &self,
        request: &StepRequest,
        _state: &PipelineState,
        scratch: &mut Scratch,
    ) -> Result<StepResult, PipelineError> {
        let mut progress = Self::load_progress(scratch)?;

        match drive(&self.steps, &mut progress, request).await {
            Ok(Drive::Completed) => {
                scratch.remove(PROGRESS_KEY);
                tracing::debug!(bind_key = %self.bind_key, "Nested pipeline completed");
                Ok(StepResult::advance(
                    self.bind_key.clone(),
                    progress.into_state().to_value(),
                ))
            }
            Ok(Drive::Suspended(view)) => {
                Self::save_progress(scratch, &progress)?;
                Ok(StepResult::NeedsInput(view))
            }
            Err(e) => {
                // Sub-steps that advanced before the failure stay advanced
                Self::save_progress(scratch, &progress)?;
                Err(e)
            }
        }
    }
}
