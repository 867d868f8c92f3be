//! Step cursor and the loop that moves it

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::PipelineError;
use super::state::PipelineState;
use super::step::{Scratch, Step, StepRequest, StepResult};
use super::view::StepView;

/// Cursor, bindings and per-step scratch of one (possibly nested) run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    cursor: usize,
    state: PipelineState,
    #[serde(default)]
    scratch: HashMap<String, Scratch>,
}

impl RunProgress {
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_state(&self) -> &PipelineState {
        &self.state
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    pub fn bind_state(
        &mut self,
        owner: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<(), PipelineError> {
        self.state.bind(owner, key, value)
    }

    /// Move past the current step, dropping its scratch area
    pub fn next_step(&mut self, finished_key: &str) {
        self.scratch.remove(finished_key);
        self.cursor += 1;
    }
}

/// Where a drive stopped
#[derive(Debug, Clone, PartialEq)]
pub enum Drive {
    /// The current step is waiting for the user
    Suspended(StepView),
    /// Every step has advanced
    Completed,
}

/// Dispatch steps from the cursor on until one suspends or all complete
///
/// Only the first step sees the caller's input; a step reached by advancing is
/// dispatched with an input-free request so it renders. On error `progress`
/// keeps everything committed by the steps that advanced before the failure.
pub async fn drive(
    steps: &[Arc<dyn Step>],
    progress: &mut RunProgress,
    request: &StepRequest,
) -> Result<Drive, PipelineError> {
    let mut request = request.clone();

    while let Some(step) = steps.get(progress.cursor) {
        let key = step.key();
        let scratch = progress.scratch.entry(key.to_string()).or_default();

        match step.dispatch(&request, &progress.state, scratch).await? {
            StepResult::NeedsInput(view) => {
                tracing::debug!(step = key, cursor = progress.cursor, "Step needs input");
                return Ok(Drive::Suspended(view));
            }
            StepResult::Advance(binding) => {
                if let Some(binding) = binding {
                    progress.bind_state(key, binding.key, binding.value)?;
                }
                tracing::debug!(step = key, cursor = progress.cursor, "Step advanced");
                progress.next_step(key);
                request = request.without_input();
            }
        }
    }

    Ok(Drive::Completed)
}
