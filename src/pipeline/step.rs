//! Step contract
//!
//! A step is dispatched once per inbound request while it is current. It
//! either suspends the run with a view or advances it, optionally binding a
//! value into the shared state.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::error::PipelineError;
use super::state::PipelineState;
use super::view::StepView;

/// Private per-step storage that survives between requests
pub type Scratch = Map<String, Value>;

/// Input of a single dispatch: the run id plus query/form parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepRequest {
    run_id: String,
    params: HashMap<String, String>,
}

impl StepRequest {
    pub fn new(run_id: impl Into<String>, params: HashMap<String, String>) -> Self {
        Self {
            run_id: run_id.into(),
            params,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Same run, no user input; used to render the step that follows an advance
    pub fn without_input(&self) -> Self {
        Self {
            run_id: self.run_id.clone(),
            params: HashMap::new(),
        }
    }
}

/// Value a step asks the engine to bind when it advances
#[derive(Debug, Clone, PartialEq)]
pub struct StepBinding {
    pub key: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    NeedsInput(StepView),
    Advance(Option<StepBinding>),
}

impl StepResult {
    pub fn advance(key: impl Into<String>, value: Value) -> Self {
        StepResult::Advance(Some(StepBinding {
            key: key.into(),
            value,
        }))
    }
}

#[async_trait]
pub trait Step: Send + Sync {
    /// Namespace of this step's bindings and scratch area
    fn key(&self) -> &str;

    async fn dispatch(
        &self,
        request: &StepRequest,
        state: &PipelineState,
        scratch: &mut Scratch,
    ) -> Result<StepResult, PipelineError>;
}
