//! Multi-step setup pipeline
//!
//! An ordered list of [`Step`]s is driven across independent HTTP requests.
//! Each step either suspends the run with a [`StepView`] or advances it,
//! binding a value into the shared [`PipelineState`]. Once every step has
//! advanced, the provider's finalizer turns the state into an integration
//! record.

mod engine;
mod error;
mod nested;
mod run;
mod state;
mod step;
mod view;

pub use engine::{MAX_RUN_TTL_DAYS, PipelineOutcome, SetupPipeline};
pub use error::PipelineError;
pub use nested::NestedPipelineStep;
pub use state::PipelineState;
pub use step::{Scratch, Step, StepRequest, StepResult};
pub use view::{Choice, FieldInput, FormField, FormView, StepView};
