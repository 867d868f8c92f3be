//! Visual Studio Team Services provider
//!
//! REST client for account instances, the default project step and the
//! provider that ties both to the identity sub-pipeline.

mod client;
mod integration;
mod project_step;
pub mod types;

pub use client::VstsClient;
pub use integration::VstsIntegration;
