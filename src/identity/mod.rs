//! OAuth identity sub-pipeline
//!
//! Collects the account hostname, sends the user through the provider's
//! authorize page and exchanges the returned code. Run as a nested pipeline
//! it leaves `{instance, data: {access_token, scopes, ...}}` under the parent's
//! `identity` key.

mod provider;
mod steps;
pub mod types;

use std::sync::Arc;

use crate::pipeline::{NestedPipelineStep, Step};

pub use provider::{IdentityProvider, OAuthAppConfig, VstsIdentityProvider};
pub use steps::{InstanceStep, OAuthLoginStep};

pub const IDENTITY_KEY: &str = "identity";

/// Identity sub-pipeline bound under [`IDENTITY_KEY`]
///
/// Account hosts must end in `domain` unless `any_host` is set.
pub fn identity_pipeline_step(
    provider: Arc<dyn IdentityProvider>,
    scopes: Vec<String>,
    domain: &str,
    any_host: bool,
) -> Arc<dyn Step> {
    Arc::new(NestedPipelineStep::new(
        IDENTITY_KEY,
        vec![
            Arc::new(InstanceStep::new(domain).allow_any_host(any_host)),
            Arc::new(OAuthLoginStep::new(provider, scopes)),
        ],
    ))
}

#[cfg(test)]
pub(crate) use steps::tests::StaticIdentityProvider;
