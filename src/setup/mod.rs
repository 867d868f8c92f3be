//! Setup dialog HTTP surface
//!
//! Drives a [`SetupPipeline`](crate::pipeline::SetupPipeline) from browser
//! requests: step forms are rendered as HTML, redirects are followed by the
//! browser and the provider's OAuth callback lands on the same URL.

mod router;
mod templates;

pub use router::create_setup_router;
