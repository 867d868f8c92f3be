//! Admin API module
//!
//! Read-only view of the integration registry, guarded by the admin API key
//!
//! # Usage
//! ```ignore
//! let admin_state = AdminState::new(admin_api_key, pipeline.clone());
//! let admin_router = create_admin_router(admin_state);
//! ```

mod handlers;
mod middleware;
mod router;
pub mod types;

pub use middleware::AdminState;
pub use router::create_admin_router;
