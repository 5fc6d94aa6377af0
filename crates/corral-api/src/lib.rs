//! Corral API - HTTP surface of the control plane
//!
//! - ReBAC admin routes for groups, identities, entitlements and resources
//! - A session-token API guarded by per-route capability checks
//! - Authentication and authorization middleware shared by both

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod validation;

pub use routes::create_router_with_state;
pub use state::AppState;

#[cfg(test)]
mod tests;
