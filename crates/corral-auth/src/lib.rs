//! Session authentication for corral
//!
//! Browser sessions for the admin UI, signed session tokens for API clients,
//! and the [`SessionAuthenticator`] that turns either into a principal.

pub mod authenticator;
pub mod jwt;
pub mod session;

pub use authenticator::SessionAuthenticator;
pub use jwt::{SessionClaims, SessionToken, SessionTokenService};
pub use session::{BrowserSessionStore, SessionConfig};
