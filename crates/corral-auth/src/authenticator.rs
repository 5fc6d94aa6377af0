//! Resolves request credentials to principals

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use corral_core::{
    Authenticator, BrowserSession, Entity, IdentityRepository, Principal, Result, TupleStore,
};

use crate::jwt::SessionTokenService;
use crate::session::BrowserSessionStore;

/// [`Authenticator`] backed by browser sessions and signed session tokens.
///
/// Principals are administrators when they hold `administrator` on the
/// local controller.
pub struct SessionAuthenticator {
    sessions: BrowserSessionStore,
    tokens: SessionTokenService,
    identities: Arc<dyn IdentityRepository>,
    store: Arc<dyn TupleStore>,
    controller: Entity,
}

impl SessionAuthenticator {
    pub fn new(
        sessions: BrowserSessionStore,
        tokens: SessionTokenService,
        identities: Arc<dyn IdentityRepository>,
        store: Arc<dyn TupleStore>,
        controller: Entity,
    ) -> Self {
        Self {
            sessions,
            tokens,
            identities,
            store,
            controller,
        }
    }

    pub fn sessions(&self) -> &BrowserSessionStore {
        &self.sessions
    }

    pub fn tokens(&self) -> &SessionTokenService {
        &self.tokens
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate_browser_session(&self, cookie_header: Option<&str>) -> Result<BrowserSession> {
        self.sessions.authenticate(cookie_header).await
    }

    async fn start_browser_session(&self, identity_name: &str) -> Result<String> {
        Ok(self.sessions.create(identity_name).await)
    }

    #[instrument(skip(self, token))]
    async fn login_with_session_token(&self, token: &str) -> Result<Principal> {
        let claims = self.tokens.validate(token)?;
        self.user_login(&claims.sub).await
    }

    #[instrument(skip(self))]
    async fn user_login(&self, identity_name: &str) -> Result<Principal> {
        let identity = self.identities.get_or_create_identity(identity_name).await?;
        let principal = Principal::login(identity, &self.controller, Arc::clone(&self.store)).await?;
        debug!(is_admin = principal.is_admin(), "Logged in");
        Ok(principal)
    }
}
