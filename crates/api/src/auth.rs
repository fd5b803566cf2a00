//! Bearer-token identity resolution.
//!
//! Token issuance, sessions, and revocation belong to the auth collaborator;
//! this module only turns a presented credential into an [`Actor`]. The
//! in-memory [`TokenRegistry`] stands in for that collaborator the same way
//! the simulated gateway stands in for a payment processor.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use checkout::PaymentGateway;
use domain::Actor;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// Resolves a bearer credential to the calling actor.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns the actor for a valid token, `None` for an unknown or
    /// revoked one.
    async fn resolve(&self, token: &str) -> Option<Actor>;
}

/// In-memory token-to-actor registry.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: Arc<RwLock<HashMap<String, Actor>>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token for an actor, replacing any previous binding.
    pub fn register(&self, token: impl Into<String>, actor: Actor) {
        self.tokens.write().unwrap().insert(token.into(), actor);
    }

    /// Removes a token binding.
    pub fn revoke(&self, token: &str) {
        self.tokens.write().unwrap().remove(token);
    }
}

#[async_trait]
impl IdentityResolver for TokenRegistry {
    async fn resolve(&self, token: &str) -> Option<Actor> {
        self.tokens.read().unwrap().get(token).copied()
    }
}

/// Extractor yielding the authenticated [`Actor`].
///
/// Rejects with 401 when the `Authorization: Bearer` header is missing,
/// malformed, or names an unknown token.
pub struct Identity(pub Actor);

impl<S, G> FromRequestParts<Arc<AppState<S, G>>> for Identity
where
    S: Store,
    G: PaymentGateway + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S, G>>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .ok_or_else(ApiError::unauthorized)?;

        let actor = state
            .identity
            .resolve(token)
            .await
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Identity(actor))
    }
}
