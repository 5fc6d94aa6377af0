//! Entitlement pagination across resource kinds
//!
//! A client pages through every direct relation a user or group holds with a
//! single opaque token. The token wraps the tuple store's own cursor together
//! with the resource kind currently being read, and kinds are visited in the
//! fixed order of [`ENTITLEMENT_RESOURCES`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::error::CorralError;
use crate::pagination::TokenPagination;
use crate::traits::TupleStore;
use crate::tuple::{Entity, Kind, Tuple, TupleFilter};

/// Kinds exposed as entitlements, in the order they are returned
pub const ENTITLEMENT_RESOURCES: [Kind; 6] = [
    Kind::Controller,
    Kind::Cloud,
    Kind::Model,
    Kind::ApplicationOffer,
    Kind::Group,
    Kind::ServiceAccount,
];

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("marshal entitlement token: kind not specified")]
    MissingKind,

    #[error("failed to decode token: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to unmarshal token: {0}")]
    Unmarshal(#[from] serde_json::Error),
}

impl From<TokenError> for CorralError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingKind => CorralError::internal_error(err.to_string()),
            other => CorralError::pagination(format!("failed to decode pagination token: {}", other)),
        }
    }
}

/// A resource kind paired with a tuple-store cursor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboToken {
    #[serde(default, deserialize_with = "empty_kind_as_none")]
    pub kind: Option<Kind>,
    #[serde(rename = "token", default)]
    pub openfga_token: String,
}

fn empty_kind_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Kind>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(kind) => kind.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl ComboToken {
    pub fn new(kind: Kind, openfga_token: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            openfga_token: openfga_token.into(),
        }
    }

    /// Encode as base64 (standard alphabet) of `{"kind":..,"token":..}`
    pub fn marshal(&self) -> Result<String, TokenError> {
        if self.kind.is_none() {
            return Err(TokenError::MissingKind);
        }
        let json = serde_json::to_vec(self)?;
        Ok(BASE64.encode(json))
    }

    pub fn unmarshal(token: &str) -> Result<Self, TokenError> {
        let raw = BASE64.decode(token)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// The client-visible entitlement cursor; empty means "start from the first kind"
/// when sent and "no more results" when returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitlementToken(String);

impl EntitlementToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntitlementToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split an entitlement token into the store cursor and the kind to read.
pub fn decode_entitlement_token(token: &EntitlementToken) -> crate::Result<(String, Kind)> {
    if token.is_empty() {
        return Ok((String::new(), ENTITLEMENT_RESOURCES[0]));
    }
    let combo = ComboToken::unmarshal(token.as_str())?;
    let kind = combo
        .kind
        .ok_or_else(|| CorralError::pagination("failed to decode pagination token: kind not specified"))?;
    if !ENTITLEMENT_RESOURCES.contains(&kind) {
        return Err(CorralError::pagination(format!(
            "failed to decode pagination token: {} is not an entitlement resource",
            kind
        )));
    }
    Ok((combo.openfga_token, kind))
}

/// Build the token for the page after one read of `kind` returned `openfga_token`.
///
/// A non-empty store cursor stays on the same kind. An empty cursor moves on
/// to the next kind, and after the last kind the empty token is returned.
pub fn next_entitlement_token(kind: Kind, openfga_token: &str) -> crate::Result<EntitlementToken> {
    let mut combo = ComboToken::new(kind, openfga_token);
    if openfga_token.is_empty() {
        let index = ENTITLEMENT_RESOURCES
            .iter()
            .position(|k| *k == kind)
            .ok_or_else(|| {
                CorralError::internal_error(format!(
                    "failed to generate next entitlement token: unable to determine next resource after {}",
                    kind
                ))
            })?;
        match ENTITLEMENT_RESOURCES.get(index + 1) {
            Some(next) => combo.kind = Some(*next),
            None => return Ok(EntitlementToken::default()),
        }
    }
    Ok(EntitlementToken(combo.marshal()?))
}

/// One page of a subject's direct entitlements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitlementPage {
    pub tuples: Vec<Tuple>,
    /// Token for the following page; empty once every kind has been read
    pub next_token: EntitlementToken,
}

/// Read the next page of relations held directly by `subject`.
///
/// Each call reads a single kind, so a page may be empty while the returned
/// token still points at later kinds. Callers keep requesting pages until
/// the token comes back empty.
#[instrument(skip(store), fields(subject = %subject))]
pub async fn list_entitlements(
    store: &dyn TupleStore,
    subject: &Entity,
    size: i64,
    token: &EntitlementToken,
) -> crate::Result<EntitlementPage> {
    let (cursor, kind) = decode_entitlement_token(token)?;
    let filter = TupleFilter::new()
        .object(subject.clone())
        .target(Entity::of_kind(kind));
    let response = store
        .list_relations(&filter, &TokenPagination::new(size, cursor))
        .await?;
    let next_token = next_entitlement_token(kind, &response.continuation_token)?;
    debug!(kind = %kind, count = response.tuples.len(), "Listed entitlements");
    Ok(EntitlementPage {
        tuples: response.tuples,
        next_token,
    })
}
