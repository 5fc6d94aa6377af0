//! OpenFGA HTTP client implementation

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use corral_core::{
    CorralError, Entity, Kind, ReadResponse, Relation, Result, TokenPagination, Tuple, TupleFilter,
    TupleStore,
};

/// Configuration for the OpenFGA connection
#[derive(Debug, Clone)]
pub struct OpenFgaConfig {
    /// API URL (e.g., "http://localhost:8080")
    pub api_url: String,
    /// Pre-shared key sent as a bearer token
    pub api_token: Option<String>,
    pub store_id: String,
    /// Authorization model to pin requests to; the store's latest otherwise
    pub authorization_model_id: Option<String>,
    pub timeout: Duration,
}

impl Default for OpenFgaConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_token: None,
            store_id: String::new(),
            authorization_model_id: None,
            timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
struct TupleKey {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    relation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    object: String,
}

impl From<&Tuple> for TupleKey {
    fn from(tuple: &Tuple) -> Self {
        Self {
            user: tuple.object.to_string(),
            relation: tuple.relation.to_string(),
            object: tuple.target.to_string(),
        }
    }
}

impl From<&TupleFilter> for TupleKey {
    fn from(filter: &TupleFilter) -> Self {
        Self {
            user: filter.object.as_ref().map(ToString::to_string).unwrap_or_default(),
            relation: filter.relation.map(|r| r.to_string()).unwrap_or_default(),
            object: filter.target.as_ref().map(ToString::to_string).unwrap_or_default(),
        }
    }
}

impl TryFrom<TupleKey> for Tuple {
    type Error = CorralError;

    fn try_from(key: TupleKey) -> Result<Self> {
        let unexpected = |what: &str, value: &str, err: CorralError| {
            CorralError::openfga_error(format!("unexpected {} {:?} in tuple: {}", what, value, err))
        };
        let object: Entity = key.user.parse().map_err(|e| unexpected("user", &key.user, e))?;
        let relation: Relation = key
            .relation
            .parse()
            .map_err(|e| unexpected("relation", &key.relation, e))?;
        let target: Entity = key.object.parse().map_err(|e| unexpected("object", &key.object, e))?;
        Ok(Tuple::new(object, relation, target))
    }
}

#[derive(Debug, Serialize)]
struct TupleKeys {
    tuple_keys: Vec<TupleKey>,
}

#[derive(Debug, Serialize)]
struct WriteRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    writes: Option<TupleKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deletes: Option<TupleKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CheckRequest<'a> {
    tuple_key: TupleKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    contextual_tuples: Option<TupleKeys>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    allowed: bool,
}

#[derive(Debug, Serialize)]
struct ReadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    tuple_key: Option<TupleKey>,
    page_size: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    continuation_token: String,
}

#[derive(Debug, Deserialize)]
struct ReadTuple {
    key: TupleKey,
}

#[derive(Debug, Deserialize)]
struct ReadResponseBody {
    #[serde(default)]
    tuples: Vec<ReadTuple>,
    #[serde(default)]
    continuation_token: String,
}

#[derive(Debug, Serialize)]
struct ListObjectsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization_model_id: Option<&'a str>,
    #[serde(rename = "type")]
    kind: &'a str,
    relation: &'a str,
    user: String,
}

#[derive(Debug, Deserialize)]
struct ListObjectsResponse {
    #[serde(default)]
    objects: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// A failed store call, kept apart so writes can recognise idempotent failures
#[derive(Debug)]
struct StoreFailure {
    status: Option<StatusCode>,
    body: ErrorBody,
}

impl StoreFailure {
    fn transport(err: reqwest::Error) -> Self {
        Self {
            status: err.status(),
            body: ErrorBody {
                code: "transport".to_string(),
                message: err.to_string(),
            },
        }
    }

    fn is_duplicate_write(&self) -> bool {
        self.status == Some(StatusCode::BAD_REQUEST)
            && self.body.message.contains("cannot write a tuple which already exists")
    }

    fn is_missing_delete(&self) -> bool {
        self.status == Some(StatusCode::BAD_REQUEST)
            && self.body.message.contains("cannot delete a tuple which does not exist")
    }
}

impl From<StoreFailure> for CorralError {
    fn from(failure: StoreFailure) -> Self {
        match failure.status {
            Some(status) => CorralError::openfga_error(format!(
                "{} ({}): {}",
                status, failure.body.code, failure.body.message
            )),
            None => CorralError::openfga_error(failure.body.message),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum WriteOp {
    Add,
    Remove,
}

// =============================================================================
// Client
// =============================================================================

/// OpenFGA client providing typed access to the store's HTTP API
#[derive(Clone)]
pub struct OpenFgaClient {
    http: reqwest::Client,
    config: Arc<OpenFgaConfig>,
}

impl OpenFgaClient {
    #[instrument(skip(config), fields(api_url = %config.api_url, store_id = %config.store_id))]
    pub fn new(config: OpenFgaConfig) -> Result<Self> {
        if config.store_id.is_empty() {
            return Err(CorralError::config_error("OpenFGA store id is required"));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CorralError::openfga_error(format!("Failed to build HTTP client: {}", e)))?;
        info!("Configured OpenFGA client");
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    fn url(&self, action: &str) -> String {
        format!(
            "{}/stores/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.store_id,
            action
        )
    }

    fn model_id(&self) -> Option<&str> {
        self.config.authorization_model_id.as_deref()
    }

    async fn post<B, R>(&self, action: &str, body: &B) -> std::result::Result<R, StoreFailure>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let mut request = self.http.post(self.url(action)).json(body);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(StoreFailure::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            return Err(StoreFailure {
                status: Some(status),
                body,
            });
        }
        response.json::<R>().await.map_err(StoreFailure::transport)
    }

    async fn write(&self, op: WriteOp, tuples: &[Tuple]) -> std::result::Result<(), StoreFailure> {
        let keys = TupleKeys {
            tuple_keys: tuples.iter().map(TupleKey::from).collect(),
        };
        let (writes, deletes) = match op {
            WriteOp::Add => (Some(keys), None),
            WriteOp::Remove => (None, Some(keys)),
        };
        let request = WriteRequest {
            writes,
            deletes,
            authorization_model_id: self.model_id(),
        };
        self.post::<_, serde_json::Value>("write", &request).await.map(|_| ())
    }

    /// Write `tuples`, treating duplicate adds and missing removes as done.
    ///
    /// OpenFGA rejects a whole batch when one tuple is a duplicate, so such a
    /// batch is retried one tuple at a time.
    async fn write_idempotent(&self, op: WriteOp, tuples: &[Tuple]) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }
        let ignorable = |failure: &StoreFailure| match op {
            WriteOp::Add => failure.is_duplicate_write(),
            WriteOp::Remove => failure.is_missing_delete(),
        };
        match self.write(op, tuples).await {
            Ok(()) => Ok(()),
            Err(failure) if ignorable(&failure) && tuples.len() == 1 => {
                debug!(?op, "Ignoring idempotent write failure");
                Ok(())
            }
            Err(failure) if ignorable(&failure) => {
                debug!(?op, count = tuples.len(), "Retrying batch one tuple at a time");
                for tuple in tuples {
                    match self.write(op, std::slice::from_ref(tuple)).await {
                        Ok(()) => {}
                        Err(failure) if ignorable(&failure) => {}
                        Err(failure) => return Err(failure.into()),
                    }
                }
                Ok(())
            }
            Err(failure) => {
                warn!(?op, error = %failure.body.message, "OpenFGA write failed");
                Err(failure.into())
            }
        }
    }
}

#[async_trait]
impl TupleStore for OpenFgaClient {
    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn add_relation(&self, tuples: &[Tuple]) -> Result<()> {
        self.write_idempotent(WriteOp::Add, tuples).await
    }

    #[instrument(skip(self, tuples), fields(count = tuples.len()))]
    async fn remove_relation(&self, tuples: &[Tuple]) -> Result<()> {
        self.write_idempotent(WriteOp::Remove, tuples).await
    }

    #[instrument(skip(self, contextual), fields(tuple = %tuple))]
    async fn check_relation(&self, tuple: &Tuple, contextual: &[Tuple]) -> Result<bool> {
        let request = CheckRequest {
            tuple_key: TupleKey::from(tuple),
            contextual_tuples: (!contextual.is_empty()).then(|| TupleKeys {
                tuple_keys: contextual.iter().map(TupleKey::from).collect(),
            }),
            authorization_model_id: self.model_id(),
        };
        let response: CheckResponse = self.post("check", &request).await?;
        debug!(allowed = response.allowed, "Checked relation");
        Ok(response.allowed)
    }

    #[instrument(skip(self))]
    async fn list_relations(&self, filter: &TupleFilter, page: &TokenPagination) -> Result<ReadResponse> {
        let key = TupleKey::from(filter);
        let request = ReadRequest {
            tuple_key: (key != TupleKey::default()).then_some(key),
            page_size: page.limit(),
            continuation_token: page.token().to_string(),
        };
        let response: ReadResponseBody = self.post("read", &request).await?;
        let tuples = response
            .tuples
            .into_iter()
            .map(|t| Tuple::try_from(t.key))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = tuples.len(), "Read relations");
        Ok(ReadResponse {
            tuples,
            continuation_token: response.continuation_token,
        })
    }

    #[instrument(skip(self))]
    async fn list_objects(&self, object: &Entity, relation: Relation, kind: Kind) -> Result<Vec<Entity>> {
        let request = ListObjectsRequest {
            authorization_model_id: self.model_id(),
            kind: kind.as_str(),
            relation: relation.as_str(),
            user: object.to_string(),
        };
        let response: ListObjectsResponse = self.post("list-objects", &request).await?;
        response
            .objects
            .iter()
            .map(|raw| {
                raw.parse()
                    .map_err(|e| CorralError::openfga_error(format!("unexpected object {:?}: {}", raw, e)))
            })
            .collect()
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<()> {
        let url = format!(
            "{}/stores/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.store_id
        );
        let mut request = self.http.get(url);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| CorralError::openfga_error(format!("OpenFGA unreachable: {}", e)))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(CorralError::openfga_error(format!(
                "OpenFGA store check returned {}",
                response.status()
            )))
        }
    }
}
