//! Cached tuple store with in-flight deduplication
//!
//! - Moka async cache for relation checks
//! - Concurrent identical checks and reads share one upstream call
//! - Any write invalidates the whole check cache; checks started before the
//!   write neither join later callers nor repopulate the cache

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use corral_core::{
    Entity, Kind, ReadResponse, Relation, Result, SingleFlight, TokenPagination, Tuple, TupleFilter,
    TupleStore,
};

/// Cache key for relation checks
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CheckKey {
    tuple: Tuple,
    contextual: Vec<Tuple>,
}

/// In-flight check key, scoped to the write generation it started in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InFlightCheck {
    key: CheckKey,
    generation: u64,
}

/// Key for deduplicating identical reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ReadKey {
    filter: TupleFilter,
    page: TokenPagination,
}

/// Configuration for the cached store
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached check results
    pub max_capacity: u64,
    /// How long a check result may be served from cache
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Duration::from_secs(30),
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Default)]
pub struct CacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// Wraps another store with check caching and call deduplication
pub struct CachedTupleStore {
    inner: Arc<dyn TupleStore>,
    checks: Cache<CheckKey, bool>,
    checks_in_flight: SingleFlight<InFlightCheck, Result<bool>>,
    reads_in_flight: SingleFlight<ReadKey, Result<ReadResponse>>,
    /// Bumped on every write
    generation: AtomicU64,
    metrics: Arc<CacheMetrics>,
}

impl CachedTupleStore {
    pub fn new(inner: Arc<dyn TupleStore>, config: CacheConfig) -> Self {
        let checks = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            inner,
            checks,
            checks_in_flight: SingleFlight::new(),
            reads_in_flight: SingleFlight::new(),
            generation: AtomicU64::new(0),
            metrics: Arc::new(CacheMetrics::default()),
        }
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Drop every cached check result
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.checks.invalidate_all();
        self.metrics.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!("Invalidated relation check cache");
    }
}

#[async_trait]
impl TupleStore for CachedTupleStore {
    async fn add_relation(&self, tuples: &[Tuple]) -> Result<()> {
        let result = self.inner.add_relation(tuples).await;
        self.invalidate_all();
        result
    }

    async fn remove_relation(&self, tuples: &[Tuple]) -> Result<()> {
        let result = self.inner.remove_relation(tuples).await;
        self.invalidate_all();
        result
    }

    #[instrument(skip(self, contextual), fields(tuple = %tuple))]
    async fn check_relation(&self, tuple: &Tuple, contextual: &[Tuple]) -> Result<bool> {
        let key = CheckKey {
            tuple: tuple.clone(),
            contextual: contextual.to_vec(),
        };

        if let Some(allowed) = self.checks.get(&key).await {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            debug!(allowed, "Relation check cache hit");
            return Ok(allowed);
        }
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        debug!(in_flight = self.checks_in_flight.in_flight(), "Relation check cache miss");

        let generation = self.generation.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let call = key.clone();
        let allowed = self
            .checks_in_flight
            .run(
                InFlightCheck {
                    key: key.clone(),
                    generation,
                },
                move || async move { inner.check_relation(&call.tuple, &call.contextual).await },
            )
            .await??;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(allowed, "Relations changed during check, not caching");
            return Ok(allowed);
        }
        self.checks.insert(key.clone(), allowed).await;
        // A write may have landed between the generation check and the insert.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.checks.invalidate(&key).await;
        }
        Ok(allowed)
    }

    async fn list_relations(&self, filter: &TupleFilter, page: &TokenPagination) -> Result<ReadResponse> {
        let key = ReadKey {
            filter: filter.clone(),
            page: page.clone(),
        };
        let inner = Arc::clone(&self.inner);
        let call = key.clone();
        self.reads_in_flight
            .run(key, move || async move { inner.list_relations(&call.filter, &call.page).await })
            .await?
    }

    async fn list_objects(&self, object: &Entity, relation: Relation, kind: Kind) -> Result<Vec<Entity>> {
        self.inner.list_objects(object, relation, kind).await
    }

    async fn health_check(&self) -> Result<()> {
        self.inner.health_check().await
    }
}
