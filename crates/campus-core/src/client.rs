// ── Query client ──
//
// The explicit, constructible cache object every consumer shares. Owns the
// cache store, the resource sources, the invalidation table, and the
// in-flight fetch registry. Query and mutation coordination live in
// `query` and `mutation`; this module wires them together.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use campus_api::{ResourceClient, ResourceKind, TlsMode, TransportConfig};

use crate::config::{CacheConfig, ClientConfig, TlsVerification};
use crate::error::CoreError;
use crate::invalidation::InvalidationRules;
use crate::key::CacheKey;
use crate::query::InFlight;
use crate::source::ResourceSource;
use crate::store::{CacheEntry, CacheStore};

// ── QueryClient ──────────────────────────────────────────────────────

/// Shared resource cache with query deduplication and mutation sync.
///
/// Cheaply cloneable via `Arc<ClientInner>`. Create one at start-up,
/// optionally [`start()`](Self::start) the background sweeper, and
/// [`shutdown()`](Self::shutdown) when done.
#[derive(Clone)]
pub struct QueryClient {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: CacheConfig,
    pub(crate) store: Arc<CacheStore>,
    sources: HashMap<ResourceKind, Arc<dyn ResourceSource>>,
    pub(crate) rules: InvalidationRules,
    /// One shared fetch per key, tagged with its sequence number.
    pub(crate) in_flight: DashMap<CacheKey, InFlight>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl QueryClient {
    pub fn builder() -> QueryClientBuilder {
        QueryClientBuilder::default()
    }

    /// Wire an HTTP `ResourceClient` for every resource kind whose service
    /// has a base URL. All adapters share one connection pool.
    pub fn from_config(config: &ClientConfig) -> Result<Self, CoreError> {
        if config.endpoints.is_empty() {
            return Err(CoreError::Config {
                message: "no service endpoints configured (set a gateway or per-service URLs)"
                    .into(),
            });
        }

        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.cache.request_timeout,
        };
        let http = transport.build_client()?;

        let mut builder = Self::builder().cache_config(config.cache);
        for kind in <ResourceKind as strum::IntoEnumIterator>::iter() {
            let Some(base) = config.endpoints.resolve(kind.service()) else {
                debug!(%kind, service = %kind.service(), "no endpoint configured, skipping");
                continue;
            };
            let client = ResourceClient::from_reqwest(base, http.clone(), kind)?
                .with_timeout(transport.timeout);
            builder = builder.source(kind, client);
        }
        Ok(builder.build())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.inner.store
    }

    pub fn rules(&self) -> &InvalidationRules {
        &self.inner.rules
    }

    pub(crate) fn source(&self, kind: ResourceKind) -> Result<Arc<dyn ResourceSource>, CoreError> {
        self.inner
            .sources
            .get(&kind)
            .cloned()
            .ok_or(CoreError::NoSource { resource: kind })
    }

    /// Resource kinds with a registered source.
    pub fn resources(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self.inner.sources.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }

    /// Snapshot of every cache entry, for diagnostics.
    pub fn entries(&self) -> Vec<Arc<CacheEntry>> {
        self.inner.store.entries()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the background sweeper that evicts idle entries every
    /// `gc_interval`. Calling it again is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() || self.inner.cancel.is_cancelled() {
            return;
        }
        let every = self.inner.config.gc_interval;
        if every.is_zero() {
            debug!("garbage collection disabled");
            return;
        }
        let store = Arc::clone(&self.inner.store);
        let cancel = self.inner.cancel.clone();
        handles.push(tokio::spawn(gc_task(store, every, cancel)));
        debug!(interval = ?every, "cache sweeper started");
    }

    /// Stop background tasks and drop all cached state. Live
    /// subscriptions observe their entry channels closing.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.in_flight.clear();
        self.inner.store.clear();
        info!("query client shut down");
    }
}

// ── Builder ──────────────────────────────────────────────────────────

/// Registers resource sources and tuning before building a `QueryClient`.
#[derive(Default)]
pub struct QueryClientBuilder {
    config: CacheConfig,
    sources: HashMap<ResourceKind, Arc<dyn ResourceSource>>,
    rules: InvalidationRules,
}

impl QueryClientBuilder {
    #[must_use]
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the source for `kind`, replacing any previous one.
    #[must_use]
    pub fn source(mut self, kind: ResourceKind, source: impl ResourceSource) -> Self {
        self.sources.insert(kind, Arc::new(source));
        self
    }

    /// Register one shared source for several kinds.
    #[must_use]
    pub fn shared_source(
        mut self,
        kinds: impl IntoIterator<Item = ResourceKind>,
        source: Arc<dyn ResourceSource>,
    ) -> Self {
        for kind in kinds {
            self.sources.insert(kind, Arc::clone(&source));
        }
        self
    }

    #[must_use]
    pub fn rules(mut self, rules: InvalidationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn build(self) -> QueryClient {
        QueryClient {
            inner: Arc::new(ClientInner {
                store: Arc::new(CacheStore::new(self.config.gc_time)),
                config: self.config,
                sources: self.sources,
                rules: self.rules,
                in_flight: DashMap::new(),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn gc_task(store: Arc<CacheStore>, every: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(every);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let evicted = store.collect_garbage(Instant::now());
                if evicted > 0 {
                    debug!(evicted, remaining = store.len(), "cache sweep");
                }
            }
        }
    }
}
