//! Resilient catalog client
//!
//! One instance per process. Every request:
//!
//! 1. reads the settings/transport snapshot once (the request boundary),
//! 2. picks a transport through [`stockbridge_core::route`],
//! 3. answers from the cache when a fresh GET entry exists,
//! 4. retries transient failures of idempotent verbs with exponential
//!    backoff,
//! 5. fails an idempotent direct request over to the proxy when the routing
//!    policy allows it.
//!
//! The whole exchange is bounded by the request deadline and aborted when
//! the caller's token or the client's transport epoch is cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use stockbridge_core::{route, RouteDecision};
use stockbridge_domain::{BridgeError, MetricsSnapshot, Result, Settings, TransportKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::cache::{cache_key, ResponseCache};
use super::metrics::ClientMetrics;
use super::request::{HttpRequest, HttpResponse, Target};
use super::transport::{HttpTransport, RawResponse, Transport};
use crate::errors::map_status_error;
use crate::time::{SharedClock, SystemClock};

/// Statuses worth another attempt of an idempotent request.
const RETRY_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

const PROBE_ENDPOINT: &str = "store/storeConfigs";

/// Settings and transports a request runs under from start to finish.
struct Snapshot {
    settings: Arc<Settings>,
    direct: Option<Arc<dyn Transport>>,
    proxy: Arc<dyn Transport>,
    mdm: Arc<dyn Transport>,
}

impl Snapshot {
    fn build(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let direct: Option<Arc<dyn Transport>> = match settings.catalog_root.as_deref() {
            Some(root) if !root.trim().is_empty() => {
                Some(Arc::new(HttpTransport::direct(root, settings.access_token.as_deref())?))
            }
            _ => None,
        };
        Ok(Self {
            direct,
            proxy: Arc::new(HttpTransport::proxy(&settings.gateway_url)?),
            mdm: Arc::new(HttpTransport::mdm(&settings.gateway_url)?),
            settings: Arc::new(settings),
        })
    }

    fn transport(&self, kind: TransportKind) -> Result<Arc<dyn Transport>> {
        match kind {
            TransportKind::Direct => self
                .direct
                .clone()
                .ok_or_else(|| BridgeError::Config("direct transport requires catalogRoot".into())),
            TransportKind::Proxy => Ok(Arc::clone(&self.proxy)),
            TransportKind::Mdm => Ok(Arc::clone(&self.mdm)),
        }
    }
}

/// Reachability of one transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub transport: TransportKind,
    pub reachable: bool,
    pub status: Option<u16>,
    pub latency_ms: u64,
    pub error: Option<String>,
}

pub struct CatalogClient {
    snapshot: RwLock<Arc<Snapshot>>,
    direct_enabled: AtomicBool,
    /// Parent of every in-flight catalog request; replaced on transport switch.
    epoch: Mutex<CancellationToken>,
    cache: ResponseCache<SharedClock>,
    metrics: ClientMetrics,
}

impl CatalogClient {
    pub fn builder(settings: Settings) -> CatalogClientBuilder {
        CatalogClientBuilder { settings, clock: None }
    }

    /// Client on the system clock.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] for invalid settings or base URLs.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder(settings).build()
    }

    pub fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.snapshot.read().settings)
    }

    pub fn direct_enabled(&self) -> bool {
        self.direct_enabled.load(Ordering::SeqCst)
    }

    /// Switch between direct and proxy.
    ///
    /// In-flight catalog requests are cancelled and the cache partition of
    /// the transport being left is dropped. Returns whether anything changed.
    pub fn set_direct_enabled(&self, enabled: bool) -> bool {
        if self.direct_enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return false;
        }

        let previous = std::mem::replace(&mut *self.epoch.lock(), CancellationToken::new());
        previous.cancel();

        let leaving = if enabled { TransportKind::Proxy } else { TransportKind::Direct };
        let purged = self.cache.purge_partition(leaving);
        info!(direct_enabled = enabled, purged, "switched catalog transport");
        true
    }

    /// Replace the settings. Requests already running keep the previous ones.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] when the new settings are invalid; the
    /// current ones stay in force.
    pub fn update_settings(&self, settings: Settings) -> Result<()> {
        let direct_enabled = settings.direct_enabled;
        let snapshot = Snapshot::build(settings)?;
        *self.snapshot.write() = Arc::new(snapshot);
        self.set_direct_enabled(direct_enabled);
        debug!(?direct_enabled, "catalog client settings updated");
        Ok(())
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.cache.len())
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Drop cached responses whose key starts with `prefix`.
    pub fn purge_cache(&self, prefix: &str) -> usize {
        let purged = self.cache.purge_prefix(prefix);
        if purged > 0 {
            debug!(prefix, purged, "purged cached responses");
        }
        purged
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Execute `request`.
    ///
    /// # Errors
    ///
    /// The classified failure of the last attempt, [`BridgeError::Timeout`]
    /// when the deadline passes and [`BridgeError::Cancelled`] when either
    /// the caller's token or a transport switch cancels the request.
    #[instrument(
        skip(self, request),
        fields(method = %request.method, endpoint = %request.endpoint)
    )]
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let snapshot = Arc::clone(&self.snapshot.read());
        let epoch = self.epoch.lock().clone();
        let settings = Arc::clone(&snapshot.settings);
        self.metrics.record_request();

        let first = match request.target {
            Target::Mdm => TransportKind::Mdm,
            Target::Catalog => {
                let direct_ready = snapshot.direct.is_some();
                match route(self.direct_enabled(), direct_ready, request.method, None) {
                    RouteDecision::Use(kind) => kind,
                    RouteDecision::Surface => {
                        return Err(BridgeError::Internal("no transport available".into()));
                    }
                }
            }
        };

        let key = (settings.cache_enabled && request.uses_cache())
            .then(|| cache_key(request.method, &request.endpoint, &request.params));
        if let Some(key) = &key {
            if let Some(body) = self.cache.get(first, key, settings.cache_duration()) {
                self.metrics.record_cache_hit();
                debug!(transport = %first, "served from cache");
                return Ok(HttpResponse {
                    status: 200,
                    body,
                    from_cache: true,
                    transport: first,
                    elapsed: Duration::ZERO,
                });
            }
        }

        let deadline = request.deadline.unwrap_or_else(|| settings.timeout());
        let started = Instant::now();
        // Transport currently carrying the request; moves on failover.
        let carrier = Mutex::new(first);
        let catalog = request.target == Target::Catalog;
        let attempt = self.dispatch(&snapshot, &request, first, &carrier);
        let outcome = tokio::select! {
            biased;
            () = request.cancel.cancelled() => Err(BridgeError::Cancelled),
            () = epoch.cancelled(), if catalog => Err(BridgeError::Cancelled),
            result = tokio::time::timeout(deadline, attempt) => {
                result.unwrap_or_else(|_| {
                    let millis = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                    Err(BridgeError::Timeout(millis))
                })
            }
        };

        match outcome {
            Ok((transport, raw)) => {
                self.metrics.record_outcome(transport, true);
                let body = parse_body(&raw.body);
                if let Some(key) = key {
                    self.cache.insert(
                        transport,
                        key,
                        body.clone(),
                        settings.cache_duration(),
                        settings.max_cache_size,
                    );
                }
                Ok(HttpResponse {
                    status: raw.status,
                    body,
                    from_cache: false,
                    transport,
                    elapsed: started.elapsed(),
                })
            }
            Err(BridgeError::Cancelled) => {
                debug!("request cancelled");
                Err(BridgeError::Cancelled)
            }
            Err(err) => {
                self.metrics.record_outcome(*carrier.lock(), false);
                Err(err)
            }
        }
    }

    /// Send through `first`, failing over to the proxy when allowed.
    ///
    /// `carrier` is switched to the fallback before it is tried, so a
    /// failure is always charged to the transport that produced it.
    async fn dispatch(
        &self,
        snapshot: &Snapshot,
        request: &HttpRequest,
        first: TransportKind,
        carrier: &Mutex<TransportKind>,
    ) -> Result<(TransportKind, RawResponse)> {
        let settings = &snapshot.settings;
        let transport = snapshot.transport(first)?;
        let err = match self.send_with_retry(transport.as_ref(), request, settings).await {
            Ok(raw) => return Ok((first, raw)),
            Err(err) => err,
        };

        if first != TransportKind::Direct {
            return Err(err);
        }
        match route(true, true, request.method, Some(&err)) {
            RouteDecision::Use(fallback) => {
                warn!(error = %err, to = %fallback, "direct request failed, failing over");
                self.metrics.record_direct_failover();
                *carrier.lock() = fallback;
                let transport = snapshot.transport(fallback)?;
                let raw = self.send_with_retry(transport.as_ref(), request, settings).await?;
                Ok((fallback, raw))
            }
            RouteDecision::Surface => Err(err),
        }
    }

    async fn send_with_retry(
        &self,
        transport: &dyn Transport,
        request: &HttpRequest,
        settings: &Settings,
    ) -> Result<RawResponse> {
        let attempts = if request.method.is_idempotent() {
            settings.retry_attempts.saturating_add(1)
        } else {
            1
        };

        for attempt in 0..attempts {
            let started = Instant::now();
            let result = transport.send(request, settings.timeout()).await;
            self.metrics.record_response_time(started.elapsed());

            let err = match result {
                Ok(raw) if raw.is_success() => return Ok(raw),
                Ok(raw) => {
                    let err = map_status_error(raw.status, &raw.body);
                    if !RETRY_STATUSES.contains(&raw.status) {
                        return Err(err);
                    }
                    err
                }
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            debug!(
                attempt = attempt + 1,
                transport = %transport.kind(),
                error = %err,
                "HTTP attempt failed"
            );
            if attempt + 1 < attempts {
                sleep_with_backoff(settings.retry_delay(), attempt + 1).await;
                continue;
            }
            return Err(err);
        }

        Err(BridgeError::Internal(
            "http client exhausted retries without producing a result".into(),
        ))
    }

    /// Check reachability of one transport with an uncached GET.
    ///
    /// Request metrics are left untouched.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] when probing `Direct` without a catalog root.
    #[instrument(skip(self))]
    pub async fn probe(&self, kind: TransportKind) -> Result<ProbeReport> {
        let snapshot = Arc::clone(&self.snapshot.read());
        let transport = snapshot.transport(kind)?;
        let request = HttpRequest::get(PROBE_ENDPOINT).no_cache();

        let started = Instant::now();
        let result = transport.send(&request, snapshot.settings.timeout()).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let report = match result {
            Ok(raw) if raw.is_success() => ProbeReport {
                transport: kind,
                reachable: true,
                status: Some(raw.status),
                latency_ms,
                error: None,
            },
            Ok(raw) => ProbeReport {
                transport: kind,
                reachable: false,
                status: Some(raw.status),
                latency_ms,
                error: Some(map_status_error(raw.status, &raw.body).to_string()),
            },
            Err(err) => ProbeReport {
                transport: kind,
                reachable: false,
                status: None,
                latency_ms,
                error: Some(err.to_string()),
            },
        };
        info!(transport = %kind, reachable = report.reachable, latency_ms, "transport probed");
        Ok(report)
    }
}

/// Builder for [`CatalogClient`].
pub struct CatalogClientBuilder {
    settings: Settings,
    clock: Option<SharedClock>,
}

impl CatalogClientBuilder {
    /// Clock used for cache entry ages.
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<CatalogClient> {
        let direct_enabled = self.settings.direct_enabled;
        let snapshot = Snapshot::build(self.settings)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(CatalogClient {
            snapshot: RwLock::new(Arc::new(snapshot)),
            direct_enabled: AtomicBool::new(direct_enabled),
            epoch: Mutex::new(CancellationToken::new()),
            cache: ResponseCache::with_clock(clock),
            metrics: ClientMetrics::new(),
        })
    }
}

fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn backoff_delay(base: Duration, retry_number: u32) -> Duration {
    let shift = retry_number.saturating_sub(1).min(8);
    base.saturating_mul(1u32 << shift)
}

async fn sleep_with_backoff(base: Duration, retry_number: u32) {
    let delay = backoff_delay(base, retry_number);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
