//! Request and response values exchanged with the catalog client

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use stockbridge_core::{ParamValue, Params};
use stockbridge_domain::{BridgeError, HttpMethod, Result, TransportKind};
use tokio_util::sync::CancellationToken;

/// Backend a request is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The e-commerce catalog, reached directly or through the proxy.
    Catalog,
    /// The MDM endpoints of the local gateway.
    Mdm,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Path relative to the transport base, e.g. `inventory/source-items`.
    pub endpoint: String,
    pub params: Params,
    pub body: Option<Value>,
    /// Only honoured for GETs.
    pub cacheable: bool,
    pub target: Target,
    /// Overall deadline across attempts; the configured timeout when unset.
    pub deadline: Option<Duration>,
    pub cancel: CancellationToken,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into().trim_start_matches('/').to_string(),
            params: Params::new(),
            body: None,
            cacheable: method == HttpMethod::Get,
            target: Target::Catalog,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(HttpMethod::Post, endpoint).with_body(body)
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.cacheable = false;
        self
    }

    #[must_use]
    pub fn mdm(mut self) -> Self {
        self.target = Target::Mdm;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub(crate) fn uses_cache(&self) -> bool {
        self.cacheable && self.method == HttpMethod::Get
    }
}

/// Successful (2xx) response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    /// Parsed JSON body; `Null` for an empty body.
    pub body: Value,
    pub from_cache: bool,
    pub transport: TransportKind,
    pub elapsed: Duration,
}

impl HttpResponse {
    /// Deserialize the body.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Internal`] when the body does not have the expected shape.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone())
            .map_err(|err| BridgeError::Internal(format!("unexpected response shape: {err}")))
    }
}
