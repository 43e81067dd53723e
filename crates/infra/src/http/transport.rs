//! Direct, proxy and MDM transports
//!
//! A transport turns one attempt of an [`HttpRequest`] into a raw response.
//! Retries, routing and caching live in the client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Method};
use stockbridge_domain::{BridgeError, HttpMethod, Result, TransportKind};
use tracing::debug;
use url::Url;

use super::request::HttpRequest;
use crate::errors::InfraError;

/// Status and body of one attempt, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Send a single attempt.
    ///
    /// # Errors
    ///
    /// Only transport-level failures (connection, timeout); HTTP error
    /// statuses come back as a [`RawResponse`].
    async fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<RawResponse>;
}

/// reqwest-backed transport rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    kind: TransportKind,
    client: ReqwestClient,
    base: Url,
    bearer: Option<String>,
}

impl HttpTransport {
    /// `<catalog_root>/rest/V1`, authenticated with `token`.
    pub fn direct(catalog_root: &str, token: Option<&str>) -> Result<Self> {
        let base = format!("{}/rest/V1", catalog_root.trim_end_matches('/'));
        let bearer = token.filter(|t| !t.is_empty()).map(str::to_string);
        Self::build(TransportKind::Direct, &base, bearer)
    }

    /// `<gateway>/api/magento`; the gateway adds credentials.
    pub fn proxy(gateway_url: &str) -> Result<Self> {
        let base = format!("{}/api/magento", gateway_url.trim_end_matches('/'));
        Self::build(TransportKind::Proxy, &base, None)
    }

    /// `<gateway>/api`, for the MDM endpoints.
    pub fn mdm(gateway_url: &str) -> Result<Self> {
        let base = format!("{}/api", gateway_url.trim_end_matches('/'));
        Self::build(TransportKind::Mdm, &base, None)
    }

    fn build(kind: TransportKind, base: &str, bearer: Option<String>) -> Result<Self> {
        let base = Url::parse(base).map_err(|err| {
            BridgeError::Config(format!("invalid {kind} base URL '{base}': {err}"))
        })?;
        let client = ReqwestClient::builder()
            .no_proxy()
            .user_agent(concat!("stockbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| BridgeError::from(InfraError::from(err)))?;
        Ok(Self { kind, client, base, bearer })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL of `request`, query string included.
    pub fn url_for(&self, request: &HttpRequest) -> Result<Url> {
        let joined = format!("{}/{}", self.base.as_str().trim_end_matches('/'), request.endpoint);
        let mut url = Url::parse(&joined).map_err(|err| {
            BridgeError::Validation(format!("invalid endpoint '{}': {err}", request.endpoint))
        })?;
        if !request.params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.params {
                pairs.append_pair(key, &value.to_string());
            }
        }
        Ok(url)
    }
}

const fn reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn send(&self, request: &HttpRequest, timeout: Duration) -> Result<RawResponse> {
        let url = self.url_for(request)?;
        debug!(transport = %self.kind, method = %request.method, %url, "sending HTTP request");

        let mut builder = self.client.request(reqwest_method(request.method), url).timeout(timeout);
        if let Some(token) = &self.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response =
            builder.send().await.map_err(|err| BridgeError::from(InfraError::from(err)))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| BridgeError::from(InfraError::from(err)))?;
        debug!(transport = %self.kind, status, "received HTTP response");
        Ok(RawResponse { status, body })
    }
}
