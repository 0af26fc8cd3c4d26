// Async HTTP adapter for one resource type.
//
// Collection:  <service>/<kind path>        GET (list), POST (create)
// Item:        <service>/<kind path>/<id>   GET, PUT, DELETE
//
// Adapters are stateless and never cache; caching belongs to campus-core.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::filters::Filters;
use crate::page::Page;
use crate::resource::ResourceKind;
use crate::transport::TransportConfig;

// ── Error response shape shared by the services ──────────────────────

#[derive(serde::Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for a single resource type on its owning service.
#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    collection_url: Url,
    kind: ResourceKind,
    timeout: Duration,
}

impl ResourceClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build with a dedicated HTTP client from a transport config.
    pub fn new(
        service_url: &Url,
        kind: ResourceKind,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::from_reqwest(service_url, http, kind)?.with_timeout(transport.timeout))
    }

    /// Wrap an existing `reqwest::Client`, typically shared by all adapters.
    pub fn from_reqwest(
        service_url: &Url,
        http: reqwest::Client,
        kind: ResourceKind,
    ) -> Result<Self, Error> {
        let collection_url = Self::collection_url_for(service_url, kind)?;
        Ok(Self {
            http,
            collection_url,
            kind,
            timeout: TransportConfig::default().timeout,
        })
    }

    /// Record the timeout the underlying HTTP client enforces, for error reporting.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `https://fees.school.test/` + `api/v1/fees/payments`, without a trailing slash.
    pub fn collection_url_for(service_url: &Url, kind: ResourceKind) -> Result<Url, Error> {
        if service_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let mut url = service_url.clone();
        let base = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{base}/{}", kind.path()));
        url.set_query(None);
        Ok(url)
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn collection_url(&self) -> &Url {
        &self.collection_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append the id as a single, percent-encoded path segment.
    fn item_url(&self, id: &str) -> Result<Url, Error> {
        let mut url = self.collection_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    pub async fn list(&self, filters: &Filters) -> Result<Page, Error> {
        let url = self.collection_url.clone();
        let params = filters.to_query();
        debug!(resource = %self.kind, "GET {url} params={params:?}");

        let resp = self.send(self.http.get(url).query(&params)).await?;
        let body: Value = self.handle_response(resp).await?;
        Page::from_envelope(body, self.kind.envelope())
    }

    pub async fn get(&self, id: &str) -> Result<Value, Error> {
        let url = self.item_url(id)?;
        debug!(resource = %self.kind, "GET {url}");

        let resp = self.send(self.http.get(url)).await?;
        self.handle_response(resp).await
    }

    pub async fn create<B: Serialize + Sync>(&self, payload: &B) -> Result<Value, Error> {
        let url = self.collection_url.clone();
        debug!(resource = %self.kind, "POST {url}");

        let resp = self.send(self.http.post(url).json(payload)).await?;
        self.handle_response(resp).await
    }

    pub async fn update<B: Serialize + Sync>(&self, id: &str, payload: &B) -> Result<Value, Error> {
        let url = self.item_url(id)?;
        debug!(resource = %self.kind, "PUT {url}");

        let resp = self.send(self.http.put(url).json(payload)).await?;
        self.handle_response(resp).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), Error> {
        let url = self.item_url(id)?;
        debug!(resource = %self.kind, "DELETE {url}");

        let resp = self.send(self.http.delete(url)).await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, Error> {
        req.send().await.map_err(|e| self.transport_error(e))
    }

    /// Timeouts apply to the whole exchange, so one can surface while
    /// sending or while reading the body.
    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(self.timeout)
        } else {
            Error::Transport(e)
        }
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await.map_err(|e| self.transport_error(e))?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ErrorResponse>(&raw)
            .ok()
            .and_then(|err| err.message.or(err.error))
            .unwrap_or_else(|| {
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                }
            });

        debug!(resource = %self.kind, status = status.as_u16(), %message, "request failed");

        if status.is_client_error() {
            Error::Client {
                status: status.as_u16(),
                message,
            }
        } else {
            Error::Server {
                status: status.as_u16(),
                message,
            }
        }
    }
}
