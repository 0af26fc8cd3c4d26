// ── Runtime client configuration ──
//
// These types describe *where* each service lives and how the cache
// behaves. They never touch disk: campus-config or the CLI builds a
// `ClientConfig` and hands it in.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use campus_api::{ResourceClient, ResourceKind, Service};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed staging services).
    DangerAcceptInvalid,
}

/// Cache and request tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a successful read stays fresh.
    pub stale_time: Duration,
    /// How long an entry with no subscribers is retained.
    pub gc_time: Duration,
    /// How often the background sweeper runs.
    pub gc_interval: Duration,
    /// Automatic retries after a failed fetch.
    pub retry: u32,
    pub retry_delay: Duration,
    /// Upper bound on any single resource call.
    pub request_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(300),
            gc_time: Duration::from_secs(300),
            gc_interval: Duration::from_secs(60),
            retry: 1,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Base URL per backend service.
///
/// A gateway URL, when set, serves every service without an explicit entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub gateway: Option<Url>,
    pub services: HashMap<Service, Url>,
}

impl ServiceEndpoints {
    pub fn gateway(url: Url) -> Self {
        Self {
            gateway: Some(url),
            services: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_service(mut self, service: Service, url: Url) -> Self {
        self.services.insert(service, url);
        self
    }

    pub fn resolve(&self, service: Service) -> Option<&Url> {
        self.services.get(&service).or(self.gateway.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.gateway.is_none() && self.services.is_empty()
    }

    /// Collection URL for `kind`, if its service resolves.
    pub fn collection_url(&self, kind: ResourceKind) -> Option<Url> {
        let base = self.resolve(kind.service())?;
        ResourceClient::collection_url_for(base, kind).ok()
    }
}

/// Everything needed to build a `QueryClient` over HTTP.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub endpoints: ServiceEndpoints,
    pub cache: CacheConfig,
    pub tls: TlsVerification,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_service_beats_gateway() {
        let gw = Url::parse("https://gw.school.test").ok();
        let fees = Url::parse("https://fees.school.test").ok();
        let (Some(gw), Some(fees)) = (gw, fees) else {
            panic!("test URLs must parse");
        };

        let endpoints = ServiceEndpoints::gateway(gw.clone()).with_service(Service::Fees, fees.clone());

        assert_eq!(endpoints.resolve(Service::Fees), Some(&fees));
        assert_eq!(endpoints.resolve(Service::Library), Some(&gw));
        assert_eq!(
            endpoints
                .collection_url(ResourceKind::FeePayments)
                .map(String::from)
                .as_deref(),
            Some("https://fees.school.test/api/v1/fees/payments")
        );
    }

    #[test]
    fn empty_endpoints_resolve_nothing() {
        let endpoints = ServiceEndpoints::default();
        assert!(endpoints.is_empty());
        assert_eq!(endpoints.resolve(Service::Students), None);
        assert_eq!(endpoints.collection_url(ResourceKind::Students), None);
    }
}
