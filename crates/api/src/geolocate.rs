use city_core::{Location, TtlCache};
use geoip_client::GeoIpClient;
use std::net::IpAddr;
use tracing::debug;

/// How an IP was resolved. Logged for observability; callers receive a
/// usable location either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Served from the cache.
    Cached,
    /// Fresh upstream resolution.
    Resolved,
    /// Loopback/private address, pinned to the default location.
    Private,
    /// Upstream failed; default location substituted.
    Fallback,
}

/// Resolves client IPs to locations with a TTL cache in front of the
/// upstream service.
///
/// `resolve` never fails. Every completed path writes the cache, fallbacks
/// included, so a flaky upstream is consulted at most once per IP per TTL
/// window.
pub struct GeolocationResolver {
    client: GeoIpClient,
    cache: TtlCache<String, Location>,
    default_location: Location,
}

impl GeolocationResolver {
    pub fn new(
        client: GeoIpClient,
        cache: TtlCache<String, Location>,
        default_location: Location,
    ) -> Self {
        Self {
            client,
            cache,
            default_location,
        }
    }

    /// Number of live-or-expired entries currently held, for health
    /// reporting.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub async fn resolve(&self, client_ip: &str) -> (Location, ResolutionKind) {
        let ip = normalize_ip(client_ip);

        if let Some(cached) = self.cache.get(&ip) {
            return (cached, ResolutionKind::Cached);
        }

        if !is_public(&ip) {
            self.cache.insert(ip, self.default_location);
            return (self.default_location, ResolutionKind::Private);
        }

        match self.client.lookup(&ip).await {
            Ok(location) => {
                self.cache.insert(ip, location);
                (location, ResolutionKind::Resolved)
            }
            Err(e) => {
                debug!(ip = %ip, error = %e, "Geolocation failed, using default location");
                self.cache.insert(ip, self.default_location);
                (self.default_location, ResolutionKind::Fallback)
            }
        }
    }
}

/// Strip the IPv6-mapped-IPv4 prefix so `::ffff:1.2.3.4` and `1.2.3.4`
/// share a cache entry.
fn normalize_ip(ip: &str) -> String {
    let trimmed = ip.trim();
    trimmed
        .strip_prefix("::ffff:")
        .unwrap_or(trimmed)
        .to_string()
}

/// Whether the address is worth an upstream lookup. Loopback, private
/// ranges, and unparseable strings are resolved to the default location
/// locally; that is a legitimate resolution, not a failure.
fn is_public(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => !v4.is_loopback() && !v4.is_private() && !v4.is_unspecified(),
        Ok(IpAddr::V6(v6)) => !v6.is_loopback() && !v6.is_unspecified(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use city_core::ManualClock;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TTL: Duration = Duration::from_secs(86_400);

    fn resolver_with(server_uri: &str, clock: ManualClock) -> GeolocationResolver {
        let client = GeoIpClient::new(server_uri, Duration::from_millis(500)).unwrap();
        GeolocationResolver::new(
            client,
            TtlCache::new(TTL, Arc::new(clock)),
            Location::new(40.7128, -74.0060),
        )
    }

    fn success_body() -> serde_json::Value {
        serde_json::json!({ "status": "success", "lat": 48.8566, "lon": 2.3522 })
    }

    #[test]
    fn test_normalize_strips_mapped_prefix() {
        assert_eq!(normalize_ip("::ffff:8.8.8.8"), "8.8.8.8");
        assert_eq!(normalize_ip("8.8.8.8"), "8.8.8.8");
        assert_eq!(normalize_ip(" 8.8.8.8 "), "8.8.8.8");
    }

    #[test]
    fn test_private_ranges_are_not_public() {
        assert!(!is_public("127.0.0.1"));
        assert!(!is_public("10.1.2.3"));
        assert!(!is_public("172.16.0.1"));
        assert!(!is_public("192.168.1.1"));
        assert!(!is_public("::1"));
        assert!(!is_public("not-an-ip"));
        assert!(is_public("8.8.8.8"));
    }

    #[tokio::test]
    async fn test_resolve_caches_within_ttl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1) // the second resolve must be served from cache
            .mount(&server)
            .await;

        let resolver = resolver_with(&server.uri(), ManualClock::new());

        let (first, kind) = resolver.resolve("8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Resolved);

        let (second, kind) = resolver.resolve("8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Cached);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_after_expiry_hits_upstream_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(2)
            .mount(&server)
            .await;

        let clock = ManualClock::new();
        let resolver = resolver_with(&server.uri(), clock.clone());

        resolver.resolve("8.8.8.8").await;
        clock.advance(TTL + Duration::from_secs(1));

        let (_, kind) = resolver.resolve("8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Resolved);
    }

    #[tokio::test]
    async fn test_mapped_prefix_shares_cache_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/8.8.8.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = resolver_with(&server.uri(), ManualClock::new());

        resolver.resolve("8.8.8.8").await;
        let (_, kind) = resolver.resolve("::ffff:8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Cached);
    }

    #[tokio::test]
    async fn test_private_ip_never_hits_upstream() {
        let server = MockServer::start().await;
        // No mocks mounted: any request would 404 and still "succeed" as a
        // fallback, so assert on the request log instead.
        let resolver = resolver_with(&server.uri(), ManualClock::new());

        let (location, kind) = resolver.resolve("192.168.1.50").await;
        assert_eq!(kind, ResolutionKind::Private);
        assert_eq!(location, Location::new(40.7128, -74.0060));

        let requests = server.received_requests().await.unwrap();
        assert!(requests.is_empty());

        // Cached like any real resolution.
        let (_, kind) = resolver.resolve("192.168.1.50").await;
        assert_eq!(kind, ResolutionKind::Cached);
    }

    #[tokio::test]
    async fn test_upstream_failure_falls_back_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1) // fallback must be cached, no retry within TTL
            .mount(&server)
            .await;

        let resolver = resolver_with(&server.uri(), ManualClock::new());

        let (location, kind) = resolver.resolve("8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Fallback);
        assert_eq!(location, Location::new(40.7128, -74.0060));

        let (_, kind) = resolver.resolve("8.8.8.8").await;
        assert_eq!(kind, ResolutionKind::Cached);
    }
}
