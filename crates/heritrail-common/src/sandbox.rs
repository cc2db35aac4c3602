use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use crate::error::{HeritrailError, Result};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Maximum number of redirects followed for any outbound request.
const MAX_REDIRECTS: usize = 5;

/// An HTTP client with two doors:
/// - `get`/`post` only reach hosts on the allowlist (the configured providers);
/// - `get_public` reaches user-supplied URLs, but never private or loopback hosts.
///
/// Unless `allow_private_hosts` is set, names are resolved through [`GuardedResolver`],
/// so a public-looking name that points at a private address is refused at connect
/// time too. Only the configured provider hosts may resolve privately.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    allow_private_hosts: bool,
}

impl SandboxClient {
    /// Build a client whose allowlist is the host set of `endpoints`.
    pub fn new(
        endpoints: &[&str],
        timeout: Duration,
        user_agent: &str,
        allow_private_hosts: bool,
    ) -> Result<Self> {
        let mut allowlist = HashSet::new();
        for endpoint in endpoints {
            let url = Url::parse(endpoint)
                .map_err(|e| HeritrailError::Config(format!("invalid endpoint {endpoint}: {e}")))?;
            if let Some(host) = url.host_str() {
                allowlist.insert(host.to_lowercase());
            }
        }

        let mut builder = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect_policy(allow_private_hosts));
        if !allow_private_hosts {
            builder = builder.dns_resolver(Arc::new(GuardedResolver::new(allowlist.clone())));
        }
        let client = builder
            .build()
            .map_err(|e| HeritrailError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist, allow_private_hosts })
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                let host = host.to_lowercase();
                // Check exact match or if it's a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == *allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// GET against an allowlisted provider.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        self.check_allowed(url)?;
        Ok(self.client.get(url))
    }

    /// POST against an allowlisted provider.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        self.check_allowed(url)?;
        Ok(self.client.post(url))
    }

    /// GET a user-supplied URL. Rejects non-HTTP schemes and private hosts.
    pub fn get_public(&self, url: &str) -> Result<reqwest::RequestBuilder> {
        let parsed = Url::parse(url).map_err(|e| HeritrailError::InvalidUrl(format!("{url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HeritrailError::InvalidUrl(format!("unsupported scheme in {url}")));
        }
        if !self.allow_private_hosts && is_ssrf_target(&parsed) {
            return Err(HeritrailError::Security(format!(
                "Refusing to fetch private or local address {url}"
            )));
        }
        Ok(self.client.get(parsed))
    }

    fn check_allowed(&self, url: &str) -> Result<()> {
        if !self.is_allowed(url) {
            return Err(HeritrailError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}

/// Follow redirects, but never into a private network unless allowed.
fn redirect_policy(allow_private_hosts: bool) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if !allow_private_hosts && is_ssrf_target(attempt.url()) {
            let target = attempt.url().to_string();
            attempt.error(BlockedAddress(format!(
                "Refusing to follow redirect to private or local address {target}"
            )))
        } else {
            attempt.follow()
        }
    })
}

/// Raised inside reqwest (redirect policy, DNS) when a request would reach a
/// private address. Surfaces as `HeritrailError::Security`.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BlockedAddress(pub String);

/// The guard's refusal buried in a reqwest error, if that is what failed.
pub fn blocked_reason(err: &reqwest::Error) -> Option<String> {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(e) = source {
        if let Some(blocked) = e.downcast_ref::<BlockedAddress>() {
            return Some(blocked.0.clone());
        }
        source = e.source();
    }
    None
}

/// DNS resolution that drops private, loopback and link-local addresses.
#[derive(Debug, Clone)]
pub struct GuardedResolver {
    trusted: Arc<HashSet<String>>,
}

impl GuardedResolver {
    /// `trusted` hosts (the configured providers) may resolve to any address.
    pub fn new(trusted: HashSet<String>) -> Self {
        Self { trusted: Arc::new(trusted) }
    }

    pub async fn lookup(&self, host: &str) -> std::result::Result<Vec<SocketAddr>, BoxError> {
        let host = host.trim_end_matches('.').to_lowercase();
        let resolved: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
        if self.trusted.contains(&host) {
            return Ok(resolved);
        }

        let public: Vec<SocketAddr> = resolved.into_iter().filter(|a| !is_private_ip(&a.ip())).collect();
        if public.is_empty() {
            return Err(BlockedAddress(format!(
                "Refusing to connect to {host}: it resolves to a private or local address"
            ))
            .into());
        }
        Ok(public)
    }
}

impl Resolve for GuardedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolver.lookup(&host).await?;
            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_lowercase();
            host == "localhost"
                || host.ends_with(".localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
                // 192.0.0.0/24
                || (v4.octets()[0] == 192 && v4.octets()[1] == 0 && v4.octets()[2] == 0)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().map(|v4| is_private_ip(&IpAddr::V4(v4))).unwrap_or(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SandboxClient {
        SandboxClient::new(
            &["https://api.crossref.org/works", "https://openlibrary.org"],
            Duration::from_secs(5),
            "heritrail-test",
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_allowlist_from_endpoints() {
        let c = client();
        assert!(c.is_allowed("https://api.crossref.org/works/10.1000/x"));
        assert!(c.is_allowed("https://covers.openlibrary.org/b/isbn/1.jpg"));
        assert!(!c.is_allowed("https://evil.example.com/"));
        assert!(c.get("https://evil.example.com/").is_err());
    }

    #[test]
    fn test_ssrf_targets() {
        let blocked = [
            "http://127.0.0.1/",
            "http://localhost:8080/",
            "http://10.0.0.5/admin",
            "http://192.168.1.1/",
            "http://169.254.169.254/latest/meta-data",
            "http://[::1]/",
            "http://[fd00::1]/",
            "http://printer.local/",
            "http://localhost./admin",
            "http://LOCALHOST.:8080/",
            "http://printer.local./",
        ];
        for u in blocked {
            assert!(is_ssrf_target(&Url::parse(u).unwrap()), "{u} should be blocked");
        }
        assert!(!is_ssrf_target(&Url::parse("https://whc.unesco.org/en/list/").unwrap()));
    }

    #[test]
    fn test_get_public_rejects_private_and_non_http() {
        let c = client();
        assert!(matches!(c.get_public("http://127.0.0.1/x"), Err(HeritrailError::Security(_))));
        assert!(matches!(c.get_public("file:///etc/passwd"), Err(HeritrailError::InvalidUrl(_))));
        assert!(c.get_public("https://whc.unesco.org/en/list/252").is_ok());
    }

    #[test]
    fn test_private_hosts_allowed_when_enabled() {
        let c = SandboxClient::new(&[], Duration::from_secs(1), "t", true).unwrap();
        assert!(c.get_public("http://127.0.0.1:9999/page").is_ok());
    }

    #[tokio::test]
    async fn test_resolver_refuses_names_pointing_inside() {
        let resolver = GuardedResolver::new(HashSet::new());
        let err = resolver.lookup("localhost").await.unwrap_err();
        assert!(err.downcast_ref::<BlockedAddress>().is_some(), "unexpected error: {err}");

        // A configured provider on the local machine is still reachable
        let trusted = GuardedResolver::new(HashSet::from(["localhost".to_string()]));
        let addrs = trusted.lookup("localhost.").await.unwrap();
        assert!(addrs.iter().all(|a| a.ip().is_loopback()));
    }

    #[tokio::test]
    async fn test_redirect_into_private_network_is_refused() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "http://169.254.169.254/latest/meta-data"),
            )
            .mount(&server)
            .await;

        // The mock server itself is an allowlisted provider; only the hop is checked
        let c = SandboxClient::new(&[server.uri().as_str()], Duration::from_secs(2), "t", false).unwrap();
        let err = c.get(&format!("{}/moved", server.uri())).unwrap().send().await.unwrap_err();
        assert!(blocked_reason(&err).is_some());
        match HeritrailError::from(err) {
            HeritrailError::Security(msg) => assert!(msg.contains("169.254.169.254"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
