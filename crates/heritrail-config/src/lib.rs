//! Configuration loading for Heritrail.
//! Reads heritrail.toml from the current directory or the path in the HERITRAIL_CONFIG env var.
//! Secrets never live in the file: it only names the env vars that hold them.

use heritrail_common::SourceKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request body cap, sized for multipart gallery uploads.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_bind()       -> String { "0.0.0.0:8080".to_string() }
fn default_body_limit() -> usize  { 20 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind(), body_limit_bytes: default_body_limit() }
    }
}

// ---------------------------------------------------------------------------
// [resolver]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Budget for each provider call; slower providers are reported as timed out.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
    #[serde(default = "default_max_input_len")]
    pub max_input_len: usize,
    /// Results requested from each provider on searches.
    #[serde(default = "default_per_provider_limit")]
    pub per_provider_limit: usize,
    /// Contact address sent to Crossref/OpenAlex for their polite pools.
    #[serde(default)]
    pub mailto: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    #[serde(default)]
    pub endpoints: ProviderEndpoints,
    #[serde(default = "default_google_books_key_env")]
    pub google_books_key_env: String,
    /// Jaro-Winkler threshold for merging candidates on title.
    #[serde(default = "default_title_merge_threshold")]
    pub title_merge_threshold: f64,
    /// Lets the HTML scraper reach loopback/private hosts. Tests only.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

fn default_provider_timeout_ms()   -> u64    { 8_000 }
fn default_max_input_len()         -> usize  { 2_000 }
fn default_per_provider_limit()    -> usize  { 5 }
fn default_user_agent()            -> String { format!("heritrail/{}", env!("CARGO_PKG_VERSION")) }
fn default_google_books_key_env()  -> String { "GOOGLE_BOOKS_API_KEY".to_string() }
fn default_title_merge_threshold() -> f64    { 0.95 }

fn default_providers() -> Vec<String> {
    SourceKind::all().iter().map(|s| s.as_str().to_string()).collect()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout_ms(),
            max_input_len: default_max_input_len(),
            per_provider_limit: default_per_provider_limit(),
            mailto: None,
            user_agent: default_user_agent(),
            providers: default_providers(),
            endpoints: ProviderEndpoints::default(),
            google_books_key_env: default_google_books_key_env(),
            title_merge_threshold: default_title_merge_threshold(),
            allow_private_hosts: false,
        }
    }
}

impl ResolverConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    /// Enabled providers, in configuration order. Unknown names are skipped with a warning.
    pub fn enabled_sources(&self) -> Vec<SourceKind> {
        let mut out = Vec::new();
        for name in &self.providers {
            match SourceKind::parse(name) {
                Some(kind) if !out.contains(&kind) => out.push(kind),
                Some(_) => {}
                None => tracing::warn!(provider = %name, "Unknown provider in config; ignoring"),
            }
        }
        out
    }

    /// The Google Books key, if its env var is set.
    pub fn google_books_key(&self) -> Option<String> {
        std::env::var(&self.google_books_key_env).ok().filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEndpoints {
    #[serde(default = "default_crossref_url")]
    pub crossref: String,
    #[serde(default = "default_openalex_url")]
    pub openalex: String,
    #[serde(default = "default_openlibrary_url")]
    pub openlibrary: String,
    #[serde(default = "default_google_books_url")]
    pub google_books: String,
    /// Translation server base URL; the provider is off when unset.
    #[serde(default)]
    pub citation_extractor: Option<String>,
}

fn default_crossref_url()     -> String { "https://api.crossref.org".to_string() }
fn default_openalex_url()     -> String { "https://api.openalex.org".to_string() }
fn default_openlibrary_url()  -> String { "https://openlibrary.org".to_string() }
fn default_google_books_url() -> String { "https://www.googleapis.com/books/v1".to_string() }

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            crossref: default_crossref_url(),
            openalex: default_openalex_url(),
            openlibrary: default_openlibrary_url(),
            google_books: default_google_books_url(),
            citation_extractor: None,
        }
    }
}

impl ProviderEndpoints {
    pub fn all(&self) -> Vec<&str> {
        let mut out = vec![
            self.crossref.as_str(),
            self.openalex.as_str(),
            self.openlibrary.as_str(),
            self.google_books.as_str(),
        ];
        if let Some(u) = &self.citation_extractor {
            out.push(u.as_str());
        }
        out
    }
}

// ---------------------------------------------------------------------------
// [ranking]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,
    #[serde(default = "default_richness_weight")]
    pub richness_weight: f64,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

fn default_confidence_weight() -> f64   { 0.7 }
fn default_richness_weight()   -> f64   { 0.3 }
fn default_min_score()         -> f64   { 0.15 }
fn default_max_candidates()    -> usize { 10 }

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            confidence_weight: default_confidence_weight(),
            richness_weight: default_richness_weight(),
            min_score: default_min_score(),
            max_candidates: default_max_candidates(),
        }
    }
}

// ---------------------------------------------------------------------------
// [backend]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_anon_key_env")]
    pub anon_key_env: String,
    #[serde(default = "default_service_key_env")]
    pub service_key_env: String,
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_review_bucket")]
    pub review_images_bucket: String,
    #[serde(default = "default_gallery_bucket")]
    pub gallery_bucket: String,
    #[serde(default = "default_reviews_table")]
    pub reviews_table: String,
    #[serde(default = "default_site_images_table")]
    pub site_images_table: String,
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
}

fn default_backend_url()       -> String { "http://localhost:54321".to_string() }
fn default_anon_key_env()      -> String { "HERITRAIL_BACKEND_ANON_KEY".to_string() }
fn default_service_key_env()   -> String { "HERITRAIL_BACKEND_SERVICE_KEY".to_string() }
fn default_backend_timeout_ms() -> u64   { 10_000 }
fn default_review_bucket()     -> String { "review-images".to_string() }
fn default_gallery_bucket()    -> String { "site-images".to_string() }
fn default_reviews_table()     -> String { "reviews".to_string() }
fn default_site_images_table() -> String { "site_images".to_string() }
fn default_profiles_table()    -> String { "profiles".to_string() }

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            anon_key_env: default_anon_key_env(),
            service_key_env: default_service_key_env(),
            timeout_ms: default_backend_timeout_ms(),
            review_images_bucket: default_review_bucket(),
            gallery_bucket: default_gallery_bucket(),
            reviews_table: default_reviews_table(),
            site_images_table: default_site_images_table(),
            profiles_table: default_profiles_table(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// [media]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_quality")]
    pub default_quality: u8,
    /// Largest source image the proxy will download.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
    #[serde(default)]
    pub variants: VariantWidths,
}

fn default_max_width()        -> u32   { 2048 }
fn default_quality()          -> u8    { 75 }
fn default_max_bytes()        -> usize { 15 * 1024 * 1024 }
fn default_fetch_timeout_ms() -> u64   { 10_000 }

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            default_quality: default_quality(),
            max_bytes: default_max_bytes(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            variants: VariantWidths::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantWidths {
    #[serde(default = "default_thumb")]
    pub thumb: u32,
    #[serde(default = "default_medium")]
    pub medium: u32,
    #[serde(default = "default_large")]
    pub large: u32,
}

fn default_thumb()  -> u32 { 320 }
fn default_medium() -> u32 { 960 }
fn default_large()  -> u32 { 1920 }

impl Default for VariantWidths {
    fn default() -> Self {
        Self { thumb: default_thumb(), medium: default_medium(), large: default_large() }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from heritrail.toml.
    /// Checks HERITRAIL_CONFIG env var first, then current directory.
    /// A missing file yields the defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("HERITRAIL_CONFIG")
            .unwrap_or_else(|_| "heritrail.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::from_toml(&content)?
        } else {
            tracing::info!(path = %path, "Config file not found; using defaults");
            Config::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// HERITRAIL_BIND and HERITRAIL_BACKEND_URL win over the file.
    pub fn apply_env_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = get("HERITRAIL_BIND").filter(|v| !v.is_empty()) {
            self.server.bind = bind;
        }
        if let Some(url) = get("HERITRAIL_BACKEND_URL").filter(|v| !v.is_empty()) {
            self.backend.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("backend.url", &self.backend.url)?;
        for endpoint in self.resolver.endpoints.all() {
            check_url("resolver.endpoints", endpoint)?;
        }

        if self.resolver.provider_timeout_ms == 0 {
            return Err(invalid("resolver.provider_timeout_ms must be positive"));
        }
        if self.resolver.max_input_len == 0 || self.resolver.per_provider_limit == 0 {
            return Err(invalid("resolver limits must be positive"));
        }
        if !(0.0..=1.0).contains(&self.resolver.title_merge_threshold) {
            return Err(invalid("resolver.title_merge_threshold must be within [0, 1]"));
        }

        let r = &self.ranking;
        if r.confidence_weight < 0.0 || r.richness_weight < 0.0 {
            return Err(invalid("ranking weights must be non-negative"));
        }
        if ((r.confidence_weight + r.richness_weight) - 1.0).abs() > 1e-6 {
            return Err(invalid(&format!(
                "ranking weights must sum to 1.0, got {:.4}",
                r.confidence_weight + r.richness_weight
            )));
        }
        if !(0.0..=1.0).contains(&r.min_score) {
            return Err(invalid("ranking.min_score must be within [0, 1]"));
        }
        if r.max_candidates == 0 {
            return Err(invalid("ranking.max_candidates must be positive"));
        }

        let m = &self.media;
        if !(30..=95).contains(&m.default_quality) {
            return Err(invalid("media.default_quality must be within [30, 95]"));
        }
        if m.max_width < 16 || m.max_bytes == 0 {
            return Err(invalid("media limits are too small"));
        }
        for (name, w) in [("thumb", m.variants.thumb), ("medium", m.variants.medium), ("large", m.variants.large)] {
            if w < 16 || w > m.max_width {
                return Err(invalid(&format!(
                    "media.variants.{name} must be within [16, {}]",
                    m.max_width
                )));
            }
        }

        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes must be positive"));
        }
        Ok(())
    }
}

fn check_url(field: &str, raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| invalid(&format!("{field}: {raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(&format!("{field}: {raw} is not an http(s) URL")));
    }
    Ok(())
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}
