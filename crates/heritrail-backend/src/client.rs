//! Generic client for the hosted backend.
//!
//!   {url}/rest/v1/{table}         table reads and inserts (PostgREST)
//!   {url}/rest/v1/rpc/{function}  stored procedures
//!   {url}/auth/v1/user            who owns an access token
//!   {url}/storage/v1/object/...   object storage
//!
//! Keys never live in the config file: it names the env vars that hold them.
//! Table, RPC and storage calls run with the service-role key; row-level
//! ownership checks are done by the callers in this crate.

use heritrail_config::BackendConfig;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::{BackendError, Result};

/// The authenticated caller behind an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base: String,
    anon_key: Option<String>,
    service_key: Option<String>,
    config: BackendConfig,
}

impl std::fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendClient")
            .field("base", &self.base)
            .field("anon_key", &self.anon_key.as_ref().map(|_| "<set>"))
            .field("service_key", &self.service_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl BackendClient {
    /// Build a client, reading both keys from the env vars named in `config`.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let anon_key = read_key(&config.anon_key_env);
        let service_key = read_key(&config.service_key_env);
        if anon_key.is_none() {
            warn!(var = %config.anon_key_env, "Backend anon key not set; token checks will fail");
        }
        if service_key.is_none() {
            warn!(var = %config.service_key_env, "Backend service key not set; privileged calls will fail");
        }
        Self::with_keys(config, anon_key, service_key)
    }

    pub fn with_keys(config: &BackendConfig, anon_key: Option<String>, service_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BackendError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base: config.url.trim_end_matches('/').to_string(),
            anon_key,
            service_key,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    // ── Headers ──────────────────────────────────────────────────────────

    fn headers(apikey: &str, bearer: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert("apikey", header_value(apikey)?);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {bearer}"))?);
        Ok(headers)
    }

    fn service_headers(&self) -> Result<HeaderMap> {
        let key = self
            .service_key
            .as_deref()
            .ok_or_else(|| BackendError::Config(format!("{} is not set", self.config.service_key_env)))?;
        Self::headers(key, key)
    }

    fn user_headers(&self, access_token: &str) -> Result<HeaderMap> {
        let key = self
            .anon_key
            .as_deref()
            .ok_or_else(|| BackendError::Config(format!("{} is not set", self.config.anon_key_env)))?;
        Self::headers(key, access_token)
    }

    // ── Tables ───────────────────────────────────────────────────────────

    /// `GET /rest/v1/{table}?select={columns}&{column}={op}.{value}...`
    ///
    /// Filters use PostgREST operator syntax, e.g. `("id", "eq.42")`.
    #[instrument(skip(self))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, &str)],
        columns: &str,
    ) -> Result<Vec<T>> {
        let url = format!("{}/rest/v1/{}", self.base, table);
        let mut query: Vec<(&str, &str)> = vec![("select", columns)];
        query.extend_from_slice(filters);
        let resp = self
            .http
            .get(&url)
            .headers(self.service_headers()?)
            .query(&query)
            .send()
            .await?;
        let rows: Vec<T> = check_response(resp).await?.json().await?;
        debug!(table, n = rows.len(), "Selected rows");
        Ok(rows)
    }

    /// Insert one row and return it as stored.
    #[instrument(skip(self, row))]
    pub async fn insert<T: Serialize + ?Sized, R: DeserializeOwned>(&self, table: &str, row: &T) -> Result<R> {
        let url = format!("{}/rest/v1/{}", self.base, table);
        let resp = self
            .http
            .post(&url)
            .headers(self.service_headers()?)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .await?;
        let mut rows: Vec<R> = check_response(resp).await?.json().await?;
        if rows.is_empty() {
            return Err(BackendError::Status {
                status: StatusCode::OK.as_u16(),
                message: format!("insert into {table} returned no row"),
            });
        }
        Ok(rows.swap_remove(0))
    }

    /// Call a stored procedure. Procedures returning `void` give `Value::Null`.
    #[instrument(skip(self, args))]
    pub async fn rpc(&self, function: &str, args: &Value) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.base, function);
        let resp = self
            .http
            .post(&url)
            .headers(self.service_headers()?)
            .json(args)
            .send()
            .await?;
        let body = check_response(resp).await?.text().await?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    // ── Auth ─────────────────────────────────────────────────────────────

    /// Resolve the user behind an access token. Expired or forged tokens are
    /// `Unauthorized`.
    #[instrument(skip_all)]
    pub async fn auth_user(&self, access_token: &str) -> Result<AuthUser> {
        if access_token.trim().is_empty() {
            return Err(BackendError::Unauthorized("missing access token".to_string()));
        }
        let url = format!("{}/auth/v1/user", self.base);
        let resp = self.http.get(&url).headers(self.user_headers(access_token)?).send().await?;
        match check_response(resp).await {
            Ok(resp) => Ok(resp.json().await?),
            Err(BackendError::Forbidden(msg)) | Err(BackendError::NotFound(msg)) => {
                Err(BackendError::Unauthorized(msg))
            }
            Err(e) => Err(e),
        }
    }

    // ── Storage ──────────────────────────────────────────────────────────

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn storage_upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base, bucket, path.trim_start_matches('/'));
        let resp = self
            .http
            .post(&url)
            .headers(self.service_headers()?)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;
        check_response(resp).await?;
        debug!(bucket, path, "Uploaded object");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn storage_remove(&self, bucket: &str, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/storage/v1/object/{}", self.base, bucket);
        let resp = self
            .http
            .delete(&url)
            .headers(self.service_headers()?)
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;
        check_response(resp).await?;
        debug!(bucket, n = paths.len(), "Removed objects");
        Ok(())
    }
}

fn read_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn header_value(raw: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(raw).map_err(|_| BackendError::Config("key contains invalid header characters".to_string()))
}

/// Map non-2xx responses onto error variants, keeping the backend's message.
async fn check_response(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or_else(|| {
        status.canonical_reason().unwrap_or("unknown backend error").to_string()
    });
    Err(match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
        StatusCode::FORBIDDEN => BackendError::Forbidden(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        _ => BackendError::Status { status: status.as_u16(), message },
    })
}

/// PostgREST, GoTrue and Storage each name the field differently.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    ["message", "msg", "error_description", "error"]
        .iter()
        .find_map(|k| json[*k].as_str().map(String::from))
}
