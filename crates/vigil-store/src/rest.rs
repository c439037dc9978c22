//! PostgREST-style profile lookups.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use vigil_config::ProfileStoreConfig;
use vigil_core::{ProfileAttributes, RemoteError};
use vigil_sync::ProfileStore;

use crate::http::{check_response, transport_error};

/// Columns requested for each profile row.
const SELECT: &str = "role,related_patient_id,related_pharmacy_id,account_type";

type BearerFn = dyn Fn() -> Option<String> + Send + Sync;

/// Reads one row per identity from `{url}/rest/v1/{table}`.
///
/// Requests carry the API key as `apikey` and a bearer token: the signed-in
/// user's session token when a source is configured (so row-level security
/// applies), the API key otherwise. The client itself has no timeout; the
/// sync engine enforces its own deadline per call.
#[derive(Clone)]
pub struct RestProfileStore {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
    bearer: Option<Arc<BearerFn>>,
}

impl fmt::Debug for RestProfileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestProfileStore")
            .field("base_url", &self.base_url)
            .field("table", &self.table)
            .field("user_bearer", &self.bearer.is_some())
            .finish_non_exhaustive()
    }
}

impl RestProfileStore {
    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            table: table.into(),
            bearer: None,
        })
    }

    /// # Errors
    ///
    /// Returns `RemoteError::Unavailable` if the HTTP client cannot be built.
    pub fn from_config(config: &ProfileStoreConfig) -> Result<Self, RemoteError> {
        Self::new(&config.url, &config.api_key, &config.table)
    }

    /// Send the token produced by `source` as the bearer credential. Called
    /// once per request; `None` falls back to the API key.
    #[must_use]
    pub fn with_bearer(mut self, source: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        self.bearer = Some(Arc::new(source));
        self
    }

    fn bearer_token(&self) -> String {
        self.bearer
            .as_ref()
            .and_then(|source| source())
            .unwrap_or_else(|| self.api_key.clone())
    }
}

#[async_trait]
impl ProfileStore for RestProfileStore {
    async fn lookup_profile(
        &self,
        identity_id: &str,
    ) -> Result<Option<ProfileAttributes>, RemoteError> {
        let url = profile_url(&self.base_url, &self.table, identity_id);
        tracing::debug!(%url, "looking up profile");

        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer_token())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let body = check_response(resp)
            .await?
            .text()
            .await
            .map_err(|e| transport_error(&e))?;

        parse_rows(&body)
    }
}

/// `{base}/rest/v1/{table}?select=...&id=eq.{id}` with both path segment and
/// filter value percent-encoded.
#[must_use]
pub fn profile_url(base_url: &str, table: &str, identity_id: &str) -> String {
    format!(
        "{}/rest/v1/{}?select={SELECT}&id=eq.{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(table),
        urlencoding::encode(identity_id),
    )
}

/// The first row of a PostgREST array response. An empty array means the
/// identity has no profile row.
fn parse_rows(body: &str) -> Result<Option<ProfileAttributes>, RemoteError> {
    let rows: Vec<ProfileAttributes> = serde_json::from_str(body)
        .map_err(|e| RemoteError::Malformed(format!("profile rows: {e}")))?;
    if rows.len() > 1 {
        tracing::warn!(rows = rows.len(), "profile lookup matched several rows; using the first");
    }
    Ok(rows.into_iter().next())
}
