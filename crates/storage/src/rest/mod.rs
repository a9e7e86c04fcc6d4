//! Hosted backend adapter: PostgREST tables plus RPC procedures.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::repository::{PreferenceRepository, Storage, StorageError};

mod repo;

pub use repo::RestRepository;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RestInitError {
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
    #[error("missing api key")]
    MissingKey,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Where the hosted backend lives and which key signs anonymous requests.
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub base_url: Url,
    pub api_key: String,
}

impl RestConfig {
    /// # Errors
    ///
    /// Returns `RestInitError` for an unparsable URL or an empty key.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, RestInitError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RestInitError::MissingKey);
        }
        Ok(Self { base_url, api_key })
    }
}

/// Thin JSON client over `/rest/v1`.
///
/// Requests carry the `apikey` header and a bearer token: the signed-in
/// user's access token once set, the api key before that.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    config: RestConfig,
    access_token: Arc<RwLock<Option<String>>>,
}

#[derive(serde::Deserialize)]
struct RemoteErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Extracts the human-readable message a backend error body carries, falling
/// back to the raw body.
#[must_use]
pub fn remote_message(body: &str) -> String {
    serde_json::from_str::<RemoteErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.msg).or(b.error_description))
        .unwrap_or_else(|| body.trim().to_string())
}

impl RestClient {
    /// # Errors
    ///
    /// Returns `RestInitError::Http` if the HTTP client cannot be built.
    pub fn new(config: RestConfig) -> Result<Self, RestInitError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            config,
            access_token: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    /// Switches subsequent requests to the user's session token.
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    fn bearer(&self) -> String {
        self.access_token
            .read()
            .ok()
            .and_then(|guard| guard.clone())
            .unwrap_or_else(|| self.config.api_key.clone())
    }

    fn endpoint(&self, path: &str) -> Result<Url, StorageError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| StorageError::Connection(e.to_string()))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "rest request");
        self.http
            .request(method, url)
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.bearer())
    }

    async fn send(builder: RequestBuilder) -> Result<reqwest::Response, StorageError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND && body.trim().is_empty() {
            return Err(StorageError::NotFound);
        }
        debug!(%status, body = %body, "rest request rejected");
        Err(StorageError::Remote {
            status: status.as_u16(),
            message: remote_message(&body),
        })
    }

    async fn json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, StorageError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Void procedures answer with an empty body.
        let bytes: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) { b"null" } else { &bytes };
        serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// `GET /rest/v1/<table>` with PostgREST query parameters such as
    /// `("lesson_id", "eq.<id>")` or `("order", "order_index.asc")`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Remote` for rejected requests, `Serialization` for
    /// rows that do not decode, and `Connection` for transport failures.
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StorageError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let response = Self::send(self.request(Method::GET, url).query(query)).await?;
        Self::json(response).await
    }

    /// Inserts rows, merging on `on_conflict` columns when given, and returns
    /// the stored representation.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::select`].
    pub async fn upsert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
        on_conflict: Option<&str>,
    ) -> Result<Vec<T>, StorageError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let mut builder = self.request(Method::POST, url).json(body);
        builder = match on_conflict {
            Some(columns) => builder
                .query(&[("on_conflict", columns)])
                .header("Prefer", "resolution=merge-duplicates,return=representation"),
            None => builder.header("Prefer", "return=representation"),
        };
        let response = Self::send(builder).await?;
        Self::json(response).await
    }

    /// Deletes matching rows and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::select`].
    pub async fn delete(&self, table: &str, query: &[(&str, String)]) -> Result<usize, StorageError> {
        let url = self.endpoint(&format!("rest/v1/{table}"))?;
        let builder = self
            .request(Method::DELETE, url)
            .query(query)
            .header("Prefer", "return=representation");
        let response = Self::send(builder).await?;
        let rows: Vec<serde_json::Value> = Self::json(response).await?;
        Ok(rows.len())
    }

    /// `POST /rest/v1/rpc/<name>` with a JSON argument object.
    ///
    /// # Errors
    ///
    /// Same as [`RestClient::select`].
    pub async fn rpc<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        name: &str,
        args: &B,
    ) -> Result<T, StorageError> {
        let url = self.endpoint(&format!("rest/v1/rpc/{name}"))?;
        let response = Self::send(self.request(Method::POST, url).json(args)).await?;
        Self::json(response).await
    }
}

impl Storage {
    /// Build a `Storage` against the hosted backend. Preference flags stay on
    /// the device, so the caller supplies where they live.
    ///
    /// # Errors
    ///
    /// Returns `RestInitError` if the HTTP client cannot be built.
    pub fn remote(
        config: RestConfig,
        preferences: Arc<dyn PreferenceRepository>,
    ) -> Result<(Self, RestClient), RestInitError> {
        let client = RestClient::new(config)?;
        let repo = RestRepository::new(client.clone());
        Ok((
            Self {
                activities: Arc::new(repo.clone()),
                lessons: Arc::new(repo.clone()),
                children: Arc::new(repo.clone()),
                mastery: Arc::new(repo.clone()),
                completions: Arc::new(repo.clone()),
                families: Arc::new(repo),
                preferences,
            },
            client,
        ))
    }
}
