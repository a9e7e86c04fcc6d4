use std::time::Duration;

use async_trait::async_trait;
use lesson_core::model::ProfileId;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::rest::{RestConfig, remote_message};
use tracing::debug;
use url::Url;

use crate::error::AuthError;

/// A signed-in parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: ProfileId,
    pub email: Option<String>,
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// The provider emailed a confirmation link; no session yet.
    ConfirmationSent,
}

/// The external identity provider.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::Rejected` with the provider's message on bad credentials.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError` if the provider refuses to send the link.
    async fn request_magic_link(&self, email: &str) -> Result<(), AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError` if the provider refuses the sign-up.
    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    /// # Errors
    ///
    /// Returns `AuthError` if the provider cannot revoke the session.
    async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError>;
}

fn require_credentials(email: &str, password: Option<&str>) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_some_and(|p| p.is_empty()) {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}

//
// ─── HOSTED ────────────────────────────────────────────────────────────────────
//

/// GoTrue-compatible client for the hosted auth endpoints.
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

#[derive(Serialize)]
struct PasswordBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct OtpBody<'a> {
    email: &'a str,
    create_user: bool,
}

#[derive(Deserialize)]
struct UserBody {
    id: ProfileId,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct SessionBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    user: Option<UserBody>,
}

impl SessionBody {
    fn into_session(self) -> Option<AuthSession> {
        let token = self.access_token?;
        let user = self.user?;
        Some(AuthSession {
            user_id: user.id,
            email: user.email,
            access_token: token,
        })
    }
}

impl GoTrueClient {
    /// # Errors
    ///
    /// Returns `AuthError::Http` if the HTTP client cannot be built.
    pub fn new(config: &RestConfig) -> Result<Self, AuthError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AuthError> {
        Ok(self.base_url.join(path)?)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, AuthError> {
        debug!(%url, "auth request");
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(&self.api_key))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: remote_message(&text),
        })
    }
}

#[async_trait]
impl AuthClient for GoTrueClient {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        require_credentials(email, Some(password))?;
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let body: SessionBody = self
            .post(url, &PasswordBody { email, password }, None)
            .await?
            .json()
            .await?;
        body.into_session().ok_or(AuthError::MissingSession)
    }

    async fn request_magic_link(&self, email: &str) -> Result<(), AuthError> {
        require_credentials(email, None)?;
        let url = self.endpoint("auth/v1/otp")?;
        self.post(
            url,
            &OtpBody {
                email,
                create_user: true,
            },
            None,
        )
        .await?;
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        require_credentials(email, Some(password))?;
        let url = self.endpoint("auth/v1/signup")?;
        let body: SessionBody = self
            .post(url, &PasswordBody { email, password }, None)
            .await?
            .json()
            .await?;
        Ok(body
            .into_session()
            .map_or(SignUpOutcome::ConfirmationSent, SignUpOutcome::SignedIn))
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError> {
        let url = self.endpoint("auth/v1/logout")?;
        self.post(url, &serde_json::json!({}), Some(&session.access_token))
            .await?;
        Ok(())
    }
}

//
// ─── LOCAL ─────────────────────────────────────────────────────────────────────
//

/// Offline provider for the local SQLite backend: any email signs in as a
/// stable per-email profile. No passwords are checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAuthClient;

impl LocalAuthClient {
    #[must_use]
    pub fn session_for(email: &str) -> AuthSession {
        let email = email.trim().to_lowercase();
        AuthSession {
            user_id: ProfileId::new(format!("local:{email}")),
            email: Some(email),
            access_token: "local".to_string(),
        }
    }
}

#[async_trait]
impl AuthClient for LocalAuthClient {
    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<AuthSession, AuthError> {
        require_credentials(email, None)?;
        Ok(Self::session_for(email))
    }

    async fn request_magic_link(&self, email: &str) -> Result<(), AuthError> {
        require_credentials(email, None)
    }

    async fn sign_up(&self, email: &str, _password: &str) -> Result<SignUpOutcome, AuthError> {
        require_credentials(email, None)?;
        Ok(SignUpOutcome::SignedIn(Self::session_for(email)))
    }

    async fn sign_out(&self, _session: &AuthSession) -> Result<(), AuthError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_sessions_are_stable_per_email() {
        let client = LocalAuthClient;
        let a = client.sign_in_with_password("Ana@Example.com ", "x").await.unwrap();
        let b = client.sign_in_with_password("ana@example.com", "y").await.unwrap();
        assert_eq!(a.user_id, b.user_id);
        assert!(matches!(
            client.request_magic_link("  ").await,
            Err(AuthError::MissingCredentials)
        ));
    }

    #[test]
    fn signup_without_token_needs_confirmation() {
        let body: SessionBody =
            serde_json::from_str(r#"{"id":"u1","email":"a@b.c","confirmation_sent_at":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(body.into_session().is_none());
    }
}
