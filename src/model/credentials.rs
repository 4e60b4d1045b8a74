//! OAuth credential lifecycle
//!
//! Exactly one credential set exists at a time. It is refreshed shortly
//! before expiry and the refresh token is persisted to a single-line text
//! file, written only when the endpoint hands out a different value.

use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Method;

use crate::auth;
use crate::config::SpotifyConfig;
use crate::model::api::{ApiError, ApiReply, ReplyClassifier, RetryingHttpClient};

pub const ACCOUNT_API_BASE: &str = "https://accounts.spotify.com/api";

/// Refresh once the access token has less than this much lifetime left.
const EXPIRY_MARGIN_SECONDS: i64 = 30;

/// One OAuth credential set.
///
/// A stub loaded from storage carries only the refresh token; its empty
/// access token forces a refresh before first use.
#[derive(Clone, Debug)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    /// When the tokens were received, `None` for a stored-token stub.
    pub obtained_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn from_stored_refresh_token(refresh_token: String) -> Self {
        Self {
            access_token: String::new(),
            refresh_token,
            expires_at: Utc::now(),
            obtained_at: None,
        }
    }

    /// True when the access token is missing or expires within the margin.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_empty()
            || (self.expires_at - now) < ChronoDuration::seconds(EXPIRY_MARGIN_SECONDS)
    }

    /// Usable means a non-empty access token was received.
    pub fn is_usable(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Owns the credential lifecycle: one-time authorization, refresh,
/// persistence of the refresh token.
#[derive(Clone)]
pub struct CredentialManager {
    client: RetryingHttpClient,
    classifier: ReplyClassifier,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    mdns_name: String,
    token_path: PathBuf,
    account_base_url: String,
}

impl CredentialManager {
    pub fn new(
        client: RetryingHttpClient,
        classifier: ReplyClassifier,
        spotify: &SpotifyConfig,
        redirect_uri: String,
        mdns_name: String,
        token_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            classifier,
            client_id: spotify.client_id.clone(),
            client_secret: spotify.client_secret.clone(),
            redirect_uri,
            mdns_name,
            token_path: token_path.into(),
            account_base_url: ACCOUNT_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.account_base_url = base_url.into();
        self
    }

    pub fn stored_refresh_token(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.token_path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    /// First-run authorization or immediate refresh of the stored token.
    pub async fn bootstrap(&self) -> Result<Credential, ApiError> {
        if let Some(refresh_token) = self.stored_refresh_token() {
            tracing::info!("stored refresh token found, refreshing");
            return self
                .refresh(Credential::from_stored_refresh_token(refresh_token))
                .await;
        }

        tracing::info!("no stored refresh token, starting one-time authorization");
        self.classifier
            .show_status("Login", &format!("http:// {}.local", self.mdns_name));

        let code = auth::get_authorization_code(&self.client_id, &self.redirect_uri)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "authorization listener failed");
                ApiError::Authorization
            })?
            .ok_or(ApiError::Authorization)?;

        self.classifier.show_status(super::api::APP_NAME, "authorized");
        self.exchange_code(&code).await
    }

    /// Exchange the one-time authorization code for a credential set.
    pub async fn exchange_code(&self, authorization_code: &str) -> Result<Credential, ApiError> {
        let reply = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", authorization_code),
                ("redirect_uri", &self.redirect_uri),
            ])
            .await;

        // any failure here is fatal, there is no stale credential to fall back on
        self.classifier.check("token", &reply, &[200], &[]).await?;
        tracing::info!("api tokens received");

        let credential = credential_from_reply(&reply, None);
        self.persist_refresh_token_if_changed(None, &credential.refresh_token);
        Ok(credential)
    }

    /// Refresh `current`, reusing it unchanged on a transport failure when
    /// it was previously obtained from the endpoint. Any 4xx from the
    /// refresh endpoint is fatal: the credential is unrecoverable without
    /// re-authorization.
    pub async fn refresh(&self, current: Credential) -> Result<Credential, ApiError> {
        let reply = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &current.refresh_token),
            ])
            .await;

        let warn: &[u16] = if current.obtained_at.is_some() { &[0] } else { &[] };
        if !self.classifier.check("refresh", &reply, &[200], warn).await? {
            tracing::warn!("refresh failed transiently, reusing stale credential");
            return Ok(current);
        }
        tracing::info!("refreshed api tokens received");

        let credential = credential_from_reply(&reply, Some(&current.refresh_token));
        self.persist_refresh_token_if_changed(
            Some(&current.refresh_token),
            &credential.refresh_token,
        );
        Ok(credential)
    }

    /// Refresh iff the credential is within its expiry margin or incomplete.
    pub async fn ensure_valid(&self, credential: Credential) -> Result<Credential, ApiError> {
        if !credential.needs_refresh(Utc::now()) {
            return Ok(credential);
        }
        self.refresh(credential).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> ApiReply {
        let basic = BASE64.encode(format!("{}:{}", self.client_id, self.client_secret));
        let headers = [("Authorization", format!("Basic {basic}"))];
        self.client
            .request(
                Method::POST,
                &format!("{}/token", self.account_base_url),
                Some(form),
                &headers,
            )
            .await
    }

    fn persist_refresh_token_if_changed(&self, previous: Option<&str>, new_token: &str) {
        if new_token.is_empty() || previous == Some(new_token) {
            return;
        }
        match std::fs::write(&self.token_path, new_token) {
            Ok(()) => tracing::info!(path = %self.token_path.display(), "refresh token stored"),
            Err(e) => {
                tracing::warn!(path = %self.token_path.display(), error = %e, "failed to store refresh token")
            }
        }
    }
}

/// Build a credential from a token endpoint reply, carrying the previous
/// refresh token forward when the endpoint omits one. Missing fields are
/// tolerated; the resulting credential simply reports unusable and the
/// control loop retries the refresh.
fn credential_from_reply(reply: &ApiReply, previous_refresh_token: Option<&str>) -> Credential {
    let now = Utc::now();
    let access_token = reply.json["access_token"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    let expires_in = reply.json["expires_in"].as_i64().unwrap_or(0);
    let refresh_token = reply.json["refresh_token"]
        .as_str()
        .or(previous_refresh_token)
        .unwrap_or_default()
        .to_string();

    Credential {
        access_token,
        refresh_token,
        expires_at: now + ChronoDuration::seconds(expires_in),
        obtained_at: Some(now),
    }
}
