//! Wekan session management: eager login, expiry tracking, forced refresh.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::models::LoginResponse;

/// Safety margin before expiry at which the token is refreshed.
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Assumed token lifetime when Wekan does not report an expiry.
const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 90;

/// A Wekan session credential.
#[derive(Debug, Clone)]
pub struct Credential {
    /// Bearer token for API calls.
    pub token: String,
    /// Id of the authenticated user.
    pub user_id: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    fn needs_refresh(&self) -> bool {
        Utc::now() + Duration::minutes(REFRESH_MARGIN_MINUTES) >= self.expires_at
    }
}

/// Owns the Wekan session credential.
///
/// Authentication is eager: construction fails if Wekan rejects the
/// credentials. The credential lives behind a mutex so concurrent callers
/// observe a single in-flight refresh rather than racing re-logins.
#[derive(Debug)]
pub struct WekanAuthManager {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
    credential: Mutex<Credential>,
}

impl WekanAuthManager {
    /// Authenticate against Wekan and return a ready manager.
    ///
    /// # Errors
    /// Returns [`SyncError::AuthenticationFailure`] if Wekan rejects the
    /// credentials, or [`SyncError::Transport`] if it cannot be reached.
    pub async fn connect(
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, SyncError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();

        let credential = login(&http, &base_url, username, password).await?;
        info!(
            user_id = %credential.user_id,
            expires_at = %credential.expires_at,
            "Authenticated with Wekan"
        );

        Ok(Self {
            base_url,
            username: username.to_string(),
            password: password.to_string(),
            http,
            credential: Mutex::new(credential),
        })
    }

    /// Base URL of the Wekan instance this manager is bound to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Snapshot of the current credential, re-authenticating when it is
    /// within the refresh margin of expiry.
    ///
    /// # Errors
    /// Returns [`SyncError::AuthenticationFailure`] if re-authentication is
    /// needed and rejected.
    pub async fn credentials(&self) -> Result<Credential, SyncError> {
        let mut guard = self.credential.lock().await;
        if guard.needs_refresh() {
            debug!("Wekan token expired or about to expire, re-authenticating");
            *guard = login(&self.http, &self.base_url, &self.username, &self.password).await?;
        }
        Ok(guard.clone())
    }

    /// Discard the current credential and authenticate again.
    ///
    /// Invoked after a request observes a 401 from Wekan despite holding a
    /// token that looked valid.
    ///
    /// # Errors
    /// Returns [`SyncError::AuthenticationFailure`] if Wekan rejects the
    /// stored credentials.
    pub async fn force_refresh(&self) -> Result<Credential, SyncError> {
        let mut guard = self.credential.lock().await;
        warn!("Forcing Wekan re-authentication");
        *guard = login(&self.http, &self.base_url, &self.username, &self.password).await?;
        Ok(guard.clone())
    }
}

async fn login(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<Credential, SyncError> {
    let login_url = format!("{base_url}/users/login");
    debug!(url = %login_url, "Authenticating with Wekan");

    let response = http
        .post(&login_url)
        .form(&[("username", username), ("password", password)])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::AuthenticationFailure {
            status: status.as_u16(),
            body,
        });
    }

    let login: LoginResponse = response.json().await?;
    let expires_at = login
        .token_expires
        .unwrap_or_else(|| Utc::now() + Duration::days(DEFAULT_TOKEN_LIFETIME_DAYS));

    Ok(Credential {
        token: login.token,
        user_id: login.id,
        expires_at,
    })
}
