//! Authenticated Wekan REST client with bounded retry and backoff.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::WekanAuthManager;
use crate::error::SyncError;
use crate::models::{Board, BoardList, Card, Swimlane};

/// Retry behavior for upstream requests.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Base delay; retry n waits `base * 2^(n-1)`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

/// Client for the Wekan REST API.
///
/// Retried creates are not idempotent-safe: when a create succeeds upstream
/// but the response is lost, the retry produces a duplicate board or card.
/// Callers needing at-most-once creation must look the resource up by name
/// before creating.
#[derive(Debug, Clone)]
pub struct WekanClient {
    auth: Arc<WekanAuthManager>,
    http: reqwest::Client,
    retry: RetryConfig,
}

impl WekanClient {
    /// Create a client sharing the given session manager.
    #[must_use]
    pub fn new(auth: Arc<WekanAuthManager>) -> Self {
        Self {
            auth,
            http: reqwest::Client::new(),
            retry: RetryConfig::default(),
        }
    }

    /// Override the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Base URL of the Wekan instance.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.auth.base_url()
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url(), path.trim_start_matches('/'))
    }

    /// Issue an authenticated request, retrying with exponential backoff.
    ///
    /// A 401 forces a token refresh and retries within the same budget, not
    /// a fresh one. 200/201 bodies are parsed as JSON; success bodies that
    /// are not JSON yield a synthetic
    /// `{"status": "success", "statusCode": ...}` marker, since some Wekan
    /// endpoints reply with empty bodies.
    ///
    /// The backoff sleep runs on this request's task only; concurrent
    /// requests are not held up by it.
    ///
    /// # Errors
    /// [`SyncError::UpstreamRequestFailure`] once the retry budget is spent,
    /// [`SyncError::Transport`] if the final attempt never reached Wekan.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, SyncError> {
        let url = self.api_url(path);
        let mut last_error = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                let delay = self.retry.base_delay * 2_u32.saturating_pow(attempt - 1);
                debug!(attempt, ?delay, url = %url, "Retrying Wekan request");
                tokio::time::sleep(delay).await;
            }

            let credential = self.auth.credentials().await?;
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&credential.token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %url, error = %e, "Wekan request failed to send");
                    last_error = Some(SyncError::Transport(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED {
                warn!(url = %url, "Wekan returned 401, refreshing token");
                self.auth.force_refresh().await?;
                last_error = Some(SyncError::UpstreamRequestFailure {
                    status: status.as_u16(),
                    body: String::new(),
                });
                continue;
            }

            if status == StatusCode::OK || status == StatusCode::CREATED {
                let bytes = response.bytes().await.map_err(SyncError::Transport)?;
                return Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                    json!({ "status": "success", "statusCode": status.as_u16() })
                }));
            }

            let body_text = response.text().await.unwrap_or_default();
            warn!(url = %url, status = status.as_u16(), "Wekan request failed");
            last_error = Some(SyncError::UpstreamRequestFailure {
                status: status.as_u16(),
                body: body_text,
            });
        }

        Err(last_error.unwrap_or_else(|| SyncError::UnexpectedResponse(
            "retry loop ended without a response".to_string(),
        )))
    }

    // =========================================================================
    // Board Operations
    // =========================================================================

    /// Create a board owned by the authenticated user.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn create_board(&self, title: &str) -> Result<Board, SyncError> {
        let credential = self.auth.credentials().await?;
        let body = json!({
            "title": title,
            "owner": credential.user_id,
            "permission": "private",
            "color": "belize",
            "slug": board_slug(title),
        });

        debug!(title = %title, "Creating board");
        let value = self.request(Method::POST, "/boards", Some(&body)).await?;
        parse(value, "board")
    }

    // =========================================================================
    // List Operations
    // =========================================================================

    /// Create a list in a board.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn create_list(&self, board_id: &str, title: &str) -> Result<BoardList, SyncError> {
        let body = json!({ "title": title });
        let value = self
            .request(Method::POST, &format!("/boards/{board_id}/lists"), Some(&body))
            .await?;
        parse(value, "list")
    }

    /// Fetch all lists of a board.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn get_lists(&self, board_id: &str) -> Result<Vec<BoardList>, SyncError> {
        let value = self
            .request(Method::GET, &format!("/boards/{board_id}/lists"), None)
            .await?;
        parse(value, "lists")
    }

    /// Find a list by exact title match.
    ///
    /// # Errors
    /// Returns an error if the lists cannot be fetched.
    pub async fn get_list_by_name(
        &self,
        board_id: &str,
        list_name: &str,
    ) -> Result<Option<BoardList>, SyncError> {
        let lists = self.get_lists(board_id).await?;
        Ok(lists.into_iter().find(|l| l.title == list_name))
    }

    // =========================================================================
    // Swimlane Operations
    // =========================================================================

    /// Fetch all swimlanes of a board.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn get_swimlanes(&self, board_id: &str) -> Result<Vec<Swimlane>, SyncError> {
        let value = self
            .request(Method::GET, &format!("/boards/{board_id}/swimlanes"), None)
            .await?;
        parse(value, "swimlanes")
    }

    /// Id of the board's default swimlane.
    ///
    /// Card creation mandates a swimlane reference; "first swimlane wins" is
    /// a simplifying policy, not a semantic choice.
    ///
    /// # Errors
    /// [`SyncError::NoSwimlane`] if the board has none.
    pub async fn default_swimlane(&self, board_id: &str) -> Result<String, SyncError> {
        let swimlanes = self.get_swimlanes(board_id).await?;
        swimlanes
            .into_iter()
            .next()
            .map(|s| s.id)
            .ok_or_else(|| SyncError::NoSwimlane {
                board: board_id.to_string(),
            })
    }

    // =========================================================================
    // Card Operations
    // =========================================================================

    /// Create a card in a list.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn create_card(
        &self,
        board_id: &str,
        list_id: &str,
        swimlane_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Card, SyncError> {
        let credential = self.auth.credentials().await?;
        let body = json!({
            "title": title,
            "description": description.unwrap_or_default(),
            "authorId": credential.user_id,
            "swimlaneId": swimlane_id,
            "members": [],
            "labelIds": [],
        });

        debug!(title = %title, list_id = %list_id, "Creating card");
        let value = self
            .request(
                Method::POST,
                &format!("/boards/{board_id}/lists/{list_id}/cards"),
                Some(&body),
            )
            .await?;
        parse(value, "card")
    }

    /// Move a card into another list.
    ///
    /// Wekan requires `authorId` on this update and re-attributes the card
    /// to the moving user.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn move_card(
        &self,
        board_id: &str,
        card_id: &str,
        new_list_id: &str,
    ) -> Result<Value, SyncError> {
        let credential = self.auth.credentials().await?;
        let body = json!({
            "listId": new_list_id,
            "authorId": credential.user_id,
        });

        self.request(
            Method::PUT,
            &format!("/boards/{board_id}/lists/{new_list_id}/cards/{card_id}"),
            Some(&body),
        )
        .await
    }

    /// Add a comment to a card.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn add_comment(
        &self,
        board_id: &str,
        card_id: &str,
        comment_text: &str,
    ) -> Result<Value, SyncError> {
        let credential = self.auth.credentials().await?;
        let body = json!({
            "comment": comment_text,
            "authorId": credential.user_id,
        });

        self.request(
            Method::POST,
            &format!("/boards/{board_id}/cards/{card_id}/comments"),
            Some(&body),
        )
        .await
    }
}

fn parse<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, SyncError> {
    serde_json::from_value(value)
        .map_err(|e| SyncError::UnexpectedResponse(format!("{what}: {e}")))
}

/// Derive a URL slug from a board title the way Wekan's UI does.
fn board_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-").replace(['(', ')'], "")
}
