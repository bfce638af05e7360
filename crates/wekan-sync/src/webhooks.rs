//! Webhook signature verification and payload parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::SyncError;

type HmacSha256 = Hmac<Sha256>;

/// Prefix GitHub puts on the `X-Hub-Signature-256` header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature using HMAC-SHA256.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Header value in `sha256=<hex>` form
/// * `secret` - Webhook signing secret
///
/// # Returns
/// `true` if the signature matches the payload
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    // Decode the hex signature
    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    // Compute HMAC-SHA256
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Policy for requests that arrive without a signature header.
///
/// A present-but-wrong signature is rejected under both policies; only the
/// absent-header case differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// Absent signature header fails verification.
    Strict,
    /// Absent signature header passes verification (standalone/testing).
    Permissive,
}

impl std::str::FromStr for SignaturePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!("unknown signature policy '{other}'")),
        }
    }
}

/// Verify an inbound request against the configured secret and policy.
#[must_use]
pub fn verify_request(
    body: &[u8],
    signature: Option<&str>,
    secret: &str,
    policy: SignaturePolicy,
) -> bool {
    match signature {
        Some(sig) => verify_webhook_signature(body, sig, secret),
        None => matches!(policy, SignaturePolicy::Permissive),
    }
}

// =========================================================================
// GitHub event payloads
// =========================================================================

/// GitHub user reference inside a webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    /// Account login
    pub login: String,
}

/// Label attached to an issue.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLabel {
    /// Label name
    pub name: String,
}

/// Repository reference.
///
/// Only the name is guaranteed across event types; `repository` events
/// carry the richer fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    /// Repository name
    pub name: String,
    /// Repository HTML URL
    #[serde(default)]
    pub html_url: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language
    #[serde(default)]
    pub language: Option<String>,
    /// Whether the repository is private
    #[serde(default)]
    pub private: bool,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Issue inside an `issues` event.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    /// Issue number
    pub number: u64,
    /// Issue title
    pub title: String,
    /// HTML URL of the issue
    pub html_url: String,
    /// Issue author
    pub user: GitHubUser,
    /// Current state (open, closed)
    pub state: String,
    /// Creation timestamp
    pub created_at: String,
    /// Issue body (markdown)
    #[serde(default)]
    pub body: Option<String>,
    /// Labels on the issue
    #[serde(default)]
    pub labels: Vec<IssueLabel>,
}

/// `issues` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    /// Action (opened, reopened, edited, closed, ...)
    pub action: String,
    /// The issue the event refers to
    pub issue: Issue,
    /// Repository the issue belongs to
    pub repository: Repository,
}

/// Git reference (branch) inside a pull request.
#[derive(Debug, Clone, Deserialize)]
pub struct GitRef {
    /// Branch name
    #[serde(rename = "ref")]
    pub ref_name: String,
}

/// Pull request inside a `pull_request` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// HTML URL of the PR
    pub html_url: String,
    /// PR author
    pub user: GitHubUser,
    /// PR state (open, closed)
    pub state: String,
    /// Creation timestamp
    pub created_at: String,
    /// PR body (markdown)
    #[serde(default)]
    pub body: Option<String>,
    /// Target branch
    pub base: GitRef,
    /// Source branch
    pub head: GitRef,
    /// Whether GitHub considers the PR mergeable (null while computing)
    #[serde(default)]
    pub mergeable: Option<bool>,
    /// Whether the PR is a draft
    #[serde(default)]
    pub draft: bool,
}

/// `pull_request` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action (opened, reopened, edited, closed, ...)
    pub action: String,
    /// The pull request the event refers to
    pub pull_request: PullRequest,
    /// Repository the PR belongs to
    pub repository: Repository,
}

/// Commit author inside a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    /// Author name
    pub name: String,
    /// Author email
    pub email: String,
}

/// One commit inside a push payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    /// Commit SHA
    pub id: String,
    /// Full commit message
    pub message: String,
    /// Commit URL
    pub url: String,
    /// Commit timestamp
    pub timestamp: String,
    /// Commit author
    pub author: CommitAuthor,
    /// Added file paths
    #[serde(default)]
    pub added: Vec<String>,
    /// Modified file paths
    #[serde(default)]
    pub modified: Vec<String>,
    /// Removed file paths
    #[serde(default)]
    pub removed: Vec<String>,
}

/// `push` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// Pushed ref (e.g. `refs/heads/main`)
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Pushed commits, in payload order
    pub commits: Vec<PushCommit>,
    /// Repository the push targeted
    pub repository: Repository,
}

/// `repository` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryEvent {
    /// Action (created, deleted, ...)
    pub action: String,
    /// The repository the event refers to
    pub repository: Repository,
}

/// `ping` event payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PingEvent {
    /// GitHub's zen aphorism
    #[serde(default)]
    pub zen: Option<String>,
}

/// A decoded webhook event, classified by the `X-GitHub-Event` header.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    /// `issues` event
    Issues(IssuesEvent),
    /// `pull_request` event
    PullRequest(PullRequestEvent),
    /// `push` event
    Push(PushEvent),
    /// `repository` event
    Repository(RepositoryEvent),
    /// `ping` event
    Ping(PingEvent),
    /// Any event type this receiver does not mirror
    Unhandled {
        /// The unrecognized event type header value
        event: String,
    },
}

impl WebhookEvent {
    /// Decode a raw payload for the given event type header.
    ///
    /// The subject payload is validated up front: required fields missing
    /// for the event type fail here, before any handler runs.
    ///
    /// # Errors
    /// Returns [`SyncError::PayloadInvalid`] if the body is not JSON or
    /// lacks fields the event type requires.
    pub fn decode(event_type: &str, body: &[u8]) -> Result<Self, SyncError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(SyncError::PayloadInvalid)?;

        let event = match event_type {
            "issues" => {
                Self::Issues(serde_json::from_value(value).map_err(SyncError::PayloadInvalid)?)
            }
            "pull_request" => {
                Self::PullRequest(serde_json::from_value(value).map_err(SyncError::PayloadInvalid)?)
            }
            "push" => Self::Push(serde_json::from_value(value).map_err(SyncError::PayloadInvalid)?),
            "repository" => {
                Self::Repository(serde_json::from_value(value).map_err(SyncError::PayloadInvalid)?)
            }
            "ping" => Self::Ping(serde_json::from_value(value).map_err(SyncError::PayloadInvalid)?),
            other => Self::Unhandled {
                event: other.to_string(),
            },
        };

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let body = b"test payload";
        let secret = "test-secret";

        let signature = sign(secret, body);
        assert!(verify_webhook_signature(body, &signature, secret));
    }

    #[test]
    fn test_verify_webhook_signature_tampered_body() {
        let body = b"test payload";
        let secret = "test-secret";

        let signature = sign(secret, body);
        assert!(!verify_webhook_signature(b"test payloae", &signature, secret));
    }

    #[test]
    fn test_verify_webhook_signature_wrong() {
        let body = b"test payload";
        let secret = "test-secret";
        let wrong =
            "sha256=0000000000000000000000000000000000000000000000000000000000000000";

        assert!(!verify_webhook_signature(body, wrong, secret));
    }

    #[test]
    fn test_verify_webhook_signature_missing_prefix() {
        let body = b"test payload";
        let secret = "test-secret";

        // Valid digest but without the sha256= prefix
        let signature = sign(secret, body);
        let bare = signature.strip_prefix("sha256=").unwrap();
        assert!(!verify_webhook_signature(body, bare, secret));
    }

    #[test]
    fn test_verify_webhook_signature_malformed_hex() {
        assert!(!verify_webhook_signature(
            b"test payload",
            "sha256=not-hex",
            "test-secret"
        ));
    }

    #[test]
    fn test_absent_signature_policies() {
        let body = b"test payload";
        let secret = "test-secret";

        assert!(!verify_request(body, None, secret, SignaturePolicy::Strict));
        assert!(verify_request(
            body,
            None,
            secret,
            SignaturePolicy::Permissive
        ));
    }

    #[test]
    fn test_present_invalid_signature_fails_under_both_policies() {
        let body = b"test payload";
        let secret = "test-secret";
        let wrong =
            "sha256=0000000000000000000000000000000000000000000000000000000000000000";

        assert!(!verify_request(
            body,
            Some(wrong),
            secret,
            SignaturePolicy::Strict
        ));
        assert!(!verify_request(
            body,
            Some(wrong),
            secret,
            SignaturePolicy::Permissive
        ));
    }

    #[test]
    fn test_signature_policy_parse() {
        assert_eq!(
            "strict".parse::<SignaturePolicy>().unwrap(),
            SignaturePolicy::Strict
        );
        assert_eq!(
            "Permissive".parse::<SignaturePolicy>().unwrap(),
            SignaturePolicy::Permissive
        );
        assert!("lenient".parse::<SignaturePolicy>().is_err());
    }

    #[test]
    fn test_decode_issues_event() {
        let json = r#"{
            "action": "opened",
            "issue": {
                "number": 13,
                "title": "Fix bug",
                "html_url": "https://github.com/demo/demo/issues/13",
                "user": {"login": "alice"},
                "state": "open",
                "created_at": "2025-01-01T00:00:00Z",
                "labels": []
            },
            "repository": {"name": "demo"}
        }"#;

        let event = WebhookEvent::decode("issues", json.as_bytes()).unwrap();
        let WebhookEvent::Issues(event) = event else {
            panic!("expected issues event");
        };
        assert_eq!(event.action, "opened");
        assert_eq!(event.issue.number, 13);
        assert_eq!(event.issue.title, "Fix bug");
        assert_eq!(event.issue.user.login, "alice");
        assert_eq!(event.repository.name, "demo");
    }

    #[test]
    fn test_decode_issues_event_missing_field() {
        // No issue.number
        let json = r#"{
            "action": "opened",
            "issue": {"title": "Fix bug"},
            "repository": {"name": "demo"}
        }"#;

        let err = WebhookEvent::decode("issues", json.as_bytes()).unwrap_err();
        assert!(matches!(err, SyncError::PayloadInvalid(_)));
    }

    #[test]
    fn test_decode_push_event() {
        let json = r#"{
            "ref": "refs/heads/main",
            "commits": [{
                "id": "abcdef1234567890",
                "message": "Fix the thing\n\nLonger explanation",
                "url": "https://github.com/demo/demo/commit/abcdef12",
                "timestamp": "2025-01-01T00:00:00Z",
                "author": {"name": "Alice", "email": "alice@example.com"}
            }],
            "repository": {"name": "demo"}
        }"#;

        let event = WebhookEvent::decode("push", json.as_bytes()).unwrap();
        let WebhookEvent::Push(event) = event else {
            panic!("expected push event");
        };
        assert_eq!(event.ref_name, "refs/heads/main");
        assert_eq!(event.commits.len(), 1);
        assert!(event.commits[0].added.is_empty());
    }

    #[test]
    fn test_decode_ping_event() {
        let event = WebhookEvent::decode("ping", br#"{"zen": "Keep it simple."}"#).unwrap();
        let WebhookEvent::Ping(event) = event else {
            panic!("expected ping event");
        };
        assert_eq!(event.zen.as_deref(), Some("Keep it simple."));

        let event = WebhookEvent::decode("ping", b"{}").unwrap();
        let WebhookEvent::Ping(event) = event else {
            panic!("expected ping event");
        };
        assert!(event.zen.is_none());
    }

    #[test]
    fn test_decode_unknown_event_type() {
        let event = WebhookEvent::decode("watch", b"{}").unwrap();
        assert!(matches!(event, WebhookEvent::Unhandled { event } if event == "watch"));
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = WebhookEvent::decode("issues", b"not json").unwrap_err();
        assert!(matches!(err, SyncError::PayloadInvalid(_)));
    }
}
