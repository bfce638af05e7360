//! Wekan entity types and provisioning outcome shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Wekan board as returned by the REST API.
///
/// The id is assigned upstream and is the sole identity key for all
/// subsequent list/card operations against the board.
#[derive(Debug, Clone, Deserialize)]
pub struct Board {
    /// Board id
    #[serde(rename = "_id")]
    pub id: String,
    /// Board title
    #[serde(default)]
    pub title: Option<String>,
}

/// A list inside a board.
#[derive(Debug, Clone, Deserialize)]
pub struct BoardList {
    /// List id
    #[serde(rename = "_id")]
    pub id: String,
    /// List title; the lookup key for name-addressed card insertion
    #[serde(default)]
    pub title: String,
}

/// A swimlane inside a board.
///
/// Wekan mandates a swimlane reference on every card creation.
#[derive(Debug, Clone, Deserialize)]
pub struct Swimlane {
    /// Swimlane id
    #[serde(rename = "_id")]
    pub id: String,
    /// Swimlane title
    #[serde(default)]
    pub title: String,
}

/// A card as returned by card-creation endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    /// Card id
    #[serde(rename = "_id")]
    pub id: String,
}

/// Response of `POST /users/login`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Session token
    pub token: String,
    /// Authenticated user id
    pub id: String,
    /// Token expiry; absent on some Wekan versions
    #[serde(rename = "tokenExpires", default)]
    pub token_expires: Option<DateTime<Utc>>,
}

/// Ordered human-readable trace of one provisioning operation.
///
/// Entries are diagnostic only; nothing branches on them.
#[derive(Debug, Clone, Default)]
pub struct OperationLog(Vec<String>);

impl OperationLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one trace entry.
    pub fn push(&mut self, entry: impl Into<String>) {
        self.0.push(entry.into());
    }

    /// Entries recorded so far.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Consume the log, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<String> {
        self.0
    }
}

/// A list created during board provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedList {
    /// Upstream id of the created list
    pub id: String,
    /// List title
    pub title: String,
}

/// A card created during board provisioning.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedCard {
    /// Upstream id of the created card
    pub id: String,
    /// Card title
    pub title: String,
    /// Id of the list the card went into
    pub list_id: String,
}

/// Outcome of provisioning a whole board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardProvision {
    /// Id of the created board
    pub board_id: String,
    /// Browser URL of the board
    pub board_url: String,
    /// Lists created, in template order (failed ones are absent)
    pub lists: Vec<ProvisionedList>,
    /// Seed cards created (failed ones are absent)
    pub cards: Vec<ProvisionedCard>,
    /// Diagnostic trace of the operation
    pub operations_log: Vec<String>,
}

/// Outcome of adding one card to an existing board.
#[derive(Debug, Clone, Serialize)]
pub struct CardProvision {
    /// Board the card was added to
    pub board_id: String,
    /// Id of the created card
    pub card_id: String,
    /// Browser URL of the card
    pub card_url: String,
    /// Id of the list the card went into
    pub list_id: String,
    /// Title of the list the card went into
    pub list_name: String,
    /// Card title
    pub title: String,
    /// Card description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Diagnostic trace of the operation
    pub operations_log: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wekan_id_keys_deserialize() {
        let board: Board =
            serde_json::from_str(r#"{"_id": "b1", "title": "My Board"}"#).unwrap();
        assert_eq!(board.id, "b1");
        assert_eq!(board.title.as_deref(), Some("My Board"));

        let list: BoardList = serde_json::from_str(r#"{"_id": "l1", "title": "To Do"}"#).unwrap();
        assert_eq!(list.id, "l1");
        assert_eq!(list.title, "To Do");
    }

    #[test]
    fn test_login_response_optional_expiry() {
        let login: LoginResponse = serde_json::from_str(
            r#"{"token": "tok", "id": "u1", "tokenExpires": "2025-04-01T00:00:00.000Z"}"#,
        )
        .unwrap();
        assert!(login.token_expires.is_some());

        let login: LoginResponse =
            serde_json::from_str(r#"{"token": "tok", "id": "u1"}"#).unwrap();
        assert!(login.token_expires.is_none());
    }

    #[test]
    fn test_operation_log_preserves_order() {
        let mut log = OperationLog::new();
        log.push("first");
        log.push(format!("second {}", 2));
        assert_eq!(log.entries(), ["first", "second 2"]);
        assert_eq!(log.into_entries(), vec!["first", "second 2"]);
    }
}
