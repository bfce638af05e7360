//! Board provisioning: template-driven creation and name-addressed updates.

use serde_json::Value;
use tracing::{info, warn};

use crate::client::WekanClient;
use crate::error::SyncError;
use crate::models::{
    BoardProvision, CardProvision, OperationLog, ProvisionedCard, ProvisionedList,
};
use crate::templates::{validate_template, BoardTemplate, TemplateManager};

/// Creates boards, lists, and cards in Wekan from templates or ad-hoc
/// requests.
///
/// Upstream entities are treated as transient results: nothing is cached
/// across operations except the default swimlane id, which is resolved once
/// per provisioning operation.
#[derive(Debug, Clone)]
pub struct BoardCreator {
    client: WekanClient,
    templates: TemplateManager,
}

impl BoardCreator {
    /// Create a board creator over the given client and template registry.
    #[must_use]
    pub fn new(client: WekanClient, templates: TemplateManager) -> Self {
        Self { client, templates }
    }

    /// Template registry used by this creator.
    #[must_use]
    pub fn templates(&self) -> &TemplateManager {
        &self.templates
    }

    /// Underlying API client.
    #[must_use]
    pub fn client(&self) -> &WekanClient {
        &self.client
    }

    /// Provision a board from a named template.
    ///
    /// Lists are created in template order, then seed cards go into their
    /// named lists. A failed list or card is logged and skipped rather than
    /// aborting: Wekan has no transactional multi-resource create, and
    /// already-created state should not be thrown away.
    ///
    /// # Errors
    /// Fails if the template is unknown or the board itself cannot be
    /// created.
    pub async fn create_from_template(
        &self,
        template_name: &str,
        board_title: Option<&str>,
    ) -> Result<BoardProvision, SyncError> {
        let template = self.templates.get(template_name)?.clone();

        let mut log = OperationLog::new();
        log.push(format!("Creating board from template: {template_name}"));

        self.provision(&template, board_title, log).await
    }

    /// Provision a board from an ad-hoc template definition.
    ///
    /// # Errors
    /// Fails with [`SyncError::TemplateValidation`] before any network call
    /// if the definition is invalid.
    pub async fn create_custom_board(
        &self,
        template: &BoardTemplate,
    ) -> Result<BoardProvision, SyncError> {
        validate_template(template)?;

        let mut log = OperationLog::new();
        log.push("Creating board from custom configuration");

        self.provision(template, None, log).await
    }

    async fn provision(
        &self,
        template: &BoardTemplate,
        board_title: Option<&str>,
        mut log: OperationLog,
    ) -> Result<BoardProvision, SyncError> {
        let title = board_title.unwrap_or(&template.title);

        let board = self.client.create_board(title).await?;
        log.push(format!("Board created successfully: {}", board.id));
        info!(board_id = %board.id, title = %title, "Created board");

        let mut lists = Vec::new();
        for list_item in &template.lists {
            match self.client.create_list(&board.id, &list_item.title).await {
                Ok(list) => {
                    log.push(format!("List created: {} ({})", list_item.title, list.id));
                    lists.push(ProvisionedList {
                        id: list.id,
                        title: list_item.title.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        board_id = %board.id,
                        list = %list_item.title,
                        error = %e,
                        "Failed to create list, skipping"
                    );
                    log.push(format!(
                        "WARNING: Failed to create list '{}': {e}",
                        list_item.title
                    ));
                }
            }
        }

        let mut cards = Vec::new();
        if !template.cards.is_empty() {
            // One swimlane lookup per operation, reused for every card.
            let swimlane_id = match self.client.default_swimlane(&board.id).await {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!(board_id = %board.id, error = %e, "No swimlane available, skipping seed cards");
                    log.push(format!("WARNING: {e}"));
                    None
                }
            };

            if let Some(swimlane_id) = swimlane_id {
                for (list_title, seed_cards) in &template.cards {
                    let Some(list) = lists.iter().find(|l| l.title == *list_title) else {
                        log.push(format!(
                            "WARNING: Cannot create cards for list '{list_title}': List not found"
                        ));
                        continue;
                    };

                    for card in seed_cards {
                        match self
                            .client
                            .create_card(
                                &board.id,
                                &list.id,
                                &swimlane_id,
                                &card.title,
                                card.description.as_deref(),
                            )
                            .await
                        {
                            Ok(created) => {
                                log.push(format!("Card created: {} ({})", card.title, created.id));
                                cards.push(ProvisionedCard {
                                    id: created.id,
                                    title: card.title.clone(),
                                    list_id: list.id.clone(),
                                });
                            }
                            Err(e) => {
                                warn!(
                                    board_id = %board.id,
                                    card = %card.title,
                                    error = %e,
                                    "Failed to create card, skipping"
                                );
                                log.push(format!(
                                    "WARNING: Failed to create card '{}': {e}",
                                    card.title
                                ));
                            }
                        }
                    }
                }
            }
        }

        Ok(BoardProvision {
            board_url: format!("{}/b/{}", self.client.base_url(), board.id),
            board_id: board.id,
            lists,
            cards,
            operations_log: log.into_entries(),
        })
    }

    /// Add a card to an existing board, addressing the list by its title.
    ///
    /// This is the path repeated webhook deliveries use against the same
    /// logical board: the list resolves by name, never by a cached id.
    /// Calling this twice with the same arguments creates two distinct
    /// cards; deduplication is the caller's concern.
    ///
    /// # Errors
    /// [`SyncError::ResourceNotFound`] if no list carries that name.
    pub async fn add_card_to_board(
        &self,
        board_id: &str,
        list_name: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<CardProvision, SyncError> {
        let mut log = OperationLog::new();
        log.push(format!(
            "Adding card '{title}' to list '{list_name}' in board {board_id}"
        ));

        let list = self
            .client
            .get_list_by_name(board_id, list_name)
            .await?
            .ok_or_else(|| SyncError::ResourceNotFound {
                kind: "list",
                name: list_name.to_string(),
            })?;

        let swimlane_id = self.client.default_swimlane(board_id).await?;
        let card = self
            .client
            .create_card(board_id, &list.id, &swimlane_id, title, description)
            .await?;
        log.push(format!("Card created successfully: {}", card.id));

        Ok(CardProvision {
            board_id: board_id.to_string(),
            card_url: format!("{}/b/{board_id}/cards/{}", self.client.base_url(), card.id),
            card_id: card.id,
            list_id: list.id,
            list_name: list_name.to_string(),
            title: title.to_string(),
            description: description.map(String::from),
            operations_log: log.into_entries(),
        })
    }

    /// Move a card into another list, addressed by name.
    ///
    /// # Errors
    /// [`SyncError::ResourceNotFound`] if the destination list does not
    /// exist.
    pub async fn move_card(
        &self,
        board_id: &str,
        card_id: &str,
        destination_list_name: &str,
    ) -> Result<Value, SyncError> {
        let list = self
            .client
            .get_list_by_name(board_id, destination_list_name)
            .await?
            .ok_or_else(|| SyncError::ResourceNotFound {
                kind: "list",
                name: destination_list_name.to_string(),
            })?;

        self.client.move_card(board_id, card_id, &list.id).await
    }

    /// Add a comment to a card.
    ///
    /// # Errors
    /// Returns an error if the API call fails.
    pub async fn add_comment(
        &self,
        board_id: &str,
        card_id: &str,
        text: &str,
    ) -> Result<Value, SyncError> {
        self.client.add_comment(board_id, card_id, text).await
    }
}
