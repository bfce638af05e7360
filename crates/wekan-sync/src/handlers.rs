//! Per-event webhook handlers and card formatting.
//!
//! Each handler converts its own failures into a structured JSON response;
//! no event-processing error escapes as a raw fault. When no Wekan context
//! is present (standalone mode) the handlers describe what they would have
//! provisioned instead of calling upstream.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::board::BoardCreator;
use crate::models::BoardProvision;
use crate::templates::KANBAN_BASIC;
use crate::webhooks::{
    Issue, IssuesEvent, PingEvent, PullRequest, PullRequestEvent, PushCommit, PushEvent,
    Repository, RepositoryEvent,
};

/// Branch refs whose pushes are mirrored as commit cards.
const PRIMARY_BRANCH_REFS: [&str; 2] = ["refs/heads/main", "refs/heads/master"];

/// Commits mirrored per push.
const MAX_COMMITS_PER_PUSH: usize = 5;

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn internal_error(message: &str) -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": message }),
    )
}

/// Provision a fresh board for an event.
///
/// Always creates via the basic kanban template; a redelivered
/// board-creating event therefore produces a duplicate board. Looking up an
/// existing board by title first would need a board-listing endpoint.
async fn get_or_create_board(
    creator: &BoardCreator,
    board_name: &str,
) -> Result<BoardProvision, Response> {
    match creator
        .create_from_template(KANBAN_BASIC, Some(board_name))
        .await
    {
        Ok(board) => Ok(board),
        Err(e) => {
            error!(board = %board_name, error = %e, "Failed to create board");
            Err(internal_error("Failed to create/get board"))
        }
    }
}

/// Handle `issues` events.
pub async fn handle_issue_event(wekan: Option<&BoardCreator>, event: &IssuesEvent) -> Response {
    let action = event.action.as_str();
    let issue = &event.issue;
    info!(action = %action, number = issue.number, "Processing issue event");

    match action {
        "opened" | "reopened" | "edited" => {
            let board_name = format!("GitHub Issues - {}", event.repository.name);
            let card_title = format!("Issue #{}: {}", issue.number, issue.title);
            let list_name = if action == "opened" { "To Do" } else { "Backlog" };

            let Some(creator) = wekan else {
                info!(board = %board_name, card = %card_title, "Would create WeKan card");
                return json_response(
                    StatusCode::OK,
                    json!({
                        "status": "success",
                        "action": action,
                        "board_name": board_name,
                        "card_title": card_title,
                        "message": format!("Issue #{} would be synchronized to WeKan", issue.number),
                        "mode": "standalone",
                    }),
                );
            };

            let board = match get_or_create_board(creator, &board_name).await {
                Ok(board) => board,
                Err(response) => return response,
            };

            let card_desc = format_issue_description(issue);
            match creator
                .add_card_to_board(&board.board_id, list_name, &card_title, Some(&card_desc))
                .await
            {
                Ok(card) => json_response(
                    StatusCode::OK,
                    json!({
                        "status": "success",
                        "action": action,
                        "board_id": board.board_id,
                        "card_id": card.card_id,
                        "message": format!("Issue #{} synchronized to WeKan", issue.number),
                    }),
                ),
                Err(e) => {
                    error!(number = issue.number, error = %e, "Failed to create card for issue");
                    internal_error("Failed to create card")
                }
            }
        }
        "closed" => {
            // TODO: move the issue's card to Done via BoardCreator::move_card
            info!(
                number = issue.number,
                "Issue closed - would move card to Done list"
            );
            let mut body = json!({
                "status": "success",
                "action": action,
                "message": format!("Issue #{} closed", issue.number),
            });
            if wekan.is_none() {
                body["mode"] = json!("standalone");
            }
            json_response(StatusCode::OK, body)
        }
        _ => json_response(
            StatusCode::OK,
            json!({ "status": "Issue event processed", "action": action }),
        ),
    }
}

/// Handle `pull_request` events.
pub async fn handle_pull_request_event(
    wekan: Option<&BoardCreator>,
    event: &PullRequestEvent,
) -> Response {
    let action = event.action.as_str();
    let pr = &event.pull_request;
    info!(action = %action, number = pr.number, "Processing PR event");

    if !matches!(action, "opened" | "reopened" | "edited") {
        return json_response(
            StatusCode::OK,
            json!({ "status": "PR event processed", "action": action }),
        );
    }

    let board_name = format!("GitHub PRs - {}", event.repository.name);
    let card_title = format!("PR #{}: {}", pr.number, pr.title);

    let Some(creator) = wekan else {
        info!(board = %board_name, card = %card_title, "Would create WeKan card");
        return json_response(
            StatusCode::OK,
            json!({
                "status": "success",
                "action": action,
                "board_name": board_name,
                "card_title": card_title,
                "message": format!("PR #{} would be synchronized to WeKan", pr.number),
                "mode": "standalone",
            }),
        );
    };

    let board = match get_or_create_board(creator, &board_name).await {
        Ok(board) => board,
        Err(response) => return response,
    };

    let card_desc = format_pull_request_description(pr);
    match creator
        .add_card_to_board(&board.board_id, "To Do", &card_title, Some(&card_desc))
        .await
    {
        Ok(card) => json_response(
            StatusCode::OK,
            json!({
                "status": "success",
                "action": action,
                "board_id": board.board_id,
                "card_id": card.card_id,
                "message": format!("PR #{} synchronized to WeKan", pr.number),
            }),
        ),
        Err(e) => {
            error!(number = pr.number, error = %e, "Failed to create card for PR");
            internal_error("Failed to create card")
        }
    }
}

/// Handle `push` events.
pub async fn handle_push_event(wekan: Option<&BoardCreator>, event: &PushEvent) -> Response {
    info!(
        commits = event.commits.len(),
        push_ref = %event.ref_name,
        "Processing push event"
    );

    // Only pushes to the primary branch are mirrored
    if !PRIMARY_BRANCH_REFS.contains(&event.ref_name.as_str()) {
        return json_response(
            StatusCode::OK,
            json!({ "status": "Push event processed", "ref": event.ref_name }),
        );
    }

    let board_name = format!("GitHub Commits - {}", event.repository.name);

    let Some(creator) = wekan else {
        let cards_created = event.commits.len().min(MAX_COMMITS_PER_PUSH);
        return json_response(
            StatusCode::OK,
            json!({
                "status": "success",
                "board_name": board_name,
                "cards_created": cards_created,
                "message": format!(
                    "Processed {} commits, would create {} cards",
                    event.commits.len(),
                    cards_created
                ),
                "mode": "standalone",
            }),
        );
    };

    let board = match get_or_create_board(creator, &board_name).await {
        Ok(board) => board,
        Err(response) => return response,
    };

    let mut cards_created = 0;
    for commit in event.commits.iter().take(MAX_COMMITS_PER_PUSH) {
        let first_line = commit.message.lines().next().unwrap_or_default();
        let card_title = format!("Commit: {first_line}");
        let card_desc = format_commit_description(commit);

        match creator
            .add_card_to_board(&board.board_id, "Done", &card_title, Some(&card_desc))
            .await
        {
            Ok(_) => cards_created += 1,
            Err(e) => {
                error!(sha = %commit.id, error = %e, "Failed to create card for commit");
            }
        }
    }

    json_response(
        StatusCode::OK,
        json!({
            "status": "success",
            "board_id": board.board_id,
            "cards_created": cards_created,
            "message": format!(
                "Processed {} commits, created {} cards",
                event.commits.len(),
                cards_created
            ),
        }),
    )
}

/// Handle `repository` events.
pub async fn handle_repository_event(
    wekan: Option<&BoardCreator>,
    event: &RepositoryEvent,
) -> Response {
    let action = event.action.as_str();
    let repo = &event.repository;
    info!(action = %action, repo = %repo.name, "Processing repository event");

    if action != "created" {
        return json_response(
            StatusCode::OK,
            json!({ "status": "Repository event processed", "action": action }),
        );
    }

    let board_name = format!("Project - {}", repo.name);

    let Some(creator) = wekan else {
        info!(board = %board_name, "Would create WeKan board");
        return json_response(
            StatusCode::OK,
            json!({
                "status": "success",
                "action": action,
                "board_name": board_name,
                "message": format!("Would create board for repository {}", repo.name),
                "mode": "standalone",
            }),
        );
    };

    let board = match get_or_create_board(creator, &board_name).await {
        Ok(board) => board,
        Err(response) => return response,
    };

    let setup_desc = format_repository_description(repo);
    if let Err(e) = creator
        .add_card_to_board(&board.board_id, "To Do", "Repository Setup", Some(&setup_desc))
        .await
    {
        error!(board_id = %board.board_id, error = %e, "Failed to create setup card");
        return internal_error("Failed to create card");
    }

    json_response(
        StatusCode::OK,
        json!({
            "status": "success",
            "action": action,
            "board_id": board.board_id,
            "message": format!("Created board for repository {}", repo.name),
        }),
    )
}

/// Handle `ping` events.
pub fn handle_ping_event(event: &PingEvent) -> Response {
    info!("Received ping event from GitHub");
    json_response(
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "Webhook receiver is working!",
            "zen": event.zen.as_deref().unwrap_or("No zen provided"),
        }),
    )
}

// =========================================================================
// Card description formatting
// =========================================================================

fn format_issue_description(issue: &Issue) -> String {
    let labels = issue
        .labels
        .iter()
        .map(|l| l.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "\n**GitHub Issue**: {}\n**Author**: {}\n**State**: {}\n**Created**: {}\n\n\
         **Description**:\n{}\n\n**Labels**: {}\n",
        issue.html_url,
        issue.user.login,
        issue.state,
        issue.created_at,
        issue
            .body
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or("No description provided"),
        labels,
    )
}

fn format_pull_request_description(pr: &PullRequest) -> String {
    format!(
        "\n**GitHub Pull Request**: {}\n**Author**: {}\n**State**: {}\n**Base Branch**: {}\n\
         **Head Branch**: {}\n**Created**: {}\n\n**Description**:\n{}\n\n\
         **Mergeable**: {}\n**Draft**: {}\n",
        pr.html_url,
        pr.user.login,
        pr.state,
        pr.base.ref_name,
        pr.head.ref_name,
        pr.created_at,
        pr.body
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or("No description provided"),
        pr.mergeable
            .map_or_else(|| "Unknown".to_string(), |m| m.to_string()),
        pr.draft,
    )
}

fn format_commit_description(commit: &PushCommit) -> String {
    let short_sha = commit.id.get(..8).unwrap_or(&commit.id);

    format!(
        "\n**GitHub Commit**: {}\n**Author**: {} <{}>\n**Timestamp**: {}\n**SHA**: {}\n\n\
         **Full Message**:\n{}\n\n**Modified Files**: {}\n**Added Files**: {}\n\
         **Removed Files**: {}\n",
        commit.url,
        commit.author.name,
        commit.author.email,
        commit.timestamp,
        short_sha,
        commit.message,
        commit.modified.len(),
        commit.added.len(),
        commit.removed.len(),
    )
}

fn format_repository_description(repo: &Repository) -> String {
    format!(
        "\n**Repository**: {}\n**Description**: {}\n**Language**: {}\n**Private**: {}\n\
         **Created**: {}\n\nInitial setup tasks for the new repository.\n",
        repo.html_url.as_deref().unwrap_or(""),
        repo.description.as_deref().unwrap_or("No description"),
        repo.language.as_deref().unwrap_or("Unknown"),
        repo.private,
        repo.created_at.as_deref().unwrap_or(""),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhooks::{CommitAuthor, GitHubUser, IssueLabel};

    fn sample_issue() -> Issue {
        Issue {
            number: 13,
            title: "Fix bug".to_string(),
            html_url: "https://github.com/demo/demo/issues/13".to_string(),
            user: GitHubUser {
                login: "alice".to_string(),
            },
            state: "open".to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            body: None,
            labels: vec![
                IssueLabel {
                    name: "bug".to_string(),
                },
                IssueLabel {
                    name: "urgent".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_format_issue_description() {
        let desc = format_issue_description(&sample_issue());

        assert!(desc.starts_with("\n**GitHub Issue**: https://github.com/demo/demo/issues/13\n"));
        assert!(desc.contains("**Author**: alice"));
        assert!(desc.contains("**State**: open"));
        assert!(desc.contains("**Description**:\nNo description provided"));
        assert!(desc.contains("**Labels**: bug, urgent"));
        assert!(desc.ends_with('\n'));
    }

    #[test]
    fn test_format_issue_description_empty_body_falls_back() {
        let mut issue = sample_issue();
        issue.body = Some(String::new());
        let desc = format_issue_description(&issue);
        assert!(desc.contains("No description provided"));

        issue.body = Some("Steps to reproduce".to_string());
        let desc = format_issue_description(&issue);
        assert!(desc.contains("**Description**:\nSteps to reproduce"));
    }

    #[test]
    fn test_format_commit_description_truncates_sha() {
        let commit = PushCommit {
            id: "abcdef1234567890".to_string(),
            message: "Fix the thing\n\nLonger explanation".to_string(),
            url: "https://github.com/demo/demo/commit/abcdef12".to_string(),
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            author: CommitAuthor {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
            added: vec!["src/new.rs".to_string()],
            modified: vec![],
            removed: vec![],
        };

        let desc = format_commit_description(&commit);
        assert!(desc.contains("**SHA**: abcdef12\n"));
        assert!(desc.contains("**Author**: Alice <alice@example.com>"));
        assert!(desc.contains("**Full Message**:\nFix the thing\n\nLonger explanation"));
        assert!(desc.contains("**Added Files**: 1"));
        assert!(desc.contains("**Modified Files**: 0"));
    }

    #[test]
    fn test_format_repository_description_fallbacks() {
        let repo = Repository {
            name: "demo".to_string(),
            html_url: Some("https://github.com/demo/demo".to_string()),
            description: None,
            language: None,
            private: false,
            created_at: Some("2025-01-01T00:00:00Z".to_string()),
        };

        let desc = format_repository_description(&repo);
        assert!(desc.contains("**Repository**: https://github.com/demo/demo"));
        assert!(desc.contains("**Description**: No description"));
        assert!(desc.contains("**Language**: Unknown"));
        assert!(desc.contains("**Private**: false"));
        assert!(desc.ends_with("Initial setup tasks for the new repository.\n"));
    }

    #[test]
    fn test_format_pull_request_description_mergeable_unknown() {
        let pr = PullRequest {
            number: 7,
            title: "Add feature".to_string(),
            html_url: "https://github.com/demo/demo/pull/7".to_string(),
            user: GitHubUser {
                login: "bob".to_string(),
            },
            state: "open".to_string(),
            created_at: "2025-01-01T00:00:00Z".to_string(),
            body: Some("Adds the feature".to_string()),
            base: crate::webhooks::GitRef {
                ref_name: "main".to_string(),
            },
            head: crate::webhooks::GitRef {
                ref_name: "feature/add".to_string(),
            },
            mergeable: None,
            draft: true,
        };

        let desc = format_pull_request_description(&pr);
        assert!(desc.contains("**Base Branch**: main"));
        assert!(desc.contains("**Head Branch**: feature/add"));
        assert!(desc.contains("**Mergeable**: Unknown"));
        assert!(desc.contains("**Draft**: true"));
    }
}
