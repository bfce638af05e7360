//! Ad-hoc Wekan board management CLI.
//!
//! Drives the same provisioning path as the webhook receiver for manual
//! board and card operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wekan_sync::{
    board::BoardCreator,
    client::WekanClient,
    config::Config,
    templates::{BoardTemplate, TemplateManager},
    WekanAuthManager,
};

#[derive(Parser)]
#[command(name = "boardctl", about = "Create and manage Wekan boards")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List available board templates
    ListTemplates,
    /// Create a board from a template or a custom JSON definition
    Create {
        /// Template name (e.g. kanban_basic)
        #[arg(long, conflicts_with = "config")]
        template: Option<String>,
        /// Board title override
        #[arg(long)]
        title: Option<String>,
        /// Path to a custom board definition JSON file
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Add a card to an existing board
    AddCard {
        /// Board id
        #[arg(long)]
        board_id: String,
        /// List title the card goes into
        #[arg(long)]
        list_name: String,
        /// Card title
        #[arg(long)]
        card_title: String,
        /// Card description
        #[arg(long)]
        card_description: Option<String>,
    },
    /// Move a card to another list
    MoveCard {
        /// Board id
        #[arg(long)]
        board_id: String,
        /// Card id
        #[arg(long)]
        card_id: String,
        /// Destination list title
        #[arg(long)]
        list_name: String,
    },
    /// Add a comment to a card
    AddComment {
        /// Board id
        #[arg(long)]
        board_id: String,
        /// Card id
        #[arg(long)]
        card_id: String,
        /// Comment text
        #[arg(long)]
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::default();

    let templates = match &config.templates_dir {
        Some(dir) => TemplateManager::with_templates_dir(Path::new(dir)),
        None => TemplateManager::new(),
    };

    let result = match cli.command {
        Command::ListTemplates => {
            println!("Available templates:");
            for name in templates.names() {
                println!("  - {name}");
            }
            return Ok(());
        }
        Command::Create {
            template,
            title,
            config: definition_file,
        } => {
            let creator = connect(&config, templates).await?;
            match (template, definition_file) {
                (Some(template), None) => serde_json::to_value(
                    creator
                        .create_from_template(&template, title.as_deref())
                        .await?,
                )?,
                (None, Some(path)) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    let definition: BoardTemplate =
                        serde_json::from_str(&raw).context("Invalid board definition")?;
                    serde_json::to_value(creator.create_custom_board(&definition).await?)?
                }
                _ => bail!("Specify exactly one of --template or --config"),
            }
        }
        Command::AddCard {
            board_id,
            list_name,
            card_title,
            card_description,
        } => {
            let creator = connect(&config, templates).await?;
            serde_json::to_value(
                creator
                    .add_card_to_board(
                        &board_id,
                        &list_name,
                        &card_title,
                        card_description.as_deref(),
                    )
                    .await?,
            )?
        }
        Command::MoveCard {
            board_id,
            card_id,
            list_name,
        } => {
            let creator = connect(&config, templates).await?;
            creator.move_card(&board_id, &card_id, &list_name).await?
        }
        Command::AddComment {
            board_id,
            card_id,
            text,
        } => {
            let creator = connect(&config, templates).await?;
            creator.add_comment(&board_id, &card_id, &text).await?
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "success": true, "result": result }))?
    );
    Ok(())
}

async fn connect(config: &Config, templates: TemplateManager) -> Result<BoardCreator> {
    let username = config
        .wekan_username
        .as_deref()
        .context("WEKAN_USERNAME is required")?;
    let password = config
        .wekan_password
        .as_deref()
        .context("WEKAN_PASSWORD is required")?;

    let auth = WekanAuthManager::connect(&config.wekan_url, username, password)
        .await
        .context("Failed to authenticate with Wekan")?;

    Ok(BoardCreator::new(
        WekanClient::new(Arc::new(auth)),
        templates,
    ))
}
