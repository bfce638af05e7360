//! GitHub webhook receiver that mirrors repository activity into Wekan.
//!
//! This crate provides:
//! - HMAC-SHA256 webhook signature verification
//! - Typed GitHub event payloads (issues, pull requests, pushes, ...)
//! - A Wekan REST client with token lifecycle and retry/backoff
//! - Template-driven board/list/card provisioning
//! - An HTTP server routing webhook events to board operations

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Many async API methods can fail

pub mod auth;
pub mod board;
pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod templates;
pub mod webhooks;

pub use auth::{Credential, WekanAuthManager};
pub use board::BoardCreator;
pub use client::{RetryConfig, WekanClient};
pub use config::Config;
pub use error::SyncError;
pub use server::{build_router, AppState};
pub use templates::{BoardTemplate, TemplateManager};
pub use webhooks::{verify_webhook_signature, SignaturePolicy, WebhookEvent};
