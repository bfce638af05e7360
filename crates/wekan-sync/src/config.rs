//! Service configuration resolved from the environment.

use std::env;

use crate::webhooks::SignaturePolicy;

/// Webhook receiver configuration.
///
/// Core components receive these as already-resolved values; nothing below
/// the binaries reads the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Shared secret for webhook signature verification.
    pub webhook_secret: String,
    /// Policy for requests without a signature header.
    pub signature_policy: SignaturePolicy,
    /// Base URL of the Wekan instance.
    pub wekan_url: String,
    /// Wekan username.
    pub wekan_username: Option<String>,
    /// Wekan password.
    pub wekan_password: Option<String>,
    /// Run without a Wekan connection, simulating provisioning.
    pub standalone: bool,
    /// Optional directory of custom board template JSON files.
    pub templates_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let wekan_username = env::var("WEKAN_USERNAME").ok().filter(|s| !s.is_empty());
        let wekan_password = env::var("WEKAN_PASSWORD").ok().filter(|s| !s.is_empty());

        // Standalone when explicitly requested, or when no credentials exist
        // to connect with.
        let standalone = env::var("STANDALONE_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
            || wekan_username.is_none()
            || wekan_password.is_none();

        let signature_policy = env::var("SIGNATURE_POLICY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(if standalone {
                SignaturePolicy::Permissive
            } else {
                SignaturePolicy::Strict
            });

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            webhook_secret: env::var("GITHUB_WEBHOOK_SECRET")
                .unwrap_or_else(|_| "your_github_webhook_secret".to_string()),
            signature_policy,
            wekan_url: env::var("WEKAN_URL")
                .unwrap_or_else(|_| "http://localhost:8088".to_string()),
            wekan_username,
            wekan_password,
            standalone,
            templates_dir: env::var("WEKAN_TEMPLATES_DIR").ok().filter(|s| !s.is_empty()),
        }
    }
}
