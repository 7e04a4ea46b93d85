//! Webhook notifiers for alert messages.
//!
//! Notifier failures return `false` and are logged; they never abort the
//! metrics pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{error, info};

use crate::{MetricsError, Result};

/// Something that can deliver an alert message.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &'static str;

    async fn send(&self, message: &str) -> bool;
}

fn webhook_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| MetricsError::Http(format!("failed to create HTTP client: {e}")))
}

async fn post_json(client: &Client, url: &str, payload: serde_json::Value) -> Result<()> {
    let response = client
        .post(url)
        .json(&payload)
        .send()
        .await
        .map_err(|e| MetricsError::Http(format!("webhook request failed: {e}")))?;
    if !response.status().is_success() {
        return Err(MetricsError::Http(format!(
            "webhook returned {}",
            response.status()
        )));
    }
    Ok(())
}

/// Posts `{"text": ...}` to a Slack incoming webhook.
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: String) -> Result<Self> {
        Ok(Self {
            client: webhook_client()?,
            webhook_url,
        })
    }

    /// Webhook URL from `SLACK_WEBHOOK_URL`, `None` when unset.
    pub fn from_env() -> Option<Result<Self>> {
        std::env::var("SLACK_WEBHOOK_URL").ok().map(Self::new)
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn channel(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, message: &str) -> bool {
        match post_json(&self.client, &self.webhook_url, json!({ "text": message })).await {
            Ok(()) => {
                info!("Slack notification sent");
                true
            }
            Err(err) => {
                error!(error = %err, "Slack notification failed");
                false
            }
        }
    }
}

/// Posts `{"content": ...}` to a Discord webhook.
pub struct DiscordNotifier {
    client: Client,
    webhook_url: String,
}

impl DiscordNotifier {
    pub fn new(webhook_url: String) -> Result<Self> {
        Ok(Self {
            client: webhook_client()?,
            webhook_url,
        })
    }

    /// Webhook URL from `DISCORD_WEBHOOK_URL`, `None` when unset.
    pub fn from_env() -> Option<Result<Self>> {
        std::env::var("DISCORD_WEBHOOK_URL").ok().map(Self::new)
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn channel(&self) -> &'static str {
        "discord"
    }

    async fn send(&self, message: &str) -> bool {
        // Discord rejects messages over 2000 characters.
        let message: String = message.chars().take(2000).collect();
        match post_json(&self.client, &self.webhook_url, json!({ "content": message })).await {
            Ok(()) => {
                info!("Discord notification sent");
                true
            }
            Err(err) => {
                error!(error = %err, "Discord notification failed");
                false
            }
        }
    }
}

/// Build every notifier configured through the environment.
pub fn from_env() -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();
    if let Some(Ok(slack)) = SlackNotifier::from_env() {
        notifiers.push(Box::new(slack));
    }
    if let Some(Ok(discord)) = DiscordNotifier::from_env() {
        notifiers.push(Box::new(discord));
    }
    notifiers
}
