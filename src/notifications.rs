use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::{NotificationConfig, NotifierBackend};
use crate::core::BuyEvent;
use crate::core::tx::TrackedAsset;

const EMBED_COLOR_BUY: u32 = 0x00ff00;
const EMBED_COLOR_INFO: u32 = 0x0099ff;
const EXPLORER_TX_URL: &str = "https://cardanoscan.io/transaction";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    Status(StatusCode),

    #[error("Desktop notification failed: {0}")]
    Desktop(String),
}

/// Delivery of buy events. Failures are reported to the caller, who logs them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_event(&self, event: &BuyEvent) -> Result<(), NotifyError>;

    async fn announce_startup(&self) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Build the configured notifier.
pub fn build_notifier(
    config: &NotificationConfig,
    asset: &TrackedAsset,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    if !config.enabled {
        tracing::info!("Notifications disabled");
        return Ok(Arc::new(SilentNotifier));
    }
    let notifier: Arc<dyn Notifier> = match config.backend {
        NotifierBackend::Webhook => match config.webhook_url.as_deref() {
            Some(url) if !url.is_empty() => {
                Arc::new(WebhookNotifier::new(url, &asset.ticker)?)
            }
            _ => {
                tracing::warn!(
                    "Webhook backend selected but no webhook_url set, logging events only"
                );
                Arc::new(LogNotifier::new(&asset.ticker))
            }
        },
        NotifierBackend::Desktop => Arc::new(DesktopNotifier::new(config, &asset.ticker)),
        NotifierBackend::Log => Arc::new(LogNotifier::new(&asset.ticker)),
    };
    Ok(notifier)
}

/// Lovelace to ADA with two decimals.
pub fn format_ada(lovelace: i64) -> String {
    format!("{:.2}", lovelace as f64 / 1_000_000.0)
}

/// Thousands separators: 1234567 -> "1,234,567".
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn block_timestamp(block_time: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(block_time, 0).map(|t| t.to_rfc3339())
}

/// Posts chat embeds to a Discord-compatible webhook.
pub struct WebhookNotifier {
    url: String,
    ticker: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: &str, ticker: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            url: url.to_string(),
            ticker: ticker.to_string(),
            client,
        })
    }

    fn buy_embed(&self, event: &BuyEvent) -> Value {
        let mut embed = json!({
            "title": format!("🚀 {} BUY DETECTED!", self.ticker),
            "description": format!(
                "A new purchase of {} has been detected on the Cardano blockchain!",
                self.ticker
            ),
            "color": EMBED_COLOR_BUY,
            "fields": [
                {
                    "name": "💰 Amount",
                    "value": format!("{} {}", format_number(event.token_amount), self.ticker),
                    "inline": true
                },
                {
                    "name": "💎 Value",
                    "value": format!("{} ADA", format_ada(event.ada_amount)),
                    "inline": true
                },
                { "name": "🏦 Venue", "value": event.venue_name, "inline": true },
                {
                    "name": "📊 Transaction",
                    "value": format!("[View on Cardanoscan]({EXPLORER_TX_URL}/{})", event.tx_id),
                    "inline": false
                },
            ],
            "footer": { "text": format!("{} Buy Bot | Powered by Cardano", self.ticker) },
        });
        if let Some(ts) = block_timestamp(event.block_time) {
            embed["timestamp"] = Value::String(ts);
        }
        json!({ "embeds": [embed] })
    }

    async fn post(&self, body: &Value) -> Result<(), NotifyError> {
        let resp = self.client.post(&self.url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_event(&self, event: &BuyEvent) -> Result<(), NotifyError> {
        self.post(&self.buy_embed(event)).await?;
        tracing::info!(tx = %event.tx_id, "Buy notification sent to webhook");
        Ok(())
    }

    async fn announce_startup(&self) -> Result<(), NotifyError> {
        let body = json!({
            "embeds": [{
                "title": format!("🤖 {} Buy Bot Online!", self.ticker),
                "description": format!(
                    "Bot is now monitoring the Cardano blockchain for {} purchases.",
                    self.ticker
                ),
                "color": EMBED_COLOR_INFO,
                "timestamp": Utc::now().to_rfc3339(),
            }]
        });
        self.post(&body).await
    }
}

/// Desktop notification sender with cooldown to prevent spam.
pub struct DesktopNotifier {
    ticker: String,
    cooldown: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl DesktopNotifier {
    pub fn new(config: &NotificationConfig, ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            cooldown: Duration::from_secs(config.cooldown_seconds),
            last_sent: Mutex::new(None),
        }
    }

    /// Check and update cooldown. Returns true if enough time has passed.
    fn check_cooldown(&self) -> bool {
        let mut last = self.last_sent.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.cooldown {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn send_event(&self, event: &BuyEvent) -> Result<(), NotifyError> {
        if !self.check_cooldown() {
            tracing::debug!(tx = %event.tx_id, "Desktop notification suppressed by cooldown");
            return Ok(());
        }

        let title = format!("🚀 {} buy on {}", self.ticker, event.venue_name);
        let tx_short = &event.tx_id[..8.min(event.tx_id.len())];
        let body = format!(
            "{} {} | {} ADA | {tx_short}",
            format_number(event.token_amount),
            self.ticker,
            format_ada(event.ada_amount)
        );

        // notify-rust blocks on the session bus
        tokio::task::spawn_blocking(move || {
            notify_rust::Notification::new()
                .summary(&title)
                .body(&body)
                .show()
                .map(|_| ())
                .map_err(|e| NotifyError::Desktop(e.to_string()))
        })
        .await
        .map_err(|e| NotifyError::Desktop(e.to_string()))?
    }
}

/// Logs events instead of delivering them.
pub struct LogNotifier {
    ticker: String,
}

impl LogNotifier {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_event(&self, event: &BuyEvent) -> Result<(), NotifyError> {
        tracing::info!(
            tx = %event.tx_id,
            venue = %event.venue_name,
            "🚀 BUY {} {} for {} ADA",
            format_number(event.token_amount),
            self.ticker,
            format_ada(event.ada_amount)
        );
        Ok(())
    }
}

/// Drops every event. Used when notifications are disabled.
pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn send_event(&self, event: &BuyEvent) -> Result<(), NotifyError> {
        tracing::debug!(tx = %event.tx_id, "Notifications disabled, dropping buy event");
        Ok(())
    }
}
