use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::core::tx::TrackedAsset;
use crate::core::watermark::Watermark;
use crate::core::{BuyEvent, TradeType, ValueMethod};
use crate::notifications::Notifier;
use crate::rpc::{FetchError, LedgerApi};
use crate::signals::{Classifier, Verdict};
use crate::tags::VenueRegistry;

/// Counters for a single completed tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub fetched: usize,
    pub processed: usize,
    pub notified: usize,
    pub sells: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notify_errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed(TickReport),
    /// Another tick still holds the watermark.
    Busy,
    /// The transfer listing could not be fetched; watermark untouched.
    ListFailed,
}

/// What happened to one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Notified,
    NotifyFailed,
    Sell,
    Skipped,
}

/// Polls the indexer for transfers of the tracked asset and notifies on buys.
pub struct Monitor {
    ledger: Arc<dyn LedgerApi>,
    notifier: Arc<dyn Notifier>,
    classifier: Classifier,
    asset: TrackedAsset,
    fetch_count: usize,
    watermark: Mutex<Watermark>,
}

impl Monitor {
    pub fn new(
        ledger: Arc<dyn LedgerApi>,
        notifier: Arc<dyn Notifier>,
        asset: TrackedAsset,
        registry: Arc<VenueRegistry>,
        fetch_count: usize,
    ) -> Self {
        Self {
            ledger,
            notifier,
            classifier: Classifier::new(asset.clone(), registry),
            asset,
            fetch_count,
            watermark: Mutex::new(Watermark::new()),
        }
    }

    /// Run one poll. Holds the watermark for the whole tick so ticks never
    /// overlap; a tick that cannot take it returns `Busy` immediately.
    pub async fn tick(&self) -> TickOutcome {
        let Ok(mut watermark) = self.watermark.try_lock() else {
            warn!("Previous tick still running, skipping this one");
            return TickOutcome::Busy;
        };

        info!("Checking for new {} transactions...", self.asset.ticker);

        let batch = match self
            .ledger
            .recent_transfers(&self.asset.unit, self.fetch_count)
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                error!("Error listing {} transactions: {e}", self.asset.ticker);
                return TickOutcome::ListFailed;
            }
        };

        let mut report = TickReport {
            fetched: batch.len(),
            ..TickReport::default()
        };

        if batch.is_empty() {
            info!("No recent transactions found");
            return TickOutcome::Completed(report);
        }

        for tx_id in watermark.unseen(&batch) {
            report.processed += 1;
            match self.process(tx_id).await {
                Ok(Disposition::Notified) => report.notified += 1,
                Ok(Disposition::NotifyFailed) => report.notify_errors += 1,
                Ok(Disposition::Sell) => report.sells += 1,
                Ok(Disposition::Skipped) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(tx = %tx_id, "Error processing transaction: {e}");
                }
            }
        }

        watermark.advance(&batch);

        info!(
            fetched = report.fetched,
            processed = report.processed,
            notified = report.notified,
            sells = report.sells,
            skipped = report.skipped,
            failed = report.failed,
            notify_errors = report.notify_errors,
            "Tick complete"
        );
        TickOutcome::Completed(report)
    }

    /// Current watermark value.
    #[cfg(test)]
    pub async fn last_seen(&self) -> Option<String> {
        self.watermark.lock().await.last_seen().map(str::to_string)
    }

    async fn process(&self, tx_id: &str) -> Result<Disposition, FetchError> {
        let (details, utxos, metadata) = tokio::join!(
            self.ledger.transaction(tx_id),
            self.ledger.utxos(tx_id),
            self.ledger.metadata(tx_id),
        );
        let details = details?;
        let utxos = utxos?;
        let metadata = metadata.unwrap_or_else(|e| {
            debug!(tx = %tx_id, "Metadata unavailable, continuing without it: {e}");
            Vec::new()
        });

        match self.classifier.classify(&metadata, &utxos) {
            Verdict::NotVenue => {
                debug!(tx = %tx_id, "Not a venue transaction, skipping");
                Ok(Disposition::Skipped)
            }
            Verdict::Ambiguous { venue, flow } => {
                debug!(
                    tx = %tx_id,
                    venue = %venue.venue_name,
                    rule = flow.rule,
                    "No clear direction ({}), skipping: {:?}",
                    flow.trade_type,
                    flow.flow
                );
                Ok(Disposition::Skipped)
            }
            Verdict::Sell { venue, flow } => {
                info!(
                    tx = %tx_id,
                    venue = %venue.venue_name,
                    rule = flow.rule,
                    "Sell of {} {} detected, not notifying",
                    flow.amount,
                    self.asset.ticker
                );
                Ok(Disposition::Sell)
            }
            Verdict::Buy { venue, flow, value } => {
                info!(
                    tx = %tx_id,
                    venue = %venue.venue_name,
                    rule = flow.rule,
                    fee = details.fee,
                    block = ?details.block_height,
                    size = ?details.size,
                    "Buy detected: {} {}",
                    flow.amount,
                    self.asset.ticker
                );
                if value.method == ValueMethod::NetDifference && value.lovelace < 0 {
                    warn!(
                        tx = %tx_id,
                        "Net currency difference is negative ({}), reporting as-is",
                        value.lovelace
                    );
                }

                let event = BuyEvent {
                    trade_type: TradeType::Buy,
                    token_amount: flow.amount,
                    ada_amount: value.lovelace,
                    venue_name: venue.venue_name,
                    tx_id: details.id,
                    block_time: details.block_time,
                };
                match self.notifier.send_event(&event).await {
                    Ok(()) => Ok(Disposition::Notified),
                    Err(e) => {
                        error!(tx = %tx_id, "Failed to send buy notification: {e}");
                        Ok(Disposition::NotifyFailed)
                    }
                }
            }
        }
    }
}

/// Tick every `period` until `shutdown` resolves. The first tick fires one
/// period after start. A tick in progress is allowed to finish.
pub async fn run_monitor(
    monitor: Arc<Monitor>,
    period: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!("Monitor started, polling every {}s", period.as_secs());

    loop {
        tokio::select! {
            _ = timer.tick() => {
                monitor.tick().await;
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping monitor");
                break;
            }
        }
    }
}
