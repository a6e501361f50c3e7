use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::{error::Result, services::credit_ledger::CreditLedger};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    /// Candidates whose transition the store refused; retried next sweep
    pub failed: usize,
}

/// Materializes `Expired` on contracts that ran out their term with credits
/// left. Reads already derive expiry on their own; the sweep exists for
/// consumers that want the terminal state stored.
pub struct ExpirationSweeper {
    ledger: Arc<CreditLedger>,
}

impl ExpirationSweeper {
    pub fn new(ledger: Arc<CreditLedger>) -> Self {
        Self { ledger }
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(OffsetDateTime::now_utc()).await
    }

    #[instrument(skip(self))]
    pub async fn sweep_at(&self, now: OffsetDateTime) -> Result<SweepReport> {
        let candidates = self.ledger.expiry_candidates(now);
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };

        for id in candidates {
            match self.ledger.expire_if_due(id, now).await {
                Ok((_, true)) => report.expired += 1,
                Ok((_, false)) => {}
                Err(e) => {
                    warn!(contract_id = %id, "Failed to expire contract: {}", e);
                    report.failed += 1;
                }
            }
        }

        if report.expired > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                expired = report.expired,
                failed = report.failed,
                "Expiration sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, "Expiration sweep found nothing");
        }

        Ok(report)
    }

    /// Run the sweep every `interval` on a background task
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep().await {
                    error!("Expiration sweep failed: {}", e);
                }
            }
        })
    }
}
