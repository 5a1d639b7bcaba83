//! `TransferManager`: submits and polls one venue's outbound withdrawals.

use std::sync::Arc;
use std::time::Duration;

use arb_common::{Px, Qty};
use exchange_gateway::{ExchangeHandle, WithdrawalStatus};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::TransferManagerError;
use crate::request::TransferRequest;

/// Cadence `step()`'s background monitor polls withdrawal status at.
pub const TRANSFER_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Submits and polls withdrawals from one source venue. Holds no transfer
/// state itself — `TransferRequest` is owned by the coordinator's context and
/// passed in by value on every call, so the manager stays cheap to share
/// across a spawned monitor task.
pub struct TransferManager {
    handle: Arc<dyn ExchangeHandle>,
}

impl TransferManager {
    /// Build a manager around the venue withdrawals will be submitted from.
    #[must_use]
    pub fn new(handle: Arc<dyn ExchangeHandle>) -> Self {
        Self { handle }
    }

    /// Submit a withdrawal of `qty` of `asset` toward `dest_venue`, returning
    /// a fresh in-progress `TransferRequest`. `buy_price` is carried through
    /// untouched for the receiving leg's PnL continuity.
    pub async fn transfer_asset(
        &self,
        asset: &str,
        dest_venue: &str,
        qty: Qty,
        buy_price: Px,
    ) -> Result<TransferRequest, TransferManagerError> {
        let transfer_id = self
            .handle
            .submit_withdrawal(asset, qty, dest_venue)
            .await
            .map_err(|source| TransferManagerError::SubmissionFailed {
                venue: self.handle.venue().to_string(),
                asset: asset.to_string(),
                source,
            })?;

        info!(
            venue = self.handle.venue(),
            dest_venue,
            asset,
            qty = %qty,
            transfer_id,
            "transfer submitted"
        );

        Ok(TransferRequest {
            asset: asset.to_string(),
            source_venue: self.handle.venue().to_string(),
            dest_venue: dest_venue.to_string(),
            qty,
            buy_price,
            in_progress: true,
            completed: false,
            transfer_id,
        })
    }

    /// Poll a transfer's current status and mutate its flags in place.
    /// Never propagates: a transient poll failure leaves the request
    /// untouched so the next poll retries against ground truth.
    pub async fn update_transfer_request(&self, request: &mut TransferRequest) {
        match self.handle.query_withdrawal(&request.transfer_id).await {
            Ok(WithdrawalStatus::Pending) => {
                debug!(transfer_id = request.transfer_id, "transfer still pending");
            }
            Ok(WithdrawalStatus::Completed) => {
                info!(transfer_id = request.transfer_id, "transfer completed");
                request.in_progress = false;
                request.completed = true;
            }
            Ok(WithdrawalStatus::Failed) => {
                error!(transfer_id = request.transfer_id, "transfer failed");
                request.in_progress = false;
                request.completed = false;
            }
            Err(err) => {
                warn!(transfer_id = request.transfer_id, error = %err, "transfer status poll failed, retrying next cycle");
            }
        }
    }

    /// Spawn a background task that polls `request` every
    /// `TRANSFER_REFRESH_INTERVAL` and streams each updated snapshot to the
    /// returned receiver, stopping once the transfer leaves `in_progress`.
    /// The caller is the coordinator, which owns role-flip and position
    /// handling on completion — this task only observes and reports.
    #[must_use]
    pub fn spawn_monitor(
        self: Arc<Self>,
        mut request: TransferRequest,
    ) -> (JoinHandle<()>, mpsc::Receiver<TransferRequest>) {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TRANSFER_REFRESH_INTERVAL);
            interval.tick().await; // first tick fires immediately, skip it

            while request.in_progress {
                interval.tick().await;
                self.update_transfer_request(&mut request).await;
                if tx.send(request.clone()).await.is_err() {
                    break; // coordinator dropped its receiver
                }
            }
        });
        (handle, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_gateway::fake::FakeExchange;

    fn manager(venue: &str) -> Arc<TransferManager> {
        Arc::new(TransferManager::new(Arc::new(FakeExchange::new(venue, false))))
    }

    #[tokio::test]
    async fn transfer_asset_submits_an_in_progress_request() {
        let mgr = manager("v1_spot");
        let request = mgr
            .transfer_asset("BTC", "v2_spot", Qty::new(1.0), Px::new(30_000.0))
            .await
            .unwrap();
        assert!(request.in_progress);
        assert!(!request.completed);
        assert_eq!(request.asset, "BTC");
        assert_eq!(request.dest_venue, "v2_spot");
    }

    #[tokio::test]
    async fn submission_failure_is_reported() {
        let handle = Arc::new(FakeExchange::new("v1_spot", false));
        handle.set_reject_withdrawals(true).await;
        let mgr = TransferManager::new(handle);
        let result = mgr.transfer_asset("BTC", "v2_spot", Qty::new(1.0), Px::new(30_000.0)).await;
        assert!(matches!(result, Err(TransferManagerError::SubmissionFailed { .. })));
    }

    #[derive(Clone, Copy)]
    enum PollOutcome {
        Completed,
        Failed,
        LeftPending,
    }

    #[rstest::rstest]
    #[case::completed(PollOutcome::Completed, false, true)]
    #[case::failed(PollOutcome::Failed, false, false)]
    #[case::left_pending(PollOutcome::LeftPending, true, false)]
    #[tokio::test]
    async fn update_transfer_request_reflects_polled_status(
        #[case] outcome: PollOutcome,
        #[case] expected_in_progress: bool,
        #[case] expected_completed: bool,
    ) {
        let handle = Arc::new(FakeExchange::new("v1_spot", false));
        let mgr = TransferManager::new(Arc::clone(&handle) as Arc<dyn ExchangeHandle>);
        let mut request = mgr
            .transfer_asset("BTC", "v2_spot", Qty::new(1.0), Px::new(30_000.0))
            .await
            .unwrap();
        match outcome {
            PollOutcome::Completed => handle.complete_withdrawal(&request.transfer_id).await,
            PollOutcome::Failed => handle.fail_withdrawal(&request.transfer_id).await,
            PollOutcome::LeftPending => {}
        }
        mgr.update_transfer_request(&mut request).await;
        assert_eq!(request.in_progress, expected_in_progress);
        assert_eq!(request.completed, expected_completed);
    }

    #[tokio::test(start_paused = true)]
    async fn monitor_streams_updates_until_completion() {
        let handle = Arc::new(FakeExchange::new("v1_spot", false));
        let mgr = Arc::new(TransferManager::new(Arc::clone(&handle) as Arc<dyn ExchangeHandle>));
        let request = mgr
            .transfer_asset("BTC", "v2_spot", Qty::new(1.0), Px::new(30_000.0))
            .await
            .unwrap();
        let transfer_id = request.transfer_id.clone();

        let (join, mut rx) = Arc::clone(&mgr).spawn_monitor(request);

        tokio::time::advance(TRANSFER_REFRESH_INTERVAL).await;
        let first = rx.recv().await.unwrap();
        assert!(first.in_progress);

        handle.complete_withdrawal(&transfer_id).await;
        tokio::time::advance(TRANSFER_REFRESH_INTERVAL).await;
        let second = rx.recv().await.unwrap();
        assert!(second.completed);
        assert!(rx.recv().await.is_none());

        join.await.unwrap();
    }
}
