//! This module contains the [TxQueue].

use crate::{
    errors::TxManagerError,
    traits::TxManager,
    tx::{TxCandidate, TxReceipt},
};
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, OwnedSemaphorePermit, Semaphore};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, trace};

/// Sends transactions through a [TxManager] concurrently, with at most a fixed number in flight.
///
/// Every send delivers exactly one [TxReceipt] on the receipts channel passed with it. Sends block
/// while the queue is full. Cancelling the kill token aborts the sends in flight, delivering
/// [TxManagerError::Cancelled] receipts.
#[derive(Debug)]
pub struct TxQueue<T> {
    manager: Arc<T>,
    /// `None` if the number of transactions in flight is unlimited.
    permits: Option<Arc<Semaphore>>,
    tracker: TaskTracker,
    kill: CancellationToken,
}

impl<T> Clone for TxQueue<T> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            permits: self.permits.clone(),
            tracker: self.tracker.clone(),
            kill: self.kill.clone(),
        }
    }
}

impl<T> TxQueue<T>
where
    T: TxManager + 'static,
{
    /// Creates a new [TxQueue] allowing `max_pending` transactions in flight. Zero means
    /// unlimited.
    pub fn new(manager: Arc<T>, max_pending: u64, kill: CancellationToken) -> Self {
        let permits = (max_pending > 0).then(|| Arc::new(Semaphore::new(max_pending as usize)));
        Self { manager, permits, tracker: TaskTracker::new(), kill }
    }

    /// The underlying [TxManager].
    pub fn manager(&self) -> &T {
        &self.manager
    }

    /// The number of sends in flight.
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    /// Returns `true` if no send is in flight.
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Returns `true` if a send would block.
    pub fn is_full(&self) -> bool {
        self.permits.as_ref().is_some_and(|p| p.available_permits() == 0)
    }

    /// Sends `candidate` in the background, waiting for a free slot first.
    pub async fn send<R>(
        &self,
        id: R,
        candidate: TxCandidate,
        receipts: UnboundedSender<TxReceipt<R>>,
    ) where
        R: Send + 'static,
    {
        let permit = match self.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                if receipts.send(TxReceipt { id, result: Err(e) }).is_err() {
                    debug!(target: "tx-queue", "Receipts channel closed, dropping receipt");
                }
                return;
            }
        };

        let manager = Arc::clone(&self.manager);
        let kill = self.kill.clone();
        trace!(target: "tx-queue", "Sending transaction, {} in flight", self.tracker.len());
        self.tracker.spawn(async move {
            let result = tokio::select! {
                result = manager.send(candidate) => result,
                _ = kill.cancelled() => Err(TxManagerError::Cancelled),
            };
            drop(permit);
            if receipts.send(TxReceipt { id, result }).is_err() {
                debug!(target: "tx-queue", "Receipts channel closed, dropping receipt");
            }
        });
    }

    async fn acquire(&self) -> Result<Option<OwnedSemaphorePermit>, TxManagerError> {
        let Some(permits) = &self.permits else {
            return Ok(None);
        };
        tokio::select! {
            permit = Arc::clone(permits).acquire_owned() => {
                permit.map(Some).map_err(|_| TxManagerError::Closed)
            }
            _ = self.kill.cancelled() => Err(TxManagerError::Cancelled),
        }
    }

    /// Waits until all sends in flight completed.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
