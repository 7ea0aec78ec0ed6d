//! Applying desired state to the active transports.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::ExchangeWorker;
use crate::application::selector;
use crate::application::session::StreamingSession;
use crate::domain::Subscription;
use crate::error::ExchangeError;

impl ExchangeWorker {
    /// Take the pending desired state and apply it.
    ///
    /// On failure the set is put back for the next loop unless a newer one
    /// has been written in the meantime.
    pub(super) async fn reconcile(&mut self) {
        let Some(desired) = self.store.take(&self.exchange) else {
            return;
        };

        let current: BTreeSet<Subscription> =
            self.streaming.union(&self.polling).cloned().collect();
        if desired == current {
            debug!(exchange = %self.exchange, "Desired state unchanged");
            return;
        }

        if let Err(e) = self.apply(&desired, &current).await {
            error!(
                exchange = %self.exchange,
                error = %e,
                "Failed to apply subscriptions, will retry"
            );
            if !self.store.restore_if_empty(&self.exchange, desired) {
                debug!(exchange = %self.exchange, "Newer desired state pending, not restoring");
            }
        }
    }

    async fn apply(
        &mut self,
        desired: &BTreeSet<Subscription>,
        current: &BTreeSet<Subscription>,
    ) -> Result<(), ExchangeError> {
        info!(
            exchange = %self.exchange,
            current = current.len(),
            desired = desired.len(),
            "Applying subscription change"
        );

        if !current.is_empty() {
            self.close_session().await?;
            self.streaming.clear();
            self.polling.clear();

            for dropped in current.difference(desired) {
                self.bus.evict(dropped.market(), dropped.kind());
            }
        }

        if desired.is_empty() {
            return Ok(());
        }

        let capabilities = self.handle.capabilities();
        let plan = selector::select(&capabilities, desired.clone());

        if !plan.streaming.is_empty() {
            if let Some(service) = capabilities.streaming() {
                let session = StreamingSession::open(
                    &self.exchange,
                    Arc::clone(service),
                    plan.channels(),
                    Arc::clone(&self.bus),
                )
                .await?;
                self.session = Some(session);
            }
        }

        debug!(
            exchange = %self.exchange,
            streaming = plan.streaming.len(),
            polling = plan.polling.len(),
            "Transports selected"
        );
        self.streaming = plan.streaming;
        self.polling = plan.polling;
        Ok(())
    }

    /// Close the streaming session. It stays on the worker until the
    /// disconnect succeeds, so a failed close is retried before any new
    /// session is opened.
    async fn close_session(&mut self) -> Result<(), ExchangeError> {
        if let Some(session) = self.session.as_mut() {
            session.teardown().await?;
        }
        self.session = None;
        Ok(())
    }
}
