//! Outbox relay.
//!
//! Drains committed facts in outbox order and hands each one to every
//! subscriber. A fact is marked delivered only after all subscribers accepted
//! it; the first refusal stops the drain so later facts are never delivered
//! ahead of an earlier one. Redelivery after a failure is expected, which is
//! why subscribers deduplicate by fact id.

use std::sync::Arc;

use chrono::Utc;
use schola_core::facts::StoredFact;
use schola_core::ports::{FactFeed, FactSubscriber, SubscriberError};

use crate::error::SchedulingError;

/// Result of a drain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayReport {
    pub delivered: usize,
    /// The refusal that stopped the drain, if any.
    pub failure: Option<SubscriberError>,
}

/// Delivers outbox facts to subscribers, at least once and in order.
pub struct FactRelay<F> {
    feed: F,
    subscribers: Vec<Arc<dyn FactSubscriber>>,
    batch_size: usize,
}

impl<F: FactFeed> FactRelay<F> {
    #[must_use]
    pub fn new(feed: F, batch_size: usize) -> Self {
        Self {
            feed,
            subscribers: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn FactSubscriber>) {
        tracing::debug!(subscriber = subscriber.name(), "relay subscriber added");
        self.subscribers.push(subscriber);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver at most one batch.
    ///
    /// # Errors
    ///
    /// Returns `SchedulingError::Storage` if the outbox cannot be read or a
    /// delivery cannot be recorded. Subscriber refusals are reported in the
    /// returned report instead.
    pub async fn drain_once(&self) -> Result<RelayReport, SchedulingError> {
        let pending = self.feed.pending_facts(self.batch_size).await?;
        let mut report = RelayReport::default();
        for fact in &pending {
            if let Err(failure) = self.deliver_all(fact).await {
                tracing::warn!(fact_id = %fact.id, seq = fact.seq, error = %failure, "relay stopped");
                report.failure = Some(failure);
                return Ok(report);
            }
            self.feed.mark_delivered(&fact.id, Utc::now()).await?;
            report.delivered += 1;
        }
        if report.delivered > 0 {
            tracing::info!(delivered = report.delivered, "facts relayed");
        }
        Ok(report)
    }

    /// Drain until the outbox is empty or a subscriber refuses.
    ///
    /// # Errors
    ///
    /// Same as [`FactRelay::drain_once`].
    pub async fn drain(&self) -> Result<RelayReport, SchedulingError> {
        let mut total = RelayReport::default();
        loop {
            let pass = self.drain_once().await?;
            total.delivered += pass.delivered;
            if pass.failure.is_some() || pass.delivered < self.batch_size {
                total.failure = pass.failure;
                return Ok(total);
            }
        }
    }

    async fn deliver_all(&self, fact: &StoredFact) -> Result<(), SubscriberError> {
        for subscriber in &self.subscribers {
            subscriber.deliver(fact).await?;
        }
        Ok(())
    }
}
