//! Estimate request intake: NATS queue subscription and in-flight limiting
//!
//! Replicas join the same queue group, so NATS hands each request to exactly
//! one of them. Within a replica, a semaphore bounds the requests in flight and
//! is drained on shutdown so no reply is dropped.

use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::info;

/// Subscription on the estimate request subject
pub struct RequestConsumer {
    client: Client,
    subject: String,
    /// Empty means every subscriber receives every request
    queue_group: String,
}

impl RequestConsumer {
    pub fn new(client: Client, subject: &str, queue_group: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
            queue_group: queue_group.to_string(),
        }
    }

    /// Subscribe to the request subject, joining the queue group when set
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match self.queue_group() {
            Some(group) => {
                self.client
                    .queue_subscribe(self.subject.clone(), group.to_string())
                    .await?
            }
            None => self.client.subscribe(self.subject.clone()).await?,
        };

        info!(
            subject = %self.subject,
            queue_group = self.queue_group().unwrap_or("<none>"),
            "Subscribed to estimate request subject"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn queue_group(&self) -> Option<&str> {
        queue_group_name(&self.queue_group)
    }
}

fn queue_group_name(group: &str) -> Option<&str> {
    let group = group.trim();
    (!group.is_empty()).then_some(group)
}

/// Bounds concurrent request handlers
#[derive(Clone)]
pub struct RequestLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl RequestLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Request limiter closed")
    }

    /// Number of handlers currently running
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Wait until every running handler has released its slot, then close.
    pub async fn drain(&self) -> Result<()> {
        let all = u32::try_from(self.capacity).context("Request limiter capacity too large")?;
        let permits = self
            .semaphore
            .acquire_many(all)
            .await
            .context("Request limiter closed")?;
        permits.forget();
        self.semaphore.close();
        Ok(())
    }
}
