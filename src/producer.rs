//! Reply publisher for estimate results

use crate::service::Reply;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes encoded replies to the requester's reply subject
#[derive(Clone)]
pub struct ReplyProducer {
    client: Client,
}

impl ReplyProducer {
    /// Create a new reply producer
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send a reply to `reply_to`
    pub async fn publish(&self, reply_to: Subject, reply: Reply) -> Result<()> {
        self.client
            .publish(reply_to.clone(), reply.body.into())
            .await?;

        debug!(
            request_id = %reply.request_id,
            reply_to = %reply_to,
            status = reply.status,
            "Published estimate reply"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
