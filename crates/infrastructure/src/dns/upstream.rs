use async_trait::async_trait;
use ferrous_doq_domain::DomainError;
use hickory_proto::op::Message;

/// A DNS upstream as seen by the surrounding proxy.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Canonical URL of the upstream.
    fn address(&self) -> &str;

    /// Sends `query` and returns the response. The response carries the
    /// same message ID as `query`.
    async fn exchange(&self, query: &Message) -> Result<Message, DomainError>;
}
