use anyhow::Result;

use super::events::OutboundEvent;

/// Emit side of the socket connection, injected into the conversation view.
pub trait SocketTransport: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Queue one event for delivery. No acknowledgement, no retry.
    fn emit(&self, event: OutboundEvent) -> Result<()>;
}
