pub mod client;
pub mod events;
pub mod transport;

pub use client::SocketClient;
pub use events::{InboundEvent, OutboundEvent};
pub use transport::SocketTransport;
