//! Channel provider abstraction for receiving raw telemetry messages.
//!
//! The monitor never talks to a socket directly. It asks a
//! [`ChannelProvider`] to open a channel and hands it a listener; the
//! provider pushes every raw message (and a final close notice) into
//! that listener until the channel is closed.

mod replay;
mod stream;

pub use replay::ReplayProvider;
pub use stream::StreamProvider;

use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Capacity of the listener queue between a provider and the monitor.
pub const LISTENER_CAPACITY: usize = 64;

/// An event pushed by an open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One raw message payload.
    Message(Vec<u8>),
    /// The transport went away. Carries the reason when known.
    Closed(Option<String>),
}

/// Receiving side a provider pushes events into.
pub type Listener = mpsc::Sender<ChannelEvent>;

/// Trait for opening and closing a streaming metrics channel.
///
/// Implementations decide the transport (TCP, replay, message bus);
/// the monitor only relies on `open`, `close` and the pushed events.
///
/// # Example
///
/// ```
/// use streamwatch::{ChannelProvider, ReplayProvider};
///
/// let provider = ReplayProvider::new(vec![br#"{"type":"error","data":{"message":"hi"}}"#.to_vec()]);
/// assert_eq!(provider.description(), "replay: 1 messages");
/// ```
#[async_trait]
pub trait ChannelProvider: Send + Sync + Debug + 'static {
    /// Resource held while the channel is open.
    type Handle: Send + 'static;

    /// Open the channel and start delivering events to `listener`.
    ///
    /// Events must be delivered in arrival order.
    async fn open(&self, listener: Listener) -> Result<Self::Handle, ChannelError>;

    /// Release the channel. Delivery stops once this returns.
    fn close(&self, handle: Self::Handle);

    /// Returns a human-readable description of the source.
    fn description(&self) -> &str;
}
