//! TCP stream channel provider.
//!
//! Connects to a metrics endpoint and reads newline-delimited JSON
//! messages from it.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::debug;

use super::{ChannelEvent, ChannelProvider, Listener};
use crate::error::ChannelError;

/// A provider that opens a TCP connection to `host:port`.
///
/// Each line received on the socket is forwarded as one message.
///
/// # Example
///
/// ```
/// use streamwatch::{ChannelProvider, StreamProvider};
///
/// let provider = StreamProvider::new("localhost:9090");
/// assert_eq!(provider.description(), "tcp: localhost:9090");
/// ```
#[derive(Debug)]
pub struct StreamProvider {
    address: String,
    description: String,
}

impl StreamProvider {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            description: format!("tcp: {}", address),
        }
    }

    /// Returns the address this provider connects to.
    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ChannelProvider for StreamProvider {
    type Handle = JoinHandle<()>;

    async fn open(&self, listener: Listener) -> Result<Self::Handle, ChannelError> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| ChannelError::Connect(format!("{}: {}", self.address, e)))?;
        debug!(address = %self.address, "tcp channel open");

        Ok(spawn_reader(stream, listener))
    }

    fn close(&self, handle: Self::Handle) {
        handle.abort();
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Spawn a task forwarding each line of `reader` to `listener`.
///
/// Blank lines are skipped. A `Closed` event is pushed on EOF or read error.
pub fn spawn_reader<R>(reader: R, listener: Listener) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    // EOF
                    let _ = listener
                        .send(ChannelEvent::Closed(Some("Connection closed".to_string())))
                        .await;
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if listener
                        .send(ChannelEvent::Message(trimmed.as_bytes().to_vec()))
                        .await
                        .is_err()
                    {
                        // Receiver dropped
                        break;
                    }
                }
                Err(e) => {
                    let _ = listener
                        .send(ChannelEvent::Closed(Some(format!("Read error: {}", e))))
                        .await;
                    break;
                }
            }
        }
    })
}
