//! Line reader with reconnect

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{wait_or_cancel, Connector, TransportError};
use crate::config::DEFAULT_MAX_LINE_LENGTH;
use crate::reconnect::ReconnectPolicy;

/// Consumer of lines read from a transport
pub trait LineHandler: Send {
    /// Handle one line, without its terminator
    fn on_line(&mut self, line: &str);

    /// Called for every transport failure before the reader retries
    fn on_transport_error(&mut self, error: &TransportError) {
        let _ = error;
    }
}

/// Reads newline-delimited text, reopening the transport on failure
pub struct LineReader<C> {
    connector: C,
    policy: ReconnectPolicy,
    max_line_length: usize,
}

impl<C> LineReader<C>
where
    C: Connector,
    C::Stream: AsyncRead,
{
    /// Create a reader
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            policy,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Override the maximum accepted line length in bytes
    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    /// Deliver lines to `handler` until `shutdown` is cancelled
    pub async fn run<H: LineHandler>(&mut self, handler: &mut H, shutdown: &CancellationToken) {
        let name = self.connector.describe();
        let mut backoff = self.policy.backoff();

        loop {
            let connected = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.connector.connect() => result,
            };

            let failure = match connected {
                Ok(stream) => {
                    info!(transport = %name, "Transport opened");
                    backoff.reset();
                    let codec = AnyDelimiterCodec::new_with_max_length(
                        b"\n".to_vec(),
                        Vec::new(),
                        self.max_line_length,
                    );
                    let mut lines = FramedRead::new(stream, codec);
                    let mut resuming = false;

                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => return,
                            next = lines.next() => next,
                        };
                        match next {
                            Some(Ok(raw)) => {
                                resuming = false;
                                let raw = raw.strip_suffix(b"\r").unwrap_or(&raw[..]);
                                match std::str::from_utf8(raw) {
                                    Ok(line) => handler.on_line(line),
                                    Err(_) => {
                                        let error = TransportError::InvalidUtf8 { path: name.clone() };
                                        warn!(error = %error, "Discarding line");
                                        handler.on_transport_error(&error);
                                    }
                                }
                            }
                            Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                                resuming = true;
                                let error = TransportError::LineTooLong {
                                    path: name.clone(),
                                    max: self.max_line_length,
                                };
                                warn!(error = %error, "Discarding line");
                                handler.on_transport_error(&error);
                            }
                            Some(Err(AnyDelimiterCodecError::Io(source))) => {
                                break TransportError::Read {
                                    path: name.clone(),
                                    source,
                                };
                            }
                            // FramedRead yields one `None` after a decoder error, then resumes
                            None if resuming => resuming = false,
                            None => break TransportError::Closed { path: name.clone() },
                        }
                    }
                }
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            warn!(
                error = %failure,
                attempt = backoff.attempts(),
                retry_in_ms = delay.as_millis() as u64,
                "Transport failed, reopening"
            );
            handler.on_transport_error(&failure);
            if !wait_or_cancel(delay, shutdown).await {
                break;
            }
        }
        debug!(transport = %name, "Line reader stopped");
    }
}
