//! Telemetry line writer

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{wait_or_cancel, Connector, TransportError};
use crate::reconnect::ReconnectPolicy;
use crate::telemetry::TelemetryEvent;

/// Writes one `sensor:value` line per event, reopening the transport when a
/// write fails. The event being written when the failure happened is retried
/// on the new connection; later events wait in the channel.
pub struct LineWriter<C: Connector> {
    connector: C,
    policy: ReconnectPolicy,
    stream: Option<C::Stream>,
}

impl<C> LineWriter<C>
where
    C: Connector,
    C::Stream: AsyncWrite,
{
    /// Create a writer; the transport is opened on the first event
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            policy,
            stream: None,
        }
    }

    /// Write events until the channel closes or `shutdown` is cancelled.
    /// Returns the number of lines written.
    pub async fn run(
        &mut self,
        mut events: UnboundedReceiver<TelemetryEvent>,
        shutdown: &CancellationToken,
    ) -> u64 {
        let name = self.connector.describe();
        let mut backoff = self.policy.backoff();
        let mut written = 0;

        'events: loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            let line = format!("{}\n", event.to_line());

            loop {
                if self.stream.is_none() {
                    let connected = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break 'events,
                        result = self.connector.connect() => result,
                    };
                    match connected {
                        Ok(stream) => {
                            info!(transport = %name, "Transport opened");
                            backoff.reset();
                            self.stream = Some(stream);
                        }
                        Err(e) => {
                            if !report_and_wait(&e, backoff.next_delay(), shutdown).await {
                                break 'events;
                            }
                            continue;
                        }
                    }
                }

                let Some(stream) = self.stream.as_mut() else {
                    continue;
                };
                match write_line(stream, &line).await {
                    Ok(()) => {
                        written += 1;
                        debug!(transport = %name, line = line.trim_end(), "Line written");
                        break;
                    }
                    Err(source) => {
                        self.stream = None;
                        let error = TransportError::Write {
                            path: name.clone(),
                            source,
                        };
                        if !report_and_wait(&error, backoff.next_delay(), shutdown).await {
                            break 'events;
                        }
                    }
                }
            }
        }
        debug!(transport = %name, written, "Line writer stopped");
        written
    }
}

async fn report_and_wait(
    error: &TransportError,
    delay: std::time::Duration,
    shutdown: &CancellationToken,
) -> bool {
    warn!(
        error = %error,
        retry_in_ms = delay.as_millis() as u64,
        "Transport failed, reopening"
    );
    wait_or_cancel(delay, shutdown).await
}

async fn write_line<W: AsyncWrite + Unpin>(stream: &mut W, line: &str) -> std::io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// In-memory sink that can be told to fail the next write
    #[derive(Clone, Default)]
    struct SharedSink {
        data: Arc<Mutex<Vec<u8>>>,
        broken: Arc<Mutex<bool>>,
    }

    impl AsyncWrite for SharedSink {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let mut broken = self.broken.lock().unwrap();
            if *broken {
                *broken = false;
                return Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
            }
            self.data.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    struct SinkConnector {
        sink: SharedSink,
        refuse: usize,
        connects: usize,
    }

    impl Connector for SinkConnector {
        type Stream = SharedSink;

        async fn connect(&mut self) -> Result<SharedSink, TransportError> {
            self.connects += 1;
            if self.refuse > 0 {
                self.refuse -= 1;
                return Err(TransportError::Open {
                    path: "sink".into(),
                    source: io::ErrorKind::NotFound.into(),
                });
            }
            Ok(self.sink.clone())
        }

        fn describe(&self) -> String {
            "sink".into()
        }
    }

    fn policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_millis(10), Duration::from_millis(40))
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_one_line_per_event() {
        let sink = SharedSink::default();
        let mut writer = LineWriter::new(
            SinkConnector {
                sink: sink.clone(),
                refuse: 2,
                connects: 0,
            },
            policy(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TelemetryEvent::new("speed", 27.5)).unwrap();
        tx.send(TelemetryEvent::new("power", 250.0)).unwrap();
        drop(tx);

        let written = writer.run(rx, &CancellationToken::new()).await;

        assert_eq!(written, 2);
        assert_eq!(writer.connector.connects, 3);
        assert_eq!(
            String::from_utf8(sink.data.lock().unwrap().clone()).unwrap(),
            "speed:27.5\npower:250\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_reconnects_and_retries() {
        let sink = SharedSink::default();
        *sink.broken.lock().unwrap() = true;
        let mut writer = LineWriter::new(
            SinkConnector {
                sink: sink.clone(),
                refuse: 0,
                connects: 0,
            },
            policy(),
        );
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TelemetryEvent::new("cadence", 88.0)).unwrap();
        drop(tx);

        let written = writer.run(rx, &CancellationToken::new()).await;

        assert_eq!(written, 1);
        assert_eq!(writer.connector.connects, 2);
        assert_eq!(sink.data.lock().unwrap().as_slice(), b"cadence:88\n");
    }

    #[tokio::test]
    async fn test_stops_on_shutdown() {
        let mut writer = LineWriter::new(
            SinkConnector {
                sink: SharedSink::default(),
                refuse: 0,
                connects: 0,
            },
            policy(),
        );
        let (_tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert_eq!(writer.run(rx, &shutdown).await, 0);
    }
}
