//! Frame notifier
//!
//! Pumps received frames from the bus to every registered [`FrameSink`] on a
//! dedicated blocking thread, reopening the receiver with backoff whenever the
//! bus connection fails.

use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BusConnector, BusReceiver, Frame, DEFAULT_POLL_INTERVAL_MS};
use crate::reconnect::ReconnectPolicy;

/// Granularity of shutdown checks while waiting out a backoff delay
const SHUTDOWN_CHECK: Duration = Duration::from_millis(50);

/// Listener invoked for every frame received from the bus
pub trait FrameSink: Send {
    /// Handle one received frame. Must not panic on malformed input.
    fn on_frame(&mut self, frame: &Frame);
}

/// Receives frames from a bus connector and dispatches them to sinks
pub struct Notifier<C: BusConnector> {
    connector: C,
    sinks: Vec<Box<dyn FrameSink>>,
    policy: ReconnectPolicy,
    poll_interval: Duration,
}

impl<C: BusConnector> Notifier<C> {
    /// Create a notifier with no sinks
    pub fn new(connector: C, policy: ReconnectPolicy) -> Self {
        Self {
            connector,
            sinks: Vec::new(),
            policy,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }

    /// Register a sink; sinks are called in registration order
    pub fn with_sink(mut self, sink: impl FrameSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Override how long a receive blocks before checking for shutdown
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run until `shutdown` is cancelled. Blocks the calling thread.
    pub fn run(mut self, shutdown: &CancellationToken) {
        let mut backoff = self.policy.backoff();
        let name = self.connector.describe();

        while !shutdown.is_cancelled() {
            let mut receiver = match self.connector.open_receiver() {
                Ok(receiver) => {
                    info!(bus = %name, "Bus receiver opened");
                    receiver
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(bus = %name, error = %e, retry_in_ms = delay.as_millis() as u64, "Failed to open bus receiver");
                    sleep_unless_cancelled(delay, shutdown);
                    continue;
                }
            };

            while !shutdown.is_cancelled() {
                match receiver.receive(self.poll_interval) {
                    Ok(Some(frame)) => {
                        // Only a delivered frame proves the connection healthy
                        backoff.reset();
                        self.dispatch(&frame);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        let delay = backoff.next_delay();
                        warn!(bus = %name, error = %e, retry_in_ms = delay.as_millis() as u64, "Bus receive failed, reopening");
                        sleep_unless_cancelled(delay, shutdown);
                        break;
                    }
                }
            }
        }

        debug!(bus = %name, "Notifier stopped");
    }

    fn dispatch(&mut self, frame: &Frame) {
        for sink in &mut self.sinks {
            sink.on_frame(frame);
        }
    }
}

fn sleep_unless_cancelled(delay: Duration, shutdown: &CancellationToken) {
    let mut remaining = delay;
    while !remaining.is_zero() && !shutdown.is_cancelled() {
        let step = remaining.min(SHUTDOWN_CHECK);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusError, BusTransmitter};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedReceiver {
        script: VecDeque<Result<Option<Frame>, BusError>>,
    }

    impl BusReceiver for ScriptedReceiver {
        fn receive(&mut self, _timeout: Duration) -> Result<Option<Frame>, BusError> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(BusError::Unavailable("script exhausted".into())))
        }
    }

    struct NoopTransmitter;

    impl BusTransmitter for NoopTransmitter {
        fn transmit(&mut self, _frame: &Frame, _timeout: Duration) -> Result<(), BusError> {
            Ok(())
        }
    }

    struct ScriptedConnector {
        opens: Arc<Mutex<u32>>,
        sessions: VecDeque<Result<Vec<Result<Option<Frame>, BusError>>, BusError>>,
    }

    impl BusConnector for ScriptedConnector {
        type Receiver = ScriptedReceiver;
        type Transmitter = NoopTransmitter;

        fn open_receiver(&mut self) -> Result<ScriptedReceiver, BusError> {
            *self.opens.lock().unwrap() += 1;
            match self.sessions.pop_front() {
                Some(Ok(script)) => Ok(ScriptedReceiver {
                    script: script.into(),
                }),
                Some(Err(e)) => Err(e),
                None => Err(BusError::Unavailable("no more sessions".into())),
            }
        }

        fn open_transmitter(&mut self) -> Result<NoopTransmitter, BusError> {
            Ok(NoopTransmitter)
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    struct CollectingSink {
        frames: Arc<Mutex<Vec<Frame>>>,
        stop_after: usize,
        shutdown: CancellationToken,
    }

    impl FrameSink for CollectingSink {
        fn on_frame(&mut self, frame: &Frame) {
            let mut frames = self.frames.lock().unwrap();
            frames.push(frame.clone());
            if frames.len() >= self.stop_after {
                self.shutdown.cancel();
            }
        }
    }

    fn fast_policy() -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn test_dispatches_frames_in_order() {
        let shutdown = CancellationToken::new();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let connector = ScriptedConnector {
            opens: Arc::new(Mutex::new(0)),
            sessions: VecDeque::from(vec![Ok(vec![
                Ok(Some(Frame::new(0x120, vec![1]))),
                Ok(None),
                Ok(Some(Frame::new(0x130, vec![2]))),
            ])]),
        };

        Notifier::new(connector, fast_policy())
            .with_sink(CollectingSink {
                frames: frames.clone(),
                stop_after: 2,
                shutdown: shutdown.clone(),
            })
            .run(&shutdown);

        let ids: Vec<u32> = frames.lock().unwrap().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![0x120, 0x130]);
    }

    #[test]
    fn test_reopens_after_receive_failure() {
        let shutdown = CancellationToken::new();
        let frames = Arc::new(Mutex::new(Vec::new()));
        let opens = Arc::new(Mutex::new(0));
        let connector = ScriptedConnector {
            opens: opens.clone(),
            sessions: VecDeque::from(vec![
                Ok(vec![
                    Ok(Some(Frame::new(0x120, vec![1]))),
                    Err(BusError::Unavailable("link down".into())),
                ]),
                Err(BusError::Unavailable("still down".into())),
                Ok(vec![Ok(Some(Frame::new(0x121, vec![2])))]),
            ]),
        };

        Notifier::new(connector, fast_policy())
            .with_sink(CollectingSink {
                frames: frames.clone(),
                stop_after: 2,
                shutdown: shutdown.clone(),
            })
            .run(&shutdown);

        assert_eq!(frames.lock().unwrap().len(), 2);
        assert_eq!(*opens.lock().unwrap(), 3);
    }

    /// Opens fine, fails every receive
    struct FailingReceiver;

    impl BusReceiver for FailingReceiver {
        fn receive(&mut self, _timeout: Duration) -> Result<Option<Frame>, BusError> {
            Err(BusError::IoError(std::io::Error::from(
                std::io::ErrorKind::BrokenPipe,
            )))
        }
    }

    struct FlakyConnector {
        opens: Arc<Mutex<u32>>,
    }

    impl BusConnector for FlakyConnector {
        type Receiver = FailingReceiver;
        type Transmitter = NoopTransmitter;

        fn open_receiver(&mut self) -> Result<FailingReceiver, BusError> {
            *self.opens.lock().unwrap() += 1;
            Ok(FailingReceiver)
        }

        fn open_transmitter(&mut self) -> Result<NoopTransmitter, BusError> {
            Ok(NoopTransmitter)
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    #[test]
    fn test_receive_failures_back_off() {
        let shutdown = CancellationToken::new();
        let opens = Arc::new(Mutex::new(0));
        let connector = FlakyConnector {
            opens: opens.clone(),
        };
        let policy = ReconnectPolicy::new(Duration::from_millis(20), Duration::from_millis(80));

        let stopper = shutdown.clone();
        let timer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            stopper.cancel();
        });
        Notifier::new(connector, policy).run(&shutdown);
        timer.join().unwrap();

        // 20 + 40 + 80 + 80 ... ms between reopens
        let opens = *opens.lock().unwrap();
        assert!(opens >= 2, "reopened {} times", opens);
        assert!(opens <= 8, "reopened {} times", opens);
    }

    #[test]
    fn test_cancelled_before_start() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let opens = Arc::new(Mutex::new(0));
        let connector = ScriptedConnector {
            opens: opens.clone(),
            sessions: VecDeque::new(),
        };

        Notifier::new(connector, fast_policy()).run(&shutdown);
        assert_eq!(*opens.lock().unwrap(), 0);
    }
}
