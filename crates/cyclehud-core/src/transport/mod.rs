//! FIFO Transport
//!
//! Newline-delimited text over named pipes. A [`Connector`] (re)opens the
//! underlying stream; [`LineReader`] and [`LineWriter`] wrap it in a reconnect
//! loop with bounded exponential backoff, so a closed or missing pipe is
//! reported and retried instead of ending the process.

mod error;
#[cfg(unix)]
mod fifo;
mod reader;
mod writer;

pub use error::TransportError;
#[cfg(unix)]
pub use fifo::{ensure_fifo, FifoReadConnector, FifoWriteConnector, FIFO_MODE};
pub use reader::{LineHandler, LineReader};
pub use writer::LineWriter;

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Capability to (re)establish a transport connection
pub trait Connector: Send {
    /// Byte stream produced by a successful connect
    type Stream: Send + Unpin;

    /// Open a fresh stream
    fn connect(&mut self) -> impl Future<Output = Result<Self::Stream, TransportError>> + Send;

    /// Human-readable name for logs
    fn describe(&self) -> String;
}

/// Sleep for `delay`, returning `false` if shutdown was requested first
pub(crate) async fn wait_or_cancel(delay: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
