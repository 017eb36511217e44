//! Telemetry Ingest Loop
//!
//! Applies `key:value` telemetry lines to the overlay fields and renders one
//! frame per line. Field updates are dispatched through a handler table keyed
//! by [`FieldId`], built once at construction.

mod output;

pub use output::{FrameFile, FrameOutput, NullOutput};

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::overlay::{
    FieldId, FieldKind, FormatError, OverlayConfig, OverlayField, OverlayLayout, OverlayState,
};
use crate::telemetry::{parse_segment, split_segments, Segment, SegmentError};
use crate::transport::{LineHandler, TransportError};

/// Updates one field from a raw telemetry value
pub type FieldHandler = Box<dyn Fn(&mut OverlayField, &str) -> Result<(), FormatError> + Send>;

/// A segment that could not be applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum IngestError {
    #[error("Malformed segment: {0}")]
    Segment(#[from] SegmentError),

    #[error("Bad value for '{field}': {source}")]
    Format {
        field: FieldId,
        #[source]
        source: FormatError,
    },
}

/// Outcome of processing one line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineReport {
    /// Segments that updated a field
    pub applied: usize,
    /// Segments with a key no field handles
    pub ignored: usize,
    /// Segments that were malformed or carried a bad value
    pub errors: Vec<IngestError>,
    /// Whether a frame was rendered for this line
    pub rendered: bool,
}

fn default_handler(kind: FieldKind) -> FieldHandler {
    match kind {
        FieldKind::Numeric => Box::new(|field: &mut OverlayField, raw: &str| field.set_value(raw)),
        FieldKind::Clock => Box::new(|field: &mut OverlayField, raw: &str| field.set_time(raw)),
    }
}

/// Owns the overlay state and layout; mutation and rendering happen on the
/// same task
pub struct IngestLoop<O> {
    layout: OverlayLayout,
    state: OverlayState,
    handlers: HashMap<FieldId, FieldHandler>,
    output: O,
    renders: u64,
    output_failures: u64,
    transport_failures: u64,
}

impl<O: FrameOutput> IngestLoop<O> {
    /// Create a loop with every field unset
    pub fn new(config: &OverlayConfig, output: O) -> Self {
        let handlers = FieldId::ALL
            .into_iter()
            .map(|id| (id, default_handler(id.kind())))
            .collect();
        Self {
            layout: OverlayLayout::new(config.layout.clone()),
            state: OverlayState::new(&config.fields),
            handlers,
            output,
            renders: 0,
            output_failures: 0,
            transport_failures: 0,
        }
    }

    /// Replace the update handler of one field
    pub fn with_handler(mut self, id: FieldId, handler: FieldHandler) -> Self {
        self.handlers.insert(id, handler);
        self
    }

    /// Apply every segment of `line`, then render once.
    ///
    /// Lines without any segment are skipped and render nothing.
    pub fn process_line(&mut self, line: &str) -> LineReport {
        let mut report = LineReport::default();
        let mut segments = 0;

        for segment in split_segments(line) {
            segments += 1;
            let Segment { key, value } = match parse_segment(segment) {
                Ok(segment) => segment,
                Err(e) => {
                    warn!(segment, error = %e, "Malformed telemetry segment");
                    report.errors.push(e.into());
                    continue;
                }
            };

            let Some((id, handler)) = FieldId::from_key(key)
                .and_then(|id| self.handlers.get(&id).map(|handler| (id, handler)))
            else {
                trace!(key, "Ignoring unknown telemetry key");
                report.ignored += 1;
                continue;
            };

            match handler(self.state.field_mut(id), value) {
                Ok(()) => report.applied += 1,
                Err(source) => {
                    warn!(field = %id, value, error = %source, "Rejected telemetry value");
                    report.errors.push(IngestError::Format { field: id, source });
                }
            }
        }

        if segments > 0 {
            self.render();
            report.rendered = true;
        }
        report
    }

    /// Render the current state and hand it to the output
    pub fn render(&mut self) {
        let frame = self.layout.render(&self.state);
        self.renders += 1;
        if let Err(e) = self.output.present(&frame) {
            self.output_failures += 1;
            warn!(error = %e, "Failed to present overlay frame");
        }
    }

    /// Current field values
    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Layout in use
    pub fn layout(&self) -> &OverlayLayout {
        &self.layout
    }

    /// Frame output
    pub fn output(&self) -> &O {
        &self.output
    }

    /// Frames rendered so far
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// Frames the output refused
    pub fn output_failures(&self) -> u64 {
        self.output_failures
    }

    /// Transport failures reported by the reader
    pub fn transport_failures(&self) -> u64 {
        self.transport_failures
    }
}

impl<O: FrameOutput> LineHandler for IngestLoop<O> {
    fn on_line(&mut self, line: &str) {
        let report = self.process_line(line);
        debug!(
            applied = report.applied,
            ignored = report.ignored,
            errors = report.errors.len(),
            rendered = report.rendered,
            "Telemetry line processed"
        );
    }

    fn on_transport_error(&mut self, error: &TransportError) {
        self.transport_failures += 1;
        warn!(error = %error, "Telemetry transport failed");
    }
}
