/// One event of the progress stream delivered to a caller-supplied sink.
///
/// A transfer is bracketed as `Starting(label)`, zero or more `Bytes`, one final
/// `Bytes { total: n, now: n }` and `Finished`. Messages stand alone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A single textual notice, e.g. `"Encoding to gif"`.
    Message(String),
    /// A transfer named `label` begins; size unknown, nothing received yet.
    Starting(String),
    /// Byte progress of the current transfer. `total == 0` means unknown size.
    Bytes {
        /// Expected size in bytes, or 0 when unknown.
        total: u64,
        /// Bytes received so far.
        now: u64,
    },
    /// The current transfer is over.
    Finished,
}

/// Caller-supplied progress callback. Runs inline on the converting thread.
pub type ProgressSink = Box<dyn FnMut(ProgressEvent)>;

/// Routes progress events to an optional sink, honoring the show/hide switch.
pub struct Progress {
    enabled: bool,
    sink: Option<ProgressSink>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            enabled: true,
            sink: None,
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("enabled", &self.enabled)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl Progress {
    /// Enable or suppress all events.
    pub fn set_enabled(&mut self, yes: bool) {
        self.enabled = yes;
    }

    /// Replace the sink.
    pub fn set_sink(&mut self, sink: ProgressSink) {
        self.sink = Some(sink);
    }

    /// Emit a standalone message.
    pub fn message(&mut self, text: impl Into<String>) {
        self.emit(ProgressEvent::Message(text.into()));
    }

    /// Open a transfer stream.
    pub fn starting(&mut self, label: impl Into<String>) {
        self.emit(ProgressEvent::Starting(label.into()));
    }

    /// Forward a byte-progress tick from the fetcher.
    pub fn bytes(&mut self, total: u64, now: u64) {
        self.emit(ProgressEvent::Bytes { total, now });
    }

    /// Close a transfer stream. Fetchers frequently omit the terminal tick, so a
    /// `Bytes { n, n }` for the received body length is always synthesized first.
    pub fn finished(&mut self, received: u64) {
        self.bytes(received, received);
        self.emit(ProgressEvent::Finished);
    }

    fn emit(&mut self, event: ProgressEvent) {
        if !self.enabled {
            return;
        }
        if let Some(sink) = self.sink.as_mut() {
            sink(event);
        }
    }
}
