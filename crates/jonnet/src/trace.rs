//! Trace output from `std.trace`.
//!
//! Implement [`TraceWriter`] to capture or redirect trace lines from
//! evaluated programs. The default writer prints to stderr.

/// Receives one formatted line per `std.trace` call.
pub trait TraceWriter {
    fn trace(&mut self, message: &str);
}

/// Writes trace lines to stderr. The default when running via [`crate::Runner::run`].
#[derive(Debug)]
pub struct StdTrace;

impl TraceWriter for StdTrace {
    fn trace(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

/// Discards trace output.
#[derive(Debug)]
pub struct NoTrace;

impl TraceWriter for NoTrace {
    fn trace(&mut self, _message: &str) {}
}

/// Collects trace lines in memory, for tests and embedders.
#[derive(Debug, Default)]
pub struct CollectTrace {
    messages: Vec<String>,
}

impl CollectTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl TraceWriter for CollectTrace {
    fn trace(&mut self, message: &str) {
        self.messages.push(message.to_owned());
    }
}
