//! Merging of stdout and stderr fragments into one result.

use std::time::Duration;

use tracing::{trace, warn};

use super::decoder::Utf8StreamDecoder;
use super::fragment::{OutputFragment, OutputStream};
use crate::execution::ExecutionResult;

/// Caller-supplied handler invoked for each piece of decoded output.
pub type OutputCallback<'a> = dyn FnMut(OutputStream, &str) + Send + 'a;

/// Per-stream decoding state.
#[derive(Debug, Default)]
struct StreamState {
    decoder: Utf8StreamDecoder,
    last_sequence: Option<u64>,
    text: String,
}

/// Destination shared by both streams.
struct Sink<'a> {
    combined: String,
    callback: Option<&'a mut OutputCallback<'a>>,
}

impl Sink<'_> {
    fn emit(&mut self, stream: OutputStream, state: &mut StreamState, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(callback) = self.callback.as_deref_mut() {
            callback(stream, text);
        }
        state.text.push_str(text);
        self.combined.push_str(text);
    }
}

impl StreamState {
    /// Deliver a fragment unless the stream already moved past its
    /// sequence number. Numbering may start anywhere and may skip values.
    fn accept(&mut self, stream: OutputStream, sequence: u64, data: &[u8], sink: &mut Sink<'_>) {
        if let Some(last) = self.last_sequence {
            if sequence <= last {
                warn!(%stream, sequence, last, "dropping stale output fragment");
                return;
            }
            if sequence - last > 1 {
                trace!(%stream, sequence, last, "sequence gap in output stream");
            }
        }
        self.last_sequence = Some(sequence);
        let text = self.decoder.decode(data);
        sink.emit(stream, self, &text);
    }

    fn flush(&mut self, stream: OutputStream, sink: &mut Sink<'_>) {
        let tail = self.decoder.finish();
        sink.emit(stream, self, &tail);
    }
}

/// Collects the output of one command run.
///
/// Fragments are decoded and handed to the callback as soon as they are
/// pushed, in arrival order. A fragment whose sequence number is not above
/// the last one delivered on its stream is a repeat and is dropped. The
/// final buffers equal the concatenation of everything the callback saw.
pub struct OutputMultiplexer<'a> {
    stdout: StreamState,
    stderr: StreamState,
    sink: Sink<'a>,
    fragments: u64,
}

impl<'a> OutputMultiplexer<'a> {
    /// Create a multiplexer without a streaming callback.
    pub fn new() -> Self {
        Self {
            stdout: StreamState::default(),
            stderr: StreamState::default(),
            sink: Sink {
                combined: String::new(),
                callback: None,
            },
            fragments: 0,
        }
    }

    /// Create a multiplexer that streams output to `callback`.
    pub fn with_callback(callback: &'a mut OutputCallback<'a>) -> Self {
        let mut mux = Self::new();
        mux.sink.callback = Some(callback);
        mux
    }

    /// Create a multiplexer with an optional callback.
    pub fn with_optional_callback(callback: Option<&'a mut OutputCallback<'a>>) -> Self {
        let mut mux = Self::new();
        mux.sink.callback = callback;
        mux
    }

    /// Accept one fragment from the remote shell.
    pub fn push(&mut self, fragment: OutputFragment) {
        self.fragments += 1;
        trace!(
            stream = %fragment.stream,
            sequence = fragment.sequence,
            bytes = fragment.data.len(),
            "output fragment"
        );
        let state = match fragment.stream {
            OutputStream::Stdout => &mut self.stdout,
            OutputStream::Stderr => &mut self.stderr,
        };
        state.accept(fragment.stream, fragment.sequence, &fragment.data, &mut self.sink);
    }

    /// Number of fragments pushed so far.
    pub fn fragment_count(&self) -> u64 {
        self.fragments
    }

    /// Stdout text delivered so far.
    pub fn stdout(&self) -> &str {
        &self.stdout.text
    }

    /// Stderr text delivered so far.
    pub fn stderr(&self) -> &str {
        &self.stderr.text
    }

    /// Flush both streams and build the final result.
    pub fn finish(mut self, exit_code: u64, duration: Duration) -> ExecutionResult {
        self.stdout.flush(OutputStream::Stdout, &mut self.sink);
        self.stderr.flush(OutputStream::Stderr, &mut self.sink);

        ExecutionResult::new(
            exit_code,
            self.stdout.text,
            self.stderr.text,
            self.sink.combined,
            duration,
        )
    }
}

impl Default for OutputMultiplexer<'_> {
    fn default() -> Self {
        Self::new()
    }
}
