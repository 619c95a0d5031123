//! Shared read loop for line-oriented transports
//!
//! Serial and TCP readers differ only in how a byte stream is established;
//! everything after `connect()` - framing, parsing, validation, anti-bounce,
//! reconnect policy - is identical. [`LineReader`] owns that shared state
//! machine (`Disconnected -> Connecting -> Reading`) and is generic over the
//! connecting side.

use crate::debounce::AntiBounce;
use crate::protocol::{self, LineFramer};
use crate::readers::RfidReader;
use crate::types::{ConnectionState, ReaderError, Result, TagDetection, TagHandler};
use chrono::Utc;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Slice used for interruptible sleeps so `stop_reading` stays responsive
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// How a line-oriented transport establishes its byte stream
///
/// Implementations hold connection parameters only; the stream itself lives
/// on the reader thread. Reads on the returned stream must observe a bounded
/// timeout (surfaced as `TimedOut`/`WouldBlock`) so the loop can notice
/// cancellation promptly even with no traffic.
pub trait LineTransport: Send + Sync + 'static {
    /// Human-readable endpoint description for log messages
    fn describe(&self) -> String;

    /// Open a fresh connection
    fn connect(&self) -> Result<Box<dyn Read + Send>>;
}

/// Options common to all line-oriented readers
#[derive(Debug, Clone)]
pub struct LineReaderOptions {
    pub reader_id: String,
    /// Anti-bounce window applied per tag
    pub anti_bounce: Duration,
    /// Fixed delay between reconnect attempts
    pub reconnect_delay: Duration,
}

/// A reader that consumes a line-oriented byte stream from some transport
pub struct LineReader<T: LineTransport> {
    inner: Arc<Inner<T>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct Inner<T> {
    transport: T,
    options: LineReaderOptions,
    running: AtomicBool,
    state: AtomicU8,
    discarded: AtomicU64,
}

impl<T: LineTransport> LineReader<T> {
    pub fn new(transport: T, options: LineReaderOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                options,
                running: AtomicBool::new(false),
                state: AtomicU8::new(state_to_u8(ConnectionState::Disconnected)),
                discarded: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        }
    }
}

impl<T: LineTransport> RfidReader for LineReader<T> {
    fn reader_id(&self) -> &str {
        &self.inner.options.reader_id
    }

    fn state(&self) -> ConnectionState {
        state_from_u8(self.inner.state.load(Ordering::SeqCst))
    }

    fn start_reading(&self, handler: TagHandler) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(ReaderError::AlreadyRunning);
        }

        let inner = Arc::clone(&self.inner);
        let thread = std::thread::Builder::new()
            .name(format!("rfid-{}", self.inner.options.reader_id))
            .spawn(move || inner.run(handler))?;

        *self.handle.lock().unwrap() = Some(thread);
        log::info!(
            "Reader {} started on {}",
            self.inner.options.reader_id,
            self.inner.transport.describe()
        );
        Ok(())
    }

    fn stop_reading(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.handle.lock().unwrap().take() {
            // The loop observes the flag within one read timeout
            let _ = thread.join();
        }
        log::info!("Reader {} stopped", self.inner.options.reader_id);
    }

    fn discarded_frames(&self) -> u64 {
        self.inner.discarded.load(Ordering::SeqCst)
    }
}

impl<T: LineTransport> Inner<T> {
    /// Reader thread entry point: connect, read, reconnect forever
    fn run(&self, handler: TagHandler) {
        let mut debounce = AntiBounce::new(self.options.anti_bounce);

        while self.running.load(Ordering::SeqCst) {
            self.set_state(ConnectionState::Connecting);
            let stream = match self.transport.connect() {
                Ok(stream) => stream,
                Err(e) => {
                    log::error!(
                        "Reader {}: failed to connect to {}: {}",
                        self.options.reader_id,
                        self.transport.describe(),
                        e
                    );
                    self.set_state(ConnectionState::Disconnected);
                    self.backoff();
                    continue;
                }
            };

            log::info!(
                "Reader {} connected to {}",
                self.options.reader_id,
                self.transport.describe()
            );
            self.set_state(ConnectionState::Reading);

            if let Err(e) = self.read_stream(stream, &mut debounce, &handler) {
                log::error!("Reader {}: read loop error: {}", self.options.reader_id, e);
            }

            self.set_state(ConnectionState::Disconnected);
            if self.running.load(Ordering::SeqCst) {
                log::info!(
                    "Reader {}: reconnecting in {:?}",
                    self.options.reader_id,
                    self.options.reconnect_delay
                );
                self.backoff();
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    /// Consume one connection until error, EOF or stop
    fn read_stream(
        &self,
        mut stream: Box<dyn Read + Send>,
        debounce: &mut AntiBounce,
        handler: &TagHandler,
    ) -> Result<()> {
        let mut framer = LineFramer::new();
        let mut buf = [0u8; 512];

        while self.running.load(Ordering::SeqCst) {
            match stream.read(&mut buf) {
                Ok(0) => return Err(ReaderError::Transport("connection closed".into())),
                Ok(n) => {
                    framer.push(&buf[..n]);
                    while let Some(frame) = framer.next_frame() {
                        self.handle_frame(&frame, debounce, handler);
                    }
                }
                // Bounded-wait tick with no traffic: check the flag, read again
                Err(e)
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(ReaderError::Io(e)),
            }
        }
        Ok(())
    }

    /// Parse, validate and debounce one frame
    fn handle_frame(&self, frame: &[u8], debounce: &mut AntiBounce, handler: &TagHandler) {
        if frame.is_empty() {
            return; // blank line between frames, not worth counting
        }

        let parsed = match protocol::parse_frame(frame) {
            Some(parsed) => parsed,
            None => {
                log::warn!(
                    "Reader {}: discarding malformed frame ({} bytes)",
                    self.options.reader_id,
                    frame.len()
                );
                self.discarded.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        if !debounce.accept(&parsed.tag_id, Instant::now()) {
            log::debug!(
                "Reader {}: tag {} filtered by anti-bounce",
                self.options.reader_id,
                parsed.tag_id
            );
            return;
        }

        log::debug!("Reader {}: tag read: {}", self.options.reader_id, parsed.tag_id);
        handler(TagDetection {
            tag_id: parsed.tag_id,
            reader_id: self.options.reader_id.clone(),
            antenna_port: parsed.antenna_port,
            signal_strength: parsed.signal_strength,
            timestamp: Utc::now(),
        });
    }

    /// Sleep the reconnect delay in slices so stop stays responsive
    fn backoff(&self) {
        let deadline = Instant::now() + self.options.reconnect_delay;
        while self.running.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(SLEEP_SLICE.min(remaining));
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state_to_u8(state), Ordering::SeqCst);
    }
}

fn state_to_u8(state: ConnectionState) -> u8 {
    match state {
        ConnectionState::Disconnected => 0,
        ConnectionState::Connecting => 1,
        ConnectionState::Reading => 2,
    }
}

fn state_from_u8(value: u8) -> ConnectionState {
    match value {
        1 => ConnectionState::Connecting,
        2 => ConnectionState::Reading,
        _ => ConnectionState::Disconnected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Transport that always fails to connect
    struct FailingTransport {
        attempts: Arc<AtomicUsize>,
    }

    impl LineTransport for FailingTransport {
        fn describe(&self) -> String {
            "nowhere".into()
        }

        fn connect(&self) -> Result<Box<dyn Read + Send>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(ReaderError::Transport("unreachable".into()))
        }
    }

    #[test]
    fn test_connect_failure_retries_until_stopped() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let reader = LineReader::new(
            FailingTransport {
                attempts: Arc::clone(&attempts),
            },
            LineReaderOptions {
                reader_id: "flaky".into(),
                anti_bounce: Duration::from_secs(2),
                reconnect_delay: Duration::from_millis(50),
            },
        );

        reader.start_reading(Arc::new(|_| {})).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        reader.stop_reading();

        // Several attempts, never a propagated failure
        assert!(attempts.load(Ordering::SeqCst) >= 2);
        assert_eq!(reader.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_double_start_rejected() {
        let reader = LineReader::new(
            FailingTransport {
                attempts: Arc::new(AtomicUsize::new(0)),
            },
            LineReaderOptions {
                reader_id: "r1".into(),
                anti_bounce: Duration::from_secs(2),
                reconnect_delay: Duration::from_millis(50),
            },
        );

        reader.start_reading(Arc::new(|_| {})).unwrap();
        let err = reader.start_reading(Arc::new(|_| {})).unwrap_err();
        assert!(matches!(err, ReaderError::AlreadyRunning));
        reader.stop_reading();
    }

    #[test]
    fn test_stop_without_start_is_a_no_op() {
        let reader = LineReader::new(
            FailingTransport {
                attempts: Arc::new(AtomicUsize::new(0)),
            },
            LineReaderOptions {
                reader_id: "r1".into(),
                anti_bounce: Duration::from_secs(2),
                reconnect_delay: Duration::from_millis(50),
            },
        );
        reader.stop_reading();
        assert_eq!(reader.state(), ConnectionState::Disconnected);
    }
}
