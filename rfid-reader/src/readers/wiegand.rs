//! Wiegand pulse-pair reader
//!
//! Wiegand hardware raises GPIO interrupts rather than delivering a byte
//! stream, so this reader consumes timestamped [`Pulse`] events from a
//! channel instead of connecting a transport. Whatever owns the physical
//! pins (a GPIO interrupt handler, or a test) obtains a [`Sender`] from
//! [`WiegandReader::pulse_sender`] and pushes one pulse per edge; the reader
//! thread assembles frames, validates parity and applies anti-bounce before
//! reporting the detection.

use crate::config::WiegandConfig;
use crate::debounce::AntiBounce;
use crate::readers::RfidReader;
use crate::types::{ConnectionState, ReaderError, Result, TagDetection, TagHandler};
use crate::wiegand::{card_to_tag_id, FrameAssembler, Pulse, WiegandFormat};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Wiegand 26/34 RFID reader
pub struct WiegandReader {
    inner: Arc<Inner>,
    pulse_tx: Sender<Pulse>,
    pulse_rx: Mutex<Option<Receiver<Pulse>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    config: WiegandConfig,
    format: WiegandFormat,
    running: AtomicBool,
    reading: AtomicBool,
    discarded: AtomicU64,
}

impl WiegandReader {
    /// Build a Wiegand reader from its configuration
    ///
    /// An unsupported `format_length` fails here, synchronously, before any
    /// pulse is ever processed.
    pub fn from_config(config: WiegandConfig) -> Result<Self> {
        let format = WiegandFormat::try_from(config.format_length)?;
        let (pulse_tx, pulse_rx) = mpsc::channel();

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                format,
                running: AtomicBool::new(false),
                reading: AtomicBool::new(false),
                discarded: AtomicU64::new(0),
            }),
            pulse_tx,
            pulse_rx: Mutex::new(Some(pulse_rx)),
            handle: Mutex::new(None),
        })
    }

    /// Sender half of the pulse channel, for the GPIO side
    ///
    /// May be cloned freely; both data lines feed the same channel with the
    /// line recorded in each [`Pulse`].
    pub fn pulse_sender(&self) -> Sender<Pulse> {
        self.pulse_tx.clone()
    }

    /// Configured frame format
    pub fn format(&self) -> WiegandFormat {
        self.inner.format
    }
}

impl RfidReader for WiegandReader {
    fn reader_id(&self) -> &str {
        &self.inner.config.reader_id
    }

    fn state(&self) -> ConnectionState {
        if self.inner.reading.load(Ordering::SeqCst) {
            ConnectionState::Reading
        } else {
            ConnectionState::Disconnected
        }
    }

    fn start_reading(&self, handler: TagHandler) -> Result<()> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(ReaderError::AlreadyRunning);
        }

        let rx = self
            .pulse_rx
            .lock()
            .unwrap()
            .take()
            .ok_or(ReaderError::AlreadyRunning)?;

        let inner = Arc::clone(&self.inner);
        let thread = std::thread::Builder::new()
            .name(format!("rfid-{}", self.inner.config.reader_id))
            .spawn(move || inner.run(rx, handler))?;

        *self.handle.lock().unwrap() = Some(thread);
        self.inner.reading.store(true, Ordering::SeqCst);
        log::info!(
            "Wiegand reader {} started (format W{}, D0=pin {}, D1=pin {})",
            self.inner.config.reader_id,
            self.inner.config.format_length,
            self.inner.config.d0_pin,
            self.inner.config.d1_pin
        );
        Ok(())
    }

    fn stop_reading(&self) {
        self.inner.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.handle.lock().unwrap().take() {
            let _ = thread.join();
        }
        log::info!("Wiegand reader {} stopped", self.inner.config.reader_id);
    }

    fn discarded_frames(&self) -> u64 {
        self.inner.discarded.load(Ordering::SeqCst)
    }
}

impl Inner {
    fn run(&self, rx: Receiver<Pulse>, handler: TagHandler) {
        let bit_timeout = self.config.bit_timeout();
        let mut assembler = FrameAssembler::new(self.format, bit_timeout);
        let mut debounce =
            AntiBounce::new(Duration::from_secs_f64(self.config.anti_bounce_secs));

        while self.running.load(Ordering::SeqCst) {
            // Waking at the bit timeout bounds both frame-completion latency
            // and how long stop_reading can block
            let completed = match rx.recv_timeout(bit_timeout) {
                Ok(pulse) => assembler.push(pulse),
                Err(RecvTimeoutError::Timeout) => assembler.poll(Instant::now()),
                Err(RecvTimeoutError::Disconnected) => break,
            };
            self.discarded.store(assembler.discarded(), Ordering::SeqCst);

            if let Some(card) = completed {
                self.emit(card, &mut debounce, &handler);
            }
        }

        self.reading.store(false, Ordering::SeqCst);
    }

    fn emit(&self, card: u32, debounce: &mut AntiBounce, handler: &TagHandler) {
        let tag_id = card_to_tag_id(card);
        if !debounce.accept(&tag_id, Instant::now()) {
            log::debug!(
                "Reader {}: tag {} filtered by anti-bounce",
                self.config.reader_id,
                tag_id
            );
            return;
        }

        log::debug!("Reader {}: Wiegand tag decoded: {}", self.config.reader_id, tag_id);
        handler(TagDetection {
            tag_id,
            reader_id: self.config.reader_id.clone(),
            antenna_port: None,
            signal_strength: None,
            timestamp: Utc::now(),
        });
    }
}
