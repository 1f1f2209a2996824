//! Connection supervisor
//!
//! Owns the device link and the session, and keeps the link alive across
//! drops.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐ connect() ┌────────────┐  open ok + settle  ┌───────────┐
//! │ Disconnected │ ────────▶ │ Connecting │ ─────────────────▶ │ Connected │
//! └──────────────┘           └────────────┘                    └───────────┘
//!        ▲                    │ ▲  open failed:                      │
//!        │                    │ └─ backoff, retry                    │
//!        │                    ▼                                      │
//!        │              ┌─────────┐   shutdown requested             │
//!        │              │ Stopped │ ◀────────────────────────────────┤
//!        │              └─────────┘                                  │
//!        └──────────────── transport fault: reset session ──────────┘
//! ```
//!
//! A transport fault is never surfaced to the caller. The session drops its
//! handshake and pool, the transport handle is discarded and the same
//! connector is asked for a fresh link. Queued input is kept.
//!
//! # Threading
//!
//! The supervisor itself is driven from one thread (`poll_once`/`run`).
//! Producers feed input through cloned [`InputQueue`] handles and stop the
//! loop through the shared shutdown flag.

use crate::backoff::{Backoff, ShutdownFlag, sleep_cancellable};
use crate::error::{Error, Result};
use crate::input::InputQueue;
use crate::session::Session;
use crate::transport::{Connector, SerialConnector, Transport};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Link timing parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    /// Wait policy between failed open attempts
    pub backoff: Backoff,
    /// Pause after opening, for boards that reset when the port is asserted
    pub settle: Duration,
    /// Sleep in `run` when a poll found nothing to do
    pub idle_poll: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            backoff: Backoff::fixed(Duration::from_millis(500)),
            settle: Duration::from_secs(1),
            idle_poll: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Stopped,
}

pub struct Supervisor {
    connector: Box<dyn Connector>,
    transport: Option<Box<dyn Transport>>,
    session: Session,
    sink: Box<dyn Write + Send>,
    link: LinkConfig,
    shutdown: ShutdownFlag,
    state: ConnectionState,
    reconnects: u64,
}

impl Supervisor {
    /// Create a disconnected supervisor
    pub fn new(
        connector: impl Connector + 'static,
        escape: u8,
        sink: impl Write + Send + 'static,
        link: LinkConfig,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            transport: None,
            session: Session::new(escape, InputQueue::new()),
            sink: Box::new(sink),
            link,
            shutdown: Arc::new(AtomicBool::new(false)),
            state: ConnectionState::Disconnected,
            reconnects: 0,
        }
    }

    /// Share an externally owned shutdown flag
    pub fn with_shutdown(mut self, shutdown: ShutdownFlag) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Open the serial port `path` and block until connected or `shutdown` is set
    ///
    /// Check [`Supervisor::state`] afterwards: it is `Stopped` when shutdown won.
    pub fn connect_serial(
        path: &str,
        baud_rate: u32,
        escape: u8,
        sink: impl Write + Send + 'static,
        link: LinkConfig,
        shutdown: ShutdownFlag,
    ) -> Self {
        let mut supervisor = Self::new(SerialConnector::new(path, baud_rate), escape, sink, link)
            .with_shutdown(shutdown);
        supervisor.connect();
        supervisor
    }

    /// Block until the link is open or shutdown is requested
    ///
    /// Returns [`ConnectionState::Connected`] or [`ConnectionState::Stopped`].
    pub fn connect(&mut self) -> ConnectionState {
        if self.transport.is_some() && self.state == ConnectionState::Connected {
            return self.state;
        }

        self.state = ConnectionState::Connecting;
        log::info!(
            "Waiting until {} can be opened...",
            self.connector.describe()
        );

        let backoff = self.link.backoff;
        let connector = &mut self.connector;
        let opened = backoff.retry(
            &self.shutdown,
            || connector.open(),
            |attempt, e| {
                if attempt == 0 {
                    log::debug!("Open failed: {}", e);
                } else {
                    log::trace!("Open attempt {} failed: {}", attempt + 1, e);
                }
            },
        );

        let transport = match opened {
            Ok(transport) => transport,
            Err(_) => return self.stop(),
        };

        if !sleep_cancellable(self.link.settle, &self.shutdown) {
            return self.stop();
        }

        self.transport = Some(transport);
        self.state = ConnectionState::Connected;
        log::info!("Connected to {}", self.connector.describe());
        self.state
    }

    /// Service every byte currently readable on the link
    ///
    /// Returns the number of bytes consumed from the link by the read loop
    /// (command payloads not included). Reconnects transparently on a
    /// transport fault.
    pub fn poll_once(&mut self) -> Result<usize> {
        if self.shutdown.load(Ordering::Relaxed) {
            self.stop();
            return Ok(0);
        }

        if self.transport.is_none() && self.connect() != ConnectionState::Connected {
            return Ok(0);
        }

        let (processed, wrote_sink, outcome) = self.service_link();

        if wrote_sink && let Err(e) = self.sink.flush() {
            log::warn!("Failed to flush passthrough sink: {}", e);
        }

        if let Err(e) = outcome {
            if !e.is_transport_fault() {
                return Err(e);
            }
            self.recover(&e);
        }

        Ok(processed)
    }

    fn service_link(&mut self) -> (usize, bool, Result<()>) {
        let Some(transport) = self.transport.as_deref_mut() else {
            return (0, false, Ok(()));
        };

        let mut processed = 0;
        let mut wrote_sink = false;
        let mut byte = [0u8; 1];

        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return (processed, wrote_sink, Ok(()));
            }

            match transport.read(&mut byte) {
                Ok(0) => return (processed, wrote_sink, Ok(())),
                Ok(_) => processed += 1,
                Err(e) => return (processed, wrote_sink, Err(e)),
            }

            match self.session.process_byte(byte[0], transport) {
                Ok(Some(data)) => {
                    if let Err(e) = self.sink.write_all(&[data]) {
                        log::warn!("Failed to write passthrough byte: {}", e);
                    }
                    wrote_sink = true;
                }
                Ok(None) => {}
                Err(e) => return (processed, wrote_sink, Err(e)),
            }
        }
    }

    /// Tear down link state after a fault and reopen with the same parameters
    fn recover(&mut self, fault: &Error) {
        log::warn!("Caught transport fault, port disconnected? ({})", fault);

        self.session.reset_link();
        self.transport = None;
        self.state = ConnectionState::Disconnected;
        self.reconnects += 1;

        self.connect();
    }

    /// Poll until shutdown is requested
    pub fn run(&mut self) -> Result<()> {
        while !self.shutdown.load(Ordering::Relaxed) {
            if self.poll_once()? == 0 {
                std::thread::sleep(self.link.idle_poll);
            }
        }
        self.stop();
        log::info!("Supervisor stopped after {} reconnect(s)", self.reconnects);
        Ok(())
    }

    fn stop(&mut self) -> ConnectionState {
        self.transport = None;
        self.session.reset_link();
        self.state = ConnectionState::Stopped;
        self.state
    }

    /// Producer entry point
    pub fn submit_input(&self, bytes: &[u8]) {
        self.session.input().append(bytes);
    }

    /// Handle for producers on other threads
    pub fn input_queue(&self) -> InputQueue {
        self.session.input().clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn shutdown_handle(&self) -> ShutdownFlag {
        Arc::clone(&self.shutdown)
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Number of fault-triggered reconnects so far
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }
}
