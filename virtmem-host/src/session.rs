//! Per-link session state
//!
//! The session is owned by the supervisor and threaded through the decoder
//! and dispatcher explicitly. Lifecycle:
//!
//! | Event | `initialized` | pool | decoder | input queue |
//! |-------|---------------|------|---------|-------------|
//! | new session | false | absent | Idle | empty |
//! | `init` command | true | absent | Idle | kept |
//! | `initPool` | - | fresh zeroed | - | kept |
//! | transport fault | false | absent | Idle | kept |

use crate::error::Result;
use crate::input::InputQueue;
use crate::pool::MemoryPool;
use crate::protocol::{self, DecoderState, Frame, FrameDecoder};
use crate::transport::Transport;

pub struct Session {
    initialized: bool,
    decoder: FrameDecoder,
    pool: Option<MemoryPool>,
    input: InputQueue,
}

impl Session {
    pub fn new(escape: u8, input: InputQueue) -> Self {
        Self {
            initialized: false,
            decoder: FrameDecoder::new(escape),
            pool: None,
            input,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub fn escape_value(&self) -> u8 {
        self.decoder.escape_value()
    }

    #[inline]
    pub fn decoder_state(&self) -> DecoderState {
        self.decoder.state()
    }

    pub fn pool(&self) -> Option<&MemoryPool> {
        self.pool.as_ref()
    }

    pub fn pool_mut(&mut self) -> Option<&mut MemoryPool> {
        self.pool.as_mut()
    }

    pub fn input(&self) -> &InputQueue {
        &self.input
    }

    /// Handshake received: initialized, pool dropped
    pub fn handshake(&mut self) {
        if self.pool.take().is_some() {
            log::debug!("Handshake discarded existing memory pool");
        }
        self.initialized = true;
    }

    pub fn install_pool(&mut self, pool: MemoryPool) {
        self.pool = Some(pool);
    }

    /// Forget everything tied to the current link; queued input survives
    pub fn reset_link(&mut self) {
        self.initialized = false;
        self.pool = None;
        self.decoder.reset();
    }

    /// Feed one received byte through the decoder
    ///
    /// Returns the byte when it is passthrough data for the sink. Completed
    /// command escapes are dispatched immediately and may read further bytes
    /// from `transport` and write replies to it.
    pub fn process_byte(&mut self, byte: u8, transport: &mut dyn Transport) -> Result<Option<u8>> {
        match self.decoder.push(byte) {
            Frame::Passthrough(b) => Ok(Some(b)),
            Frame::Escape => Ok(None),
            Frame::Command(code) => {
                protocol::dispatch(self, transport, code)?;
                Ok(None)
            }
        }
    }
}
