//! Two-state byte classifier
//!
//! ```text
//!            byte == escape
//!   ┌──────┐ ──────────────▶ ┌────────────┐
//!   │ Idle │                 │ EscapeSeen │
//!   └──────┘ ◀────────────── └────────────┘
//!    │  ▲     any byte (command code)
//!    └──┘
//!   other byte: passthrough
//! ```
//!
//! The escape value itself can never travel as passthrough data: in `Idle` it
//! always opens an escape. This is a property of the wire contract.

/// Decoder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    #[default]
    Idle,
    EscapeSeen,
}

/// Classification of one received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Forward verbatim to the display sink
    Passthrough(u8),
    /// Escape consumed, nothing to do yet
    Escape,
    /// Command code following an escape
    Command(u8),
}

#[derive(Debug, Clone)]
pub struct FrameDecoder {
    escape: u8,
    state: DecoderState,
}

impl FrameDecoder {
    pub fn new(escape: u8) -> Self {
        Self {
            escape,
            state: DecoderState::Idle,
        }
    }

    #[inline]
    pub fn escape_value(&self) -> u8 {
        self.escape
    }

    #[inline]
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Classify one byte and advance the state machine
    #[inline]
    pub fn push(&mut self, byte: u8) -> Frame {
        match self.state {
            DecoderState::EscapeSeen => {
                self.state = DecoderState::Idle;
                Frame::Command(byte)
            }
            DecoderState::Idle if byte == self.escape => {
                self.state = DecoderState::EscapeSeen;
                Frame::Escape
            }
            DecoderState::Idle => Frame::Passthrough(byte),
        }
    }

    /// Drop a half-received escape
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
    }
}
