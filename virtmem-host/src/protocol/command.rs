//! Command codes sent after the escape byte

/// In-band command, numbered 0-7 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    /// Handshake: marks the session initialized and drops the pool
    Init = 0,
    /// Allocate the memory pool (payload: i32 size)
    InitPool = 1,
    /// Read from the pool (payload: i32 index, i32 size)
    Read = 2,
    /// Write to the pool (payload: i32 index, i32 size, data)
    Write = 3,
    /// Query queued input length
    InputAvailable = 4,
    /// Drain queued input (payload: i32 requested)
    InputRequest = 5,
    /// Look at the next input byte without consuming it
    InputPeek = 6,
    /// Liveness check
    Ping = 7,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::Init,
        Command::InitPool,
        Command::Read,
        Command::Write,
        Command::InputAvailable,
        Command::InputRequest,
        Command::InputPeek,
        Command::Ping,
    ];

    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether the command runs before the handshake
    #[inline]
    pub fn allowed_before_init(self) -> bool {
        matches!(self, Command::Init | Command::Ping)
    }

    /// Whether the command addresses the memory pool
    #[inline]
    pub fn needs_pool(self) -> bool {
        matches!(self, Command::Read | Command::Write)
    }
}

impl TryFrom<u8> for Command {
    type Error = u8;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Command::ALL.get(code as usize).copied().ok_or(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_fixed() {
        for (code, cmd) in Command::ALL.iter().enumerate() {
            assert_eq!(cmd.code() as usize, code);
            assert_eq!(Command::try_from(code as u8), Ok(*cmd));
        }
        assert_eq!(Command::Ping.code(), 7);
    }

    #[test]
    fn test_unknown_codes() {
        assert_eq!(Command::try_from(8), Err(8));
        assert_eq!(Command::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_gating() {
        assert!(Command::Init.allowed_before_init());
        assert!(Command::Ping.allowed_before_init());
        assert!(!Command::InputPeek.allowed_before_init());
        assert!(Command::Read.needs_pool());
        assert!(!Command::InitPool.needs_pool());
    }
}
