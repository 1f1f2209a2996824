//! Command execution
//!
//! Runs one decoded command against the session and writes any reply back on
//! the same transport. Execution is strictly sequential: the reader does not
//! look at the next byte until the current command, including its payload
//! reads, has finished.
//!
//! # Replies
//!
//! | Command | Reply |
//! |---------|-------|
//! | `init`, `ping` | escape byte + same command code |
//! | `read` | `size` raw pool bytes |
//! | `inputAvailable` | i32 queue length |
//! | `inputRequest` | i32 count + `count` bytes |
//! | `inputPeek` | `0`, or `1` + head byte |
//!
//! # Pool Addressing
//!
//! Out-of-range `(index, size)` pairs are rejected by the pool. The link is
//! kept in step with the device anyway: a rejected `read` is answered with
//! `size` zero bytes and a rejected `write` still consumes its payload. Both
//! are streamed through a fixed-size chunk, so a bogus `size` costs link time
//! but never a buffer of that size.
//!
//! `read` and `write` sent while no pool exists are different: they are
//! dropped before their `index`/`size` integers are read, and those bytes
//! (plus any `write` payload) reach the decoder as ordinary data. Devices only
//! issue pool commands after `initPool`, so this path is a device bug.

use super::command::Command;
use super::wire;
use crate::error::Result;
use crate::pool::MemoryPool;
use crate::session::Session;
use crate::transport::Transport;

/// Execute the command with wire code `code`
///
/// Only transport faults are returned as errors; precondition violations are
/// logged and ignored.
pub fn dispatch(session: &mut Session, transport: &mut dyn Transport, code: u8) -> Result<()> {
    let command = match Command::try_from(code) {
        Ok(command) => command,
        Err(code) => {
            log::debug!("Ignoring unknown command code {:#04x}", code);
            return Ok(());
        }
    };

    if !session.is_initialized() && !command.allowed_before_init() {
        log::trace!("Ignoring {:?} before handshake", command);
        return Ok(());
    }

    if command.needs_pool() && session.pool().is_none() {
        log::warn!("Tried to {:?} uninitialized memory pool", command);
        return Ok(());
    }

    log::trace!("Command: {:?}", command);

    match command {
        Command::Ping => send_command(session, transport, Command::Ping)?,
        Command::Init => {
            session.handshake();
            send_command(session, transport, Command::Init)?;
        }
        Command::InitPool => init_pool(session, transport)?,
        Command::Read => read_pool(session, transport)?,
        Command::Write => write_pool(session, transport)?,
        Command::InputAvailable => {
            let available = session.input().available();
            wire::write_i32(transport, clamp_len(available))?;
        }
        Command::InputRequest => input_request(session, transport)?,
        Command::InputPeek => match session.input().peek_one() {
            Some(byte) => transport.write_all(&[1, byte])?,
            None => transport.write_all(&[0])?,
        },
    }

    transport.flush()
}

/// Echo an escaped command code back to the device
fn send_command(session: &Session, transport: &mut dyn Transport, command: Command) -> Result<()> {
    transport.write_all(&[session.escape_value(), command.code()])
}

fn init_pool(session: &mut Session, transport: &mut dyn Transport) -> Result<()> {
    let size = wire::read_i32(transport)?;
    match MemoryPool::allocate(size) {
        Ok(pool) => {
            log::info!("Set memory pool: {} bytes", pool.len());
            session.install_pool(pool);
        }
        Err(e) => log::warn!("Rejected memory pool request: {}", e),
    }
    Ok(())
}

fn read_pool(session: &mut Session, transport: &mut dyn Transport) -> Result<()> {
    let index = wire::read_i32(transport)?;
    let size = wire::read_i32(transport)?;

    let Some(pool) = session.pool() else {
        return Ok(());
    };

    match pool.read_slice(index, size) {
        Ok(bytes) => {
            log::trace!("Pool read: index={} size={}", index, size);
            transport.write_all(bytes)
        }
        Err(e) => {
            log::warn!("{}; replying with zeros", e);
            wire::write_zeros(transport, size.max(0) as usize)
        }
    }
}

fn write_pool(session: &mut Session, transport: &mut dyn Transport) -> Result<()> {
    let index = wire::read_i32(transport)?;
    let size = wire::read_i32(transport)?;

    let Some(pool) = session.pool_mut() else {
        return Ok(());
    };

    match pool.slice_mut(index, size) {
        Ok(target) => {
            wire::read_exact(transport, target)?;
            log::trace!("Pool write: index={} size={}", index, size);
        }
        Err(e) => {
            log::warn!("{}; payload discarded", e);
            wire::discard(transport, size.max(0) as usize)?;
        }
    }
    Ok(())
}

fn input_request(session: &mut Session, transport: &mut dyn Transport) -> Result<()> {
    let requested = wire::read_i32(transport)?;
    let bytes = session.input().drain(requested.max(0) as usize);

    log::debug!("Input request: {} of {} bytes", bytes.len(), requested);

    wire::write_i32(transport, clamp_len(bytes.len()))?;
    transport.write_all(&bytes)
}

/// Lengths go out as i32; the queue never reaches 2 GiB in practice
fn clamp_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}
