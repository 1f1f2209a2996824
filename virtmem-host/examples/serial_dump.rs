//! Serial link dumper
//!
//! Opens the board's serial port without answering any command and prints
//! every received byte in hex, marking escape sequences. Useful to check the
//! escape value and baud rate before running the host.
//!
//! Usage: `cargo run --example serial_dump -- [port] [baud] [escape]`

use std::time::{Duration, Instant};
use virtmem_host::protocol::{Command, Frame, FrameDecoder};
use virtmem_host::transport::{SerialTransport, Transport};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let port = args.get(1).map(String::as_str).unwrap_or("/dev/ttyACM0");
    let baud: u32 = args.get(2).map(|s| s.parse()).transpose()?.unwrap_or(115_200);
    let escape: u8 = args.get(3).map(|s| s.parse()).transpose()?.unwrap_or(0xFF);

    log::info!("Opening {} at {} baud (escape 0x{:02X})", port, baud, escape);
    let mut transport = SerialTransport::open(port, baud)?;

    let mut decoder = FrameDecoder::new(escape);
    let start = Instant::now();
    let duration = Duration::from_secs(10);
    let mut buffer = vec![0u8; 256];
    let mut total_bytes = 0;
    let mut commands = 0;

    log::info!("Capturing for {} seconds...", duration.as_secs());

    while start.elapsed() < duration {
        let bytes_read = transport.read(&mut buffer)?;
        if bytes_read == 0 {
            continue;
        }
        total_bytes += bytes_read;

        let hex_line: String = buffer[..bytes_read]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ");
        println!("[{:06}] {} bytes: {}", total_bytes, bytes_read, hex_line);

        for &byte in &buffer[..bytes_read] {
            if let Frame::Command(code) = decoder.push(byte) {
                commands += 1;
                match Command::try_from(code) {
                    Ok(cmd) => println!("  --> {:?} (code {})", cmd, code),
                    Err(code) => println!("  --> unknown command code 0x{:02X}", code),
                }
            }
        }
    }

    log::info!("Captured {} bytes, {} command escapes", total_bytes, commands);
    Ok(())
}
