//! virtmem-host - serial RAM host daemon
//!
//! Serves memory pool and input requests from a board on one serial port,
//! shows everything else the board prints, and feeds typed lines to it.
//!
//! ## Threads
//!
//! - **serial-io**: supervisor poll loop (owns the device link)
//! - **input-monitor**: reads lines from stdin or the pass-through device
//!
//! The main thread waits for the serial thread. EOF on input or Ctrl-C sets
//! the shared shutdown flag.

use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use virtmem_host::config::AppConfig;
use virtmem_host::error::{Error, Result};
use virtmem_host::passthrough::{PassDevice, pump_lines};
use virtmem_host::{ConnectionState, Supervisor};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serial RAM and input host for virtmem devices")]
struct Cli {
    /// Serial device connected to the board
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Pass-through serial device for output and input lines
    #[arg(short = 'l', long = "pass")]
    passdev: Option<String>,

    /// Baud rate of the pass-through device
    #[arg(short = 'r', long)]
    passbaud: Option<u32>,

    /// Escape byte introducing commands (decimal or 0x-prefixed hex)
    #[arg(short, long, value_parser = parse_byte)]
    escape: Option<u8>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_byte(value: &str) -> std::result::Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid byte value '{}': {}", value, e))
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(escape) = cli.escape {
        config.serial.escape_value = escape;
    }
    if let Some(passdev) = &cli.passdev {
        config.passthrough.device = Some(passdev.clone());
    }
    if let Some(passbaud) = cli.passbaud {
        config.passthrough.baud_rate = passbaud;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    config.validate()?;
    Ok(config)
}

fn print_prompt() {
    let mut stdout = std::io::stdout();
    if let Err(e) = write!(stdout, "> ").and_then(|()| stdout.flush()) {
        log::debug!("Failed to print prompt: {}", e);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Logs go to stderr; stdout carries the board's output
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("virtmem-host v{} starting...", env!("CARGO_PKG_VERSION"));

    let shutdown = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        s.store(true, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let console = config.passthrough.device.is_none();

    let (sink, lines): (Box<dyn Write + Send>, Box<dyn std::io::BufRead + Send>) =
        match &config.passthrough.device {
            Some(device) => PassDevice::open(device, config.passthrough.baud_rate)?.split()?,
            None => (
                Box::new(std::io::stdout()),
                Box::new(std::io::BufReader::new(std::io::stdin())),
            ),
        };

    let mut supervisor = Supervisor::connect_serial(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.escape_value,
        sink,
        config.link.to_link_config(),
        Arc::clone(&shutdown),
    );

    if supervisor.state() != ConnectionState::Connected {
        log::info!("Shutdown before the board connected");
        return Ok(());
    }
    let input = supervisor.input_queue();

    log::info!(
        "Monitoring serial port {}. Press Ctrl-C to quit.",
        config.serial.port
    );
    if console {
        print_prompt();
    }

    let serial_handle = thread::Builder::new()
        .name("serial-io".to_string())
        .spawn(move || {
            if let Err(e) = supervisor.run() {
                log::error!("Serial loop error: {}", e);
            }
        })
        .map_err(|e| Error::Other(format!("Failed to spawn serial thread: {}", e)))?;

    // Not joined: a blocking stdin read cannot be interrupted
    let monitor_shutdown = Arc::clone(&shutdown);
    thread::Builder::new()
        .name("input-monitor".to_string())
        .spawn(move || {
            let prompt = || {
                if console {
                    print_prompt();
                }
            };
            match pump_lines(lines, &input, &monitor_shutdown, prompt) {
                Ok(count) => log::debug!("Input closed after {} line(s)", count),
                Err(e) => log::error!("Input monitor error: {}", e),
            }
            monitor_shutdown.store(true, Ordering::Relaxed);
        })
        .map_err(|e| Error::Other(format!("Failed to spawn input thread: {}", e)))?;

    serial_handle
        .join()
        .map_err(|_| Error::Other("Serial thread panicked".to_string()))?;

    log::info!("virtmem-host stopped");
    Ok(())
}
