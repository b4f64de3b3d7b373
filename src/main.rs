use clap::Parser;
use rs485_probe::config::{Config, ConfigError, ConfigLoader};
use rs485_probe::error::{ConnectionError, ConnectionFailure, ProbeError};
use rs485_probe::port::{list_ports, SystemConnector};
use rs485_probe::{logging, PhaseRunner, SystemClock};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Process exit statuses.
struct ExitCodes;

impl ExitCodes {
    /// Every phase ran, whatever the success rate
    const SUCCESS: u8 = 0;
    /// Stopped by Ctrl-C
    const INTERRUPTED: u8 = 1;
    /// Bad configuration or log sink
    const CONFIG_ERROR: u8 = 2;
    /// The port could not be opened
    const CONNECTION_FAILED: u8 = 3;
}

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "RS-485 communication test for solar inverters.",
    long_about = "Sends the Off-line Query and Remove Register frames to an inverter over RS-485 \
                  in three timed phases and logs every transmission and reply.\n\n\
                  Make sure you may access the serial port; on Linux this usually means \
                  membership of the 'dialout' group."
)]
struct Args {
    /// Serial port path [default: /dev/ttyUSB0]
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate; the inverter expects 9600 [default: 9600]
    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Log file path [default: rs485_test.log]
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transmissions per phase [default: 5]
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Seconds between transmissions [default: 2]
    #[arg(long)]
    interval: Option<f64>,

    /// Seconds to wait for a reply [default: 2]
    #[arg(long)]
    timeout: Option<f64>,

    /// Do not read replies after sending
    #[arg(long)]
    no_response: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

fn seconds(key: &str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| ConfigError::validation(key, format!("{value} is not a valid number of seconds")))
}

/// Seconds from the command line as whole milliseconds.
fn millis(key: &str, value: f64) -> Result<u64, ConfigError> {
    u64::try_from(seconds(key, value)?.as_millis())
        .map_err(|_| ConfigError::validation(key, format!("{value} seconds is too large")))
}

/// File and environment first, then command-line flags on top.
fn build_config(args: &Args) -> Result<Config, ConfigError> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();

    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baud) = args.baudrate {
        config.serial.baud_rate = baud;
    }
    if let Some(timeout) = args.timeout {
        config.serial.timeout_ms = millis("timeout", timeout)?;
    }
    if let Some(count) = args.count {
        config.sequence.repeat_count = count;
    }
    if let Some(interval) = args.interval {
        config.sequence.interval_ms = millis("interval", interval)?;
    }
    if args.no_response {
        config.sequence.await_response = false;
    }
    if let Some(log_file) = &args.log_file {
        config.logging.file = log_file.clone();
    }

    Ok(config)
}

fn print_ports() -> ExitCode {
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            println!("No serial ports found");
            ExitCode::from(ExitCodes::SUCCESS)
        }
        Ok(ports) => {
            for port in ports {
                println!("{}\t{}", port.name, port.kind);
            }
            ExitCode::from(ExitCodes::SUCCESS)
        }
        Err(e) => {
            eprintln!("ERROR: {}", ProbeError::from(e));
            ExitCode::from(ExitCodes::CONNECTION_FAILED)
        }
    }
}

fn print_connection_help(err: &ConnectionError) {
    eprintln!("\nERROR: Failed to connect to {}", err.port);
    eprintln!("Please check:");
    eprintln!("  1. The device is connected");
    eprintln!("  2. The port path is correct");
    eprintln!("  3. You have proper permissions (try: sudo usermod -a -G dialout $USER)");
    eprintln!("  4. No other program is using the port");

    match err.failure {
        ConnectionFailure::NotFound => eprintln!("\nThe device path does not exist."),
        ConnectionFailure::PermissionDenied => eprintln!("\nAccess to the device was denied."),
        ConnectionFailure::Busy => eprintln!("\nThe device is in use by another process."),
        ConnectionFailure::InvalidSettings | ConnectionFailure::Other => {}
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.list_ports {
        return print_ports();
    }

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    // Held until exit so the file sink is flushed
    let _guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let probe = match config.probe_config() {
        Ok(probe) => probe,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    let mut runner = PhaseRunner::new(SystemClock).with_interrupt(interrupt);
    let report = runner.run_sequence(&SystemConnector, &probe);

    if let Some(err) = report.fatal_error() {
        print_connection_help(err);
        return ExitCode::from(ExitCodes::CONNECTION_FAILED);
    }
    if report.was_interrupted() {
        return ExitCode::from(ExitCodes::INTERRUPTED);
    }
    ExitCode::from(ExitCodes::SUCCESS)
}
