use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use sdsio_server::Server;
use sdsio_stream::StreamRegistry;
use sdsio_transport::{
    interface_addresses, Parity, SerialConfig, StopBits, Transport, DEFAULT_BAUD_RATE,
    DEFAULT_PORT,
};

use crate::exit::{server_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_endpoint, print_summary, OutputFormat};

pub mod serial;
pub mod socket;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a single client over a TCP socket.
    Socket(SocketArgs),
    /// Serve over a serial line.
    Serial(SerialArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Socket(args) => socket::run(args, format),
        Command::Serial(args) => serial::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct SocketArgs {
    /// Server IP address.
    #[arg(long = "ipaddr", value_name = "IP", conflicts_with = "interface")]
    pub ip: Option<IpAddr>,
    /// Network interface whose address the server binds to.
    #[arg(long, value_name = "INTERFACE", value_parser = parse_interface)]
    pub interface: Option<String>,
    /// TCP port.
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Output directory (must exist).
    #[arg(long, value_name = "DIR", default_value = ".", value_parser = parse_out_dir)]
    pub outdir: PathBuf,
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial port (e.g. 3, COM3, /dev/ttyUSB0).
    #[arg(short = 'p', long = "port", value_name = "PORT")]
    pub port: String,
    /// Baud rate.
    #[arg(long, value_name = "BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baudrate: u32,
    /// Parity: N = none, E = even, O = odd.
    #[arg(long, value_enum, value_name = "PARITY", default_value = "N")]
    pub parity: ParityArg,
    /// Stop bits.
    #[arg(long, value_enum, value_name = "BITS", default_value = "1")]
    pub stopbits: StopBitsArg,
    /// Output directory (must exist).
    #[arg(long, value_name = "DIR", default_value = ".", value_parser = parse_out_dir)]
    pub outdir: PathBuf,
}

impl SerialArgs {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baudrate,
            parity: self.parity.into(),
            stop_bits: self.stopbits.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ParityArg {
    #[value(name = "N")]
    None,
    #[value(name = "E")]
    Even,
    #[value(name = "O")]
    Odd,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Even => Parity::Even,
            ParityArg::Odd => Parity::Odd,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

fn parse_out_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("invalid output directory: {value}"))
    }
}

fn parse_interface(value: &str) -> Result<String, String> {
    match interface_addresses(value) {
        Ok(addrs) if !addrs.is_empty() => Ok(value.to_string()),
        Ok(_) => Err(format!("unknown network interface: {value}")),
        Err(err) => Err(format!("cannot enumerate network interfaces: {err}")),
    }
}

/// Run the server on `transport` until Ctrl+C, then print the session summary.
pub(crate) fn serve<T: Transport>(
    transport: T,
    out_dir: &Path,
    format: OutputFormat,
) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    print_endpoint(&transport.describe(), out_dir, format);

    let mut server = Server::new(transport, StreamRegistry::new(out_dir)).with_running_flag(running);
    let summary = server
        .run()
        .map_err(|err| server_error("server failed", err))?;

    print_summary(&summary, format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
