use sdsio_transport::SerialPortTransport;

use crate::cmd::{serve, SerialArgs};
use crate::exit::CliResult;
use crate::output::OutputFormat;

pub fn run(args: SerialArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.serial_config();
    tracing::info!(port = %config.device_name(), "serial port selected");
    serve(SerialPortTransport::new(config), &args.outdir, format)
}
