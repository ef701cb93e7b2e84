use std::net::SocketAddr;

use sdsio_transport::{resolve_bind_address, BindAddress, TcpServer};

use crate::cmd::{serve, SocketArgs};
use crate::exit::{transport_error, CliResult};
use crate::output::OutputFormat;

pub fn run(args: SocketArgs, format: OutputFormat) -> CliResult<i32> {
    let bind = bind_address(&args);
    let ip = resolve_bind_address(&bind)
        .map_err(|err| transport_error("address resolution failed", err))?;
    tracing::info!(%ip, port = args.port, "server address resolved");

    let transport = TcpServer::new(SocketAddr::new(ip, args.port));
    serve(transport, &args.outdir, format)
}

fn bind_address(args: &SocketArgs) -> BindAddress {
    match (&args.ip, &args.interface) {
        (Some(ip), _) => BindAddress::Explicit(*ip),
        (None, Some(name)) => BindAddress::Interface(name.clone()),
        (None, None) => BindAddress::HostDefault,
    }
}
