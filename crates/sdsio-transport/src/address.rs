use std::net::{IpAddr, ToSocketAddrs};

use tracing::debug;

use crate::error::{Result, TransportError};

/// How the socket transport picks the address it binds to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BindAddress {
    /// Bind to exactly this address.
    Explicit(IpAddr),
    /// Bind to the address of a named network interface.
    Interface(String),
    /// Bind to the address the host name resolves to.
    #[default]
    HostDefault,
}

/// Resolve a [`BindAddress`] to a concrete IP.
///
/// Interfaces prefer their IPv4 address and fall back to IPv6. The host
/// default prefers IPv4 as well.
pub fn resolve_bind_address(bind: &BindAddress) -> Result<IpAddr> {
    let ip = match bind {
        BindAddress::Explicit(ip) => *ip,
        BindAddress::Interface(name) => {
            let addrs = interface_addresses(name)?;
            pick_preferred(&addrs).ok_or_else(|| TransportError::InterfaceNotFound(name.clone()))?
        }
        BindAddress::HostDefault => host_default_address()?,
    };
    debug!(?bind, %ip, "resolved bind address");
    Ok(ip)
}

fn pick_preferred(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

fn host_default_address() -> Result<IpAddr> {
    let host = gethostname::gethostname()
        .into_string()
        .map_err(|_| TransportError::AddressResolution("host name is not UTF-8".to_string()))?;
    let addrs: Vec<IpAddr> = (host.as_str(), 0)
        .to_socket_addrs()
        .map_err(|err| TransportError::AddressResolution(format!("{host}: {err}")))?
        .map(|addr| addr.ip())
        .collect();
    pick_preferred(&addrs)
        .ok_or_else(|| TransportError::AddressResolution(format!("{host}: no addresses")))
}

// Windows adapter GUIDs are commonly written with or without braces.
fn same_interface(candidate: &str, wanted: &str) -> bool {
    let strip = |name: &str| name.trim_start_matches('{').trim_end_matches('}').to_string();
    candidate == wanted || strip(candidate).eq_ignore_ascii_case(&strip(wanted))
}

/// All IP addresses assigned to the interface called `name`.
///
/// An empty list means no such interface is up.
pub fn interface_addresses(name: &str) -> Result<Vec<IpAddr>> {
    let addrs = if_addrs::get_if_addrs()?
        .into_iter()
        .filter(|iface| same_interface(&iface.name, name))
        .map(|iface| iface.ip())
        .collect();
    Ok(addrs)
}
