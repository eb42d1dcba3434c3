//! Local interface discovery.
//!
//! The scan needs the host's own IPv4 address and subnet mask to derive the
//! range to probe. Failure here is fatal to scan initiation; there is no
//! fallback guessing.

use std::net::Ipv4Addr;

use pnet::datalink;
use pnet::ipnetwork::IpNetwork;

use crate::error::NetError;

/// IPv4 address of the first usable LAN interface.
pub fn local_address() -> Result<Ipv4Addr, NetError> {
    lan_ipv4().map(|net| net.ip())
}

/// Subnet mask of the first usable LAN interface.
pub fn subnet_mask() -> Result<Ipv4Addr, NetError> {
    lan_ipv4().map(|net| net.mask())
}

// Selects the first interface that looks like a LAN attachment: up,
// broadcast-capable, not loopback, not point-to-point, carrying IPv4.
fn lan_ipv4() -> Result<pnet::ipnetwork::Ipv4Network, NetError> {
    datalink::interfaces()
        .into_iter()
        .filter(|i| i.is_up() && i.is_broadcast() && !i.is_loopback() && !i.is_point_to_point())
        .flat_map(|i| i.ips)
        .find_map(|ip| match ip {
            IpNetwork::V4(v4) => Some(v4),
            IpNetwork::V6(_) => None,
        })
        .ok_or(NetError::NoInterface)
}
