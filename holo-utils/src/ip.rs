//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use serde::{Deserialize, Serialize};

// Address Family identifier.
//
// IANA registry:
// http://www.iana.org/assignments/address-family-numbers
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum AddressFamily {
    Ipv4 = 1,
    Ipv6 = 2,
}

// Extension methods for IpAddr.
pub trait IpAddrExt {
    // Returns the address family of this address.
    fn address_family(&self) -> AddressFamily;

    // Returns true if this is an usable address.
    fn is_usable(&self) -> bool;

    // Converts this IP address into a host prefix network.
    fn to_host_prefix(&self) -> IpNetwork;

    // Returns an unspecified address of the given address family.
    fn unspecified(af: AddressFamily) -> IpAddr;
}

// Extension methods for Ipv4Addr.
pub trait Ipv4AddrExt {
    const LENGTH: usize;

    // Converts this IPv4 address into a host prefix network.
    fn to_host_prefix(&self) -> Ipv4Network;
}

// Extension methods for Ipv6Addr.
pub trait Ipv6AddrExt {
    const LENGTH: usize;

    // Converts this IPv6 address into a host prefix network.
    fn to_host_prefix(&self) -> Ipv6Network;
}

// Extension methods for IpNetwork.
pub trait IpNetworkExt {
    // Apply mask to prefix.
    #[must_use]
    fn apply_mask(&self) -> IpNetwork;

    // Returns the address family of this network.
    fn address_family(&self) -> AddressFamily;

    // Returns true if this is a host prefix.
    fn is_host_prefix(&self) -> bool;
}

// ===== impl AddressFamily =====

impl AddressFamily {
    pub fn addr_len(&self) -> usize {
        match self {
            AddressFamily::Ipv4 => Ipv4Addr::LENGTH,
            AddressFamily::Ipv6 => Ipv6Addr::LENGTH,
        }
    }

    pub fn max_prefixlen(&self) -> u8 {
        match self {
            AddressFamily::Ipv4 => 32,
            AddressFamily::Ipv6 => 128,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::Ipv4 => write!(f, "IPv4"),
            AddressFamily::Ipv6 => write!(f, "IPv6"),
        }
    }
}

// ===== impl IpAddr =====

impl IpAddrExt for IpAddr {
    fn address_family(&self) -> AddressFamily {
        match self {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }

    fn is_usable(&self) -> bool {
        !(self.is_loopback() || self.is_multicast() || self.is_unspecified())
    }

    fn to_host_prefix(&self) -> IpNetwork {
        match self {
            IpAddr::V4(addr) => addr.to_host_prefix().into(),
            IpAddr::V6(addr) => addr.to_host_prefix().into(),
        }
    }

    fn unspecified(af: AddressFamily) -> IpAddr {
        match af {
            AddressFamily::Ipv4 => Ipv4Addr::UNSPECIFIED.into(),
            AddressFamily::Ipv6 => Ipv6Addr::UNSPECIFIED.into(),
        }
    }
}

// ===== impl Ipv4Addr =====

impl Ipv4AddrExt for Ipv4Addr {
    const LENGTH: usize = 4;

    fn to_host_prefix(&self) -> Ipv4Network {
        Ipv4Network::new(*self, 32).unwrap()
    }
}

// ===== impl Ipv6Addr =====

impl Ipv6AddrExt for Ipv6Addr {
    const LENGTH: usize = 16;

    fn to_host_prefix(&self) -> Ipv6Network {
        Ipv6Network::new(*self, 128).unwrap()
    }
}

// ===== impl IpNetwork =====

impl IpNetworkExt for IpNetwork {
    fn apply_mask(&self) -> IpNetwork {
        match self {
            IpNetwork::V4(network) => {
                Ipv4Network::new(
                    network.network(),
                    network.prefix(),
                )
                .unwrap()
                .into()
            }
            IpNetwork::V6(network) => {
                Ipv6Network::new(
                    network.network(),
                    network.prefix(),
                )
                .unwrap()
                .into()
            }
        }
    }

    fn address_family(&self) -> AddressFamily {
        match self {
            IpNetwork::V4(_) => AddressFamily::Ipv4,
            IpNetwork::V6(_) => AddressFamily::Ipv6,
        }
    }

    fn is_host_prefix(&self) -> bool {
        self.prefix() == self.address_family().max_prefixlen()
    }
}
