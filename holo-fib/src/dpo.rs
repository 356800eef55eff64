//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use enum_as_inner::EnumAsInner;
use holo_utils::ip::AddressFamily;
use serde::{Deserialize, Serialize};

use crate::collections::{AdjacencyIndex, LoadBalanceIndex};

// Payload protocol a path forwards for.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum FibProtocol {
    Ipv4,
    Ipv6,
    Mpls,
}

// Link-layer type an adjacency is keyed on.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum LinkType {
    Ipv4,
    Ipv6,
    Mpls,
    Ethernet,
}

// Forwarding context a data-plane object is requested for.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum ChainType {
    Ipv4,
    Ipv6,
    MplsEos,
    MplsNonEos,
    Ethernet,
}

// Data-plane object: the opaque forwarding operation a path contributes.
//
// `None` is the zero DPO carried by paths that have not resolved yet.
#[derive(Clone, Debug, Default, EnumAsInner, Eq, PartialEq)]
pub enum Dpo {
    #[default]
    None,
    Drop(FibProtocol),
    Adjacency(AdjacencyIndex),
    Lookup { proto: FibProtocol, table_id: u32 },
    Receive { ifindex: u32, addr: IpAddr },
    LoadBalance(LoadBalanceIndex),
}

// ===== impl FibProtocol =====

impl FibProtocol {
    // Returns the address family of this protocol, if any.
    pub fn address_family(&self) -> Option<AddressFamily> {
        match self {
            FibProtocol::Ipv4 => Some(AddressFamily::Ipv4),
            FibProtocol::Ipv6 => Some(AddressFamily::Ipv6),
            FibProtocol::Mpls => None,
        }
    }

    // Returns the forwarding chain this protocol natively contributes to.
    pub fn default_chain(&self) -> ChainType {
        match self {
            FibProtocol::Ipv4 => ChainType::Ipv4,
            FibProtocol::Ipv6 => ChainType::Ipv6,
            FibProtocol::Mpls => ChainType::MplsNonEos,
        }
    }

    // Returns the link type adjacencies for this protocol are keyed on.
    pub fn link_type(&self) -> LinkType {
        match self {
            FibProtocol::Ipv4 => LinkType::Ipv4,
            FibProtocol::Ipv6 => LinkType::Ipv6,
            FibProtocol::Mpls => LinkType::Mpls,
        }
    }
}

impl From<AddressFamily> for FibProtocol {
    fn from(af: AddressFamily) -> FibProtocol {
        match af {
            AddressFamily::Ipv4 => FibProtocol::Ipv4,
            AddressFamily::Ipv6 => FibProtocol::Ipv6,
        }
    }
}

impl std::fmt::Display for FibProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FibProtocol::Ipv4 => write!(f, "ipv4"),
            FibProtocol::Ipv6 => write!(f, "ipv6"),
            FibProtocol::Mpls => write!(f, "mpls"),
        }
    }
}

// ===== impl ChainType =====

impl ChainType {
    // Returns the link type matching this forwarding chain.
    pub fn link_type(&self) -> LinkType {
        match self {
            ChainType::Ipv4 => LinkType::Ipv4,
            ChainType::Ipv6 => LinkType::Ipv6,
            ChainType::MplsEos | ChainType::MplsNonEos => LinkType::Mpls,
            ChainType::Ethernet => LinkType::Ethernet,
        }
    }
}

impl std::fmt::Display for ChainType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainType::Ipv4 => write!(f, "ipv4"),
            ChainType::Ipv6 => write!(f, "ipv6"),
            ChainType::MplsEos => write!(f, "mpls-eos"),
            ChainType::MplsNonEos => write!(f, "mpls-non-eos"),
            ChainType::Ethernet => write!(f, "ethernet"),
        }
    }
}

// ===== impl Dpo =====

impl Dpo {
    // Returns true unless this is the zero DPO.
    pub fn is_valid(&self) -> bool {
        !matches!(self, Dpo::None)
    }
}

impl std::fmt::Display for Dpo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dpo::None => write!(f, "invalid"),
            Dpo::Drop(proto) => write!(f, "{}-drop", proto),
            Dpo::Adjacency(_) => write!(f, "adjacency"),
            Dpo::Lookup { proto, table_id } => {
                write!(f, "{}-lookup in table {}", proto, table_id)
            }
            Dpo::Receive { ifindex, addr } => {
                write!(f, "receive {} dev {}", addr, ifindex)
            }
            Dpo::LoadBalance(_) => write!(f, "load-balance"),
        }
    }
}
