//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};

// MPLS label value, as carried in the 20-bit field of a label stack
// entry. Unreserved values key label lookup tables; the reserved block
// carries per-label semantics instead.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct Label(u32);

// ===== impl Label =====

impl Label {
    pub const MAX: u32 = (1 << 20) - 1;

    // Reserved labels (RFC 3032).
    pub const IPV4_EXPLICIT_NULL: Label = Label(0);
    pub const ROUTER_ALERT: Label = Label(1);
    pub const IPV6_EXPLICIT_NULL: Label = Label(2);
    pub const IMPLICIT_NULL: Label = Label(3);

    // First value outside the reserved block.
    pub const FIRST_UNRESERVED: u32 = 16;

    pub fn new(value: u32) -> Label {
        if value > Self::MAX {
            panic!("invalid label value: {}", value);
        }
        Label(value)
    }

    pub fn get(&self) -> u32 {
        self.0
    }

    pub fn is_reserved(&self) -> bool {
        self.0 < Self::FIRST_UNRESERVED
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Label::IPV4_EXPLICIT_NULL => write!(f, "ipv4-explicit-null"),
            Label::ROUTER_ALERT => write!(f, "router-alert"),
            Label::IPV6_EXPLICIT_NULL => write!(f, "ipv6-explicit-null"),
            Label::IMPLICIT_NULL => write!(f, "implicit-null"),
            _ => write!(f, "{}", self.0),
        }
    }
}
