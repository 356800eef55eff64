//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod adjacency;
pub mod collections;
pub mod debug;
pub mod dpo;
pub mod entry;
pub mod error;
pub mod interface;
pub mod loadbalance;
pub mod node;
pub mod path;
pub mod path_list;
pub mod table;
pub mod urpf;
pub mod walk;

use crate::collections::{
    Adjacencies, Entries, Interfaces, LoadBalances, PathLists, Paths, Tables,
};
use crate::loadbalance::LoadBalanceMaps;

// The FIB: every pool the subsystem allocates from, threaded through all
// operations by mutable reference. All control-plane work is cooperatively
// serialized on a single executor.
#[derive(Debug, Default)]
pub struct Fib {
    // Interfaces keyed by ifindex.
    pub interfaces: Interfaces,
    // Neighbor and glean adjacencies.
    pub adjacencies: Adjacencies,
    // FIB tables keyed by (protocol, table ID).
    pub tables: Tables,
    // FIB entries.
    pub entries: Entries,
    // Path-lists.
    pub path_lists: PathLists,
    // Paths.
    pub paths: Paths,
    // Load-balances.
    pub load_balances: LoadBalances,
    // PIC-edge signalling.
    pub lb_maps: LoadBalanceMaps,
}

// ===== impl Fib =====

impl Fib {
    pub fn new() -> Fib {
        Default::default()
    }
}
