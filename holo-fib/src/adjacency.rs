//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::IpAddr;

use holo_utils::ip::{AddressFamily, IpAddrExt};
use serde::{Deserialize, Serialize};

use crate::Fib;
use crate::collections::AdjacencyIndex;
use crate::debug::Debug;
use crate::dpo::LinkType;
use crate::node::{ChildList, NodeRef, SiblingIndex};
use crate::walk::{self, BackWalkCtx, BackWalkReason};

// Key of a neighbor adjacency.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct AdjacencyKey {
    pub ifindex: u32,
    pub link: LinkType,
    pub addr: IpAddr,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AdjacencyKind {
    // Resolved (or resolving) neighbor binding.
    Neighbor,
    // Placeholder that triggers neighbor resolution on first use.
    Glean,
}

// Prebuilt encapsulation prepended to packets forwarded through a
// neighbor adjacency. Present once the neighbor's link-layer address is
// known.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Rewrite(Vec<u8>);

#[derive(Debug)]
pub struct Adjacency {
    pub kind: AdjacencyKind,
    pub link: LinkType,
    pub nexthop: IpAddr,
    pub ifindex: u32,
    pub locks: u32,
    pub rewrite: Option<Rewrite>,
    pub children: ChildList,
}

// ===== impl Rewrite =====

impl Rewrite {
    pub const MAX_LEN: usize = 128;

    pub fn new(data: Vec<u8>) -> Rewrite {
        if data.len() > Self::MAX_LEN {
            panic!("rewrite string too long: {} bytes", data.len());
        }
        Rewrite(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Rewrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ":")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

// ===== impl Adjacency =====

impl Adjacency {
    pub fn key(&self) -> AdjacencyKey {
        AdjacencyKey {
            ifindex: self.ifindex,
            link: self.link,
            addr: self.nexthop,
        }
    }
}

// ===== global functions =====

// Finds or creates the neighbor adjacency for the given key, taking one
// lock on it.
pub fn nbr_add_or_lock(
    fib: &mut Fib,
    link: LinkType,
    nexthop: IpAddr,
    ifindex: u32,
) -> AdjacencyIndex {
    let key = AdjacencyKey {
        ifindex,
        link,
        addr: nexthop,
    };
    if let Some((adj_idx, _)) = fib.adjacencies.get_by_key(&key) {
        fib.adjacencies[adj_idx].locks += 1;
        return adj_idx;
    }

    let adj_idx = fib.adjacencies.insert(Adjacency {
        kind: AdjacencyKind::Neighbor,
        link,
        nexthop,
        ifindex,
        locks: 1,
        rewrite: None,
        children: Default::default(),
    });
    Debug::AdjacencyCreate(&fib.adjacencies[adj_idx]).log();

    adj_idx
}

// Finds or creates the glean adjacency on the given interface, taking one
// lock on it.
pub fn glean_add_or_lock(
    fib: &mut Fib,
    link: LinkType,
    ifindex: u32,
) -> AdjacencyIndex {
    if let Some((adj_idx, _)) = fib.adjacencies.get_glean(ifindex, link) {
        fib.adjacencies[adj_idx].locks += 1;
        return adj_idx;
    }

    let af = match link {
        LinkType::Ipv6 => AddressFamily::Ipv6,
        _ => AddressFamily::Ipv4,
    };
    let adj_idx = fib.adjacencies.insert(Adjacency {
        kind: AdjacencyKind::Glean,
        link,
        nexthop: IpAddr::unspecified(af),
        ifindex,
        locks: 1,
        rewrite: None,
        children: Default::default(),
    });
    Debug::AdjacencyCreate(&fib.adjacencies[adj_idx]).log();

    adj_idx
}

// Releases one lock; the adjacency is reclaimed once unlocked and
// childless.
pub fn unlock(fib: &mut Fib, adj_idx: AdjacencyIndex) {
    let adj = &mut fib.adjacencies[adj_idx];
    adj.locks = adj.locks.saturating_sub(1);
    maybe_delete(fib, adj_idx);
}

pub(crate) fn child_add(
    fib: &mut Fib,
    adj_idx: AdjacencyIndex,
    child: NodeRef,
) -> SiblingIndex {
    fib.adjacencies[adj_idx].children.add(child)
}

pub(crate) fn child_remove(
    fib: &mut Fib,
    adj_idx: AdjacencyIndex,
    sibling: SiblingIndex,
) {
    fib.adjacencies[adj_idx].children.remove(sibling);
    maybe_delete(fib, adj_idx);
}

// Updates (or withdraws) the rewrite string of a neighbor adjacency and
// back-walks its dependents.
pub fn rewrite_update(
    fib: &mut Fib,
    link: LinkType,
    nexthop: IpAddr,
    ifindex: u32,
    rewrite: Option<Rewrite>,
) {
    let key = AdjacencyKey {
        ifindex,
        link,
        addr: nexthop,
    };
    let Some((adj_idx, _)) = fib.adjacencies.get_by_key(&key) else {
        return;
    };

    let up = rewrite.is_some();
    let adj = &mut fib.adjacencies[adj_idx];
    adj.rewrite = rewrite;
    Debug::AdjacencyRewriteUpdate(adj, up).log();

    let reason = if up {
        BackWalkReason::ADJ_UPDATE
    } else {
        BackWalkReason::ADJ_DOWN
    };
    let children = fib.adjacencies[adj_idx].children.collect();
    walk::backwalk_children(fib, children, BackWalkCtx::new(reason));
}

// Force-removes an adjacency, regardless of locks. Used when its
// interface is deleted.
pub(crate) fn delete(fib: &mut Fib, adj_idx: AdjacencyIndex) {
    Debug::AdjacencyDelete(&fib.adjacencies[adj_idx]).log();
    fib.adjacencies.delete(adj_idx);
}

fn maybe_delete(fib: &mut Fib, adj_idx: AdjacencyIndex) {
    let adj = &fib.adjacencies[adj_idx];
    if adj.locks == 0 && adj.children.is_empty() {
        delete(fib, adj_idx);
    }
}
