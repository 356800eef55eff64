//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

use bitflags::bitflags;
use holo_utils::ip::{AddressFamily, IpAddrExt};
use holo_utils::mpls::Label;
use serde::{Deserialize, Serialize};

use crate::collections::{
    AdjacencyIndex, EntryIndex, PathIndex, PathListIndex,
};
use crate::debug::Debug;
use crate::dpo::{ChainType, Dpo, FibProtocol, LinkType};
use crate::entry::{self, EntryFlags, FibSource};
use crate::error::Error;
use crate::loadbalance::LoadBalancePath;
use crate::node::{NodeRef, SiblingIndex};
use crate::table::{self, DEFAULT_TABLE_ID, FibPrefix};
use crate::urpf::UrpfList;
use crate::walk::{BackWalkCtx, BackWalkReason};
use crate::{Fib, adjacency, interface, path_list};

bitflags! {
    // Flags carried by a route-path descriptor. Everything else about a
    // path's configuration comes through the `cfg` argument of `create`.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct RoutePathFlags: u8 {
        const RESOLVE_VIA_HOST = 0x01;
        const RESOLVE_VIA_ATTACHED = 0x02;
    }
}

bitflags! {
    // Configured path flags; part of the hashable state.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct PathCfgFlags: u8 {
        const DROP = 0x01;
        const LOCAL = 0x02;
        const RESOLVE_VIA_HOST = 0x04;
        const RESOLVE_VIA_ATTACHED = 0x08;
    }
}

bitflags! {
    // Derived path flags; recomputed, never copied.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct PathOperFlags: u8 {
        const RESOLVED = 0x01;
        const RECURSIVE_LOOP = 0x02;
        const DROP = 0x04;
    }
}

// Route-path descriptor: the external representation of one way to reach
// a destination.
#[derive(Clone, Debug)]
#[derive(Deserialize, Serialize)]
pub struct RoutePath {
    pub proto: FibProtocol,
    pub nexthop: IpAddr,
    pub ifindex: Option<u32>,
    pub table_id: Option<u32>,
    pub label: Option<Label>,
    pub weight: u32,
    pub flags: RoutePathFlags,
    #[serde(skip)]
    pub dpo: Option<Dpo>,
}

// Discriminant of the path variants, ordered for comparison purposes.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum PathType {
    AttachedNextHop,
    Attached,
    Recursive,
    Special,
    Exclusive,
    Deag,
    Receive,
}

// Next-hop of a recursive path.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum RecursiveNexthop {
    Address(IpAddr),
    Label(Label),
}

// Kind-specific configured payload. Exactly one variant is ever valid for
// a given path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathKind {
    // Forward through a neighbor on an interface.
    AttachedNextHop { nexthop: IpAddr, ifindex: u32 },
    // Forward onto an interface, resolving the neighbor per packet.
    Attached { ifindex: u32 },
    // Forward via another FIB entry.
    Recursive { via: RecursiveNexthop, table_id: u32 },
    // Drop.
    Special,
    // Forward via a caller-supplied DPO.
    Exclusive { dpo: Dpo },
    // Deaggregate: look the packet up again in another table.
    Deag { table_id: u32 },
    // Punt to the local receive handler.
    Receive { ifindex: u32, addr: IpAddr },
}

#[derive(Debug)]
pub struct Path {
    // Owning path-list.
    pub path_list: PathListIndex,
    // Configured state.
    pub proto: FibProtocol,
    pub weight: u32,
    pub cfg_flags: PathCfgFlags,
    pub kind: PathKind,
    // Derived state.
    pub oper_flags: PathOperFlags,
    pub via_fib: Option<EntryIndex>,
    pub sibling: Option<SiblingIndex>,
    pub dpo: Dpo,
}

// ===== impl RoutePath =====

impl Default for RoutePath {
    fn default() -> RoutePath {
        RoutePath {
            proto: FibProtocol::Ipv4,
            nexthop: IpAddr::unspecified(AddressFamily::Ipv4),
            ifindex: None,
            table_id: None,
            label: None,
            weight: 0,
            flags: RoutePathFlags::empty(),
            dpo: None,
        }
    }
}

impl From<RoutePathFlags> for PathCfgFlags {
    fn from(flags: RoutePathFlags) -> PathCfgFlags {
        let mut cfg = PathCfgFlags::empty();
        if flags.contains(RoutePathFlags::RESOLVE_VIA_HOST) {
            cfg.insert(PathCfgFlags::RESOLVE_VIA_HOST);
        }
        if flags.contains(RoutePathFlags::RESOLVE_VIA_ATTACHED) {
            cfg.insert(PathCfgFlags::RESOLVE_VIA_ATTACHED);
        }
        cfg
    }
}

impl From<PathCfgFlags> for RoutePathFlags {
    fn from(cfg: PathCfgFlags) -> RoutePathFlags {
        let mut flags = RoutePathFlags::empty();
        if cfg.contains(PathCfgFlags::RESOLVE_VIA_HOST) {
            flags.insert(RoutePathFlags::RESOLVE_VIA_HOST);
        }
        if cfg.contains(PathCfgFlags::RESOLVE_VIA_ATTACHED) {
            flags.insert(RoutePathFlags::RESOLVE_VIA_ATTACHED);
        }
        flags
    }
}

// ===== impl PathKind =====

impl PathKind {
    pub fn path_type(&self) -> PathType {
        match self {
            PathKind::AttachedNextHop { .. } => PathType::AttachedNextHop,
            PathKind::Attached { .. } => PathType::Attached,
            PathKind::Recursive { .. } => PathType::Recursive,
            PathKind::Special => PathType::Special,
            PathKind::Exclusive { .. } => PathType::Exclusive,
            PathKind::Deag { .. } => PathType::Deag,
            PathKind::Receive { .. } => PathType::Receive,
        }
    }
}

// ===== impl RecursiveNexthop =====

impl std::fmt::Display for RecursiveNexthop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecursiveNexthop::Address(addr) => write!(f, "{}", addr),
            RecursiveNexthop::Label(label) => write!(f, "mpls:{}", label),
        }
    }
}

// ===== impl Path =====

impl Path {
    // Permanent drops contribute the drop DPO and never bind upstream.
    pub fn is_permanent_drop(&self) -> bool {
        self.cfg_flags.contains(PathCfgFlags::DROP)
            || self.oper_flags.contains(PathOperFlags::DROP)
    }

    pub fn is_resolved(&self) -> bool {
        self.dpo.is_valid()
            && self.oper_flags.contains(PathOperFlags::RESOLVED)
            && !self.oper_flags.contains(PathOperFlags::RECURSIVE_LOOP)
            && !self.is_permanent_drop()
    }

    pub fn is_looped(&self) -> bool {
        self.oper_flags.contains(PathOperFlags::RECURSIVE_LOOP)
    }

    pub fn is_recursive(&self) -> bool {
        self.kind.path_type() == PathType::Recursive
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind.path_type() == PathType::Exclusive
    }

    pub fn is_deag(&self) -> bool {
        self.kind.path_type() == PathType::Deag
    }

    // Returns the adjacency this path forwards through. The DPO must be an
    // adjacency.
    pub fn adjacency(&self) -> AdjacencyIndex {
        *self
            .dpo
            .as_adjacency()
            .expect("path does not resolve via an adjacency")
    }

    // Structural comparison over the configured state. Weight does not
    // participate.
    pub fn cmp(&self, other: &Path) -> Ordering {
        self.kind
            .path_type()
            .cmp(&other.kind.path_type())
            .then_with(|| self.proto.cmp(&other.proto))
            .then_with(|| match (&self.kind, &other.kind) {
                (
                    PathKind::AttachedNextHop { nexthop, ifindex },
                    PathKind::AttachedNextHop {
                        nexthop: other_nexthop,
                        ifindex: other_ifindex,
                    },
                ) => nexthop
                    .cmp(other_nexthop)
                    .then_with(|| ifindex.cmp(other_ifindex)),
                (
                    PathKind::Attached { ifindex },
                    PathKind::Attached {
                        ifindex: other_ifindex,
                    },
                ) => ifindex.cmp(other_ifindex),
                (
                    PathKind::Recursive { via, table_id },
                    PathKind::Recursive {
                        via: other_via,
                        table_id: other_table_id,
                    },
                ) => via
                    .cmp(other_via)
                    .then_with(|| table_id.cmp(other_table_id)),
                (
                    PathKind::Deag { table_id },
                    PathKind::Deag {
                        table_id: other_table_id,
                    },
                ) => table_id.cmp(other_table_id),
                // Special, exclusive and receive paths compare equal.
                _ => Ordering::Equal,
            })
    }

    // Comparison against a route-path descriptor; weight goes first.
    pub fn cmp_with_rpath(&self, rpath: &RoutePath) -> Ordering {
        self.weight.cmp(&rpath.weight).then_with(|| match &self.kind {
            PathKind::AttachedNextHop { nexthop, ifindex } => nexthop
                .cmp(&rpath.nexthop)
                .then_with(|| Some(*ifindex).cmp(&rpath.ifindex)),
            PathKind::Attached { ifindex } => {
                Some(*ifindex).cmp(&rpath.ifindex)
            }
            PathKind::Recursive { via, table_id } => match via {
                RecursiveNexthop::Label(label) => {
                    Some(*label).cmp(&rpath.label)
                }
                RecursiveNexthop::Address(addr) => addr.cmp(&rpath.nexthop),
            }
            .then_with(|| {
                table_id.cmp(&rpath.table_id.unwrap_or(DEFAULT_TABLE_ID))
            }),
            PathKind::Deag { table_id } => {
                Some(*table_id).cmp(&rpath.table_id)
            }
            PathKind::Special
            | PathKind::Exclusive { .. }
            | PathKind::Receive { .. } => Ordering::Equal,
        })
    }

    // Hash over the configured state `cmp` consults; equal paths hash
    // identically.
    pub fn hash_config(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.kind.path_type().hash(&mut hasher);
        self.proto.hash(&mut hasher);
        match &self.kind {
            PathKind::AttachedNextHop { nexthop, ifindex } => {
                nexthop.hash(&mut hasher);
                ifindex.hash(&mut hasher);
            }
            PathKind::Attached { ifindex } => {
                ifindex.hash(&mut hasher);
            }
            PathKind::Recursive { via, table_id } => {
                via.hash(&mut hasher);
                table_id.hash(&mut hasher);
            }
            PathKind::Deag { table_id } => {
                table_id.hash(&mut hasher);
            }
            PathKind::Special
            | PathKind::Exclusive { .. }
            | PathKind::Receive { .. } => (),
        }
        hasher.finish()
    }
}

// ===== global functions =====

// Creates a path for the given route-path descriptor. The path starts
// unresolved.
pub fn create(
    fib: &mut Fib,
    path_list: PathListIndex,
    proto: FibProtocol,
    cfg_flags: PathCfgFlags,
    rpath: &RoutePath,
) -> PathIndex {
    let cfg_flags = cfg_flags | PathCfgFlags::from(rpath.flags);
    let kind = kind_from_route_path(proto, cfg_flags, rpath);
    let path = Path {
        path_list,
        proto,
        weight: if rpath.weight == 0 { 1 } else { rpath.weight },
        cfg_flags,
        kind,
        oper_flags: PathOperFlags::empty(),
        via_fib: None,
        sibling: None,
        dpo: Dpo::None,
    };
    let path_type = path.kind.path_type();

    let path_idx = fib.paths.insert(path);
    Debug::PathCreate(path_idx, path_type).log();

    path_idx
}

// Creates a drop, receive or exclusive path, consuming the caller's DPO
// in the exclusive case.
pub fn create_special(
    fib: &mut Fib,
    path_list: PathListIndex,
    proto: FibProtocol,
    cfg_flags: PathCfgFlags,
    dpo: Dpo,
) -> PathIndex {
    let kind = if cfg_flags.contains(PathCfgFlags::DROP) {
        PathKind::Special
    } else if cfg_flags.contains(PathCfgFlags::LOCAL) {
        let af = proto.address_family().unwrap_or(AddressFamily::Ipv4);
        PathKind::Receive {
            ifindex: 0,
            addr: IpAddr::unspecified(af),
        }
    } else {
        PathKind::Exclusive { dpo }
    };
    let path = Path {
        path_list,
        proto,
        weight: 1,
        cfg_flags,
        kind,
        oper_flags: PathOperFlags::empty(),
        via_fib: None,
        sibling: None,
        dpo: Dpo::None,
    };
    let path_type = path.kind.path_type();

    let path_idx = fib.paths.insert(path);
    Debug::PathCreate(path_idx, path_type).log();

    path_idx
}

// Duplicates the configured state of a path into a new path owned by
// another path-list. The copy starts unresolved with the zero DPO.
pub fn copy(
    fib: &mut Fib,
    src_idx: PathIndex,
    path_list: PathListIndex,
) -> PathIndex {
    let src = &fib.paths[src_idx];
    let path = Path {
        path_list,
        proto: src.proto,
        weight: src.weight,
        cfg_flags: src.cfg_flags,
        kind: src.kind.clone(),
        oper_flags: PathOperFlags::empty(),
        via_fib: None,
        sibling: None,
        dpo: Dpo::None,
    };

    let path_idx = fib.paths.insert(path);
    Debug::PathCopy(src_idx, path_idx).log();

    path_idx
}

// Destroys a path, releasing every upstream reference first. Only the
// owning path-list calls this.
pub fn destroy(fib: &mut Fib, path_idx: PathIndex) {
    unresolve(fib, path_idx);
    Debug::PathDestroy(path_idx).log();
    fib.paths.remove(path_idx);
}

// Binds the path to its downstream object and publishes its DPO. Returns
// whether the path came out resolved-visible.
pub fn resolve(fib: &mut Fib, path_idx: PathIndex) -> bool {
    if fib.paths[path_idx].is_permanent_drop() {
        // Permanent drops hold no upstream references.
        let path = &mut fib.paths[path_idx];
        path.dpo = Dpo::Drop(path.proto);
        path.oper_flags.remove(PathOperFlags::RESOLVED);
    } else if fib.paths[path_idx].sibling.is_some() {
        // Already bound to its upstream.
    } else {
        match fib.paths[path_idx].kind.clone() {
            PathKind::AttachedNextHop { nexthop, ifindex } => {
                resolve_attached_next_hop(fib, path_idx, nexthop, ifindex);
            }
            PathKind::Attached { ifindex } => {
                resolve_attached(fib, path_idx, ifindex);
            }
            PathKind::Recursive { via, table_id } => {
                resolve_recursive(fib, path_idx, via, table_id);
            }
            PathKind::Special => {
                let path = &mut fib.paths[path_idx];
                path.dpo = Dpo::Drop(path.proto);
                path.oper_flags.insert(PathOperFlags::RESOLVED);
            }
            PathKind::Deag { table_id } => {
                let proto = fib.paths[path_idx].proto;
                table::find_or_create(fib, proto, table_id);
                let path = &mut fib.paths[path_idx];
                path.dpo = Dpo::Lookup { proto, table_id };
                path.oper_flags.insert(PathOperFlags::RESOLVED);
            }
            PathKind::Receive { ifindex, addr } => {
                let path = &mut fib.paths[path_idx];
                path.dpo = Dpo::Receive { ifindex, addr };
                path.oper_flags.insert(PathOperFlags::RESOLVED);
            }
            PathKind::Exclusive { dpo } => {
                let path = &mut fib.paths[path_idx];
                path.dpo = dpo;
                path.oper_flags.insert(PathOperFlags::RESOLVED);
            }
        }
    }

    let resolved = fib.paths[path_idx].is_resolved();
    Debug::PathResolve(path_idx, resolved).log();
    resolved
}

// Releases all upstream references and resets the DPO. Oper flags keep
// their values, except RESOLVED which is cleared.
pub(crate) fn unresolve(fib: &mut Fib, path_idx: PathIndex) {
    match fib.paths[path_idx].kind.path_type() {
        PathType::AttachedNextHop | PathType::Attached => {
            let sibling = fib.paths[path_idx].sibling.take();
            let adj_idx = fib.paths[path_idx].dpo.as_adjacency().copied();
            if let (Some(adj_idx), Some(sibling)) = (adj_idx, sibling) {
                adjacency::child_remove(fib, adj_idx, sibling);
                adjacency::unlock(fib, adj_idx);
            }
        }
        PathType::Recursive => {
            let sibling = fib.paths[path_idx].sibling.take();
            let via_fib = fib.paths[path_idx].via_fib.take();
            if let Some(via_fib) = via_fib {
                if let Some(sibling) = sibling {
                    entry::child_remove(fib, via_fib, sibling);
                }
                table::entry_special_remove(
                    fib,
                    via_fib,
                    FibSource::RecursiveResolution,
                );
            }
        }
        _ => {
            fib.paths[path_idx].sibling = None;
        }
    }

    let path = &mut fib.paths[path_idx];
    path.dpo = Dpo::None;
    path.oper_flags.remove(PathOperFlags::RESOLVED);
    Debug::PathUnresolve(path_idx).log();
}

// Walks forward looking for a recursion cycle that links back into
// `entries`. A loop is installed, not rejected: the path keeps its
// control-plane edges and contributes drop until the cycle breaks.
pub fn recursive_loop_detect(
    fib: &mut Fib,
    path_idx: PathIndex,
    entries: &mut Vec<EntryIndex>,
) -> bool {
    // Non-recursive paths are graph leaves.
    if fib.paths[path_idx].kind.path_type() != PathType::Recursive {
        return fib.paths[path_idx].is_looped();
    }
    let Some(via_fib) = fib.paths[path_idx].via_fib else {
        return fib.paths[path_idx].is_looped();
    };

    if entries.contains(&via_fib) {
        // This path closes the cycle.
        let path = &mut fib.paths[path_idx];
        path.oper_flags.insert(PathOperFlags::RECURSIVE_LOOP);
        path.dpo = Dpo::Drop(path.proto);
        Debug::PathRecursiveLoop(path_idx, true).log();
        return true;
    }

    let looped = entry::recursive_loop_detect(fib, via_fib, entries);
    let was_looped = fib.paths[path_idx].is_looped();
    if looped && !was_looped {
        let path = &mut fib.paths[path_idx];
        path.oper_flags.insert(PathOperFlags::RECURSIVE_LOOP);
        path.dpo = Dpo::Drop(path.proto);
        Debug::PathRecursiveLoop(path_idx, true).log();
    } else if !looped && was_looped {
        fib.paths[path_idx]
            .oper_flags
            .remove(PathOperFlags::RECURSIVE_LOOP);
        Debug::PathRecursiveLoop(path_idx, false).log();
        // Restore the forwarding the loop had overridden.
        let chain = fib.paths[path_idx].proto.default_chain();
        let dpo = recursive_adj_update(fib, path_idx, chain);
        fib.paths[path_idx].dpo = dpo;
    }

    looped
}

// Reacts to a change in this path's upstream. Early returns mean "not a
// change worth forwarding"; otherwise the walk continues into the owning
// path-list.
pub fn back_walk(fib: &mut Fib, path_idx: PathIndex, ctx: BackWalkCtx) {
    Debug::PathBackWalk(path_idx, ctx.reasons).log();

    match fib.paths[path_idx].kind.path_type() {
        PathType::Recursive => {
            if ctx.reasons.contains(BackWalkReason::EVALUATE) {
                // Restack on the via-entry's fresh forwarding. Safe for
                // in-flight packets: they see the old or the new DPO.
                let chain = fib.paths[path_idx].proto.default_chain();
                let dpo = recursive_adj_update(fib, path_idx, chain);
                fib.paths[path_idx].dpo = dpo;
            } else if ctx.reasons.intersects(
                BackWalkReason::ADJ_UPDATE | BackWalkReason::ADJ_DOWN,
            ) {
                // The load-balance below handles adjacency restacking.
                return;
            }
        }
        PathType::AttachedNextHop => {
            if ctx.reasons.contains(BackWalkReason::ADJ_UPDATE) {
                let PathKind::AttachedNextHop { nexthop, ifindex } =
                    fib.paths[path_idx].kind
                else {
                    unreachable!();
                };
                let up = interface::is_admin_up(fib, ifindex);
                fib.paths[path_idx]
                    .oper_flags
                    .set(PathOperFlags::RESOLVED, up);

                // Refresh the adjacency binding; the fetch took a lock of
                // its own, so release the surplus one.
                let link = fib.paths[path_idx].proto.link_type();
                let addr = attached_next_hop_addr(fib, nexthop, ifindex);
                let new_adj =
                    adjacency::nbr_add_or_lock(fib, link, addr, ifindex);
                let old_adj =
                    fib.paths[path_idx].dpo.as_adjacency().copied();
                fib.paths[path_idx].dpo = Dpo::Adjacency(new_adj);
                if let Some(old_adj) = old_adj {
                    adjacency::unlock(fib, old_adj);
                }

                if !up {
                    return;
                }
            }
            if ctx.reasons.contains(BackWalkReason::ADJ_DOWN) {
                let path = &mut fib.paths[path_idx];
                if !path.oper_flags.contains(PathOperFlags::RESOLVED) {
                    return;
                }
                path.oper_flags.remove(PathOperFlags::RESOLVED);
            }
            if !interface_back_walk(fib, path_idx, ctx) {
                return;
            }
        }
        PathType::Attached => {
            if !interface_back_walk(fib, path_idx, ctx) {
                return;
            }
        }
        _ => unreachable!("back-walk into a leaf path kind"),
    }

    // The path-list is the aggregation point for whatever changed here.
    let plist_idx = fib.paths[path_idx].path_list;
    path_list::back_walk(fib, plist_idx, ctx.descend());
}

// Shared INTERFACE_* handling for the attached kinds. Returns false when
// the walk should not propagate.
fn interface_back_walk(
    fib: &mut Fib,
    path_idx: PathIndex,
    ctx: BackWalkCtx,
) -> bool {
    if ctx.reasons.contains(BackWalkReason::INTERFACE_UP) {
        let path = &mut fib.paths[path_idx];
        if path.oper_flags.contains(PathOperFlags::RESOLVED) {
            return false;
        }
        path.oper_flags.insert(PathOperFlags::RESOLVED);
    }
    if ctx.reasons.contains(BackWalkReason::INTERFACE_DOWN) {
        let path = &mut fib.paths[path_idx];
        if !path.oper_flags.contains(PathOperFlags::RESOLVED) {
            return false;
        }
        path.oper_flags.remove(PathOperFlags::RESOLVED);
    }
    if ctx.reasons.contains(BackWalkReason::INTERFACE_DELETE) {
        // Permanent drop until the route is removed and re-added.
        unresolve(fib, path_idx);
        let path = &mut fib.paths[path_idx];
        path.oper_flags.insert(PathOperFlags::DROP);
        path.dpo = Dpo::Drop(path.proto);
    }
    true
}

// Restacks a recursive path on whatever its via-entry currently
// contributes for the requested chain, enforcing the RESOLVE_VIA_*
// constraints.
pub(crate) fn recursive_adj_update(
    fib: &mut Fib,
    path_idx: PathIndex,
    chain: ChainType,
) -> Dpo {
    let (via_fib, proto, cfg_flags) = {
        let path = &fib.paths[path_idx];
        (
            path.via_fib.expect("recursive path has no via-entry"),
            path.proto,
            path.cfg_flags,
        )
    };

    let mut via_dpo = entry::contribute_forwarding(fib, via_fib, chain);

    // Be optimistic.
    fib.paths[path_idx].oper_flags.insert(PathOperFlags::RESOLVED);

    if fib.paths[path_idx].is_looped() {
        // The cycle is broken in the data plane only; the control-plane
        // edges stay so recovery is observable.
        via_dpo = Dpo::Drop(proto);
        fib.paths[path_idx].oper_flags.remove(PathOperFlags::RESOLVED);
    } else if cfg_flags.contains(PathCfgFlags::RESOLVE_VIA_HOST) {
        // The via-entry must be a host route owned by something better
        // than the reverse-resolution source.
        let ok = {
            let entry = &fib.entries[via_fib];
            entry.prefix.is_host()
                && entry
                    .best_source()
                    .is_some_and(|s| s < FibSource::RecursiveResolution)
        };
        if !ok {
            via_dpo = Dpo::Drop(proto);
            fib.paths[path_idx].oper_flags.remove(PathOperFlags::RESOLVED);
            fib.lb_maps.path_state_change(path_idx);
        }
    } else if cfg_flags.contains(PathCfgFlags::RESOLVE_VIA_ATTACHED) {
        let ok = fib.entries[via_fib].flags().contains(EntryFlags::ATTACHED);
        if !ok {
            via_dpo = Dpo::Drop(proto);
            fib.paths[path_idx].oper_flags.remove(PathOperFlags::RESOLVED);
            fib.lb_maps.path_state_change(path_idx);
        }
    }

    Debug::PathRestack(path_idx, &via_dpo).log();
    via_dpo
}

// Contributes a DPO for the requested forwarding chain.
pub fn contribute_forwarding(
    fib: &mut Fib,
    path_idx: PathIndex,
    chain: ChainType,
) -> Dpo {
    let (path_type, proto) = {
        let path = &fib.paths[path_idx];
        (path.kind.path_type(), path.proto)
    };

    if fib.paths[path_idx].is_permanent_drop() {
        return Dpo::Drop(proto);
    }
    if chain == proto.default_chain() {
        return fib.paths[path_idx].dpo.clone();
    }

    match path_type {
        PathType::AttachedNextHop => {
            // The caller owns the lock taken on the contributed adjacency.
            let adj_idx =
                attached_next_hop_adj(fib, path_idx, chain.link_type());
            Dpo::Adjacency(adj_idx)
        }
        PathType::Recursive => match chain {
            ChainType::Ethernet => {
                unreachable!("recursive path cannot contribute ethernet")
            }
            _ => recursive_adj_update(fib, path_idx, chain),
        },
        PathType::Deag => match chain {
            ChainType::MplsNonEos => Dpo::Lookup {
                proto: FibProtocol::Mpls,
                table_id: DEFAULT_TABLE_ID,
            },
            ChainType::Ethernet => {
                unreachable!("deag path cannot contribute ethernet")
            }
            _ => fib.paths[path_idx].dpo.clone(),
        },
        PathType::Exclusive => fib.paths[path_idx].dpo.clone(),
        PathType::Attached | PathType::Receive | PathType::Special => {
            unreachable!("invalid chain type for path kind")
        }
    }
}

// Appends this path's contribution to a load-balance hash key, if it is
// resolved-visible.
pub fn append_nh_for_multipath_hash(
    fib: &mut Fib,
    path_idx: PathIndex,
    chain: ChainType,
    key: &mut Vec<LoadBalancePath>,
) {
    let (resolved, weight) = {
        let path = &fib.paths[path_idx];
        (path.is_resolved(), path.weight)
    };
    if !resolved {
        return;
    }

    let dpo = contribute_forwarding(fib, path_idx, chain);
    key.push(LoadBalancePath::new(path_idx, weight, dpo));
}

// Appends the interfaces this path legitimately receives from, if it is
// resolved-visible.
pub fn contribute_urpf(
    fib: &mut Fib,
    path_idx: PathIndex,
    urpf: &mut UrpfList,
) {
    let (resolved, via_fib) = {
        let path = &fib.paths[path_idx];
        (path.is_resolved(), path.via_fib)
    };
    if !resolved {
        return;
    }

    match fib.paths[path_idx].kind.path_type() {
        PathType::AttachedNextHop | PathType::Attached => {
            if let Some(ifindex) = resolving_interface(fib, path_idx) {
                urpf.append(ifindex);
            }
        }
        PathType::Recursive => {
            if let Some(via_fib) = via_fib {
                entry::contribute_urpf(fib, via_fib, urpf);
            }
        }
        PathType::Exclusive | PathType::Special => {
            if let Some(adj_idx) =
                fib.paths[path_idx].dpo.as_adjacency().copied()
                && let Some(adj) = fib.adjacencies.get(adj_idx)
            {
                urpf.append(adj.ifindex);
            }
        }
        PathType::Deag | PathType::Receive => (),
    }
}

// Returns the interface this path ultimately resolves through.
pub fn resolving_interface(fib: &Fib, path_idx: PathIndex) -> Option<u32> {
    let path = &fib.paths[path_idx];
    match path.kind {
        PathKind::AttachedNextHop { ifindex, .. }
        | PathKind::Attached { ifindex }
        | PathKind::Receive { ifindex, .. } => Some(ifindex),
        PathKind::Recursive { .. } => path
            .via_fib
            .and_then(|via_fib| entry::resolving_interface(fib, via_fib)),
        _ => None,
    }
}

// Encodes the path back into a route-path descriptor. Only exclusive
// paths populate the descriptor's DPO.
pub fn encode(fib: &Fib, path_idx: PathIndex) -> RoutePath {
    let path = &fib.paths[path_idx];
    let af = path.proto.address_family().unwrap_or(AddressFamily::Ipv4);
    let mut rpath = RoutePath {
        proto: path.proto,
        nexthop: IpAddr::unspecified(af),
        ifindex: None,
        table_id: None,
        label: None,
        weight: path.weight,
        flags: RoutePathFlags::from(path.cfg_flags),
        dpo: None,
    };

    match &path.kind {
        PathKind::AttachedNextHop { nexthop, ifindex } => {
            rpath.nexthop = *nexthop;
            rpath.ifindex = Some(*ifindex);
        }
        PathKind::Attached { ifindex } => {
            rpath.ifindex = Some(*ifindex);
        }
        PathKind::Recursive { via, table_id } => {
            match via {
                RecursiveNexthop::Address(addr) => rpath.nexthop = *addr,
                RecursiveNexthop::Label(label) => rpath.label = Some(*label),
            }
            rpath.table_id = Some(*table_id);
        }
        PathKind::Deag { table_id } => {
            rpath.table_id = Some(*table_id);
        }
        PathKind::Special => (),
        PathKind::Exclusive { dpo } => {
            rpath.dpo = Some(dpo.clone());
        }
        PathKind::Receive { ifindex, addr } => {
            rpath.nexthop = *addr;
            rpath.ifindex = Some(*ifindex);
        }
    }

    rpath
}

// Formats all paths, or one path with its upstream binding.
pub fn show(fib: &Fib, index: Option<PathIndex>) -> Result<String, Error> {
    let mut buf = String::new();
    let _ = writeln!(buf, "FIB paths: {} allocated", fib.paths.len());

    match index {
        Some(path_idx) => {
            if fib.paths.get(path_idx).is_none() {
                return Err(Error::PathNotFound(path_idx));
            }
            buf.push_str(&format(fib, path_idx));
        }
        None => {
            for (path_idx, _) in fib.paths.iter() {
                buf.push_str(&format(fib, path_idx));
            }
        }
    }

    Ok(buf)
}

// Formats a single path.
pub fn format(fib: &Fib, path_idx: PathIndex) -> String {
    let path = &fib.paths[path_idx];
    let mut buf = String::new();

    let _ = writeln!(
        buf,
        "path:[{}] pl:[{}] {} weight:{} cfg:{:?} oper:{:?}",
        path_idx.into_raw_parts().0,
        path.path_list.into_raw_parts().0,
        path.proto,
        path.weight,
        path.cfg_flags,
        path.oper_flags,
    );
    match &path.kind {
        PathKind::AttachedNextHop { nexthop, ifindex } => {
            let _ =
                writeln!(buf, "  attached-nexthop: {} dev {}", nexthop, ifindex);
        }
        PathKind::Attached { ifindex } => {
            let _ = writeln!(buf, "  attached: dev {}", ifindex);
        }
        PathKind::Recursive { via, table_id } => {
            let _ = write!(buf, "  recursive: {} in table {}", via, table_id);
            if let Some(entry) =
                path.via_fib.and_then(|via_fib| fib.entries.get(via_fib))
            {
                let _ = write!(buf, " via-entry {}", entry.prefix);
            }
            let _ = writeln!(buf);
        }
        PathKind::Special => {
            let _ = writeln!(buf, "  special:");
        }
        PathKind::Exclusive { dpo } => {
            let _ = writeln!(buf, "  exclusive: {}", dpo);
        }
        PathKind::Deag { table_id } => {
            let _ = writeln!(buf, "  deag: table {}", table_id);
        }
        PathKind::Receive { ifindex, addr } => {
            let _ = writeln!(buf, "  receive: {} dev {}", addr, ifindex);
        }
    }
    let _ = writeln!(buf, "  forwarding: {}", path.dpo);

    buf
}

// Derives the path kind from a route-path descriptor. First match wins.
fn kind_from_route_path(
    proto: FibProtocol,
    cfg_flags: PathCfgFlags,
    rpath: &RoutePath,
) -> PathKind {
    if let Some(ifindex) = rpath.ifindex {
        if cfg_flags.contains(PathCfgFlags::LOCAL) {
            PathKind::Receive {
                ifindex,
                addr: rpath.nexthop,
            }
        } else if rpath.nexthop.is_unspecified() {
            PathKind::Attached { ifindex }
        } else {
            PathKind::AttachedNextHop {
                nexthop: rpath.nexthop,
                ifindex,
            }
        }
    } else if proto == FibProtocol::Mpls
        && let Some(label) = rpath.label
    {
        PathKind::Recursive {
            via: RecursiveNexthop::Label(label),
            table_id: rpath.table_id.unwrap_or(DEFAULT_TABLE_ID),
        }
    } else if rpath.nexthop.is_unspecified() {
        match rpath.table_id {
            None => PathKind::Special,
            Some(table_id) => PathKind::Deag { table_id },
        }
    } else {
        PathKind::Recursive {
            via: RecursiveNexthop::Address(rpath.nexthop),
            table_id: rpath.table_id.unwrap_or(DEFAULT_TABLE_ID),
        }
    }
}

fn resolve_attached_next_hop(
    fib: &mut Fib,
    path_idx: PathIndex,
    nexthop: IpAddr,
    ifindex: u32,
) {
    let up = interface::is_admin_up(fib, ifindex);
    let link = fib.paths[path_idx].proto.link_type();
    let addr = attached_next_hop_addr(fib, nexthop, ifindex);
    let adj_idx = adjacency::nbr_add_or_lock(fib, link, addr, ifindex);
    let sibling =
        adjacency::child_add(fib, adj_idx, NodeRef::path(path_idx));

    let path = &mut fib.paths[path_idx];
    path.dpo = Dpo::Adjacency(adj_idx);
    path.sibling = Some(sibling);
    path.oper_flags.set(PathOperFlags::RESOLVED, up);
}

fn resolve_attached(fib: &mut Fib, path_idx: PathIndex, ifindex: u32) {
    let up = interface::is_admin_up(fib, ifindex);
    let link = fib.paths[path_idx].proto.link_type();
    let adj_idx = if interface::is_p2p(fib, ifindex) {
        // The per-link auto-adjacency.
        let af = fib.paths[path_idx]
            .proto
            .address_family()
            .unwrap_or(AddressFamily::Ipv4);
        adjacency::nbr_add_or_lock(
            fib,
            link,
            IpAddr::unspecified(af),
            ifindex,
        )
    } else {
        adjacency::glean_add_or_lock(fib, link, ifindex)
    };
    let sibling =
        adjacency::child_add(fib, adj_idx, NodeRef::path(path_idx));

    let path = &mut fib.paths[path_idx];
    path.dpo = Dpo::Adjacency(adj_idx);
    path.sibling = Some(sibling);
    path.oper_flags.set(PathOperFlags::RESOLVED, up);
}

fn resolve_recursive(
    fib: &mut Fib,
    path_idx: PathIndex,
    via: RecursiveNexthop,
    table_id: u32,
) {
    assert!(
        fib.paths[path_idx].via_fib.is_none(),
        "recursive path is already resolved"
    );

    let proto = fib.paths[path_idx].proto;
    let prefix = match via {
        RecursiveNexthop::Address(addr) => FibPrefix::Ip(addr.to_host_prefix()),
        RecursiveNexthop::Label(label) => FibPrefix::Mpls(label),
    };
    let table_idx = table::find_or_create(fib, proto, table_id);
    let via_fib = table::entry_special_add(
        fib,
        table_idx,
        prefix,
        FibSource::RecursiveResolution,
    );
    let sibling = entry::child_add(fib, via_fib, NodeRef::path(path_idx));

    {
        let path = &mut fib.paths[path_idx];
        path.via_fib = Some(via_fib);
        path.sibling = Some(sibling);
    }

    let dpo = recursive_adj_update(fib, path_idx, proto.default_chain());
    fib.paths[path_idx].dpo = dpo;
}

// Returns the address an attached next-hop adjacency is keyed on: the
// zero address on point-to-point links, the neighbor otherwise.
fn attached_next_hop_addr(
    fib: &Fib,
    nexthop: IpAddr,
    ifindex: u32,
) -> IpAddr {
    if interface::is_p2p(fib, ifindex) {
        IpAddr::unspecified(nexthop.address_family())
    } else {
        nexthop
    }
}

// Locks the adjacency an attached next-hop path uses for the given link
// type.
fn attached_next_hop_adj(
    fib: &mut Fib,
    path_idx: PathIndex,
    link: LinkType,
) -> AdjacencyIndex {
    let PathKind::AttachedNextHop { nexthop, ifindex } =
        fib.paths[path_idx].kind
    else {
        unreachable!("not an attached next-hop path");
    };
    let addr = attached_next_hop_addr(fib, nexthop, ifindex);
    adjacency::nbr_add_or_lock(fib, link, addr, ifindex)
}

// ===== unit tests =====
