//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use crate::Fib;
use crate::collections::{EntryIndex, PathIndex, PathListIndex};
use crate::dpo::{ChainType, Dpo, FibProtocol};
use crate::loadbalance::LoadBalance;
use crate::node::{ChildList, NodeRef, SiblingIndex};
use crate::path::{self, PathCfgFlags, RoutePath};
use crate::urpf::UrpfList;
use crate::walk::{self, BackWalkCtx};

// Aggregation point for the paths of one route source.
//
// Selection policy among members lives with the consumers; the list only
// fans operations out and combines the resolved contributions.
#[derive(Debug)]
pub struct PathList {
    pub proto: FibProtocol,
    pub paths: Vec<PathIndex>,
    // Dependent entries.
    pub children: ChildList,
}

// ===== global functions =====

// Creates a path-list and one path per descriptor, all sharing the
// caller's configured flags.
pub fn create(
    fib: &mut Fib,
    proto: FibProtocol,
    cfg_flags: PathCfgFlags,
    rpaths: &[RoutePath],
) -> PathListIndex {
    let plist_idx = fib.path_lists.insert(PathList {
        proto,
        paths: Vec::new(),
        children: Default::default(),
    });

    for rpath in rpaths {
        let path_idx =
            path::create(fib, plist_idx, rpath.proto, cfg_flags, rpath);
        fib.path_lists[plist_idx].paths.push(path_idx);
    }

    plist_idx
}

// Destroys the path-list and its member paths.
pub(crate) fn destroy(fib: &mut Fib, plist_idx: PathListIndex) {
    let paths = fib.path_lists[plist_idx].paths.clone();
    for path_idx in paths {
        path::destroy(fib, path_idx);
    }
    fib.path_lists.remove(plist_idx);
}

pub(crate) fn child_add(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    child: NodeRef,
) -> SiblingIndex {
    fib.path_lists[plist_idx].children.add(child)
}

pub(crate) fn child_remove(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    sibling: SiblingIndex,
) {
    fib.path_lists[plist_idx].children.remove(sibling);
}

// Forwards a back-walk to the dependent entries.
pub(crate) fn back_walk(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    ctx: BackWalkCtx,
) {
    let children = fib.path_lists[plist_idx].children.collect();
    walk::backwalk_children(fib, children, ctx.descend());
}

// Combines the resolved members into a single forwarding contribution.
pub(crate) fn contribute_forwarding(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    chain: ChainType,
) -> Dpo {
    let (proto, paths) = {
        let plist = &fib.path_lists[plist_idx];
        (plist.proto, plist.paths.clone())
    };

    let mut buckets = Vec::new();
    for path_idx in paths {
        path::append_nh_for_multipath_hash(fib, path_idx, chain, &mut buckets);
    }

    match buckets.len() {
        0 => Dpo::Drop(proto),
        1 => buckets.swap_remove(0).dpo,
        _ => Dpo::LoadBalance(
            fib.load_balances.insert(LoadBalance { proto, buckets }),
        ),
    }
}

// Checks every member for recursion cycles. No short-circuit: each looped
// member must be marked.
pub(crate) fn recursive_loop_detect(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    entries: &mut Vec<EntryIndex>,
) -> bool {
    let paths = fib.path_lists[plist_idx].paths.clone();
    let mut looped = false;
    for path_idx in paths {
        looped |= path::recursive_loop_detect(fib, path_idx, entries);
    }

    looped
}

// Collects the uRPF interfaces of all members.
pub(crate) fn contribute_urpf(
    fib: &mut Fib,
    plist_idx: PathListIndex,
    urpf: &mut UrpfList,
) {
    let paths = fib.path_lists[plist_idx].paths.clone();
    for path_idx in paths {
        path::contribute_urpf(fib, path_idx, urpf);
    }
}

// Encodes the member paths back into route-path descriptors.
pub fn encode(fib: &Fib, plist_idx: PathListIndex) -> Vec<RoutePath> {
    fib.path_lists[plist_idx]
        .paths
        .iter()
        .map(|path_idx| path::encode(fib, *path_idx))
        .collect()
}
