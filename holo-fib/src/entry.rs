//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::Fib;
use crate::collections::{EntryIndex, PathListIndex, TableIndex};
use crate::debug::Debug;
use crate::dpo::{ChainType, Dpo};
use crate::node::{ChildList, NodeRef, SiblingIndex};
use crate::path_list;
use crate::table::{self, FibPrefix};
use crate::urpf::UrpfList;
use crate::walk::{self, BackWalkCtx, BackWalkReason};

// Sources an entry may be owned by, in decreasing order of priority.
//
// The reverse-resolution source ranks last: it never beats a real route
// and only keeps the entry alive for the recursive paths through it.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum FibSource {
    Interface = 1,
    Static = 2,
    Rib = 3,
    Adjacency = 4,
    RecursiveResolution = 5,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct EntryFlags: u8 {
        const CONNECTED = 0x01;
        const ATTACHED = 0x02;
        const DROP = 0x04;
    }
}

#[derive(Debug)]
pub struct FibEntrySource {
    pub path_list: Option<PathListIndex>,
    pub pl_sibling: Option<SiblingIndex>,
    pub flags: EntryFlags,
    pub refs: u32,
}

#[derive(Debug)]
pub struct FibEntry {
    pub prefix: FibPrefix,
    pub table: TableIndex,
    // Contributing sources ordered by rank.
    pub sources: BTreeMap<FibSource, FibEntrySource>,
    // Dependent paths and covered reverse-resolution entries.
    pub children: ChildList,
    // Cover this entry inherits forwarding from, when it has no real
    // source of its own.
    pub cover: Option<(EntryIndex, SiblingIndex)>,
    // Current forwarding contribution.
    pub dpo: Dpo,
}

// ===== impl FibEntry =====

impl FibEntry {
    // Returns the highest-priority source of this entry.
    pub fn best_source(&self) -> Option<FibSource> {
        self.sources.keys().next().copied()
    }

    // Returns the flags of the best source.
    pub fn flags(&self) -> EntryFlags {
        self.best_source()
            .and_then(|source| self.sources.get(&source))
            .map(|src| src.flags)
            .unwrap_or_default()
    }

    pub(crate) fn best_path_list(&self) -> Option<PathListIndex> {
        self.best_source()
            .and_then(|source| self.sources.get(&source))
            .and_then(|src| src.path_list)
    }
}

// ===== global functions =====

pub(crate) fn child_add(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    child: NodeRef,
) -> SiblingIndex {
    fib.entries[entry_idx].children.add(child)
}

pub(crate) fn child_remove(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    sibling: SiblingIndex,
) {
    fib.entries[entry_idx].children.remove(sibling);
}

// Contributes this entry's forwarding for the requested chain type.
pub(crate) fn contribute_forwarding(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    chain: ChainType,
) -> Dpo {
    let native = fib.entries[entry_idx].prefix.native_chain();
    if chain == native {
        return fib.entries[entry_idx].dpo.clone();
    }
    match fib.entries[entry_idx].best_path_list() {
        Some(plist_idx) => {
            path_list::contribute_forwarding(fib, plist_idx, chain)
        }
        None => fib.entries[entry_idx].dpo.clone(),
    }
}

// Recomputes the entry's forwarding from its best source, or from its
// cover when only the reverse-resolution source remains.
pub(crate) fn restack(fib: &mut Fib, entry_idx: EntryIndex) {
    let (prefix, table_idx, best_plist) = {
        let entry = &fib.entries[entry_idx];
        (entry.prefix, entry.table, entry.best_path_list())
    };

    let dpo = match best_plist {
        Some(plist_idx) => {
            cover_unlink(fib, entry_idx);
            path_list::contribute_forwarding(
                fib,
                plist_idx,
                prefix.native_chain(),
            )
        }
        None => {
            // Re-evaluate which cover this entry inherits from.
            let new_cover = table::cover_lookup(fib, table_idx, &prefix);
            let old_cover =
                fib.entries[entry_idx].cover.map(|(cover_idx, _)| cover_idx);
            if new_cover != old_cover {
                cover_unlink(fib, entry_idx);
                if let Some(cover_idx) = new_cover {
                    let sibling = child_add(
                        fib,
                        cover_idx,
                        NodeRef::entry(entry_idx),
                    );
                    fib.entries[entry_idx].cover = Some((cover_idx, sibling));
                }
            }
            match new_cover {
                Some(cover_idx) => fib.entries[cover_idx].dpo.clone(),
                None => Dpo::Drop(prefix.proto()),
            }
        }
    };

    let old = std::mem::replace(&mut fib.entries[entry_idx].dpo, dpo);
    if let Dpo::LoadBalance(lb_idx) = &old
        && fib.entries[entry_idx].dpo != old
    {
        fib.load_balances.remove(*lb_idx);
    }
    Debug::EntryRestack(&prefix, &fib.entries[entry_idx].dpo).log();
}

// Reacts to an upstream change: re-checks recursion cycles, restacks the
// forwarding and pushes the walk down to the dependents.
//
// The dependents always receive EVALUATE on top of the original reasons:
// the restack above them published a new forwarding value they must
// re-clone.
pub(crate) fn back_walk(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    ctx: BackWalkCtx,
) {
    if ctx.reasons.contains(BackWalkReason::EVALUATE)
        && let Some(plist_idx) = fib.entries[entry_idx].best_path_list()
    {
        let mut entries = vec![entry_idx];
        path_list::recursive_loop_detect(fib, plist_idx, &mut entries);
    }

    restack(fib, entry_idx);

    let mut ctx = ctx.descend();
    ctx.reasons |= BackWalkReason::EVALUATE;
    let children = fib.entries[entry_idx].children.collect();
    walk::backwalk_children(fib, children, ctx);
}

// Walks forward through this entry looking for a recursion cycle.
pub(crate) fn recursive_loop_detect(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    entries: &mut Vec<EntryIndex>,
) -> bool {
    entries.push(entry_idx);
    let looped = match fib.entries[entry_idx].best_path_list() {
        Some(plist_idx) => {
            path_list::recursive_loop_detect(fib, plist_idx, entries)
        }
        None => false,
    };
    entries.pop();

    looped
}

// Appends the interfaces this entry's forwarding legitimately uses.
pub(crate) fn contribute_urpf(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    urpf: &mut UrpfList,
) {
    if let Some(plist_idx) = fib.entries[entry_idx].best_path_list() {
        path_list::contribute_urpf(fib, plist_idx, urpf);
    }
}

// Returns the interface this entry ultimately resolves through.
pub(crate) fn resolving_interface(
    fib: &Fib,
    entry_idx: EntryIndex,
) -> Option<u32> {
    match fib.entries[entry_idx].best_path_list() {
        Some(plist_idx) => fib.path_lists[plist_idx].paths.iter().find_map(
            |path_idx| crate::path::resolving_interface(fib, *path_idx),
        ),
        // Reverse-resolution entries resolve through their cover.
        None => {
            let (cover_idx, _) = fib.entries[entry_idx].cover?;
            resolving_interface(fib, cover_idx)
        }
    }
}

// Drops the cover linkage, if any.
pub(crate) fn cover_unlink(fib: &mut Fib, entry_idx: EntryIndex) {
    if let Some((cover_idx, sibling)) = fib.entries[entry_idx].cover.take()
        && fib.entries.get(cover_idx).is_some()
    {
        fib.entries[cover_idx].children.remove(sibling);
    }
}
