//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;

use holo_utils::ip::IpNetworkExt;
use holo_utils::mpls::Label;
use ipnetwork::IpNetwork;
use prefix_trie::joint::map::JointPrefixMap;
use serde::{Deserialize, Serialize};

use crate::Fib;
use crate::collections::{EntryIndex, TableIndex};
use crate::debug::Debug;
use crate::dpo::{ChainType, Dpo, FibProtocol};
use crate::entry::{self, EntryFlags, FibEntry, FibEntrySource, FibSource};
use crate::error::Error;
use crate::node::{NodeKind, NodeRef};
use crate::path::{self, PathCfgFlags, RoutePath};
use crate::path_list;
use crate::walk::{self, BackWalkCtx, BackWalkReason};

pub const DEFAULT_TABLE_ID: u32 = 0;

// Destination an entry matches on: an IP prefix or an MPLS local label.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum FibPrefix {
    Ip(IpNetwork),
    Mpls(Label),
}

#[derive(Debug)]
pub struct Table {
    pub id: u32,
    pub proto: FibProtocol,
    // IP entries keyed by prefix.
    pub ip: JointPrefixMap<IpNetwork, EntryIndex>,
    // MPLS entries keyed by local label.
    pub mpls: BTreeMap<Label, EntryIndex>,
}

// ===== impl FibPrefix =====

impl FibPrefix {
    // Returns the protocol of the entries matching this destination.
    pub fn proto(&self) -> FibProtocol {
        match self {
            FibPrefix::Ip(prefix) => prefix.address_family().into(),
            FibPrefix::Mpls(_) => FibProtocol::Mpls,
        }
    }

    // Returns true if this destination matches a single host.
    pub fn is_host(&self) -> bool {
        match self {
            FibPrefix::Ip(prefix) => prefix.is_host_prefix(),
            FibPrefix::Mpls(_) => true,
        }
    }

    // Returns the forwarding chain entries at this destination natively
    // contribute to.
    pub fn native_chain(&self) -> ChainType {
        match self.proto() {
            FibProtocol::Ipv4 => ChainType::Ipv4,
            FibProtocol::Ipv6 => ChainType::Ipv6,
            FibProtocol::Mpls => ChainType::MplsEos,
        }
    }
}

impl std::fmt::Display for FibPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FibPrefix::Ip(prefix) => write!(f, "{}", prefix),
            FibPrefix::Mpls(label) => write!(f, "mpls:{}", label),
        }
    }
}

// ===== global functions =====

// Finds or creates the table with the given protocol and ID.
pub fn find_or_create(
    fib: &mut Fib,
    proto: FibProtocol,
    id: u32,
) -> TableIndex {
    if let Some((table_idx, _)) = fib.tables.get_by_id(proto, id) {
        return table_idx;
    }

    fib.tables.insert(Table {
        id,
        proto,
        ip: Default::default(),
        mpls: Default::default(),
    })
}

// Returns the table with the given protocol and ID.
pub fn get(fib: &Fib, proto: FibProtocol, id: u32) -> Result<TableIndex, Error> {
    fib.tables
        .get_by_id(proto, id)
        .map(|(table_idx, _)| table_idx)
        .ok_or(Error::TableNotFound(proto, id))
}

// Exact-match lookup.
pub(crate) fn entry_lookup(
    fib: &Fib,
    table_idx: TableIndex,
    prefix: &FibPrefix,
) -> Option<EntryIndex> {
    let table = &fib.tables[table_idx];
    match prefix {
        FibPrefix::Ip(prefix) => table.ip.get(prefix).copied(),
        FibPrefix::Mpls(label) => table.mpls.get(label).copied(),
    }
}

// Longest-prefix-match lookup strictly covering the given destination.
pub(crate) fn cover_lookup(
    fib: &Fib,
    table_idx: TableIndex,
    prefix: &FibPrefix,
) -> Option<EntryIndex> {
    // MPLS destinations match exactly and have no cover.
    let FibPrefix::Ip(prefix) = prefix else {
        return None;
    };
    if prefix.prefix() == 0 {
        return None;
    }

    let table = &fib.tables[table_idx];
    let shorter = IpNetwork::new(prefix.network(), prefix.prefix() - 1)
        .ok()?
        .apply_mask();
    let (_, entry_idx) = table.ip.get_lpm(&shorter)?;
    Some(*entry_idx)
}

// Adds a reverse-resolution source to the entry matching the given
// destination, creating the entry first if need be. Each add is paired
// with an `entry_special_remove`.
pub(crate) fn entry_special_add(
    fib: &mut Fib,
    table_idx: TableIndex,
    prefix: FibPrefix,
    source: FibSource,
) -> EntryIndex {
    let (entry_idx, created) = match entry_lookup(fib, table_idx, &prefix) {
        Some(entry_idx) => (entry_idx, false),
        None => (entry_insert(fib, table_idx, prefix), true),
    };

    let entry = &mut fib.entries[entry_idx];
    let src = entry.sources.entry(source).or_insert_with(|| FibEntrySource {
        path_list: None,
        pl_sibling: None,
        flags: EntryFlags::empty(),
        refs: 0,
    });
    src.refs += 1;

    if created {
        entry::restack(fib, entry_idx);
    }

    entry_idx
}

// Drops one reference on the given source, removing it when the last
// reference goes, and reclaiming the entry when nothing uses it anymore.
pub(crate) fn entry_special_remove(
    fib: &mut Fib,
    entry_idx: EntryIndex,
    source: FibSource,
) {
    let entry = &mut fib.entries[entry_idx];
    if let Some(src) = entry.sources.get_mut(&source) {
        src.refs = src.refs.saturating_sub(1);
        if src.refs == 0 {
            entry.sources.remove(&source);
        }
    }

    if fib.entries[entry_idx].sources.is_empty() {
        entry_delete(fib, entry_idx);
    }
}

// Installs (or replaces) the given source's route at a destination.
pub fn route_path_add(
    fib: &mut Fib,
    proto: FibProtocol,
    table_id: u32,
    prefix: FibPrefix,
    source: FibSource,
    flags: EntryFlags,
    cfg_flags: PathCfgFlags,
    rpaths: &[RoutePath],
) -> EntryIndex {
    let table_idx = find_or_create(fib, proto, table_id);
    let entry_idx = match entry_lookup(fib, table_idx, &prefix) {
        Some(entry_idx) => entry_idx,
        None => entry_insert(fib, table_idx, prefix),
    };

    // Build the new path-list and swap it into the source.
    let plist_idx = path_list::create(fib, proto, cfg_flags, rpaths);
    let pl_sibling =
        path_list::child_add(fib, plist_idx, NodeRef::entry(entry_idx));
    let entry = &mut fib.entries[entry_idx];
    let old = entry.sources.insert(
        source,
        FibEntrySource {
            path_list: Some(plist_idx),
            pl_sibling: Some(pl_sibling),
            flags,
            refs: 1,
        },
    );
    if let Some(old) = old
        && let Some(old_plist) = old.path_list
    {
        if let Some(old_sibling) = old.pl_sibling {
            path_list::child_remove(fib, old_plist, old_sibling);
        }
        path_list::destroy(fib, old_plist);
    }

    // Resolve the new paths, then look for recursion cycles rooted at this
    // entry before publishing any forwarding.
    let paths = fib.path_lists[plist_idx].paths.clone();
    for path_idx in paths {
        path::resolve(fib, path_idx);
    }
    let mut entries = vec![entry_idx];
    path_list::recursive_loop_detect(fib, plist_idx, &mut entries);

    entry::restack(fib, entry_idx);
    let children = fib.entries[entry_idx].children.collect();
    walk::backwalk_children(
        fib,
        children,
        BackWalkCtx::new(BackWalkReason::EVALUATE),
    );

    // A topology change can change which cover a reverse-resolution entry
    // inherits from.
    rr_entries_evaluate(fib, table_idx);

    entry_idx
}

// Withdraws the given source's route from a destination.
pub fn route_remove(
    fib: &mut Fib,
    proto: FibProtocol,
    table_id: u32,
    prefix: &FibPrefix,
    source: FibSource,
) -> Result<(), Error> {
    let table_idx = get(fib, proto, table_id)?;
    let Some(entry_idx) = entry_lookup(fib, table_idx, prefix) else {
        return Ok(());
    };

    let entry = &mut fib.entries[entry_idx];
    if let Some(src) = entry.sources.remove(&source) {
        if let Some(plist_idx) = src.path_list {
            if let Some(pl_sibling) = src.pl_sibling {
                path_list::child_remove(fib, plist_idx, pl_sibling);
            }
            path_list::destroy(fib, plist_idx);
        }
    }

    if fib.entries[entry_idx].sources.is_empty() {
        entry_delete(fib, entry_idx);
    } else {
        entry::restack(fib, entry_idx);
        let children = fib.entries[entry_idx].children.collect();
        walk::backwalk_children(
            fib,
            children,
            BackWalkCtx::new(BackWalkReason::EVALUATE),
        );
    }

    rr_entries_evaluate(fib, table_idx);

    Ok(())
}

// Creates an entry and links it into its table.
fn entry_insert(
    fib: &mut Fib,
    table_idx: TableIndex,
    prefix: FibPrefix,
) -> EntryIndex {
    let entry_idx = fib.entries.insert(FibEntry {
        prefix,
        table: table_idx,
        sources: Default::default(),
        children: Default::default(),
        cover: None,
        dpo: Dpo::None,
    });

    let table = &mut fib.tables[table_idx];
    match prefix {
        FibPrefix::Ip(prefix) => {
            table.ip.insert(prefix, entry_idx);
        }
        FibPrefix::Mpls(label) => {
            table.mpls.insert(label, entry_idx);
        }
    }
    Debug::EntryCreate(&prefix).log();

    entry_idx
}

// Unlinks and removes an entry. Covered reverse-resolution entries are
// orphaned first and re-evaluated once the entry is gone.
pub(crate) fn entry_delete(fib: &mut Fib, entry_idx: EntryIndex) {
    // Orphan the dependents still covered by this entry.
    let mut orphans = Vec::new();
    for child in fib.entries[entry_idx].children.collect() {
        if child.kind == NodeKind::Entry {
            fib.entries[child.index].cover = None;
            orphans.push(child.index);
        }
    }

    entry::cover_unlink(fib, entry_idx);

    let (prefix, table_idx) = {
        let entry = &fib.entries[entry_idx];
        (entry.prefix, entry.table)
    };
    let table = &mut fib.tables[table_idx];
    match prefix {
        FibPrefix::Ip(prefix) => {
            table.ip.remove(&prefix);
        }
        FibPrefix::Mpls(label) => {
            table.mpls.remove(&label);
        }
    }

    if let Dpo::LoadBalance(lb_idx) = &fib.entries[entry_idx].dpo {
        let lb_idx = *lb_idx;
        fib.load_balances.remove(lb_idx);
    }
    Debug::EntryDelete(&prefix).log();
    fib.entries.remove(entry_idx);

    for orphan in orphans {
        entry::back_walk(
            fib,
            orphan,
            BackWalkCtx::new(BackWalkReason::EVALUATE),
        );
    }
}

// Re-evaluates the table's reverse-resolution-only entries.
fn rr_entries_evaluate(fib: &mut Fib, table_idx: TableIndex) {
    let table = &fib.tables[table_idx];
    let entries = table
        .ip
        .iter()
        .map(|(_, entry_idx)| *entry_idx)
        .chain(table.mpls.values().copied())
        .filter(|entry_idx| {
            fib.entries[*entry_idx].best_source()
                == Some(FibSource::RecursiveResolution)
        })
        .collect::<Vec<_>>();

    for entry_idx in entries {
        entry::back_walk(
            fib,
            entry_idx,
            BackWalkCtx::new(BackWalkReason::EVALUATE),
        );
    }
}
