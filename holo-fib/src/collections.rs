//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::{BTreeMap, HashMap};

use generational_arena::{Arena, Index};

use crate::adjacency::{Adjacency, AdjacencyKey, AdjacencyKind};
use crate::dpo::{FibProtocol, LinkType};
use crate::entry::FibEntry;
use crate::interface::Interface;
use crate::loadbalance::LoadBalance;
use crate::path::Path;
use crate::path_list::PathList;
use crate::table::Table;

pub type AdjacencyIndex = Index;
pub type EntryIndex = Index;
pub type InterfaceIndex = Index;
pub type LoadBalanceIndex = Index;
pub type PathIndex = Index;
pub type PathListIndex = Index;
pub type TableIndex = Index;

#[derive(Debug, Default)]
pub struct Paths {
    // Path arena.
    arena: Arena<Path>,
}

#[derive(Debug, Default)]
pub struct PathLists {
    // Path-list arena.
    arena: Arena<PathList>,
}

#[derive(Debug, Default)]
pub struct Entries {
    // FIB entry arena.
    arena: Arena<FibEntry>,
}

#[derive(Debug, Default)]
pub struct Adjacencies {
    // Adjacency arena.
    arena: Arena<Adjacency>,
    // Neighbor adjacency binary tree keyed by (ifindex, link, address) (1:1).
    nbr_tree: BTreeMap<AdjacencyKey, AdjacencyIndex>,
    // Glean adjacency binary tree keyed by (ifindex, link) (1:1).
    glean_tree: BTreeMap<(u32, LinkType), AdjacencyIndex>,
}

#[derive(Debug, Default)]
pub struct Interfaces {
    // Interface arena.
    arena: Arena<Interface>,
    // Interface hash table keyed by ifindex (1:1).
    ifindex_tree: HashMap<u32, InterfaceIndex>,
}

#[derive(Debug, Default)]
pub struct Tables {
    // Table arena.
    arena: Arena<Table>,
    // Table binary tree keyed by (protocol, table ID) (1:1).
    id_tree: BTreeMap<(FibProtocol, u32), TableIndex>,
}

#[derive(Debug, Default)]
pub struct LoadBalances {
    // Load-balance arena.
    arena: Arena<LoadBalance>,
}

// ===== impl Paths =====

impl Paths {
    pub(crate) fn insert(&mut self, path: Path) -> PathIndex {
        self.arena.insert(path)
    }

    pub(crate) fn remove(&mut self, path_idx: PathIndex) -> Option<Path> {
        self.arena.remove(path_idx)
    }

    // Returns a reference to the path corresponding to the given index.
    pub fn get(&self, path_idx: PathIndex) -> Option<&Path> {
        self.arena.get(path_idx)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    // Returns an iterator visiting all paths.
    pub fn iter(&self) -> impl Iterator<Item = (PathIndex, &'_ Path)> + '_ {
        self.arena.iter()
    }
}

impl std::ops::Index<PathIndex> for Paths {
    type Output = Path;

    fn index(&self, index: PathIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<PathIndex> for Paths {
    fn index_mut(&mut self, index: PathIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl PathLists =====

impl PathLists {
    pub(crate) fn insert(&mut self, plist: PathList) -> PathListIndex {
        self.arena.insert(plist)
    }

    pub(crate) fn remove(
        &mut self,
        plist_idx: PathListIndex,
    ) -> Option<PathList> {
        self.arena.remove(plist_idx)
    }

    pub fn get(&self, plist_idx: PathListIndex) -> Option<&PathList> {
        self.arena.get(plist_idx)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<PathListIndex> for PathLists {
    type Output = PathList;

    fn index(&self, index: PathListIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<PathListIndex> for PathLists {
    fn index_mut(&mut self, index: PathListIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Entries =====

impl Entries {
    pub(crate) fn insert(&mut self, entry: FibEntry) -> EntryIndex {
        self.arena.insert(entry)
    }

    pub(crate) fn remove(&mut self, entry_idx: EntryIndex) -> Option<FibEntry> {
        self.arena.remove(entry_idx)
    }

    pub fn get(&self, entry_idx: EntryIndex) -> Option<&FibEntry> {
        self.arena.get(entry_idx)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<EntryIndex> for Entries {
    type Output = FibEntry;

    fn index(&self, index: EntryIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<EntryIndex> for Entries {
    fn index_mut(&mut self, index: EntryIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Adjacencies =====

impl Adjacencies {
    pub(crate) fn insert(&mut self, adj: Adjacency) -> AdjacencyIndex {
        // Insert adjacency into the arena.
        let adj_idx = self.arena.insert(adj);

        // Link adjacency to the lookup trees.
        let adj = &self.arena[adj_idx];
        match adj.kind {
            AdjacencyKind::Neighbor => {
                self.nbr_tree.insert(adj.key(), adj_idx);
            }
            AdjacencyKind::Glean => {
                self.glean_tree.insert((adj.ifindex, adj.link), adj_idx);
            }
        }

        adj_idx
    }

    pub(crate) fn delete(&mut self, adj_idx: AdjacencyIndex) {
        let adj = &self.arena[adj_idx];

        // Unlink adjacency from the lookup trees.
        match adj.kind {
            AdjacencyKind::Neighbor => {
                self.nbr_tree.remove(&adj.key());
            }
            AdjacencyKind::Glean => {
                self.glean_tree.remove(&(adj.ifindex, adj.link));
            }
        }

        // Remove adjacency from the arena.
        self.arena.remove(adj_idx);
    }

    pub fn get(&self, adj_idx: AdjacencyIndex) -> Option<&Adjacency> {
        self.arena.get(adj_idx)
    }

    // Returns the neighbor adjacency corresponding to the given key.
    pub fn get_by_key(
        &self,
        key: &AdjacencyKey,
    ) -> Option<(AdjacencyIndex, &Adjacency)> {
        self.nbr_tree
            .get(key)
            .copied()
            .map(|adj_idx| (adj_idx, &self.arena[adj_idx]))
    }

    // Returns the glean adjacency on the given interface.
    pub fn get_glean(
        &self,
        ifindex: u32,
        link: LinkType,
    ) -> Option<(AdjacencyIndex, &Adjacency)> {
        self.glean_tree
            .get(&(ifindex, link))
            .copied()
            .map(|adj_idx| (adj_idx, &self.arena[adj_idx]))
    }

    // Returns an iterator visiting all adjacencies on the given interface.
    //
    // NOTE: this method scales linearly with the number of adjacencies.
    pub fn iter_for_interface(
        &self,
        ifindex: u32,
    ) -> impl Iterator<Item = (AdjacencyIndex, &'_ Adjacency)> + '_ {
        self.arena
            .iter()
            .filter(move |(_, adj)| adj.ifindex == ifindex)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<AdjacencyIndex> for Adjacencies {
    type Output = Adjacency;

    fn index(&self, index: AdjacencyIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<AdjacencyIndex> for Adjacencies {
    fn index_mut(&mut self, index: AdjacencyIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Interfaces =====

impl Interfaces {
    pub(crate) fn insert(&mut self, iface: Interface) -> InterfaceIndex {
        // Check for existing entry first.
        if let Some(iface_idx) = self.ifindex_tree.get(&iface.ifindex).copied()
        {
            self.arena[iface_idx] = iface;
            return iface_idx;
        }

        // Create and insert interface into the arena.
        let ifindex = iface.ifindex;
        let iface_idx = self.arena.insert(iface);
        self.ifindex_tree.insert(ifindex, iface_idx);

        iface_idx
    }

    pub(crate) fn delete(&mut self, iface_idx: InterfaceIndex) {
        let iface = &self.arena[iface_idx];

        // Unlink interface from the lookup tree.
        self.ifindex_tree.remove(&iface.ifindex);

        // Remove interface from the arena.
        self.arena.remove(iface_idx);
    }

    // Returns a reference to the interface corresponding to the given
    // ifindex.
    pub fn get_by_ifindex(
        &self,
        ifindex: u32,
    ) -> Option<(InterfaceIndex, &Interface)> {
        self.ifindex_tree
            .get(&ifindex)
            .copied()
            .map(|iface_idx| (iface_idx, &self.arena[iface_idx]))
    }

    // Returns a mutable reference to the interface corresponding to the
    // given ifindex.
    pub fn get_mut_by_ifindex(
        &mut self,
        ifindex: u32,
    ) -> Option<(InterfaceIndex, &mut Interface)> {
        self.ifindex_tree
            .get(&ifindex)
            .copied()
            .map(move |iface_idx| (iface_idx, &mut self.arena[iface_idx]))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<InterfaceIndex> for Interfaces {
    type Output = Interface;

    fn index(&self, index: InterfaceIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<InterfaceIndex> for Interfaces {
    fn index_mut(&mut self, index: InterfaceIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Tables =====

impl Tables {
    pub(crate) fn insert(&mut self, table: Table) -> TableIndex {
        // Check for existing entry first.
        let key = (table.proto, table.id);
        if let Some(table_idx) = self.id_tree.get(&key).copied() {
            return table_idx;
        }

        // Create and insert table into the arena.
        let table_idx = self.arena.insert(table);
        self.id_tree.insert(key, table_idx);

        table_idx
    }

    // Returns the table corresponding to the given protocol and ID.
    pub fn get_by_id(
        &self,
        proto: FibProtocol,
        id: u32,
    ) -> Option<(TableIndex, &Table)> {
        self.id_tree
            .get(&(proto, id))
            .copied()
            .map(|table_idx| (table_idx, &self.arena[table_idx]))
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<TableIndex> for Tables {
    type Output = Table;

    fn index(&self, index: TableIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<TableIndex> for Tables {
    fn index_mut(&mut self, index: TableIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl LoadBalances =====

impl LoadBalances {
    pub(crate) fn insert(&mut self, lb: LoadBalance) -> LoadBalanceIndex {
        self.arena.insert(lb)
    }

    pub(crate) fn remove(
        &mut self,
        lb_idx: LoadBalanceIndex,
    ) -> Option<LoadBalance> {
        self.arena.remove(lb_idx)
    }

    pub fn get(&self, lb_idx: LoadBalanceIndex) -> Option<&LoadBalance> {
        self.arena.get(lb_idx)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }
}

impl std::ops::Index<LoadBalanceIndex> for LoadBalances {
    type Output = LoadBalance;

    fn index(&self, index: LoadBalanceIndex) -> &Self::Output {
        &self.arena[index]
    }
}
