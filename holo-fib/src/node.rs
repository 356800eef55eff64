//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;
use generational_arena::{Arena, Index};

// Stable handle a dependent holds inside its parent's child list.
pub type SiblingIndex = Index;

// Kind of a node in the FIB dependency graph.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NodeKind {
    Path,
    PathList,
    Entry,
}

// Typed reference to a dependency-graph node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub index: Index,
}

// List of dependents registered on an upstream object.
//
// Children keep the sibling index returned by `add` and surrender it in
// `remove`; slots stay stable while other children come and go.
#[derive(Debug, Default)]
pub struct ChildList {
    slab: Arena<NodeRef>,
}

// ===== impl NodeRef =====

impl NodeRef {
    pub fn path(index: Index) -> NodeRef {
        NodeRef::new(NodeKind::Path, index)
    }

    pub fn path_list(index: Index) -> NodeRef {
        NodeRef::new(NodeKind::PathList, index)
    }

    pub fn entry(index: Index) -> NodeRef {
        NodeRef::new(NodeKind::Entry, index)
    }
}

// ===== impl ChildList =====

impl ChildList {
    pub(crate) fn add(&mut self, child: NodeRef) -> SiblingIndex {
        self.slab.insert(child)
    }

    pub(crate) fn remove(&mut self, sibling: SiblingIndex) -> Option<NodeRef> {
        self.slab.remove(sibling)
    }

    pub fn len(&self) -> usize {
        self.slab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slab.is_empty()
    }

    // Returns an iterator visiting all children.
    pub fn iter(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.slab.iter().map(|(_, child)| *child)
    }

    // Returns a snapshot of the child set, safe to walk while children
    // unlink themselves.
    pub(crate) fn collect(&self) -> Vec<NodeRef> {
        self.iter().collect()
    }
}
