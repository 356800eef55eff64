//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bitflags::bitflags;
use derive_new::new;

use crate::debug::Debug;
use crate::node::{NodeKind, NodeRef};
use crate::{Fib, entry, path, path_list};

// Synchronous walks must terminate even though the dependency graph
// admits cycles; anything cut off here is recomputed by the next
// level-triggered event.
pub(crate) const MAX_WALK_DEPTH: u8 = 32;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct BackWalkReason: u8 {
        const EVALUATE = 0x01;
        const ADJ_UPDATE = 0x02;
        const ADJ_DOWN = 0x04;
        const INTERFACE_UP = 0x08;
        const INTERFACE_DOWN = 0x10;
        const INTERFACE_DELETE = 0x20;
    }
}

// Context propagated from a changed node to its dependents.
#[derive(Clone, Copy, Debug)]
#[derive(new)]
pub struct BackWalkCtx {
    pub reasons: BackWalkReason,
    #[new(default)]
    pub depth: u8,
}

// ===== impl BackWalkCtx =====

impl BackWalkCtx {
    pub(crate) fn descend(&self) -> BackWalkCtx {
        BackWalkCtx {
            reasons: self.reasons,
            depth: self.depth + 1,
        }
    }
}

// ===== global functions =====

// Walks a snapshot of a node's dependents.
pub(crate) fn backwalk_children(
    fib: &mut Fib,
    children: Vec<NodeRef>,
    ctx: BackWalkCtx,
) {
    if ctx.depth > MAX_WALK_DEPTH {
        Debug::WalkDepthLimit(ctx.depth).log();
        return;
    }

    for child in children {
        backwalk_node(fib, child, ctx);
    }
}

// Dispatches a back-walk by node kind.
pub(crate) fn backwalk_node(fib: &mut Fib, node: NodeRef, ctx: BackWalkCtx) {
    match node.kind {
        NodeKind::Path => path::back_walk(fib, node.index, ctx),
        NodeKind::PathList => path_list::back_walk(fib, node.index, ctx),
        NodeKind::Entry => entry::back_walk(fib, node.index, ctx),
    }
}
