//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use bitflags::bitflags;

use crate::Fib;
use crate::adjacency;
use crate::collections::InterfaceIndex;
use crate::debug::Debug;
use crate::node::NodeRef;
use crate::walk::{self, BackWalkCtx, BackWalkReason};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct InterfaceFlags: u8 {
        const UP = 0x01;
        const POINT_TO_POINT = 0x02;
        const LOOPBACK = 0x04;
    }
}

#[derive(Debug)]
pub struct Interface {
    pub ifindex: u32,
    pub name: String,
    pub flags: InterfaceFlags,
}

// ===== global functions =====

// Adds an interface, or refreshes it if it already exists.
pub fn add(
    fib: &mut Fib,
    ifindex: u32,
    name: &str,
    flags: InterfaceFlags,
) -> InterfaceIndex {
    Debug::InterfaceAdd(name, ifindex).log();

    fib.interfaces.insert(Interface {
        ifindex,
        name: name.to_owned(),
        flags,
    })
}

// Updates the administrative status of an interface, back-walking the
// paths that depend on its adjacencies.
pub fn update_admin_status(fib: &mut Fib, ifindex: u32, up: bool) {
    let Some((_, iface)) = fib.interfaces.get_mut_by_ifindex(ifindex) else {
        return;
    };
    if iface.flags.contains(InterfaceFlags::UP) == up {
        return;
    }
    iface.flags.set(InterfaceFlags::UP, up);
    Debug::InterfaceAdminStatus(ifindex, up).log();

    let reason = if up {
        BackWalkReason::INTERFACE_UP
    } else {
        BackWalkReason::INTERFACE_DOWN
    };
    let children = adjacency_children(fib, ifindex);
    walk::backwalk_children(fib, children, BackWalkCtx::new(reason));
}

// Deletes an interface.
//
// Dependent paths become permanent drops; the interface's adjacencies are
// reclaimed once their last child unlinks.
pub fn delete(fib: &mut Fib, ifindex: u32) {
    let Some((iface_idx, _)) = fib.interfaces.get_by_ifindex(ifindex) else {
        return;
    };
    Debug::InterfaceDelete(ifindex).log();

    let children = adjacency_children(fib, ifindex);
    walk::backwalk_children(
        fib,
        children,
        BackWalkCtx::new(BackWalkReason::INTERFACE_DELETE),
    );

    // Reclaim adjacencies left on the interface.
    let stale = fib
        .adjacencies
        .iter_for_interface(ifindex)
        .map(|(adj_idx, _)| adj_idx)
        .collect::<Vec<_>>();
    for adj_idx in stale {
        adjacency::delete(fib, adj_idx);
    }

    fib.interfaces.delete(iface_idx);
}

// Returns true if the interface exists and is administratively up.
pub(crate) fn is_admin_up(fib: &Fib, ifindex: u32) -> bool {
    fib.interfaces
        .get_by_ifindex(ifindex)
        .is_some_and(|(_, iface)| iface.flags.contains(InterfaceFlags::UP))
}

// Returns true if the interface is point-to-point.
pub(crate) fn is_p2p(fib: &Fib, ifindex: u32) -> bool {
    fib.interfaces.get_by_ifindex(ifindex).is_some_and(|(_, iface)| {
        iface.flags.contains(InterfaceFlags::POINT_TO_POINT)
    })
}

// Collects the dependents of every adjacency on the given interface.
fn adjacency_children(fib: &Fib, ifindex: u32) -> Vec<NodeRef> {
    fib.adjacencies
        .iter_for_interface(ifindex)
        .flat_map(|(_, adj)| adj.children.iter())
        .collect()
}
