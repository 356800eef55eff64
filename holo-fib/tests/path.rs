//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::net::IpAddr;

use const_addrs::{ip4, ip6, net4};
use holo_fib::Fib;
use holo_fib::adjacency::{self, AdjacencyKind, Rewrite};
use holo_fib::collections::{PathIndex, PathListIndex};
use holo_fib::dpo::{ChainType, Dpo, FibProtocol, LinkType};
use holo_fib::entry::{EntryFlags, FibSource};
use holo_fib::error::Error;
use holo_fib::interface::{self, InterfaceFlags};
use holo_fib::loadbalance::LoadBalancePath;
use holo_fib::path::{
    self, PathCfgFlags, PathType, RoutePath, RoutePathFlags,
};
use holo_fib::path_list;
use holo_fib::table::{self, FibPrefix};
use holo_fib::urpf::UrpfList;
use holo_fib::walk::{BackWalkCtx, BackWalkReason};

//
// Helper functions.
//

fn fib_with_interfaces() -> Fib {
    let mut fib = Fib::new();
    interface::add(&mut fib, 3, "eth3", InterfaceFlags::UP);
    interface::add(&mut fib, 4, "eth4", InterfaceFlags::UP);
    interface::add(
        &mut fib,
        7,
        "serial7",
        InterfaceFlags::UP | InterfaceFlags::POINT_TO_POINT,
    );
    fib
}

fn rpath(f: impl FnOnce(&mut RoutePath)) -> RoutePath {
    let mut rpath = RoutePath::default();
    f(&mut rpath);
    rpath
}

fn anh_rpath(nexthop: IpAddr, ifindex: u32) -> RoutePath {
    rpath(|r| {
        r.nexthop = nexthop;
        r.ifindex = Some(ifindex);
    })
}

// Creates a standalone path-list holding the single given path.
fn one_path(
    fib: &mut Fib,
    cfg_flags: PathCfgFlags,
    rpath: &RoutePath,
) -> (PathListIndex, PathIndex) {
    let plist_idx = path_list::create(
        fib,
        rpath.proto,
        cfg_flags,
        std::slice::from_ref(rpath),
    );
    let path_idx = fib.path_lists[plist_idx].paths[0];
    (plist_idx, path_idx)
}

// Returns the member paths of the given source's path-list at an entry.
fn source_paths(
    fib: &Fib,
    entry_idx: holo_fib::collections::EntryIndex,
    source: FibSource,
) -> Vec<PathIndex> {
    let plist_idx = fib.entries[entry_idx].sources[&source]
        .path_list
        .expect("source has no path-list");
    fib.path_lists[plist_idx].paths.clone()
}

//
// Scenario tests.
//

// Attached next-hop on a broadcast interface: resolve, interface down,
// interface up.
#[test]
fn test_attached_next_hop() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    assert_eq!(
        fib.paths[path_idx].kind.path_type(),
        PathType::AttachedNextHop
    );

    assert!(path::resolve(&mut fib, path_idx));

    let adj_idx = fib.paths[path_idx].adjacency();
    let adj = &fib.adjacencies[adj_idx];
    assert_eq!(adj.kind, AdjacencyKind::Neighbor);
    assert_eq!(adj.link, LinkType::Ipv4);
    assert_eq!(adj.nexthop, IpAddr::from(ip4!("10.0.0.2")));
    assert_eq!(adj.ifindex, 3);

    interface::update_admin_status(&mut fib, 3, false);
    assert!(!fib.paths[path_idx].is_resolved());

    interface::update_admin_status(&mut fib, 3, true);
    assert!(fib.paths[path_idx].is_resolved());
}

// On a point-to-point interface the adjacency is keyed on the zero
// address, regardless of the configured neighbor.
#[test]
fn test_attached_next_hop_p2p() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("192.168.1.9").into(), 7),
    );
    assert!(path::resolve(&mut fib, path_idx));

    let adj = &fib.adjacencies[fib.paths[path_idx].adjacency()];
    assert!(adj.nexthop.is_unspecified());
    assert_eq!(adj.ifindex, 7);
}

// Attached path on a broadcast interface resolves via a glean adjacency.
#[test]
fn test_attached_glean() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.proto = FibProtocol::Ipv6;
            r.nexthop = ip6!("::").into();
            r.ifindex = Some(4);
        }),
    );
    assert_eq!(fib.paths[path_idx].kind.path_type(), PathType::Attached);
    assert!(path::resolve(&mut fib, path_idx));

    let adj = &fib.adjacencies[fib.paths[path_idx].adjacency()];
    assert_eq!(adj.kind, AdjacencyKind::Glean);
    assert_eq!(adj.link, LinkType::Ipv6);
    assert_eq!(adj.ifindex, 4);
}

// A RESOLVE_VIA_HOST recursive path whose via-entry is owned only by the
// reverse-resolution source contributes drop and signals PIC-edge.
#[test]
fn test_resolve_via_host() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("1.1.1.1").into();
            r.table_id = Some(0);
            r.flags = RoutePathFlags::RESOLVE_VIA_HOST;
        }),
    );
    assert!(!path::resolve(&mut fib, path_idx));
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));
    assert!(fib.lb_maps.has_pending(path_idx));
    fib.lb_maps.take_pending();

    // A host route from a real source satisfies the constraint.
    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("1.1.1.1/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );
    assert!(fib.paths[path_idx].is_resolved());
    assert!(fib.paths[path_idx].dpo.is_adjacency());

    // Withdrawing it re-imposes the drop.
    table::route_remove(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        &FibPrefix::Ip(net4!("1.1.1.1/32").into()),
        FibSource::Rib,
    )
    .unwrap();
    assert!(!fib.paths[path_idx].is_resolved());
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));
    assert!(fib.lb_maps.has_pending(path_idx));
}

// A RESOLVE_VIA_ATTACHED recursive path requires the via-entry to be
// attached.
#[test]
fn test_resolve_via_attached() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("5.5.5.5").into();
            r.table_id = Some(0);
            r.flags = RoutePathFlags::RESOLVE_VIA_ATTACHED;
        }),
    );
    assert!(!path::resolve(&mut fib, path_idx));
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));
    assert!(fib.lb_maps.has_pending(path_idx));

    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("5.5.5.5/32").into()),
        FibSource::Rib,
        EntryFlags::ATTACHED,
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );
    assert!(fib.paths[path_idx].is_resolved());
}

// Mutual recursion: the loop is installed, the back edge contributes
// drop, and the non-looped sibling still forwards. Breaking the cycle
// recovers both paths.
#[test]
fn test_recursive_loop() {
    let mut fib = fib_with_interfaces();

    // A = 1.1.1.1/32 via 2.2.2.2.
    let entry_a = table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("1.1.1.1/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[rpath(|r| {
            r.nexthop = ip4!("2.2.2.2").into();
            r.table_id = Some(0);
        })],
    );
    let path_a = source_paths(&fib, entry_a, FibSource::Rib)[0];
    assert!(!fib.paths[path_a].is_looped());

    // B = 2.2.2.2/32 via 1.1.1.1, plus an attached-next-hop sibling.
    let entry_b = table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("2.2.2.2/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[
            rpath(|r| {
                r.nexthop = ip4!("1.1.1.1").into();
                r.table_id = Some(0);
            }),
            anh_rpath(ip4!("10.0.0.2").into(), 3),
        ],
    );
    let b_paths = source_paths(&fib, entry_b, FibSource::Rib);
    let (path_b_rec, path_b_anh) = (b_paths[0], b_paths[1]);

    // The back edge is looped and contributes drop.
    assert!(fib.paths[path_a].is_looped());
    assert!(!fib.paths[path_a].is_resolved());
    assert_eq!(fib.paths[path_a].dpo, Dpo::Drop(FibProtocol::Ipv4));

    // The control-plane edges survive the loop.
    assert!(fib.paths[path_a].via_fib.is_some());

    // The non-looped sibling in B's path-list still forwards.
    assert!(fib.paths[path_b_rec].is_looped());
    assert!(fib.paths[path_b_anh].is_resolved());
    assert!(fib.entries[entry_b].dpo.is_adjacency());

    // Break the cycle: B becomes a plain attached-next-hop route.
    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("2.2.2.2/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );
    assert!(!fib.paths[path_a].is_looped());
    assert!(fib.paths[path_a].is_resolved());
    assert!(fib.paths[path_a].dpo.is_adjacency());
}

// Interface deletion turns attached paths into permanent drops.
#[test]
fn test_interface_delete() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    assert!(path::resolve(&mut fib, path_idx));

    interface::delete(&mut fib, 3);
    assert!(!fib.paths[path_idx].is_resolved());
    assert!(fib.paths[path_idx].is_permanent_drop());
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));

    // No upstream reference survives.
    assert_eq!(fib.adjacencies.len(), 0);

    // The drop is terminal: no event or re-resolution revives the path.
    path::back_walk(
        &mut fib,
        path_idx,
        BackWalkCtx::new(BackWalkReason::INTERFACE_UP),
    );
    assert!(!fib.paths[path_idx].is_resolved());
    assert!(!path::resolve(&mut fib, path_idx));
}

//
// Invariant tests.
//

// A copy shares the configured state only.
#[test]
fn test_copy() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("10.0.0.2").into();
            r.ifindex = Some(3);
            r.weight = 5;
        }),
    );
    assert!(path::resolve(&mut fib, path_idx));

    let plist_idx = path_list::create(
        &mut fib,
        FibProtocol::Ipv4,
        PathCfgFlags::empty(),
        &[],
    );
    let copy_idx = path::copy(&mut fib, path_idx, plist_idx);
    fib.path_lists[plist_idx].paths.push(copy_idx);

    let (orig, copy) = (&fib.paths[path_idx], &fib.paths[copy_idx]);
    assert_eq!(orig.cmp(copy), Ordering::Equal);
    assert_eq!(orig.hash_config(), copy.hash_config());
    assert_eq!(copy.weight, 5);
    assert!(!copy.is_resolved());
    assert_eq!(copy.dpo, Dpo::None);
}

// Destroying a path releases every upstream lock and child slot.
#[test]
fn test_destroy_releases_upstream() {
    let mut fib = fib_with_interfaces();

    // Attached next-hop: the adjacency disappears with its last user.
    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    assert!(path::resolve(&mut fib, path_idx));
    assert_eq!(fib.adjacencies.len(), 1);
    path::destroy(&mut fib, path_idx);
    assert_eq!(fib.adjacencies.len(), 0);

    // Recursive: the reverse-resolution entry disappears with its last
    // dependent.
    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("1.1.1.1").into();
            r.table_id = Some(0);
        }),
    );
    path::resolve(&mut fib, path_idx);
    assert_eq!(fib.entries.len(), 1);
    path::destroy(&mut fib, path_idx);
    assert_eq!(fib.entries.len(), 0);
}

// A path configured to drop holds no upstream references at all.
#[test]
fn test_cfg_drop_holds_no_locks() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::DROP,
        &rpath(|r| {
            r.nexthop = ip4!("10.0.0.2").into();
            r.ifindex = Some(3);
        }),
    );
    assert!(!path::resolve(&mut fib, path_idx));
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));
    assert_eq!(fib.adjacencies.len(), 0);
    assert_eq!(fib.entries.len(), 0);
}

// Leaf kinds resolve to their dedicated DPOs.
#[test]
fn test_leaf_kinds() {
    let mut fib = fib_with_interfaces();

    // Deaggregation.
    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| r.table_id = Some(10)),
    );
    assert_eq!(fib.paths[path_idx].kind.path_type(), PathType::Deag);
    assert!(fib.paths[path_idx].is_deag());
    assert!(path::resolve(&mut fib, path_idx));
    assert_eq!(
        fib.paths[path_idx].dpo,
        Dpo::Lookup {
            proto: FibProtocol::Ipv4,
            table_id: 10
        }
    );
    assert!(table::get(&fib, FibProtocol::Ipv4, 10).is_ok());

    // Receive.
    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::LOCAL,
        &rpath(|r| {
            r.nexthop = ip4!("10.0.0.1").into();
            r.ifindex = Some(3);
        }),
    );
    assert!(path::resolve(&mut fib, path_idx));
    assert_eq!(
        fib.paths[path_idx].dpo,
        Dpo::Receive {
            ifindex: 3,
            addr: ip4!("10.0.0.1").into()
        }
    );

    // Special.
    let (_, path_idx) =
        one_path(&mut fib, PathCfgFlags::empty(), &rpath(|_| ()));
    assert!(path::resolve(&mut fib, path_idx));
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));
}

// Exclusive paths carry the caller's DPO verbatim.
#[test]
fn test_exclusive() {
    let mut fib = fib_with_interfaces();

    let adj_idx = adjacency::nbr_add_or_lock(
        &mut fib,
        LinkType::Ipv4,
        ip4!("10.0.0.7").into(),
        3,
    );
    let plist_idx = path_list::create(
        &mut fib,
        FibProtocol::Ipv4,
        PathCfgFlags::empty(),
        &[],
    );
    let path_idx = path::create_special(
        &mut fib,
        plist_idx,
        FibProtocol::Ipv4,
        PathCfgFlags::empty(),
        Dpo::Adjacency(adj_idx),
    );
    fib.path_lists[plist_idx].paths.push(path_idx);

    assert!(fib.paths[path_idx].is_exclusive());
    assert!(path::resolve(&mut fib, path_idx));
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Adjacency(adj_idx));

    // Any chain type copies the stored exclusive DPO.
    let dpo =
        path::contribute_forwarding(&mut fib, path_idx, ChainType::MplsEos);
    assert_eq!(dpo, Dpo::Adjacency(adj_idx));

    // The encoded descriptor carries the DPO for exclusive paths only.
    let encoded = path::encode(&fib, path_idx);
    assert_eq!(encoded.dpo, Some(Dpo::Adjacency(adj_idx)));
}

// uRPF contribution across path kinds.
#[test]
fn test_contribute_urpf() {
    let mut fib = fib_with_interfaces();

    // Attached next-hop and attached paths append their interfaces.
    let (_, anh_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    let (_, att_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| r.ifindex = Some(4)),
    );
    path::resolve(&mut fib, anh_idx);
    path::resolve(&mut fib, att_idx);

    let mut urpf = UrpfList::default();
    path::contribute_urpf(&mut fib, anh_idx, &mut urpf);
    path::contribute_urpf(&mut fib, att_idx, &mut urpf);
    assert_eq!(urpf.len(), 2);
    assert!(urpf.contains(3));
    assert!(urpf.contains(4));

    // Recursive paths delegate to the via-entry.
    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("9.9.9.9/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );
    let (_, rec_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("9.9.9.9").into();
            r.table_id = Some(0);
        }),
    );
    path::resolve(&mut fib, rec_idx);

    let mut urpf = UrpfList::default();
    path::contribute_urpf(&mut fib, rec_idx, &mut urpf);
    assert_eq!(urpf.len(), 1);
    assert!(urpf.contains(3));

    // An unresolved path contributes nothing.
    interface::update_admin_status(&mut fib, 4, false);
    let mut urpf = UrpfList::default();
    path::contribute_urpf(&mut fib, att_idx, &mut urpf);
    assert!(urpf.is_empty());
}

// Only resolved-visible paths append to the multipath hash key.
#[test]
fn test_multipath_hash_key() {
    let mut fib = fib_with_interfaces();
    interface::add(&mut fib, 5, "eth5", InterfaceFlags::empty());

    let (_, up_a) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    let (_, up_b) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("10.0.1.2").into();
            r.ifindex = Some(4);
            r.weight = 3;
        }),
    );
    // eth5 is admin-down: resolve binds but stays invisible.
    let (_, down) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.2.2").into(), 5),
    );
    path::resolve(&mut fib, up_a);
    path::resolve(&mut fib, up_b);
    path::resolve(&mut fib, down);

    let mut key: Vec<LoadBalancePath> = Vec::new();
    for path_idx in [up_a, up_b, down] {
        path::append_nh_for_multipath_hash(
            &mut fib,
            path_idx,
            ChainType::Ipv4,
            &mut key,
        );
    }

    assert_eq!(key.len(), 2);
    assert_eq!(key[0].path, up_a);
    assert_eq!(key[0].weight, 1);
    assert_eq!(key[1].path, up_b);
    assert_eq!(key[1].weight, 3);
}

// Chain-specific contributions.
#[test]
fn test_contribute_forwarding_chains() {
    let mut fib = fib_with_interfaces();

    // Attached next-hop contributes a chain-derived adjacency.
    let (_, anh_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    path::resolve(&mut fib, anh_idx);
    let dpo =
        path::contribute_forwarding(&mut fib, anh_idx, ChainType::Ethernet);
    let adj_idx = *dpo.as_adjacency().unwrap();
    assert_eq!(fib.adjacencies[adj_idx].link, LinkType::Ethernet);
    adjacency::unlock(&mut fib, adj_idx);

    // Native chain copies the stored DPO.
    let dpo = path::contribute_forwarding(&mut fib, anh_idx, ChainType::Ipv4);
    assert_eq!(dpo, fib.paths[anh_idx].dpo);

    // Deag on a non-eos MPLS chain looks up the MPLS default table.
    let (_, deag_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| r.table_id = Some(10)),
    );
    path::resolve(&mut fib, deag_idx);
    let dpo = path::contribute_forwarding(
        &mut fib,
        deag_idx,
        ChainType::MplsNonEos,
    );
    assert_eq!(
        dpo,
        Dpo::Lookup {
            proto: FibProtocol::Mpls,
            table_id: 0
        }
    );
}

// Adjacency rewrite updates ripple through attached next-hop paths.
#[test]
fn test_adjacency_rewrite_walks() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    assert!(path::resolve(&mut fib, path_idx));

    // Rewrite complete.
    adjacency::rewrite_update(
        &mut fib,
        LinkType::Ipv4,
        ip4!("10.0.0.2").into(),
        3,
        Some(Rewrite::new(vec![0, 1, 2, 3, 4, 5])),
    );
    assert!(fib.paths[path_idx].is_resolved());

    // Rewrite withdrawn.
    adjacency::rewrite_update(
        &mut fib,
        LinkType::Ipv4,
        ip4!("10.0.0.2").into(),
        3,
        None,
    );
    assert!(!fib.paths[path_idx].is_resolved());

    // Rewrite restored.
    adjacency::rewrite_update(
        &mut fib,
        LinkType::Ipv4,
        ip4!("10.0.0.2").into(),
        3,
        Some(Rewrite::new(vec![0, 1, 2, 3, 4, 5])),
    );
    assert!(fib.paths[path_idx].is_resolved());
}

// A recursive path through a covering route follows the cover's fate.
#[test]
fn test_recursive_via_cover() {
    let mut fib = fib_with_interfaces();

    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("10.1.0.0/16").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("10.1.1.1").into();
            r.table_id = Some(0);
        }),
    );
    assert!(path::resolve(&mut fib, path_idx));
    assert!(fib.paths[path_idx].dpo.is_adjacency());
    assert_eq!(path::resolving_interface(&fib, path_idx), Some(3));

    // The cover's interface going down drops the recursive path's
    // forwarding.
    interface::update_admin_status(&mut fib, 3, false);
    assert_eq!(fib.paths[path_idx].dpo, Dpo::Drop(FibProtocol::Ipv4));

    interface::update_admin_status(&mut fib, 3, true);
    assert!(fib.paths[path_idx].dpo.is_adjacency());
}

// MPLS recursion binds to the label entry.
#[test]
fn test_recursive_mpls() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.proto = FibProtocol::Mpls;
            r.label = Some(holo_utils::mpls::Label::new(16));
            r.table_id = Some(0);
        }),
    );
    assert_eq!(fib.paths[path_idx].kind.path_type(), PathType::Recursive);
    assert!(fib.paths[path_idx].is_recursive());
    path::resolve(&mut fib, path_idx);

    let via_fib = fib.paths[path_idx].via_fib.unwrap();
    assert_eq!(
        fib.entries[via_fib].prefix,
        FibPrefix::Mpls(holo_utils::mpls::Label::new(16))
    );
}

// Route replacement re-resolves the new paths and keeps dependents
// consistent.
#[test]
fn test_route_replace() {
    let mut fib = fib_with_interfaces();

    let entry_idx = table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("8.8.8.8/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.0.2").into(), 3)],
    );
    let old_path = source_paths(&fib, entry_idx, FibSource::Rib)[0];
    assert!(fib.paths[old_path].is_resolved());

    table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("8.8.8.8/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[anh_rpath(ip4!("10.0.1.2").into(), 4)],
    );
    // The old path is gone, the new one forwards.
    assert!(fib.paths.get(old_path).is_none());
    let new_path = source_paths(&fib, entry_idx, FibSource::Rib)[0];
    assert!(fib.paths[new_path].is_resolved());
    assert_eq!(
        fib.adjacencies[fib.paths[new_path].adjacency()].ifindex,
        4
    );
}

// Multiple resolved paths combine into a load-balance.
#[test]
fn test_route_multipath() {
    let mut fib = fib_with_interfaces();

    let entry_idx = table::route_path_add(
        &mut fib,
        FibProtocol::Ipv4,
        0,
        FibPrefix::Ip(net4!("8.8.8.8/32").into()),
        FibSource::Rib,
        EntryFlags::empty(),
        PathCfgFlags::empty(),
        &[
            anh_rpath(ip4!("10.0.0.2").into(), 3),
            anh_rpath(ip4!("10.0.1.2").into(), 4),
        ],
    );

    let lb_idx = *fib.entries[entry_idx].dpo.as_load_balance().unwrap();
    let lb = fib.load_balances.get(lb_idx).unwrap();
    assert_eq!(lb.buckets.len(), 2);

    // One member going away degrades the entry to a single adjacency.
    interface::update_admin_status(&mut fib, 4, false);
    assert!(fib.entries[entry_idx].dpo.is_adjacency());
    assert!(fib.load_balances.get(lb_idx).is_none());
}

// Operator introspection.
#[test]
fn test_show() {
    let mut fib = fib_with_interfaces();

    let (_, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &anh_rpath(ip4!("10.0.0.2").into(), 3),
    );
    path::resolve(&mut fib, path_idx);

    let out = path::show(&fib, None).unwrap();
    assert!(out.contains("FIB paths: 1 allocated"));
    assert!(out.contains("attached-nexthop: 10.0.0.2 dev 3"));

    let out = path::show(&fib, Some(path_idx)).unwrap();
    assert!(out.contains("attached-nexthop"));

    path::destroy(&mut fib, path_idx);
    let err = path::show(&fib, Some(path_idx)).unwrap_err();
    err.log();
    assert!(matches!(err, Error::PathNotFound(_)));

    // Unknown table on withdrawal is an operational error.
    let err = table::route_remove(
        &mut fib,
        FibProtocol::Ipv6,
        99,
        &FibPrefix::Ip(net4!("8.8.8.8/32").into()),
        FibSource::Rib,
    )
    .unwrap_err();
    assert!(matches!(err, Error::TableNotFound(FibProtocol::Ipv6, 99)));
}

// Encoding non-exclusive paths leaves the descriptor's DPO empty.
#[test]
fn test_encode() {
    let mut fib = fib_with_interfaces();

    let (plist_idx, path_idx) = one_path(
        &mut fib,
        PathCfgFlags::empty(),
        &rpath(|r| {
            r.nexthop = ip4!("10.0.0.2").into();
            r.ifindex = Some(3);
            r.weight = 2;
        }),
    );

    let encoded = path_list::encode(&fib, plist_idx);
    assert_eq!(encoded.len(), 1);
    let encoded = &encoded[0];
    assert_eq!(encoded.nexthop, IpAddr::from(ip4!("10.0.0.2")));
    assert_eq!(encoded.ifindex, Some(3));
    assert_eq!(encoded.weight, 2);
    assert_eq!(encoded.dpo, None);
    assert_eq!(
        fib.paths[path_idx].cmp_with_rpath(encoded),
        Ordering::Equal
    );
}
