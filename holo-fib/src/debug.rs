//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::{debug, debug_span};

use crate::adjacency::Adjacency;
use crate::collections::PathIndex;
use crate::dpo::Dpo;
use crate::path::PathType;
use crate::table::FibPrefix;
use crate::walk::BackWalkReason;

// FIB debug messages.
#[derive(Debug)]
pub enum Debug<'a> {
    AdjacencyCreate(&'a Adjacency),
    AdjacencyDelete(&'a Adjacency),
    AdjacencyRewriteUpdate(&'a Adjacency, bool),
    EntryCreate(&'a FibPrefix),
    EntryDelete(&'a FibPrefix),
    EntryRestack(&'a FibPrefix, &'a Dpo),
    InterfaceAdd(&'a str, u32),
    InterfaceAdminStatus(u32, bool),
    InterfaceDelete(u32),
    PathCreate(PathIndex, PathType),
    PathCopy(PathIndex, PathIndex),
    PathDestroy(PathIndex),
    PathResolve(PathIndex, bool),
    PathUnresolve(PathIndex),
    PathBackWalk(PathIndex, BackWalkReason),
    PathRecursiveLoop(PathIndex, bool),
    PathRestack(PathIndex, &'a Dpo),
    PicEdgeNotify(PathIndex),
    WalkDepthLimit(u8),
}

// ===== impl Debug =====

impl Debug<'_> {
    // Log debug message using the tracing API.
    pub(crate) fn log(&self) {
        match self {
            Debug::AdjacencyCreate(adj) | Debug::AdjacencyDelete(adj) => {
                debug_span!("adjacency", link = ?adj.link, nexthop = %adj.nexthop, ifindex = %adj.ifindex)
                    .in_scope(|| {
                        debug!("{}", self);
                    });
            }
            Debug::AdjacencyRewriteUpdate(adj, up) => {
                debug_span!("adjacency", link = ?adj.link, nexthop = %adj.nexthop, ifindex = %adj.ifindex)
                    .in_scope(|| {
                        debug!(%up, "{}", self);
                    });
            }
            Debug::EntryCreate(prefix) | Debug::EntryDelete(prefix) => {
                debug_span!("entry", %prefix).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::EntryRestack(prefix, dpo) => {
                debug_span!("entry", %prefix).in_scope(|| {
                    debug!(%dpo, "{}", self);
                });
            }
            Debug::InterfaceAdd(name, ifindex) => {
                debug_span!("interface", %name, %ifindex).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::InterfaceAdminStatus(ifindex, up) => {
                debug_span!("interface", %ifindex).in_scope(|| {
                    debug!(%up, "{}", self);
                });
            }
            Debug::InterfaceDelete(ifindex) => {
                debug_span!("interface", %ifindex).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::PathCreate(path_idx, path_type) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(?path_type, "{}", self);
                });
            }
            Debug::PathCopy(src_idx, path_idx) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(source = ?src_idx, "{}", self);
                });
            }
            Debug::PathDestroy(path_idx) | Debug::PathUnresolve(path_idx) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::PathResolve(path_idx, resolved) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(%resolved, "{}", self);
                });
            }
            Debug::PathBackWalk(path_idx, reasons) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(?reasons, "{}", self);
                });
            }
            Debug::PathRecursiveLoop(path_idx, looped) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(%looped, "{}", self);
                });
            }
            Debug::PathRestack(path_idx, dpo) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!(%dpo, "{}", self);
                });
            }
            Debug::PicEdgeNotify(path_idx) => {
                debug_span!("path", index = ?path_idx).in_scope(|| {
                    debug!("{}", self);
                });
            }
            Debug::WalkDepthLimit(depth) => {
                debug!(%depth, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Debug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Debug::AdjacencyCreate(..) => {
                write!(f, "adjacency create")
            }
            Debug::AdjacencyDelete(..) => {
                write!(f, "adjacency delete")
            }
            Debug::AdjacencyRewriteUpdate(..) => {
                write!(f, "adjacency rewrite update")
            }
            Debug::EntryCreate(..) => {
                write!(f, "entry create")
            }
            Debug::EntryDelete(..) => {
                write!(f, "entry delete")
            }
            Debug::EntryRestack(..) => {
                write!(f, "entry restack")
            }
            Debug::InterfaceAdd(..) => {
                write!(f, "interface add")
            }
            Debug::InterfaceAdminStatus(..) => {
                write!(f, "interface admin status change")
            }
            Debug::InterfaceDelete(..) => {
                write!(f, "interface delete")
            }
            Debug::PathCreate(..) => {
                write!(f, "path create")
            }
            Debug::PathCopy(..) => {
                write!(f, "path copy")
            }
            Debug::PathDestroy(..) => {
                write!(f, "path destroy")
            }
            Debug::PathResolve(..) => {
                write!(f, "path resolve")
            }
            Debug::PathUnresolve(..) => {
                write!(f, "path unresolve")
            }
            Debug::PathBackWalk(..) => {
                write!(f, "path back-walk")
            }
            Debug::PathRecursiveLoop(..) => {
                write!(f, "path recursive loop change")
            }
            Debug::PathRestack(..) => {
                write!(f, "path restack")
            }
            Debug::PicEdgeNotify(..) => {
                write!(f, "PIC-edge state change")
            }
            Debug::WalkDepthLimit(..) => {
                write!(f, "back-walk depth limit reached")
            }
        }
    }
}
