//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;

use crate::collections::PathIndex;
use crate::debug::Debug;
use crate::dpo::{Dpo, FibProtocol};

// One element of a multipath hash key: the contribution of a single path.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(new)]
pub struct LoadBalancePath {
    pub path: PathIndex,
    pub weight: u32,
    pub dpo: Dpo,
}

// Multipath forwarding object: a weighted bucket set built from the
// resolved members of a path-list.
#[derive(Debug)]
pub struct LoadBalance {
    pub proto: FibProtocol,
    pub buckets: Vec<LoadBalancePath>,
}

// PIC-edge signalling towards the load-balance maps.
//
// A recursive path whose RESOLVE_VIA_* predicate flips records itself here
// so forwarding entries can pre-compute alternate buckets before the
// back-walk finishes rippling.
#[derive(Debug, Default)]
pub struct LoadBalanceMaps {
    pending: Vec<PathIndex>,
}

// ===== impl LoadBalanceMaps =====

impl LoadBalanceMaps {
    pub(crate) fn path_state_change(&mut self, path: PathIndex) {
        Debug::PicEdgeNotify(path).log();
        if !self.pending.contains(&path) {
            self.pending.push(path);
        }
    }

    pub fn has_pending(&self, path: PathIndex) -> bool {
        self.pending.contains(&path)
    }

    // Drains the recorded state changes.
    pub fn take_pending(&mut self) -> Vec<PathIndex> {
        std::mem::take(&mut self.pending)
    }
}
