//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};

// Unicast reverse-path-forwarding list: the set of interfaces a source
// address may legitimately arrive on.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct UrpfList {
    itfs: Vec<u32>,
}

// ===== impl UrpfList =====

impl UrpfList {
    // Appends an interface, ignoring duplicates.
    pub fn append(&mut self, ifindex: u32) {
        if !self.itfs.contains(&ifindex) {
            self.itfs.push(ifindex);
        }
    }

    pub fn contains(&self, ifindex: u32) -> bool {
        self.itfs.contains(&ifindex)
    }

    pub fn len(&self) -> usize {
        self.itfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itfs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.itfs.iter().copied()
    }
}
