//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use tracing::warn;

use crate::collections::PathIndex;
use crate::dpo::FibProtocol;

// FIB errors.
//
// Internal invariant violations are not represented here; they halt
// execution instead.
#[derive(Debug)]
pub enum Error {
    PathNotFound(PathIndex),
    TableNotFound(FibProtocol, u32),
}

// ===== impl Error =====

impl Error {
    pub fn log(&self) {
        match self {
            Error::PathNotFound(path_idx) => {
                warn!(?path_idx, "{}", self);
            }
            Error::TableNotFound(proto, table_id) => {
                warn!(%proto, %table_id, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::PathNotFound(..) => {
                write!(f, "path not found")
            }
            Error::TableNotFound(..) => {
                write!(f, "table not found")
            }
        }
    }
}

impl std::error::Error for Error {}
