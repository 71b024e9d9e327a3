//! Stable identifiers for simulation entities
//!
//! Entities never hold references to each other. A resource names its holder
//! by `ProcessId`, a block names its occupant by `ProcessId`/`PageId`, so the
//! wait-for graph and the block map are plain id-to-id edges.

use serde::Serialize;
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Returns the inner index.
            #[inline]
            pub fn index(&self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(val: usize) -> Self {
                Self(val)
            }
        }

        impl From<$name> for usize {
            fn from(val: $name) -> Self {
                val.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(
                &self,
                f: &mut fmt::Formatter<'_>,
            ) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }
    };
}

entity_id!(
    /// Position of a process in the process table (creation order).
    ProcessId,
    "Process"
);

entity_id!(
    /// Position of a resource in the resource table (creation order).
    ResourceId,
    "Resource"
);

entity_id!(
    /// Position of a block in the memory pool. Block order is fixed at construction.
    BlockId,
    "Block"
);

entity_id!(
    /// Ordinal of a page within its owning process, 0-based.
    PageId,
    "Page"
);
