//! Arena indices.
//!
//! Nodes never point at each other directly: sub-expressions, resolved
//! bindings and function references are all `u32` indices into the flat
//! vectors of a [`Module`](crate::Module). Indices are `Copy`, hash in O(1)
//! and serialize as plain integers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(index: u32) -> Self {
                $name(index)
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of an expression node.
    ExprId
);
arena_id!(
    /// Index of a declaration (anything that introduces a name).
    DeclId
);
arena_id!(
    /// Index of a function definition.
    FuncId
);
