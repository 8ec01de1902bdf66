#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// A map keyed by any `Hash + Eq` type, built on [`HashTable`].
///
/// This module provides a `HashMap` that wraps the `HashTable` and hashes keys
/// with a configurable [`BuildHasher`](core::hash::BuildHasher).
pub mod hash_map;

pub mod hash_table;

pub mod policy;

mod metadata;
mod probe;
mod storage;

pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::HashTable;
pub use hash_table::SlotState;
pub use policy::BackwardShift;
pub use policy::ErasePolicy;
pub use policy::Tombstone;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`HashMap`] when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`HashMap`] when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder hash builder when neither `foldhash` nor `std` is
        /// enabled. It cannot be constructed; supply a hasher explicitly with
        /// [`HashMap::with_hasher`].
        pub enum DefaultHashBuilder {}
    }
}
