//! Erase policies.
//!
//! A policy decides what happens to a slot when its entry is erased, and with
//! it how many metadata bits each slot needs:
//!
//! - [`BackwardShift`] leaves no trace of the erased entry. Later members of
//!   the same probe run are pulled back into the hole so that every lookup
//!   still terminates at the first empty slot. One metadata bit per slot.
//! - [`Tombstone`] marks the slot as deleted. Nothing moves, lookups probe past
//!   deleted slots and insertions reuse them. Two metadata bits per slot.
//!
//! Policies are zero-sized marker types selected through a type parameter on
//! [`HashTable`](crate::HashTable) and [`HashMap`](crate::HashMap); the trait
//! is sealed.

use crate::metadata::MetaWord;
use crate::metadata::SlotState;
use crate::storage::SlotsMut;

pub(crate) mod sealed {
    use super::*;

    pub trait Sealed: Sized {
        /// Whether erasing may move other live entries to different slots.
        const RELOCATES: bool;

        /// Retires `index`, whose entry has already been moved out.
        fn vacate<K, V, H>(slots: &mut SlotsMut<'_, K, V, Self>, index: usize, rehash: &H)
        where
            Self: super::ErasePolicy,
            H: Fn(&K) -> u64;
    }
}

/// Strategy for erasing entries from a linear-probing table.
///
/// This trait is sealed; the crate provides [`BackwardShift`] and
/// [`Tombstone`].
pub trait ErasePolicy: sealed::Sealed + 'static {
    /// Metadata bits recorded for each slot.
    const BITS_PER_SLOT: u32;
    /// Mask selecting the "occupied" bit of every slot packed in a word.
    const OCCUPIED_MASK: u32;
}

/// Backward-shift deletion.
///
/// After an erase, the following entries of the probe run are walked until an
/// empty slot. An entry is moved into the hole unless its home slot lies
/// cyclically within `(hole, position]`, in which case moving it would put it
/// before its home. Each moved entry leaves a new hole behind.
///
/// Erasing any key may relocate other entries, so slot indices obtained from
/// the cursor API are invalidated by every erase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BackwardShift;

/// Tombstone deletion.
///
/// Erased slots become [`SlotState::Deleted`]. Lookups keep probing past them
/// and insertions reuse them. No entry ever moves on erase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tombstone;

impl ErasePolicy for BackwardShift {
    const BITS_PER_SLOT: u32 = 1;
    const OCCUPIED_MASK: MetaWord = 0xFFFF_FFFF;
}

impl ErasePolicy for Tombstone {
    const BITS_PER_SLOT: u32 = 2;
    const OCCUPIED_MASK: MetaWord = 0x5555_5555;
}

impl sealed::Sealed for BackwardShift {
    const RELOCATES: bool = true;

    fn vacate<K, V, H>(slots: &mut SlotsMut<'_, K, V, Self>, index: usize, rehash: &H)
    where
        H: Fn(&K) -> u64,
    {
        let mask = slots.capacity() - 1;
        let mut hole = index;
        slots.set_state(hole, SlotState::Empty);

        let mut probe = hole;
        loop {
            probe = (probe + 1) & mask;
            if slots.state(probe) == SlotState::Empty {
                break;
            }

            // SAFETY: `probe` is occupied.
            let home = rehash(unsafe { slots.key(probe) }) as usize & mask;
            let reachable_from_home = if hole <= probe {
                hole < home && home <= probe
            } else {
                hole < home || home <= probe
            };
            if reachable_from_home {
                continue;
            }

            slots.relocate(probe, hole);
            slots.set_state(hole, SlotState::Occupied);
            slots.set_state(probe, SlotState::Empty);
            hole = probe;
        }
    }
}

impl sealed::Sealed for Tombstone {
    const RELOCATES: bool = false;

    fn vacate<K, V, H>(slots: &mut SlotsMut<'_, K, V, Self>, index: usize, _rehash: &H)
    where
        H: Fn(&K) -> u64,
    {
        slots.set_state(index, SlotState::Deleted);
    }
}
