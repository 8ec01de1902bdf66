//! Linear probe sequences.
//!
//! Probing starts at the home slot `hash & (capacity - 1)` and advances one
//! slot at a time, wrapping at the end of the table. Both functions work on a
//! storage view rather than a table so growth can place entries directly into
//! a freshly allocated generation.

use crate::metadata::SlotState;
use crate::policy::ErasePolicy;
use crate::storage::Slots;

#[inline(always)]
pub(crate) fn home(hash: u64, capacity: usize) -> usize {
    hash as usize & (capacity - 1)
}

/// Finds the slot holding a key matching `eq`.
///
/// Stops at the first empty slot, or after one full cycle when the table holds
/// no empty slot at all (possible once tombstones accumulate).
pub(crate) fn locate<K, V, P: ErasePolicy>(
    slots: Slots<'_, K, V, P>,
    hash: u64,
    mut eq: impl FnMut(&K) -> bool,
) -> Option<usize> {
    let mask = slots.capacity() - 1;
    let mut index = home(hash, slots.capacity());
    for _ in 0..slots.capacity() {
        match slots.state(index) {
            SlotState::Empty => return None,
            // SAFETY: The slot is occupied.
            SlotState::Occupied if eq(unsafe { slots.key(index) }) => return Some(index),
            SlotState::Occupied | SlotState::Deleted => {}
        }
        index = (index + 1) & mask;
    }
    None
}

/// Finds the first empty or deleted slot on the probe sequence of `hash`.
///
/// The caller guarantees at least one such slot exists.
pub(crate) fn vacant<K, V, P: ErasePolicy>(slots: Slots<'_, K, V, P>, hash: u64) -> usize {
    let mask = slots.capacity() - 1;
    let mut index = home(hash, slots.capacity());
    while slots.state(index) == SlotState::Occupied {
        index = (index + 1) & mask;
    }
    index
}

/// Cyclic distance from an entry's home slot to where it actually sits.
#[cfg(any(test, feature = "stats"))]
pub(crate) fn displacement(home: usize, index: usize, capacity: usize) -> usize {
    index.wrapping_sub(home) & (capacity - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::BackwardShift;
    use crate::policy::Tombstone;
    use crate::storage::SlotStorage;

    #[test]
    fn locate_walks_run_and_stops_at_empty() {
        let mut storage = SlotStorage::<u64, (), BackwardShift, 8>::new(8);
        let mut slots = storage.slots_mut();
        slots.construct_in_place(6, 6, ());
        slots.construct_in_place(7, 14, ());
        slots.construct_in_place(0, 22, ());

        let slots = storage.slots();
        assert_eq!(locate(slots, 22, |&k| k == 22), Some(0));
        assert_eq!(locate(slots, 14, |&k| k == 14), Some(7));
        assert_eq!(locate(slots, 30, |&k| k == 30), None);
        assert_eq!(vacant(slots, 6), 1);
        assert_eq!(vacant(slots, 3), 3);
    }

    #[test]
    fn locate_probes_past_tombstones() {
        let mut storage = SlotStorage::<u64, (), Tombstone, 8>::new(8);
        let mut slots = storage.slots_mut();
        slots.construct_in_place(2, 2, ());
        slots.construct_in_place(3, 10, ());
        slots.set_state(2, SlotState::Deleted);

        let slots = storage.slots();
        assert_eq!(locate(slots, 10, |&k| k == 10), Some(3));
        assert_eq!(vacant(slots, 10), 2);
    }

    #[test]
    fn locate_terminates_without_empty_slots() {
        let mut storage = SlotStorage::<u64, (), Tombstone, 8>::new(8);
        let mut slots = storage.slots_mut();
        for index in 0..8 {
            slots.construct_in_place(index, index as u64, ());
            slots.set_state(index, SlotState::Deleted);
        }
        slots.construct_in_place(5, 5, ());

        assert_eq!(locate(storage.slots(), 9, |&k| k == 9), None);
        assert_eq!(locate(storage.slots(), 13, |&k| k == 5), Some(5));
    }

    #[test]
    fn displacement_wraps() {
        assert_eq!(displacement(6, 6, 8), 0);
        assert_eq!(displacement(6, 1, 8), 3);
        assert_eq!(displacement(0, 7, 8), 7);
    }
}
