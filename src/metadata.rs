//! Bit-packed per-slot state words.
//!
//! Each slot's state occupies [`ErasePolicy::BITS_PER_SLOT`] bits of a
//! [`MetaWord`]; slot `i` lives in word `i / slots_per_word` at bit offset
//! `(i % slots_per_word) * BITS_PER_SLOT`. Bits past the table's capacity are
//! always zero, so whole-word scans never report phantom slots.

use crate::policy::ErasePolicy;

pub(crate) type MetaWord = u32;

const EMPTY: MetaWord = 0b00;
const OCCUPIED: MetaWord = 0b01;
const DELETED: MetaWord = 0b10;

/// The lifecycle state of a single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never held an entry, or was vacated by a relocating erase.
    Empty,
    /// Holds an initialized key and value.
    Occupied,
    /// Held an entry which was erased; probing continues past it.
    Deleted,
}

impl SlotState {
    #[inline(always)]
    fn encode(self) -> MetaWord {
        match self {
            SlotState::Empty => EMPTY,
            SlotState::Occupied => OCCUPIED,
            SlotState::Deleted => DELETED,
        }
    }

    #[inline(always)]
    fn decode(bits: MetaWord) -> Self {
        match bits {
            EMPTY => SlotState::Empty,
            OCCUPIED => SlotState::Occupied,
            _ => SlotState::Deleted,
        }
    }
}

#[inline(always)]
pub(crate) const fn slots_per_word<P: ErasePolicy>() -> usize {
    (MetaWord::BITS / P::BITS_PER_SLOT) as usize
}

#[inline(always)]
const fn slot_mask<P: ErasePolicy>() -> MetaWord {
    MetaWord::MAX >> (MetaWord::BITS - P::BITS_PER_SLOT)
}

/// Number of words needed to describe `capacity` slots.
pub(crate) const fn words_for<P: ErasePolicy>(capacity: usize) -> usize {
    capacity.div_ceil(slots_per_word::<P>())
}

#[inline(always)]
fn position<P: ErasePolicy>(index: usize) -> (usize, u32) {
    let per_word = slots_per_word::<P>();
    (index / per_word, (index % per_word) as u32 * P::BITS_PER_SLOT)
}

#[inline(always)]
pub(crate) fn state<P: ErasePolicy>(words: &[MetaWord], index: usize) -> SlotState {
    let (word, shift) = position::<P>(index);
    SlotState::decode((words[word] >> shift) & slot_mask::<P>())
}

#[inline(always)]
pub(crate) fn set_state<P: ErasePolicy>(words: &mut [MetaWord], index: usize, state: SlotState) {
    debug_assert!(
        state != SlotState::Deleted || P::BITS_PER_SLOT > 1,
        "policy cannot encode deleted slots"
    );
    let (word, shift) = position::<P>(index);
    let cleared = words[word] & !(slot_mask::<P>() << shift);
    words[word] = cleared | (state.encode() << shift);
}

/// Index of the lowest occupied slot in `live`, which must be non-zero.
#[inline(always)]
fn lowest<P: ErasePolicy>(word: usize, live: MetaWord) -> usize {
    word * slots_per_word::<P>() + (live.trailing_zeros() / P::BITS_PER_SLOT) as usize
}

pub(crate) fn first_occupied<P: ErasePolicy>(words: &[MetaWord]) -> Option<usize> {
    words
        .iter()
        .enumerate()
        .find_map(|(word, &bits)| {
            let live = bits & P::OCCUPIED_MASK;
            (live != 0).then(|| lowest::<P>(word, live))
        })
}

/// Finds the first occupied slot strictly after `index`.
pub(crate) fn next_occupied<P: ErasePolicy>(words: &[MetaWord], index: usize) -> Option<usize> {
    let (word, shift) = position::<P>(index);
    let shift = shift + P::BITS_PER_SLOT;
    if shift < MetaWord::BITS {
        let live = words[word] & P::OCCUPIED_MASK & (MetaWord::MAX << shift);
        if live != 0 {
            return Some(lowest::<P>(word, live));
        }
    }

    words[word + 1..]
        .iter()
        .enumerate()
        .find_map(|(offset, &bits)| {
            let live = bits & P::OCCUPIED_MASK;
            (live != 0).then(|| lowest::<P>(word + 1 + offset, live))
        })
}

#[cfg(any(test, feature = "stats"))]
pub(crate) fn count<P: ErasePolicy>(words: &[MetaWord], capacity: usize, target: SlotState) -> usize {
    (0..capacity)
        .filter(|&index| state::<P>(words, index) == target)
        .count()
}
