//! Backing memory for the table's slots.
//!
//! A table of capacity `N` lives entirely inside the owning value; anything
//! larger lives in a single heap block laid out as metadata words, then keys,
//! then values. Storage never drops keys or values; element lifetimes are the
//! table's business.

use alloc::alloc::Layout;
use alloc::alloc::handle_alloc_error;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::metadata;
use crate::metadata::MetaWord;
use crate::metadata::SlotState;
use crate::policy::ErasePolicy;

struct DataLayout {
    layout: Layout,
    keys_offset: usize,
    values_offset: usize,
}

impl DataLayout {
    fn new<K, V>(capacity: usize, words: usize) -> Self {
        let meta_layout = Layout::array::<MetaWord>(words).expect("capacity overflow");
        let keys_layout = Layout::array::<MaybeUninit<K>>(capacity).expect("capacity overflow");
        let values_layout = Layout::array::<MaybeUninit<V>>(capacity).expect("capacity overflow");

        let (layout, keys_offset) = meta_layout.extend(keys_layout).expect("capacity overflow");
        let (layout, values_offset) = layout.extend(values_layout).expect("capacity overflow");

        DataLayout {
            layout,
            keys_offset,
            values_offset,
        }
    }
}

// One word followed by `N` spare bytes. A word covers at least 16 slots, so
// `4 + N` bytes always hold the `words_for(N)` words an inline table needs.
// Fields are only read through `words`.
#[allow(dead_code)]
#[repr(C)]
struct InlineMeta<const N: usize> {
    head: MetaWord,
    tail: [u8; N],
}

impl<const N: usize> InlineMeta<N> {
    const BYTES: usize = core::mem::size_of::<MetaWord>() + N;

    fn new() -> Self {
        InlineMeta {
            head: 0,
            tail: [0; N],
        }
    }

    fn words(&self, words: usize) -> &[MetaWord] {
        debug_assert!(words * core::mem::size_of::<MetaWord>() <= Self::BYTES);
        // SAFETY: `repr(C)` puts `tail` directly after `head` with no padding
        // (`u8` has alignment 1), so the first `BYTES` bytes are initialized,
        // aligned for `MetaWord`, and cover `words` words. Every bit pattern
        // is a valid `MetaWord`.
        unsafe { core::slice::from_raw_parts((self as *const Self).cast::<MetaWord>(), words) }
    }

    fn words_mut(&mut self, words: usize) -> &mut [MetaWord] {
        debug_assert!(words * core::mem::size_of::<MetaWord>() <= Self::BYTES);
        // SAFETY: As for `words`, through an exclusive borrow of the whole
        // struct.
        unsafe { core::slice::from_raw_parts_mut((self as *mut Self).cast::<MetaWord>(), words) }
    }
}

struct InlineSlots<K, V, const N: usize> {
    meta: InlineMeta<N>,
    keys: [MaybeUninit<K>; N],
    values: [MaybeUninit<V>; N],
}

struct HeapSlots<K, V> {
    layout: DataLayout,
    alloc: NonNull<u8>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> HeapSlots<K, V> {
    fn new(capacity: usize, words: usize) -> Self {
        let layout = DataLayout::new::<K, V>(capacity, words);
        // Metadata always occupies at least one word, so the layout is never empty.
        debug_assert!(layout.layout.size() != 0);

        // SAFETY: The layout size is non-zero. A null return is routed to
        // `handle_alloc_error`, and the metadata prefix is zeroed before use.
        unsafe {
            let raw_alloc = alloc::alloc::alloc(layout.layout);
            if raw_alloc.is_null() {
                handle_alloc_error(layout.layout);
            }
            core::ptr::write_bytes(raw_alloc.cast::<MetaWord>(), 0, words);

            HeapSlots {
                layout,
                alloc: NonNull::new_unchecked(raw_alloc),
                _phantom: PhantomData,
            }
        }
    }
}

impl<K, V> Drop for HeapSlots<K, V> {
    fn drop(&mut self) {
        // SAFETY: `alloc` was returned by `alloc` with exactly this layout.
        unsafe { alloc::alloc::dealloc(self.alloc.as_ptr(), self.layout.layout) }
    }
}

enum Block<K, V, const N: usize> {
    Inline(InlineSlots<K, V, N>),
    Heap(HeapSlots<K, V>),
}

/// Owner of the metadata, key, and value arrays for one table generation.
pub struct SlotStorage<K, V, P, const N: usize> {
    capacity: usize,
    words: usize,
    block: Block<K, V, N>,
    _policy: PhantomData<P>,
}

impl<K, V, P: ErasePolicy, const N: usize> SlotStorage<K, V, P, N> {
    /// `capacity` must be a power of two no smaller than `N`; exactly `N`
    /// selects the inline buffer.
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two() && capacity >= N);
        let words = metadata::words_for::<P>(capacity);

        let block = if capacity == N {
            Block::Inline(InlineSlots {
                meta: InlineMeta::new(),
                keys: [const { MaybeUninit::uninit() }; N],
                values: [const { MaybeUninit::uninit() }; N],
            })
        } else {
            Block::Heap(HeapSlots::new(capacity, words))
        };

        SlotStorage {
            capacity,
            words,
            block,
            _policy: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn is_inline(&self) -> bool {
        matches!(self.block, Block::Inline(_))
    }

    #[cfg(any(test, feature = "stats"))]
    pub(crate) fn total_bytes(&self) -> usize {
        match &self.block {
            Block::Inline(_) => core::mem::size_of::<InlineSlots<K, V, N>>(),
            Block::Heap(heap) => heap.layout.layout.size(),
        }
    }

    pub(crate) fn slots(&self) -> Slots<'_, K, V, P> {
        match &self.block {
            Block::Inline(inline) => Slots {
                meta: inline.meta.words(self.words),
                keys: &inline.keys,
                values: &inline.values,
                _policy: PhantomData,
            },
            // SAFETY: The block holds `words` metadata words at offset zero,
            // followed by `capacity` keys and `capacity` values at the layout's
            // offsets. Metadata is always initialized.
            Block::Heap(heap) => unsafe {
                let base = heap.alloc.as_ptr();
                Slots {
                    meta: core::slice::from_raw_parts(base.cast::<MetaWord>(), self.words),
                    keys: core::slice::from_raw_parts(
                        base.add(heap.layout.keys_offset).cast::<MaybeUninit<K>>(),
                        self.capacity,
                    ),
                    values: core::slice::from_raw_parts(
                        base.add(heap.layout.values_offset).cast::<MaybeUninit<V>>(),
                        self.capacity,
                    ),
                    _policy: PhantomData,
                }
            },
        }
    }

    pub(crate) fn slots_mut(&mut self) -> SlotsMut<'_, K, V, P> {
        match &mut self.block {
            Block::Inline(inline) => SlotsMut {
                meta: inline.meta.words_mut(self.words),
                keys: &mut inline.keys,
                values: &mut inline.values,
                _policy: PhantomData,
            },
            // SAFETY: As for `slots`; the three regions are disjoint, and the
            // exclusive borrow of `self` covers the whole block.
            Block::Heap(heap) => unsafe {
                let base = heap.alloc.as_ptr();
                SlotsMut {
                    meta: core::slice::from_raw_parts_mut(base.cast::<MetaWord>(), self.words),
                    keys: core::slice::from_raw_parts_mut(
                        base.add(heap.layout.keys_offset).cast::<MaybeUninit<K>>(),
                        self.capacity,
                    ),
                    values: core::slice::from_raw_parts_mut(
                        base.add(heap.layout.values_offset).cast::<MaybeUninit<V>>(),
                        self.capacity,
                    ),
                    _policy: PhantomData,
                }
            },
        }
    }
}

// SAFETY: Storage owns its keys and values like a `Vec<(K, V)>` would.
unsafe impl<K: Send, V: Send, P, const N: usize> Send for SlotStorage<K, V, P, N> {}
// SAFETY: Shared access only ever hands out shared references.
unsafe impl<K: Sync, V: Sync, P, const N: usize> Sync for SlotStorage<K, V, P, N> {}

/// Shared view of a storage generation.
pub struct Slots<'a, K, V, P> {
    pub(crate) meta: &'a [MetaWord],
    keys: &'a [MaybeUninit<K>],
    values: &'a [MaybeUninit<V>],
    _policy: PhantomData<P>,
}

impl<K, V, P> Clone for Slots<'_, K, V, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, P> Copy for Slots<'_, K, V, P> {}

impl<'a, K, V, P: ErasePolicy> Slots<'a, K, V, P> {
    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.keys.len()
    }

    #[inline(always)]
    pub(crate) fn state(&self, index: usize) -> SlotState {
        metadata::state::<P>(self.meta, index)
    }

    pub(crate) fn first_occupied(&self) -> Option<usize> {
        metadata::first_occupied::<P>(self.meta)
    }

    pub(crate) fn next_occupied(&self, index: usize) -> Option<usize> {
        metadata::next_occupied::<P>(self.meta, index)
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn key(&self, index: usize) -> &'a K {
        let keys: &'a [MaybeUninit<K>] = self.keys;
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe { keys.get_unchecked(index).assume_init_ref() }
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn value(&self, index: usize) -> &'a V {
        let values: &'a [MaybeUninit<V>] = self.values;
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe { values.get_unchecked(index).assume_init_ref() }
    }
}

/// Exclusive view of a storage generation.
pub struct SlotsMut<'a, K, V, P> {
    meta: &'a mut [MetaWord],
    keys: &'a mut [MaybeUninit<K>],
    values: &'a mut [MaybeUninit<V>],
    _policy: PhantomData<P>,
}

impl<'a, K, V, P: ErasePolicy> SlotsMut<'a, K, V, P> {
    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn as_slots(&self) -> Slots<'_, K, V, P> {
        Slots {
            meta: &*self.meta,
            keys: &*self.keys,
            values: &*self.values,
            _policy: PhantomData,
        }
    }

    #[inline(always)]
    pub(crate) fn state(&self, index: usize) -> SlotState {
        metadata::state::<P>(self.meta, index)
    }

    #[inline(always)]
    pub(crate) fn set_state(&mut self, index: usize, state: SlotState) {
        metadata::set_state::<P>(self.meta, index, state);
    }

    /// Writes an entry into a vacant slot and marks it occupied.
    ///
    /// Writing over an occupied slot leaks the previous entry.
    #[inline(always)]
    pub(crate) fn construct_in_place(&mut self, index: usize, key: K, value: V) {
        debug_assert!(self.state(index) != SlotState::Occupied);
        self.keys[index].write(key);
        self.values[index].write(value);
        self.set_state(index, SlotState::Occupied);
    }

    /// Moves the entry out of `index`. The slot's state is left untouched.
    ///
    /// # Safety
    ///
    /// Slot `index` must be occupied, and the caller must retire it before the
    /// entry can be observed again.
    #[inline(always)]
    pub(crate) unsafe fn take(&mut self, index: usize) -> (K, V) {
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe {
            (
                self.keys.get_unchecked(index).assume_init_read(),
                self.values.get_unchecked(index).assume_init_read(),
            )
        }
    }

    /// Drops the entry at `index` and marks the slot empty.
    ///
    /// # Safety
    ///
    /// Slot `index` must be occupied.
    pub(crate) unsafe fn destroy_in_place(&mut self, index: usize) {
        self.set_state(index, SlotState::Empty);
        // SAFETY: Caller guarantees the slot is initialized. The state was
        // cleared first so a panicking destructor cannot cause a double drop.
        unsafe {
            self.keys.get_unchecked_mut(index).assume_init_drop();
            self.values.get_unchecked_mut(index).assume_init_drop();
        }
    }

    /// Swaps the raw contents of two slots without touching metadata.
    #[inline(always)]
    pub(crate) fn relocate(&mut self, from: usize, to: usize) {
        self.keys.swap(from, to);
        self.values.swap(from, to);
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn key(&self, index: usize) -> &K {
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe { self.keys.get_unchecked(index).assume_init_ref() }
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    #[inline(always)]
    pub(crate) unsafe fn entry_mut(&mut self, index: usize) -> (&K, &mut V) {
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe {
            (
                self.keys.get_unchecked(index).assume_init_ref(),
                self.values.get_unchecked_mut(index).assume_init_mut(),
            )
        }
    }

    /// Like [`entry_mut`](Self::entry_mut), but for the full view lifetime.
    ///
    /// # Safety
    ///
    /// Slot `index` must be occupied.
    pub(crate) unsafe fn into_entry_mut(self, index: usize) -> (&'a K, &'a mut V) {
        let SlotsMut { keys, values, .. } = self;
        let keys: &'a [MaybeUninit<K>] = keys;
        // SAFETY: Caller guarantees the slot is initialized.
        unsafe {
            (
                keys.get_unchecked(index).assume_init_ref(),
                values.get_unchecked_mut(index).assume_init_mut(),
            )
        }
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        &'a mut [MetaWord],
        &'a [MaybeUninit<K>],
        &'a mut [MaybeUninit<V>],
    ) {
        (self.meta, self.keys, self.values)
    }

    pub(crate) fn clear_metadata(&mut self) {
        self.meta.fill(0);
    }
}
