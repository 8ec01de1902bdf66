//! A raw open-addressing table with linear probing.
//!
//! [`HashTable`] stores key/value pairs in a power-of-two array of slots. It
//! never hashes anything itself: every lookup takes a precomputed `u64` hash
//! and an equality predicate, and every operation which may move entries
//! (insertion, erasure, growth) takes a `rehash` closure that recomputes the
//! hash of a stored key. [`HashMap`](crate::HashMap) pairs the table with a
//! [`BuildHasher`](core::hash::BuildHasher).

use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

use crate::metadata;
use crate::metadata::MetaWord;
pub use crate::metadata::SlotState;
use crate::policy::BackwardShift;
use crate::policy::ErasePolicy;
use crate::probe;
use crate::storage::SlotStorage;
use crate::storage::Slots;

/// Number of slots held inline when no other inline capacity is chosen.
pub const DEFAULT_INLINE_CAPACITY: usize = 32;

/// Debug statistics for hash table analysis.
///
/// Requires the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Number of slots
    pub capacity: usize,
    /// Number of slots marked deleted
    pub tombstones: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Whether the slots live in the inline buffer
    pub inline: bool,
    /// Total memory in bytes used by the slot arrays and metadata
    pub total_bytes: usize,
    /// Bytes of key/value storage not holding a live entry
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.capacity,
            self.load_factor * 100.0
        );
        println!("Tombstones: {}", self.tombstones);
        println!(
            "Storage: {} ({} bytes)",
            if self.inline { "inline" } else { "heap" },
            self.total_bytes
        );
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// An open-addressing hash table using linear probing.
///
/// Capacity is measured in slots and is always a power of two no smaller than
/// the inline capacity `N`. While the capacity equals `N` the slots live inside
/// the table value itself; the first growth moves them to the heap. The table
/// grows by doubling whenever an insertion would push the number of entries
/// above half the capacity, so `len() * 2 <= capacity()` always holds.
///
/// The inline buffer holds `N` keys, `N` values, and `4 + N` bytes of slot
/// metadata, of which only the first `N / 4` (1 bit per slot) or `N / 2`
/// (2 bits per slot) bytes are used, rounded up to whole words.
///
/// What happens on erase is chosen by the policy `P`; see
/// [`policy`](crate::policy).
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hasher;
/// #
/// # use linprobe::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # fn hash(key: &u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     hasher.write_u64(*key);
/// #     hasher.finish()
/// # }
/// #
/// let mut table: HashTable<u64, &str> = HashTable::new();
///
/// if table.find(hash(&7), |&k| k == 7).is_none() {
///     table.insert_unique(hash(&7), 7, "seven", hash);
/// }
///
/// assert_eq!(table.find(hash(&7), |&k| k == 7), Some((&7, &"seven")));
/// assert_eq!(table.remove(hash(&7), |&k| k == 7, hash), Some((7, "seven")));
/// assert!(table.is_empty());
/// ```
pub struct HashTable<K, V, P: ErasePolicy = BackwardShift, const N: usize = DEFAULT_INLINE_CAPACITY>
{
    storage: SlotStorage<K, V, P, N>,
    populated: usize,
}

struct DebugEntries<'a, K, V, P: ErasePolicy, const N: usize>(&'a HashTable<K, V, P, N>);

impl<K: Debug, V: Debug, P: ErasePolicy, const N: usize> Debug for DebugEntries<'_, K, V, P, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Debug, V: Debug, P: ErasePolicy, const N: usize> Debug for HashTable<K, V, P, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;

        f.debug_struct("HashTable")
            .field(
                "metadata",
                &self
                    .storage
                    .slots()
                    .meta
                    .iter()
                    .map(|word| format!("{word:08x}"))
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .field("inline", &self.is_inline())
            .field("entries", &DebugEntries(self))
            .finish()
    }
}

impl<K: Clone, V: Clone, P: ErasePolicy, const N: usize> Clone for HashTable<K, V, P, N> {
    fn clone(&self) -> Self {
        let mut table = Self {
            storage: SlotStorage::new(self.capacity()),
            populated: 0,
        };

        // Entries keep their slot indices, so probe runs and tombstones carry
        // over without rehashing.
        let source = self.storage.slots();
        let mut target = table.storage.slots_mut();
        for index in 0..source.capacity() {
            match source.state(index) {
                SlotState::Occupied => {
                    // SAFETY: The source slot is occupied.
                    let (key, value) = unsafe { (source.key(index), source.value(index)) };
                    target.construct_in_place(index, key.clone(), value.clone());
                    table.populated += 1;
                }
                SlotState::Deleted => target.set_state(index, SlotState::Deleted),
                SlotState::Empty => {}
            }
        }

        debug_assert_eq!(table.populated, self.populated);
        table
    }
}

impl<K, V, P: ErasePolicy, const N: usize> Drop for HashTable<K, V, P, N> {
    fn drop(&mut self) {
        if !(core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>()) || self.populated == 0 {
            return;
        }

        let mut slots = self.storage.slots_mut();
        let mut cursor = slots.as_slots().first_occupied();
        while let Some(index) = cursor {
            // SAFETY: The cursor only visits occupied slots.
            unsafe { slots.destroy_in_place(index) };
            cursor = slots.as_slots().next_occupied(index);
        }
    }
}

impl<K, V, P: ErasePolicy, const N: usize> Default for HashTable<K, V, P, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, P: ErasePolicy, const N: usize> HashTable<K, V, P, N> {
    const VALID_INLINE_CAPACITY: () = assert!(
        N.is_power_of_two(),
        "inline capacity must be a non-zero power of two"
    );

    /// Creates an empty table using the inline buffer.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty table with at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two, and never drops below
    /// the inline capacity `N`.
    ///
    /// # Panics
    ///
    /// Panics if the rounded capacity overflows `usize` or the allocation
    /// size overflows `isize`. Allocation failure aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use linprobe::HashTable;
    /// #
    /// let table: HashTable<u32, u32> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// assert!(!table.is_inline());
    ///
    /// let table: HashTable<u32, u32> = HashTable::with_capacity(5);
    /// assert_eq!(table.capacity(), 32);
    /// assert!(table.is_inline());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::VALID_INLINE_CAPACITY;

        Self {
            storage: SlotStorage::new(Self::slots_for(capacity)),
            populated: 0,
        }
    }

    fn slots_for(requested: usize) -> usize {
        if requested <= N {
            N
        } else {
            requested
                .checked_next_power_of_two()
                .expect("capacity overflow")
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.storage.capacity()
    }

    /// Returns `true` while the slots live in the inline buffer.
    pub fn is_inline(&self) -> bool {
        self.storage.is_inline()
    }

    /// Returns the key and value matching `eq` on the probe sequence of
    /// `hash`.
    pub fn find(&self, hash: u64, eq: impl FnMut(&K) -> bool) -> Option<(&K, &V)> {
        let slots = self.storage.slots();
        let index = probe::locate(slots, hash, eq)?;
        // SAFETY: `locate` only returns occupied slots.
        Some(unsafe { (slots.key(index), slots.value(index)) })
    }

    /// Like [`find`](Self::find), with mutable access to the value.
    pub fn find_mut(&mut self, hash: u64, eq: impl FnMut(&K) -> bool) -> Option<(&K, &mut V)> {
        let index = probe::locate(self.storage.slots(), hash, eq)?;
        // SAFETY: `locate` only returns occupied slots.
        Some(unsafe { self.entry_at_mut(index) })
    }

    /// Returns the slot index of the entry matching `eq`.
    ///
    /// The index stays valid until the next insertion, erasure, or growth.
    pub fn find_index(&self, hash: u64, eq: impl FnMut(&K) -> bool) -> Option<usize> {
        probe::locate(self.storage.slots(), hash, eq)
    }

    /// Inserts an entry without checking whether an equal key is present.
    ///
    /// Returns the slot index the entry landed in. The caller must make sure
    /// the key is absent, typically with [`find`](Self::find); otherwise the
    /// table ends up with two entries for the key and lookups see only one of
    /// them.
    ///
    /// If the insertion would take the table above half full, capacity is
    /// doubled first and every entry is moved to the new slots using `rehash`.
    ///
    /// # Panics
    ///
    /// Panics if doubling the capacity overflows.
    pub fn insert_unique(
        &mut self,
        hash: u64,
        key: K,
        value: V,
        rehash: impl Fn(&K) -> u64,
    ) -> usize {
        if (self.populated + 1) * 2 > self.capacity() {
            let doubled = self.capacity().checked_mul(2).expect("capacity overflow");
            self.grow(doubled, &rehash);
        }

        let mut slots = self.storage.slots_mut();
        let index = probe::vacant(slots.as_slots(), hash);
        slots.construct_in_place(index, key, value);
        self.populated += 1;

        debug_assert!(self.populated * 2 <= self.capacity());
        index
    }

    /// Removes and returns the entry matching `eq`.
    ///
    /// Under [`BackwardShift`], other entries of the same probe run may move.
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl FnMut(&K) -> bool,
        rehash: impl Fn(&K) -> u64,
    ) -> Option<(K, V)> {
        let index = probe::locate(self.storage.slots(), hash, eq)?;
        // SAFETY: `locate` only returns occupied slots.
        Some(unsafe { self.erase_at(index, &rehash) })
    }

    /// Removes and returns the entry stored at slot `index`, if any.
    pub fn remove_index(&mut self, index: usize, rehash: impl Fn(&K) -> u64) -> Option<(K, V)> {
        if self.slot_state(index) != Some(SlotState::Occupied) {
            return None;
        }
        // SAFETY: Checked above.
        Some(unsafe { self.erase_at(index, &rehash) })
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    pub(crate) unsafe fn erase_at(&mut self, index: usize, rehash: &impl Fn(&K) -> u64) -> (K, V) {
        let mut slots = self.storage.slots_mut();
        // SAFETY: Caller guarantees the slot is occupied; `vacate` retires it
        // before anything else runs.
        let entry = unsafe { slots.take(index) };
        self.populated -= 1;
        P::vacate(&mut slots, index, rehash);
        entry
    }

    /// Grows the table to at least `min_capacity` slots.
    ///
    /// The new capacity is `min_capacity` rounded up to a power of two. Does
    /// nothing if the table is already large enough; the table never shrinks.
    pub fn reserve(&mut self, min_capacity: usize, rehash: impl Fn(&K) -> u64) {
        if min_capacity <= self.capacity() {
            return;
        }

        let capacity = min_capacity
            .checked_next_power_of_two()
            .expect("capacity overflow");
        self.grow(capacity, &rehash);
    }

    /// Moves every entry into a fresh storage generation of `capacity` slots.
    ///
    /// Tombstones are dropped along the way. If `rehash` panics, entries
    /// already moved are leaked and the entry being moved is dropped; nothing
    /// is dropped twice.
    #[cold]
    #[inline(never)]
    fn grow(&mut self, capacity: usize, rehash: &impl Fn(&K) -> u64) {
        debug_assert!(capacity.is_power_of_two() && capacity > self.capacity());

        #[cfg(feature = "logging")]
        log::debug!(
            "growing table from {} to {} slots with {} entries",
            self.capacity(),
            capacity,
            self.populated
        );

        let mut next = SlotStorage::<K, V, P, N>::new(capacity);
        {
            let mut old = self.storage.slots_mut();
            let mut new = next.slots_mut();

            let mut cursor = old.as_slots().first_occupied();
            while let Some(index) = cursor {
                old.set_state(index, SlotState::Empty);
                // SAFETY: The slot was occupied; its state was cleared above
                // so the old generation no longer owns the entry.
                let (key, value) = unsafe { old.take(index) };
                let target = probe::vacant(new.as_slots(), rehash(&key));
                new.construct_in_place(target, key, value);
                cursor = old.as_slots().next_occupied(index);
            }
        }

        self.storage = next;
    }

    /// Removes all entries, keeping the current capacity.
    pub fn clear(&mut self) {
        let mut slots = self.storage.slots_mut();
        if core::mem::needs_drop::<K>() || core::mem::needs_drop::<V>() {
            let mut cursor = slots.as_slots().first_occupied();
            while let Some(index) = cursor {
                // SAFETY: The cursor only visits occupied slots.
                unsafe { slots.destroy_in_place(index) };
                cursor = slots.as_slots().next_occupied(index);
            }
        }
        slots.clear_metadata();
        self.populated = 0;
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// Every entry is visited exactly once, even when erasures relocate
    /// entries that have not been visited yet.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool, rehash: impl Fn(&K) -> u64) {
        if self.populated == 0 {
            return;
        }

        let capacity = self.capacity();
        let mask = capacity - 1;
        // A relocating erase only ever pulls entries backwards into the slot
        // being visited, and never across an empty slot. Starting the walk just
        // past one keeps every pull inside the unvisited part of the walk.
        let start = if P::RELOCATES {
            let slots = self.storage.slots();
            (0..capacity)
                .find(|&index| slots.state(index) == SlotState::Empty)
                .unwrap_or(mask)
        } else {
            mask
        };

        let mut offset = 1;
        while offset <= capacity {
            let index = (start + offset) & mask;
            let mut slots = self.storage.slots_mut();
            if slots.state(index) == SlotState::Occupied {
                // SAFETY: The slot is occupied.
                let (key, value) = unsafe { slots.entry_mut(index) };
                if !keep(key, value) {
                    // SAFETY: The slot is occupied.
                    let entry = unsafe { slots.take(index) };
                    self.populated -= 1;
                    P::vacate(&mut slots, index, &rehash);
                    drop(entry);
                    if P::RELOCATES {
                        // Revisit: a later entry may have moved into this slot.
                        continue;
                    }
                }
            }
            offset += 1;
        }
    }

    /// Returns the state of slot `index`, or `None` past the end of the table.
    pub fn slot_state(&self, index: usize) -> Option<SlotState> {
        (index < self.capacity()).then(|| self.storage.slots().state(index))
    }

    /// Returns the index of the first occupied slot.
    ///
    /// Together with [`next_index`](Self::next_index) this walks the table by
    /// slot index; `None` marks the end. Indices are invalidated by any
    /// insertion, growth, or clear, and under [`BackwardShift`] also by any
    /// erase.
    pub fn first_index(&self) -> Option<usize> {
        self.storage.slots().first_occupied()
    }

    /// Returns the index of the next occupied slot after `index`.
    pub fn next_index(&self, index: usize) -> Option<usize> {
        if index >= self.capacity() {
            return None;
        }
        self.storage.slots().next_occupied(index)
    }

    /// Returns the entry stored at slot `index`, if any.
    pub fn get_index(&self, index: usize) -> Option<(&K, &V)> {
        if self.slot_state(index) != Some(SlotState::Occupied) {
            return None;
        }
        // SAFETY: Checked above.
        Some(unsafe { self.entry_at(index) })
    }

    /// Returns the entry stored at slot `index` with a mutable value.
    pub fn get_index_mut(&mut self, index: usize) -> Option<(&K, &mut V)> {
        if self.slot_state(index) != Some(SlotState::Occupied) {
            return None;
        }
        // SAFETY: Checked above.
        Some(unsafe { self.entry_at_mut(index) })
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    pub(crate) unsafe fn entry_at(&self, index: usize) -> (&K, &V) {
        let slots = self.storage.slots();
        // SAFETY: Caller guarantees the slot is occupied.
        unsafe { (slots.key(index), slots.value(index)) }
    }

    /// # Safety
    ///
    /// Slot `index` must be occupied.
    pub(crate) unsafe fn entry_at_mut(&mut self, index: usize) -> (&K, &mut V) {
        // SAFETY: Caller guarantees the slot is occupied.
        unsafe { self.storage.slots_mut().into_entry_mut(index) }
    }

    /// Returns an iterator over all entries in slot order.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        let slots = self.storage.slots();
        Iter {
            slots,
            cursor: slots.first_occupied(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over all entries with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, P> {
        let remaining = self.populated;
        let (meta, keys, values) = self.storage.slots_mut().into_parts();
        let meta: &[MetaWord] = meta;
        IterMut {
            cursor: metadata::first_occupied::<P>(meta),
            meta,
            keys,
            values: values.iter_mut(),
            consumed: 0,
            remaining,
            _policy: PhantomData,
        }
    }

    /// Removes and yields every entry.
    ///
    /// The table is empty once the iterator is dropped, whether or not it was
    /// fully consumed; capacity is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V, P, N> {
        // The slots are detached for the lifetime of the iterator and handed
        // back on drop. If the iterator is leaked, the table is left empty
        // and inline; undrained entries leak with it.
        let storage = core::mem::replace(&mut self.storage, SlotStorage::new(N));
        let remaining = core::mem::take(&mut self.populated);
        Drain {
            cursor: storage.slots().first_occupied(),
            storage,
            remaining,
            table: self,
        }
    }

    /// Moves the entry at `index` out, marks the slot empty, and returns the
    /// next occupied index.
    ///
    /// # Safety
    ///
    /// Slot `index` must be occupied.
    unsafe fn take_advance(&mut self, index: usize) -> ((K, V), Option<usize>) {
        let mut slots = self.storage.slots_mut();
        slots.set_state(index, SlotState::Empty);
        // SAFETY: Caller guarantees the slot was occupied; its state is cleared.
        let entry = unsafe { slots.take(index) };
        let next = slots.as_slots().next_occupied(index);
        self.populated -= 1;
        (entry, next)
    }
}

#[cfg(any(test, feature = "stats"))]
impl<K, V, P: ErasePolicy, const N: usize> HashTable<K, V, P, N> {
    /// Returns detailed utilization statistics.
    ///
    /// Requires the `stats` feature.
    pub fn debug_stats(&self) -> DebugStats {
        let slots = self.storage.slots();
        let capacity = self.capacity();

        DebugStats {
            populated: self.populated,
            capacity,
            tombstones: metadata::count::<P>(slots.meta, capacity, SlotState::Deleted),
            load_factor: self.populated as f64 / capacity as f64,
            inline: self.is_inline(),
            total_bytes: self.storage.total_bytes(),
            wasted_bytes: (capacity - self.populated)
                * (core::mem::size_of::<K>() + core::mem::size_of::<V>()),
        }
    }

    /// Counts entries by their distance from their home slot.
    ///
    /// Element `d` of the result is the number of entries sitting `d` slots
    /// past the slot their hash maps to. Requires the `stats` feature.
    pub fn probe_histogram(&self, rehash: impl Fn(&K) -> u64) -> Vec<usize> {
        let mut hist = alloc::vec![0usize; 1];
        let capacity = self.capacity();

        for (index, key) in self.occupied_keys() {
            let home = probe::home(rehash(key), capacity);
            let distance = probe::displacement(home, index, capacity);
            if distance >= hist.len() {
                hist.resize(distance + 1, 0);
            }
            hist[distance] += 1;
        }

        hist
    }

    fn occupied_keys(&self) -> impl Iterator<Item = (usize, &K)> + '_ {
        let slots = self.storage.slots();
        core::iter::successors(slots.first_occupied(), move |&index| {
            slots.next_occupied(index)
        })
        // SAFETY: The cursor only yields occupied slots.
        .map(move |index| (index, unsafe { slots.key(index) }))
    }

    /// Pretty-prints the probe-distance histogram horizontally using stdout.
    ///
    /// Requires the `stats` and `std` features.
    #[cfg(feature = "std")]
    pub fn print_probe_histogram(&self, rehash: impl Fn(&K) -> u64) {
        let hist = self.probe_histogram(rehash);
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.populated);

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            const PARTIAL: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(PARTIAL[units % 8]);
            }
            bar
        };

        for (distance, &count) in hist.iter().enumerate() {
            println!("{:>3} | {} ({})", distance, make_bar(count), count);
        }
    }
}

/// An iterator over the entries of a [`HashTable`].
///
/// Created by [`HashTable::iter`]. Entries are yielded in slot order.
pub struct Iter<'a, K, V, P: ErasePolicy> {
    slots: Slots<'a, K, V, P>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<K, V, P: ErasePolicy> Clone for Iter<'_, K, V, P> {
    fn clone(&self) -> Self {
        Iter {
            slots: self.slots,
            cursor: self.cursor,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V, P: ErasePolicy> Iterator for Iter<'a, K, V, P> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        self.cursor = self.slots.next_occupied(index);
        self.remaining -= 1;
        // SAFETY: The cursor only visits occupied slots.
        Some(unsafe { (self.slots.key(index), self.slots.value(index)) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: ErasePolicy> ExactSizeIterator for Iter<'_, K, V, P> {}
impl<K, V, P: ErasePolicy> FusedIterator for Iter<'_, K, V, P> {}

/// A mutable iterator over the entries of a [`HashTable`].
///
/// Created by [`HashTable::iter_mut`].
pub struct IterMut<'a, K, V, P: ErasePolicy> {
    meta: &'a [MetaWord],
    keys: &'a [MaybeUninit<K>],
    values: core::slice::IterMut<'a, MaybeUninit<V>>,
    // Number of slots already pulled out of `values`.
    consumed: usize,
    cursor: Option<usize>,
    remaining: usize,
    _policy: PhantomData<P>,
}

impl<'a, K, V, P: ErasePolicy> Iterator for IterMut<'a, K, V, P> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        self.cursor = metadata::next_occupied::<P>(self.meta, index);
        let value = self.values.nth(index - self.consumed)?;
        self.consumed = index + 1;
        self.remaining -= 1;

        // SAFETY: The cursor only visits occupied slots, so both the key and
        // value at `index` are initialized.
        unsafe {
            Some((
                self.keys.get_unchecked(index).assume_init_ref(),
                value.assume_init_mut(),
            ))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: ErasePolicy> ExactSizeIterator for IterMut<'_, K, V, P> {}
impl<K, V, P: ErasePolicy> FusedIterator for IterMut<'_, K, V, P> {}

/// A draining iterator over the entries of a [`HashTable`].
///
/// Created by [`HashTable::drain`].
pub struct Drain<'a, K, V, P: ErasePolicy, const N: usize> {
    table: &'a mut HashTable<K, V, P, N>,
    // The table's slots, detached until drop.
    storage: SlotStorage<K, V, P, N>,
    cursor: Option<usize>,
    remaining: usize,
}

impl<K, V, P: ErasePolicy, const N: usize> Drop for Drain<'_, K, V, P, N> {
    fn drop(&mut self) {
        for _ in &mut *self {}

        // Clears any tombstones left behind.
        self.storage.slots_mut().clear_metadata();
        self.table.storage = core::mem::replace(&mut self.storage, SlotStorage::new(N));
    }
}

impl<K, V, P: ErasePolicy, const N: usize> Iterator for Drain<'_, K, V, P, N> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        let mut slots = self.storage.slots_mut();
        slots.set_state(index, SlotState::Empty);
        // SAFETY: The cursor only visits occupied slots, and the state was
        // cleared above.
        let entry = unsafe { slots.take(index) };
        self.cursor = slots.as_slots().next_occupied(index);
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, P: ErasePolicy, const N: usize> ExactSizeIterator for Drain<'_, K, V, P, N> {}
impl<K, V, P: ErasePolicy, const N: usize> FusedIterator for Drain<'_, K, V, P, N> {}

/// An owning iterator over the entries of a [`HashTable`].
///
/// Entries not yielded are dropped with the iterator.
pub struct IntoIter<K, V, P: ErasePolicy, const N: usize> {
    table: HashTable<K, V, P, N>,
    cursor: Option<usize>,
}

impl<K, V, P: ErasePolicy, const N: usize> Iterator for IntoIter<K, V, P, N> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cursor?;
        // SAFETY: The cursor only visits occupied slots.
        let (entry, next) = unsafe { self.table.take_advance(index) };
        self.cursor = next;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<K, V, P: ErasePolicy, const N: usize> ExactSizeIterator for IntoIter<K, V, P, N> {}
impl<K, V, P: ErasePolicy, const N: usize> FusedIterator for IntoIter<K, V, P, N> {}

impl<K, V, P: ErasePolicy, const N: usize> IntoIterator for HashTable<K, V, P, N> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, P, N>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            cursor: self.first_index(),
            table: self,
        }
    }
}

impl<'a, K, V, P: ErasePolicy, const N: usize> IntoIterator for &'a HashTable<K, V, P, N> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, P: ErasePolicy, const N: usize> IntoIterator for &'a mut HashTable<K, V, P, N> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
