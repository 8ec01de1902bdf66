use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::DefaultHashBuilder;
pub use crate::hash_table::Drain;
pub use crate::hash_table::IntoIter;
pub use crate::hash_table::Iter;
pub use crate::hash_table::IterMut;
use crate::hash_table::DEFAULT_INLINE_CAPACITY;
use crate::hash_table::HashTable;
use crate::policy::BackwardShift;
use crate::policy::ErasePolicy;

/// A hash map using a linear-probing [`HashTable`] as the underlying storage.
///
/// `HashMap<K, V, S, P, N>` stores key-value pairs where keys implement
/// `Hash + Eq`, hashed by the builder `S`. Erasure follows the policy `P`,
/// and the first `N` slots are stored inline in the map value itself.
///
/// Unlike the standard library's map, [`insert`](HashMap::insert) never
/// overwrites: inserting a key that is already present leaves the map
/// unchanged and returns `false`. Use [`entry`](HashMap::entry) or
/// [`get_mut`](HashMap::get_mut) to replace values.
///
/// # Examples
///
/// ```rust
/// use linprobe::HashMap;
///
/// let mut map: HashMap<u64, u64> = HashMap::new();
/// for (key, value) in [(5, 3), (17, 8), (99, 2), (0, 8), (1, 6)] {
///     assert!(map.insert(key, value));
/// }
///
/// assert_eq!(map.len(), 5);
/// assert_eq!(map.get(&17), Some(&8));
///
/// assert_eq!(map.remove(&99), Some(2));
/// assert_eq!(map.count(&99), 0);
/// assert_eq!(map.len(), 4);
/// ```
pub struct HashMap<
    K,
    V,
    S = DefaultHashBuilder,
    P: ErasePolicy = BackwardShift,
    const N: usize = DEFAULT_INLINE_CAPACITY,
> {
    table: HashTable<K, V, P, N>,
    hash_builder: S,
}

fn make_hasher<K: Hash, S: BuildHasher>(hash_builder: &S) -> impl Fn(&K) -> u64 + '_ {
    move |key: &K| hash_builder.hash_one(key)
}

fn equivalent<'a, K, Q>(key: &'a Q) -> impl Fn(&K) -> bool + 'a
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    move |k: &K| <K as Borrow<Q>>::borrow(k) == key
}

impl<K, V, S, P, const N: usize> Clone for HashMap<K, V, S, P, N>
where
    K: Clone,
    V: Clone,
    S: Clone,
    P: ErasePolicy,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K, V, S, P, const N: usize> Debug for HashMap<K, V, S, P, N>
where
    K: Debug,
    V: Debug,
    P: ErasePolicy,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, P: ErasePolicy, const N: usize> HashMap<K, V, S, P, N> {
    /// Creates an empty map which will use the given hash builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use linprobe::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// assert!(map.is_inline());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates an empty map with at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two. At most half of the
    /// slots are filled before the map grows.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the map's hash builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of slots. The map holds at most half this many
    /// entries before growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use linprobe::HashMap;
    /// use linprobe::Tombstone;
    ///
    /// let mut map: HashMap<u32, u32, linprobe::DefaultHashBuilder, Tombstone, 8> =
    ///     HashMap::new();
    /// assert_eq!(map.capacity(), 8);
    ///
    /// for key in 0..20 {
    ///     map.insert(key, key);
    /// }
    /// assert!(map.capacity() >= 32);
    /// assert!(!map.is_inline());
    /// ```
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns `true` while the entries live in the inline buffer.
    pub fn is_inline(&self) -> bool {
        self.table.is_inline()
    }

    /// Removes all entries, keeping the current capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Returns an iterator over all key-value pairs.
    pub fn iter(&self) -> Iter<'_, K, V, P> {
        self.table.iter()
    }

    /// Returns an iterator over all key-value pairs with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, P> {
        self.table.iter_mut()
    }

    /// Returns an iterator over all keys.
    pub fn keys(&self) -> Keys<'_, K, V, P> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over all values.
    pub fn values(&self) -> Values<'_, K, V, P> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over all values, mutably.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, P> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes and yields all key-value pairs, keeping the allocated capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use linprobe::HashMap;
    ///
    /// let mut map: HashMap<u32, &str> = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, P, N> {
        self.table.drain()
    }
}

impl<K, V, S, P, const N: usize> HashMap<K, V, S, P, N>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: ErasePolicy,
{
    /// Grows the map to at least `min_capacity` slots.
    ///
    /// The new capacity is `min_capacity` rounded up to a power of two. The
    /// map never shrinks.
    pub fn reserve(&mut self, min_capacity: usize) {
        self.table
            .reserve(min_capacity, make_hasher(&self.hash_builder));
    }

    /// Inserts `key` with `value` if the key is not already present.
    ///
    /// Returns `true` if the entry was inserted. If the key is present the map
    /// is left untouched, `value` is dropped, and `false` is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use linprobe::HashMap;
    ///
    /// let mut map: HashMap<&str, u32> = HashMap::new();
    /// assert!(map.insert("a", 1));
    /// assert!(!map.insert("a", 2));
    /// assert_eq!(map.get("a"), Some(&1));
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let hash = self.hash_builder.hash_one(&key);
        if self.table.find_index(hash, |k| *k == key).is_some() {
            return false;
        }

        self.table
            .insert_unique(hash, key, value, make_hasher(&self.hash_builder));
        true
    }

    /// Returns a reference to the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, equivalent(key))
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.find_mut(hash, equivalent(key)).map(|(_, v)| v)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Returns the number of entries for `key`: 1 if present, otherwise 0.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        usize::from(self.contains_key(key))
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    ///
    /// This takes `&mut self` because a miss inserts; the read-only accessors
    /// never modify the map.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Returns the value for `key`, inserting the result of `default` first
    /// if absent.
    pub fn get_or_insert_with(&mut self, key: K, default: impl FnOnce() -> V) -> &mut V {
        self.entry(key).or_insert_with(default)
    }

    /// Removes `key` and returns its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use linprobe::HashMap;
    ///
    /// let mut map: HashMap<u64, &str> = HashMap::new();
    /// map.insert(1, "v1");
    /// assert_eq!(map.remove(&1), Some("v1"));
    /// assert_eq!(map.remove(&1), None);
    ///
    /// assert!(map.insert(1, "v2"));
    /// assert_eq!(map.get(&1), Some(&"v2"));
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` and returns the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .remove(hash, equivalent(key), make_hasher(&self.hash_builder))
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(keep, make_hasher(&self.hash_builder));
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use linprobe::HashMap;
    ///
    /// let mut counts: HashMap<char, usize> = HashMap::new();
    /// for c in "hello".chars() {
    ///     *counts.entry(c).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts[&'l'], 2);
    /// assert_eq!(counts[&'o'], 1);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, P, N> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.find_index(hash, |k| *k == key) {
            Some(index) => Entry::Occupied(OccupiedEntry {
                table: &mut self.table,
                hash_builder: &self.hash_builder,
                index,
            }),
            None => Entry::Vacant(VacantEntry {
                table: &mut self.table,
                hash_builder: &self.hash_builder,
                hash,
                key,
            }),
        }
    }
}

impl<K, V, S, P, const N: usize> HashMap<K, V, S, P, N>
where
    S: Default,
    P: ErasePolicy,
{
    /// Creates an empty map using the inline buffer and a default hash builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map with at least `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

#[cfg(any(test, feature = "stats"))]
impl<K, V, S, P, const N: usize> HashMap<K, V, S, P, N>
where
    K: Hash,
    S: BuildHasher,
    P: ErasePolicy,
{
    /// Returns detailed utilization statistics of the underlying table.
    ///
    /// Requires the `stats` feature.
    pub fn debug_stats(&self) -> crate::hash_table::DebugStats {
        self.table.debug_stats()
    }

    /// Counts entries by their distance from their home slot.
    ///
    /// Requires the `stats` feature.
    pub fn probe_histogram(&self) -> alloc::vec::Vec<usize> {
        self.table.probe_histogram(make_hasher(&self.hash_builder))
    }
}

impl<K, V, S, P, const N: usize> Default for HashMap<K, V, S, P, N>
where
    S: Default,
    P: ErasePolicy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, P, const N: usize> PartialEq for HashMap<K, V, S, P, N>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    P: ErasePolicy,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K, V, S, P, const N: usize> Eq for HashMap<K, V, S, P, N>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    P: ErasePolicy,
{
}

impl<K, Q, V, S, P, const N: usize> Index<&Q> for HashMap<K, V, S, P, N>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
    P: ErasePolicy,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found"),
        }
    }
}

/// Inserts every pair, replacing the values of keys already present.
impl<K, V, S, P, const N: usize> Extend<(K, V)> for HashMap<K, V, S, P, N>
where
    K: Hash + Eq,
    S: BuildHasher,
    P: ErasePolicy,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            match self.entry(key) {
                Entry::Occupied(mut entry) => {
                    entry.insert(value);
                }
                Entry::Vacant(entry) => {
                    entry.insert(value);
                }
            }
        }
    }
}

impl<K, V, S, P, const N: usize> FromIterator<(K, V)> for HashMap<K, V, S, P, N>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    P: ErasePolicy,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, P: ErasePolicy, const N: usize> IntoIterator for HashMap<K, V, S, P, N> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, P, N>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, K, V, S, P: ErasePolicy, const N: usize> IntoIterator for &'a HashMap<K, V, S, P, N> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, P: ErasePolicy, const N: usize> IntoIterator
    for &'a mut HashMap<K, V, S, P, N>
{
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in a map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S, P: ErasePolicy, const N: usize> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S, P, N>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S, P, N>),
}

impl<'a, K, V, S, P, const N: usize> Entry<'a, K, V, S, P, N>
where
    K: Hash,
    S: BuildHasher,
    P: ErasePolicy,
{
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from `default` if the entry is vacant and
    /// returns a mutable reference to the value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

/// A view into a vacant entry in a [`HashMap`].
pub struct VacantEntry<'a, K, V, S, P: ErasePolicy, const N: usize> {
    table: &'a mut HashTable<K, V, P, N>,
    hash_builder: &'a S,
    hash: u64,
    key: K,
}

impl<'a, K, V, S, P, const N: usize> VacantEntry<'a, K, V, S, P, N>
where
    K: Hash,
    S: BuildHasher,
    P: ErasePolicy,
{
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    ///
    /// May grow the map.
    pub fn insert(self, value: V) -> &'a mut V {
        let VacantEntry {
            table,
            hash_builder,
            hash,
            key,
        } = self;
        let index = table.insert_unique(hash, key, value, make_hasher(hash_builder));
        // SAFETY: `insert_unique` returns the slot it just filled.
        unsafe { table.entry_at_mut(index).1 }
    }
}

/// A view into an occupied entry in a [`HashMap`].
pub struct OccupiedEntry<'a, K, V, S, P: ErasePolicy, const N: usize> {
    table: &'a mut HashTable<K, V, P, N>,
    hash_builder: &'a S,
    index: usize,
}

impl<'a, K, V, S, P, const N: usize> OccupiedEntry<'a, K, V, S, P, N>
where
    K: Hash,
    S: BuildHasher,
    P: ErasePolicy,
{
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        // SAFETY: The entry's slot stays occupied for the entry's lifetime.
        unsafe { self.table.entry_at(self.index).0 }
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        // SAFETY: The entry's slot stays occupied for the entry's lifetime.
        unsafe { self.table.entry_at(self.index).1 }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The entry's slot stays occupied for the entry's lifetime.
        unsafe { self.table.entry_at_mut(self.index).1 }
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: The entry's slot stays occupied for the entry's lifetime.
        unsafe { self.table.entry_at_mut(self.index).1 }
    }

    /// Replaces the value in the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        // SAFETY: The entry's slot stays occupied for the entry's lifetime.
        unsafe {
            self.table
                .erase_at(self.index, &make_hasher(self.hash_builder))
        }
    }
}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V, P: ErasePolicy> {
    inner: Iter<'a, K, V, P>,
}

impl<'a, K, V, P: ErasePolicy> Iterator for Keys<'a, K, V, P> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: ErasePolicy> ExactSizeIterator for Keys<'_, K, V, P> {}
impl<K, V, P: ErasePolicy> FusedIterator for Keys<'_, K, V, P> {}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V, P: ErasePolicy> {
    inner: Iter<'a, K, V, P>,
}

impl<'a, K, V, P: ErasePolicy> Iterator for Values<'a, K, V, P> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: ErasePolicy> ExactSizeIterator for Values<'_, K, V, P> {}
impl<K, V, P: ErasePolicy> FusedIterator for Values<'_, K, V, P> {}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V, P: ErasePolicy> {
    inner: IterMut<'a, K, V, P>,
}

impl<'a, K, V, P: ErasePolicy> Iterator for ValuesMut<'a, K, V, P> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, P: ErasePolicy> ExactSizeIterator for ValuesMut<'_, K, V, P> {}
impl<K, V, P: ErasePolicy> FusedIterator for ValuesMut<'_, K, V, P> {}
