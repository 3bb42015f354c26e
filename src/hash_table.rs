//! The raw Robin Hood table.
//!
//! [`HashTable<V>`] stores values of type `V` in a single power-of-two array
//! of buckets using open addressing with linear probing. Callers supply the
//! hash and an equality predicate for every operation, which lets the higher
//! level containers decide how keys are stored and compared.
//!
//! Every occupied slot caches its full hash and its DIB (distance from
//! initial bucket). Insertion follows the Robin Hood discipline: a carried
//! entry that has travelled farther than the incumbent takes its slot, and the
//! incumbent continues probing. That bounds the variance of probe lengths and
//! lets lookups stop as soon as they meet an entry closer to home than the
//! distance already probed.
//!
//! Removal defaults to backshift deletion, which keeps "empty slot means the
//! key is absent" sound without a third slot state. A tombstone policy is
//! available through [`DeletionPolicy::Tombstone`].

use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;

use crate::error::TryReserveError;
use crate::error::infallible;

/// Smallest slot count a table ever has.
pub const MIN_CAPACITY: usize = 8;

/// Growth threshold as a percentage of the slot count.
///
/// A table grows before an insertion when `(len + 1) * 100 >= capacity * 85`.
/// The boundary is inclusive.
pub const LOAD_FACTOR_PERCENT: u128 = 85;

#[inline(always)]
fn exceeds_load(entries: usize, capacity: usize) -> bool {
    entries as u128 * 100 >= capacity as u128 * LOAD_FACTOR_PERCENT
}

/// Largest `len` a table of `capacity` slots may hold.
#[inline(always)]
fn max_load(capacity: usize) -> usize {
    ((capacity as u128 * LOAD_FACTOR_PERCENT).saturating_sub(1) / 100) as usize
}

/// Round a capacity hint up to a valid slot count.
fn slot_count(hint: usize) -> Result<usize, TryReserveError> {
    let capacity = hint
        .max(MIN_CAPACITY)
        .checked_next_power_of_two()
        .ok_or(TryReserveError::CapacityOverflow)?;
    // DIBs are stored as u32 and can reach `capacity - 1`.
    if capacity - 1 > u32::MAX as usize {
        return Err(TryReserveError::CapacityOverflow);
    }
    Ok(capacity)
}

fn alloc_buckets<V>(capacity: usize) -> Result<Vec<Bucket<V>>, TryReserveError> {
    let layout =
        Layout::array::<Bucket<V>>(capacity).map_err(|_| TryReserveError::CapacityOverflow)?;
    let mut buckets = Vec::new();
    buckets
        .try_reserve_exact(capacity)
        .map_err(|_| TryReserveError::AllocError { layout })?;
    buckets.resize_with(capacity, || Bucket::Empty);
    Ok(buckets)
}

/// How [`HashTable::remove`] vacates a slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Slide every following displaced entry one slot back, then empty the
    /// last slot of the run. Leaves no markers behind.
    #[default]
    Backshift,

    /// Replace the removed entry with a tombstone that keeps its DIB.
    /// Lookups probe past tombstones; insertions of new keys may reclaim
    /// them. Tombstones count towards the growth threshold and are purged on
    /// every rehash.
    Tombstone,
}

#[derive(Clone)]
struct Slot<V> {
    hash: u64,
    dib: u32,
    value: V,
}

#[derive(Clone)]
enum Bucket<V> {
    Empty,
    Tombstone { dib: u32 },
    Full(Slot<V>),
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries.
    pub populated: usize,
    /// Number of tombstones.
    pub tombstones: usize,
    /// Number of slots.
    pub capacity: usize,
    /// Maximum number of entries before the next insertion grows the table.
    pub max_load: usize,
    /// `populated / capacity`.
    pub load_factor: f64,
    /// Largest DIB of any live entry.
    pub max_dib: u32,
    /// Mean DIB over live entries.
    pub mean_dib: f64,
    /// Bytes held by the slot array.
    pub total_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, limit {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_load
        );
        println!("Tombstones: {}", self.tombstones);
        println!("DIB: max {}, mean {:.3}", self.max_dib, self.mean_dib);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Histogram of DIB values over live entries; bin `i` counts entries sitting
/// `i` slots away from their ideal bucket.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// Entry counts per DIB.
    pub bins: Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} entries):", self.total());
        for (dib, &count) in self.bins.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", dib, "█".repeat(width), count);
        }
    }
}

/// A hash table using Robin Hood linear probing.
///
/// `HashTable<V>` stores values of type `V`. Like a raw table it does not
/// know how to hash or compare its values: every operation takes the hash
/// and an equality predicate. The map and set types in this crate are thin
/// layers that derive both from a key.
///
/// Invariants maintained after every public operation:
///
/// - [`capacity`](Self::capacity) is a power of two and at least
///   [`MIN_CAPACITY`].
/// - [`len`](Self::len) never exceeds [`max_load`](Self::max_load); growth
///   happens before an insertion would break this.
/// - Every entry's DIB equals its distance from `hash & (capacity - 1)`, and
///   no entry on its probe path is closer to home than the path length.
///
/// ## Example
///
/// ```rust
/// use vitl_table::fnv::fnv1a_64;
/// use vitl_table::hash_table::Entry;
/// use vitl_table::hash_table::HashTable;
///
/// #[derive(Debug, PartialEq)]
/// struct Person {
///     id: u64,
///     name: String,
/// }
///
/// let mut table = HashTable::with_capacity(16);
/// let hash = fnv1a_64(&123u64.to_le_bytes());
///
/// match table.entry(hash, |p: &Person| p.id == 123) {
///     Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     Entry::Occupied(_) => unreachable!(),
/// }
///
/// assert_eq!(table.find(hash, |p| p.id == 123).unwrap().name, "Alice");
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    buckets: Vec<Bucket<V>>,
    populated: usize,
    tombstones: usize,
    policy: DeletionPolicy,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::string::ToString;

        f.debug_struct("HashTable")
            .field(
                "slots",
                &self
                    .buckets
                    .chunks(16)
                    .map(|row| {
                        row.iter()
                            .map(|bucket| match bucket {
                                Bucket::Empty => "..".to_string(),
                                Bucket::Tombstone { .. } => "xx".to_string(),
                                Bucket::Full(slot) => format!("{:02x}", slot.dib),
                            })
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .collect::<Vec<String>>(),
            )
            .field("populated", &self.populated)
            .field("tombstones", &self.tombstones)
            .field("capacity", &self.capacity())
            .field("policy", &self.policy)
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table with [`MIN_CAPACITY`] slots.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty table with at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two, minimum
    /// [`MIN_CAPACITY`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    ///
    /// let small: HashTable<String> = HashTable::with_capacity(0);
    /// assert_eq!(small.capacity(), 8);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        infallible(Self::try_with_capacity(capacity))
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        Self::try_with_capacity_and_policy(capacity, DeletionPolicy::default())
    }

    /// Creates an empty table with at least `capacity` slots that removes
    /// entries according to `policy`.
    pub fn with_capacity_and_policy(capacity: usize, policy: DeletionPolicy) -> Self {
        infallible(Self::try_with_capacity_and_policy(capacity, policy))
    }

    /// Fallible version of
    /// [`with_capacity_and_policy`](Self::with_capacity_and_policy).
    pub fn try_with_capacity_and_policy(
        capacity: usize,
        policy: DeletionPolicy,
    ) -> Result<Self, TryReserveError> {
        let buckets = alloc_buckets(slot_count(capacity)?)?;
        Ok(Self {
            buckets,
            populated: 0,
            tombstones: 0,
            policy,
        })
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.buckets.len() - 1
    }

    /// Returns the deletion policy this table was created with.
    pub fn policy(&self) -> DeletionPolicy {
        self.policy
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// assert_eq!(table.len(), 0);
    ///
    /// table.entry(1, |&n: &u64| n == 1).or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns the number of slots. Always a power of two, at least
    /// [`MIN_CAPACITY`].
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Returns the largest number of elements the table holds before the
    /// next insertion grows it: the greatest `n` with
    /// `n * 100 < capacity * 85`.
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<u8> = HashTable::new();
    /// assert_eq!(table.max_load(), 6);
    /// ```
    pub fn max_load(&self) -> usize {
        max_load(self.capacity())
    }

    /// Returns the number of tombstones currently in the table. Always zero
    /// under [`DeletionPolicy::Backshift`].
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Removes all elements from the table, keeping its capacity.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            *bucket = Bucket::Empty;
        }
        self.populated = 0;
        self.tombstones = 0;
    }

    /// Ensures the table has at least `min_capacity` slots.
    ///
    /// If growth is needed the new slot count is the smallest power of two
    /// that is at least `max(2 * capacity, min_capacity)`. Does nothing when
    /// the table is already large enough.
    ///
    /// # Panics
    ///
    /// Panics on capacity overflow and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails. See [`try_reserve`](Self::try_reserve).
    pub fn reserve(&mut self, min_capacity: usize) {
        infallible(self.try_reserve(min_capacity))
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<i32> = HashTable::new();
    /// table.try_reserve(100).unwrap();
    /// assert_eq!(table.capacity(), 128);
    ///
    /// assert!(table.try_reserve(usize::MAX).is_err());
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn try_reserve(&mut self, min_capacity: usize) -> Result<(), TryReserveError> {
        if min_capacity <= self.capacity() {
            return Ok(());
        }

        let doubled = self
            .capacity()
            .checked_mul(2)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let capacity = slot_count(doubled.max(min_capacity))?;
        self.rehash(capacity)
    }

    /// Shrinks the slot array to the smallest power of two (at least
    /// [`MIN_CAPACITY`]) that still holds the current elements, purging
    /// tombstones on the way.
    pub fn shrink_to_fit(&mut self) {
        let mut capacity = MIN_CAPACITY;
        while exceeds_load(self.populated, capacity) {
            capacity *= 2;
        }

        if capacity < self.capacity() || self.tombstones > 0 {
            trace!(
                old_capacity = self.capacity(),
                new_capacity = capacity,
                len = self.populated,
                "shrinking table"
            );
            infallible(self.rehash(capacity));
        }
    }

    /// Makes room for one more entry, growing or purging tombstones as
    /// required by the load threshold.
    fn reserve_for_insert(&mut self) -> Result<(), TryReserveError> {
        let capacity = self.capacity();
        if !exceeds_load(self.populated + self.tombstones + 1, capacity) {
            return Ok(());
        }

        if self.tombstones > 0 && !exceeds_load(self.populated + 1, capacity) {
            trace!(
                capacity,
                len = self.populated,
                tombstones = self.tombstones,
                "purging tombstones"
            );
            return self.rehash(capacity);
        }

        let capacity = capacity
            .checked_mul(2)
            .ok_or(TryReserveError::CapacityOverflow)?;
        self.rehash(slot_count(capacity)?)
    }

    /// Moves every entry into a fresh slot array of `capacity` slots.
    ///
    /// The new array is allocated before anything is touched, so failure
    /// leaves the table as it was.
    #[cold]
    fn rehash(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        let buckets = alloc_buckets(capacity)?;
        trace!(
            old_capacity = self.capacity(),
            new_capacity = capacity,
            len = self.populated,
            tombstones = self.tombstones,
            "rehashing table"
        );

        let old = core::mem::replace(&mut self.buckets, buckets);
        self.populated = 0;
        self.tombstones = 0;
        for bucket in old {
            if let Bucket::Full(slot) = bucket {
                self.insert_absent(slot.hash, slot.value);
            }
        }
        Ok(())
    }

    /// Returns the index of the entry matching `hash` and `eq`.
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        let mask = self.mask();
        let mut index = hash as usize & mask;
        let mut dib = 0u32;

        loop {
            match &self.buckets[index] {
                Bucket::Empty => return None,
                Bucket::Tombstone { dib: slot_dib } => {
                    if *slot_dib < dib {
                        return None;
                    }
                }
                Bucket::Full(slot) => {
                    // Anything we are looking for would have displaced this
                    // entry on insertion.
                    if slot.dib < dib {
                        return None;
                    }
                    if slot.hash == hash && eq(&slot.value) {
                        return Some(index);
                    }
                }
            }

            index = (index + 1) & mask;
            dib += 1;
        }
    }

    /// Robin Hood insertion of a value whose key is known to be absent.
    ///
    /// The caller must have made room first. Returns the index the new value
    /// landed in; entries it displaced keep probing until they find an empty
    /// slot or a reclaimable tombstone.
    fn insert_absent(&mut self, hash: u64, value: V) -> usize {
        let mask = self.mask();
        let mut index = hash as usize & mask;
        let mut carried = Slot {
            hash,
            dib: 0,
            value,
        };
        let mut landed = None;

        loop {
            let bucket = &mut self.buckets[index];
            match bucket {
                Bucket::Empty => {
                    *bucket = Bucket::Full(carried);
                    self.populated += 1;
                    return landed.unwrap_or(index);
                }
                Bucket::Tombstone { dib } => {
                    if *dib <= carried.dib {
                        *bucket = Bucket::Full(carried);
                        self.tombstones -= 1;
                        self.populated += 1;
                        return landed.unwrap_or(index);
                    }
                }
                Bucket::Full(slot) => {
                    // Ties go to the incumbent.
                    if slot.dib < carried.dib {
                        core::mem::swap(slot, &mut carried);
                        landed.get_or_insert(index);
                    }
                }
            }

            index = (index + 1) & mask;
            carried.dib += 1;
        }
    }

    /// Removes the entry at `index`, which must be occupied.
    fn remove_at(&mut self, index: usize) -> V {
        let removed = match self.policy {
            DeletionPolicy::Backshift => {
                let mask = self.mask();
                let removed = core::mem::replace(&mut self.buckets[index], Bucket::Empty);

                let mut hole = index;
                loop {
                    let next = (hole + 1) & mask;
                    match &mut self.buckets[next] {
                        Bucket::Full(slot) if slot.dib > 0 => slot.dib -= 1,
                        _ => break,
                    }
                    self.buckets.swap(hole, next);
                    hole = next;
                }
                removed
            }
            DeletionPolicy::Tombstone => {
                let dib = match &self.buckets[index] {
                    Bucket::Full(slot) => slot.dib,
                    _ => unreachable!("removing from an unoccupied slot"),
                };
                self.tombstones += 1;
                core::mem::replace(&mut self.buckets[index], Bucket::Tombstone { dib })
            }
        };

        self.populated -= 1;
        match removed {
            Bucket::Full(slot) => slot.value,
            _ => unreachable!("removing from an unoccupied slot"),
        }
    }

    fn value_at(&self, index: usize) -> &V {
        match &self.buckets[index] {
            Bucket::Full(slot) => &slot.value,
            _ => unreachable!("slot {index} is not occupied"),
        }
    }

    fn value_at_mut(&mut self, index: usize) -> &mut V {
        match &mut self.buckets[index] {
            Bucket::Full(slot) => &mut slot.value,
            _ => unreachable!("slot {index} is not occupied"),
        }
    }

    /// Returns a reference to the value matching `hash` and `eq`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::fnv::fnv1a_64;
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let hash = fnv1a_64(b"key");
    /// table
    ///     .entry(hash, |s: &String| s == "key")
    ///     .or_insert("key".to_string());
    ///
    /// assert_eq!(table.find(hash, |s| s == "key").map(String::as_str), Some("key"));
    /// assert!(table.find(fnv1a_64(b"other"), |s| s == "other").is_none());
    /// ```
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        Some(self.value_at(index))
    }

    /// Returns a mutable reference to the value matching `hash` and `eq`.
    ///
    /// The caller must not change the parts of the value that `hash` and
    /// `eq` are derived from.
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        Some(self.value_at_mut(index))
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// Removing an absent value is not an error and returns `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert!(table.is_empty());
    /// assert_eq!(table.remove(99, |&n| n == 99), None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        if self.populated == 0 {
            return None;
        }
        let index = self.find_index(hash, eq)?;
        Some(self.remove_at(index))
    }

    /// Gets the entry for `hash` and `eq`, growing the table first if one
    /// more element would cross the load threshold.
    ///
    /// Growth is decided before probing, so it also happens when the entry
    /// turns out to be occupied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::fnv::fnv1a_64;
    /// # use vitl_table::hash_table::Entry;
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let hash = fnv1a_64(b"hello");
    ///
    /// match table.entry(hash, |s: &String| s == "hello") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().push('!');
    ///     }
    /// }
    ///
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Entry<'_, V> {
        infallible(self.try_entry(hash, eq))
    }

    /// Fallible version of [`entry`](Self::entry). On error the table is
    /// unchanged.
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
    ) -> Result<Entry<'_, V>, TryReserveError> {
        self.reserve_for_insert()?;
        Ok(match self.find_index(hash, eq) {
            Some(index) => Entry::Occupied(OccupiedEntry { table: self, index }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        })
    }

    /// Returns the first occupied slot after `prev`, in slot order.
    ///
    /// Pass a negative `prev` to start at slot 0. Feeding the returned index
    /// back in walks every entry. Any insertion that grows the table, and any
    /// removal, may move entries, so a walk is only meaningful between
    /// mutations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use vitl_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(1, |&n: &u32| n == 10).or_insert(10);
    /// table.entry(5, |&n: &u32| n == 50).or_insert(50);
    ///
    /// let mut seen = Vec::new();
    /// let mut cursor = -1;
    /// while let Some((index, value)) = table.next_occupied(cursor) {
    ///     seen.push((index, *value));
    ///     cursor = index;
    /// }
    /// assert_eq!(seen, vec![(1, 10), (5, 50)]);
    /// ```
    pub fn next_occupied(&self, prev: isize) -> Option<(isize, &V)> {
        let start = if prev < 0 { 0 } else { prev as usize + 1 };
        self.buckets
            .get(start..)?
            .iter()
            .enumerate()
            .find_map(|(offset, bucket)| match bucket {
                Bucket::Full(slot) => Some(((start + offset) as isize, &slot.value)),
                _ => None,
            })
    }

    /// Returns an iterator over all values in slot order.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator over mutable references to all values in slot
    /// order.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            buckets: self.buckets.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// The table is empty once the iterator is dropped, even if it was not
    /// run to completion.
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Computes a histogram of DIBs over the live entries.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut bins = alloc::vec![0usize; 1];
        for bucket in &self.buckets {
            if let Bucket::Full(slot) = bucket {
                let dib = slot.dib as usize;
                if dib >= bins.len() {
                    bins.resize(dib + 1, 0);
                }
                bins[dib] += 1;
            }
        }
        ProbeHistogram { bins }
    }

    /// Returns occupancy and probe-length statistics.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let (max_dib, total_dib) = self
            .buckets
            .iter()
            .filter_map(|bucket| match bucket {
                Bucket::Full(slot) => Some(slot.dib),
                _ => None,
            })
            .fold((0u32, 0u64), |(max, sum), dib| {
                (max.max(dib), sum + dib as u64)
            });

        DebugStats {
            populated: self.populated,
            tombstones: self.tombstones,
            capacity: self.capacity(),
            max_load: self.max_load(),
            load_factor: self.populated as f64 / self.capacity() as f64,
            max_dib,
            mean_dib: if self.populated == 0 {
                0.0
            } else {
                total_dib as f64 / self.populated as f64
            },
            total_bytes: self.capacity() * core::mem::size_of::<Bucket<V>>(),
        }
    }

    /// Returns the DIB stored in `index`, if it holds an entry.
    #[cfg(test)]
    pub(crate) fn dib_at(&self, index: usize) -> Option<u32> {
        match &self.buckets[index] {
            Bucket::Full(slot) => Some(slot.dib),
            _ => None,
        }
    }

    /// Walks the slot array and panics if any structural invariant is
    /// broken.
    #[cfg(test)]
    #[track_caller]
    pub(crate) fn assert_invariants(&self) {
        let capacity = self.capacity();
        let mask = self.mask();
        assert!(capacity.is_power_of_two() && capacity >= MIN_CAPACITY);
        assert!(self.populated <= self.max_load(), "{:#?}", self);

        let mut populated = 0;
        let mut tombstones = 0;
        for (index, bucket) in self.buckets.iter().enumerate() {
            match bucket {
                Bucket::Empty => {}
                Bucket::Tombstone { .. } => tombstones += 1,
                Bucket::Full(slot) => {
                    populated += 1;
                    let home = slot.hash as usize & mask;
                    let distance = index.wrapping_sub(home) & mask;
                    assert_eq!(slot.dib as usize, distance, "slot {index}: {:#?}", self);

                    // Every slot on the probe path is non-empty and at least
                    // as far from its own home as the path is long.
                    for step in 0..distance {
                        let on_path = (home + step) & mask;
                        let path_dib = match &self.buckets[on_path] {
                            Bucket::Empty => panic!("gap at {on_path} before {index}"),
                            Bucket::Tombstone { dib } => *dib,
                            Bucket::Full(other) => other.dib,
                        };
                        assert!(
                            path_dib as usize >= step,
                            "slot {on_path} dib {path_dib} < {step} on path to {index}"
                        );
                    }
                }
            }
        }
        assert_eq!(populated, self.populated);
        assert_eq!(tombstones, self.tombstones);
        if self.policy == DeletionPolicy::Backshift {
            assert_eq!(tombstones, 0);
        }
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, V> {
    /// A vacant entry - no value matches.
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present.
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value in the entry.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value in the entry.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies an occupied entry in place. Returns `None` if the entry is
    /// vacant.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in a [`HashTable`].
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Returns the hash this entry was looked up with.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Inserts `value` and returns a mutable reference to it.
    ///
    /// Room was made when the entry was created, so this never allocates.
    pub fn insert(self, value: V) -> &'a mut V {
        let index = self.table.insert_absent(self.hash, value);
        self.table.value_at_mut(index)
    }
}

/// A view into an occupied entry in a [`HashTable`].
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Returns the slot index holding this entry.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        self.table.value_at(self.index)
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        self.table.value_at_mut(self.index)
    }

    /// Converts the entry into a mutable reference with the table's
    /// lifetime.
    pub fn into_mut(self) -> &'a mut V {
        self.table.value_at_mut(self.index)
    }

    /// Replaces the value in the entry, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry from the table and returns its value.
    pub fn remove(self) -> V {
        self.table.remove_at(self.index)
    }
}

/// An iterator over the values of a [`HashTable`], in slot order.
///
/// Created by [`HashTable::iter`].
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Bucket<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for bucket in self.buckets.by_ref() {
            if let Bucket::Full(slot) = bucket {
                self.remaining -= 1;
                return Some(&slot.value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`], in slot order.
///
/// Created by [`HashTable::iter_mut`].
pub struct IterMut<'a, V> {
    buckets: core::slice::IterMut<'a, Bucket<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for bucket in self.buckets.by_ref() {
            if let Bucket::Full(slot) = bucket {
                self.remaining -= 1;
                return Some(&mut slot.value);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::drain`].
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.table.buckets.len() {
            let bucket = core::mem::replace(&mut self.table.buckets[self.index], Bucket::Empty);
            self.index += 1;
            match bucket {
                Bucket::Full(slot) => {
                    self.table.populated -= 1;
                    return Some(slot.value);
                }
                Bucket::Tombstone { .. } => self.table.tombstones -= 1,
                Bucket::Empty => {}
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}
