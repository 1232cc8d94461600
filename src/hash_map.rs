//! The public map: an extendible-hashing directory over sub-tables.
//!
//! The directory is an array of table handles of length `2^depth`. A key's
//! high hash bits select a directory slot; several consecutive slots may
//! alias the same table when that table has not yet needed every directory
//! bit to be told apart from its siblings. Growth never rehashes the whole
//! map: one overfull table splits into two, and only the directory slots
//! aliasing it are rewritten.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use crate::hash::Seed;
use crate::table::MAX_USED;
use crate::table::TABLE_HASH_BITS;
use crate::table::TABLE_SLOTS;
use crate::table::Table;

/// Directory-selector field of a hash: the bits above the table's own
/// verification-byte and group-selector fields.
#[inline(always)]
fn h0(hash: u64) -> u64 {
    hash >> TABLE_HASH_BITS
}

/// Handle to a table in the arena. Directory slots store handles, never
/// tables, so aliasing a table from many slots is a plain copy.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct TableId(u32);

/// Slab of tables addressed by [`TableId`]. Ids freed by splits and
/// rehashes are recycled, so the arena stays as dense as the directory.
struct Tables<K, V> {
    slots: Vec<Option<Table<K, V>>>,
    free: Vec<TableId>,
}

impl<K, V> Tables<K, V> {
    fn new() -> Self {
        Tables {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn insert(&mut self, table: Table<K, V>) -> TableId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.0 as usize] = Some(table);
                id
            }
            None => {
                let id = TableId(u32::try_from(self.slots.len()).expect("table arena overflow"));
                self.slots.push(Some(table));
                id
            }
        }
    }

    fn remove(&mut self, id: TableId) -> Table<K, V> {
        let table = self.slots[id.0 as usize].take().expect("stale table handle");
        self.free.push(id);
        table
    }

    fn get(&self, id: TableId) -> &Table<K, V> {
        self.slots[id.0 as usize].as_ref().expect("stale table handle")
    }

    fn get_mut(&mut self, id: TableId) -> &mut Table<K, V> {
        self.slots[id.0 as usize].as_mut().expect("stale table handle")
    }
}

/// A hash map that grows by splitting one sub-table at a time.
///
/// Keys are hashed once per operation under a per-map random seed; the
/// hash word is carved into a directory selector, a group selector, and a
/// per-slot verification byte. No operation ever rehashes more than one
/// 2048-slot sub-table, so mutation latency stays bounded as the map
/// grows.
///
/// The map is single-threaded: wrap it in a lock for shared access.
/// Iteration over entries is deliberately not exposed; there is no stable
/// order to promise.
///
/// ## Example
///
/// ```rust
/// use ext_hash::HashMap;
///
/// let mut map: HashMap<String, u64> = HashMap::new();
/// assert_eq!(map.insert("meaning".to_string(), 42), None);
/// assert_eq!(map.get(&"meaning".to_string()), Some(&42));
/// assert_eq!(map.insert("meaning".to_string(), 43), Some(42));
/// assert_eq!(map.remove(&"meaning".to_string()), Some(43));
/// assert!(map.is_empty());
/// ```
pub struct HashMap<K, V> {
    dir: Vec<TableId>,
    tables: Tables<K, V>,
    seed: Seed,
    items: usize,
    depth: u8,
}

impl<K, V> HashMap<K, V>
where
    K: Hash + Eq,
{
    /// Creates an empty map with a single depth-0 table and a fresh
    /// random seed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let map: HashMap<u64, u64> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        let mut tables = Tables::new();
        let root = tables.insert(Table::new(0));
        HashMap {
            dir: vec![root],
            tables,
            seed: Seed::random(),
            items: 0,
            depth: 0,
        }
    }

    /// Creates a map that can hold at least `capacity` items before any
    /// table has to split: the directory starts at the depth whose tables
    /// jointly clear the split trigger.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let map: HashMap<u64, u64> = HashMap::with_capacity(10_000);
    /// assert!(map.capacity() >= 10_000);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let mut depth: u8 = 0;
        while (MAX_USED as u128) << depth < capacity as u128 {
            depth += 1;
        }
        let mut tables = Tables::new();
        let dir = (0..1usize << depth)
            .map(|_| tables.insert(Table::new(depth)))
            .collect();
        HashMap {
            dir,
            tables,
            seed: Seed::random(),
            items: 0,
            depth,
        }
    }

    /// Number of items stored in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1u64, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.items
    }

    /// Returns `true` if the map contains no items.
    pub fn is_empty(&self) -> bool {
        self.items == 0
    }

    /// Number of item slots behind the directory: directory length times
    /// the per-table slot count. Slots aliasing one table count once per
    /// alias — the capacity an un-aliased directory of this depth would
    /// address.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let map: HashMap<u64, u64> = HashMap::new();
    /// assert_eq!(map.capacity(), 2048);
    /// ```
    pub fn capacity(&self) -> usize {
        self.dir.len() * TABLE_SLOTS
    }

    #[inline(always)]
    fn dir_index(&self, hash: u64) -> usize {
        h0(hash) as usize & (self.dir.len() - 1)
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u64, "one");
    /// assert_eq!(map.get(&1), Some(&"one"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        let hash = self.seed.hash(key);
        self.tables.get(self.dir[self.dir_index(hash)]).get(key, hash)
    }

    /// Returns a mutable reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u64, 10);
    /// if let Some(v) = map.get_mut(&1) {
    ///     *v += 1;
    /// }
    /// assert_eq!(map.get(&1), Some(&11));
    /// ```
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.seed.hash(key);
        let id = self.dir[self.dir_index(hash)];
        self.tables.get_mut(id).get_mut(key, hash)
    }

    /// Returns `true` if the map stores a value for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Inserts a key-value pair, returning the previous value if the key
    /// was already present.
    ///
    /// A replacement never changes occupancy. A genuine insert may find
    /// its table full, in which case the table splits — growing the
    /// directory first if the table already uses every directory bit —
    /// and the insert retries against the new, lighter target.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37u64, "a"), None);
    /// assert_eq!(map.insert(37u64, "b"), Some("a"));
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.seed.hash(&key);
        let id = self.dir[self.dir_index(hash)];
        let value = match self.tables.get_mut(id).swap(&key, value, hash) {
            Ok(old) => return Some(old),
            Err(value) => value,
        };

        let mut entry = (key, value);
        loop {
            let id = self.dir[self.dir_index(hash)];
            match self.tables.get_mut(id).add(entry, hash) {
                Ok(()) => break,
                Err(rejected) => {
                    // Each split halves the load routed at this hash, so
                    // the retry loop terminates.
                    entry = rejected;
                    self.split(id, hash);
                }
            }
        }
        self.items += 1;
        None
    }

    /// Splits the full table behind `hash` and repoints its aliases.
    fn split(&mut self, id: TableId, hash: u64) {
        let table_depth = self.tables.get(id).depth;
        if table_depth == self.depth {
            // The table is distinguished by every directory bit already:
            // double the directory, aliasing each table from the new half.
            self.dir.extend_from_within(..);
            self.depth += 1;
        }

        // Aliases of one table sit `step` apart; after the split, the
        // half owning the new bit takes every second alias.
        let step = 1usize << table_depth;
        let first = h0(hash) as usize & (step - 1);
        let (low, high) = self.tables.remove(id).split(self.seed);
        let low_id = self.tables.insert(low);
        let high_id = self.tables.insert(high);

        let mut idx = first;
        while idx < self.dir.len() {
            self.dir[idx] = low_id;
            self.dir[idx + step] = high_id;
            idx += step * 2;
        }
    }

    /// Removes `key` from the map, returning its value.
    ///
    /// Removing an absent key is a no-op. When a removal pushes the
    /// table's tombstone count over its threshold, the table is replaced
    /// by a tombstone-free rebuild and every alias is repointed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ext_hash::HashMap;
    /// #
    /// let mut map = HashMap::new();
    /// map.insert(1u64, "one");
    /// assert_eq!(map.remove(&1), Some("one"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let hash = self.seed.hash(key);
        let id = self.dir[self.dir_index(hash)];
        let value = self.tables.get_mut(id).del(key, hash)?;
        self.items -= 1;

        if self.tables.get(id).needs_rehash() {
            let step = 1usize << self.tables.get(id).depth;
            let first = h0(hash) as usize & (step - 1);
            let fresh = self.tables.remove(id).rehash(self.seed);
            let fresh_id = self.tables.insert(fresh);
            let mut idx = first;
            while idx < self.dir.len() {
                self.dir[idx] = fresh_id;
                idx += step;
            }
        }
        Some(value)
    }
}

impl<K, V> Default for HashMap<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for HashMap<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashMap")
            .field("items", &self.items)
            .field("capacity", &(self.dir.len() * TABLE_SLOTS))
            .field("depth", &self.depth)
            .field("tables", &self.tables.len())
            .finish()
    }
}
