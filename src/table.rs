//! A fixed-capacity sub-table: 256 groups of 8 slots.
//!
//! Tables never grow in place. When one crosses its load trigger the
//! directory replaces it with two half-tables one level deeper, and when
//! deletions leave too many tombstones behind it is replaced by a fresh
//! rebuild at the same depth. Both replacements consume the old table.

use alloc::boxed::Box;
use core::hash::Hash;

use crate::hash::Seed;
use crate::header::GROUP_SLOTS;
use crate::header::Header;
use crate::header::Pattern;
use crate::header::TOMBSTONE;
use crate::header::TOP_HASH_BITS;
use crate::header::h1;
use crate::header::top_hash;

const TABLE_GROUPS_LOG2: u32 = 8;
const TABLE_GROUPS: usize = 1 << TABLE_GROUPS_LOG2;
const GROUP_MASK: usize = TABLE_GROUPS - 1;

/// Slot capacity of one table.
pub(crate) const TABLE_SLOTS: usize = TABLE_GROUPS * GROUP_SLOTS;

/// Hash bits a table consumes: the verification byte plus the group
/// selector. Everything above belongs to the directory.
pub(crate) const TABLE_HASH_BITS: u32 = TOP_HASH_BITS + TABLE_GROUPS_LOG2;

/// Occupied-plus-tombstone count above which the table refuses inserts
/// and must be split. Checked before probing so worst-case probe chains
/// stay bounded.
pub(crate) const MAX_USED: usize = TABLE_SLOTS * 90 / 100;

/// Tombstone count above which the table asks to be rehashed.
const MAX_TOMBSTONES: usize = TABLE_SLOTS * 15 / 100;

struct Group<K, V> {
    header: Header,
    slots: [Option<(K, V)>; GROUP_SLOTS],
}

impl<K, V> Group<K, V> {
    fn empty() -> Self {
        Group {
            header: Header::default(),
            slots: [const { None }; GROUP_SLOTS],
        }
    }
}

/// Triangular probe sequence over group indices: starts at the group the
/// hash selects and advances by 1, 2, 3, … groups, wrapping. With a
/// power-of-two group count the sequence visits every group before any
/// repeat, and the load trigger guarantees a free slot exists somewhere,
/// so every probe chain terminates.
struct Probe {
    group: usize,
    stride: usize,
}

impl Probe {
    #[inline(always)]
    fn new(hash: u64) -> Self {
        Probe {
            group: h1(hash) as usize & GROUP_MASK,
            stride: 0,
        }
    }

    #[inline(always)]
    fn advance(&mut self) {
        self.stride += 1;
        self.group = (self.group + self.stride) & GROUP_MASK;
    }
}

/// A fixed array of 256 groups plus occupancy counters.
///
/// `depth` is the number of directory-selector bits that distinguish this
/// table from its siblings; the directory maintains it.
pub(crate) struct Table<K, V> {
    groups: Box<[Group<K, V>]>,
    items: u16,
    tombstones: u16,
    pub(crate) depth: u8,
}

impl<K: Hash + Eq, V> Table<K, V> {
    pub(crate) fn new(depth: u8) -> Self {
        Table {
            groups: (0..TABLE_GROUPS).map(|_| Group::empty()).collect(),
            items: 0,
            tombstones: 0,
            depth,
        }
    }

    /// Number of items stored in the table.
    pub(crate) fn len(&self) -> usize {
        usize::from(self.items)
    }

    /// Occupancy as seen by the split trigger: live items plus
    /// tombstones. An upper bound, since an insert reclaiming a tombstone
    /// slot does not decrement the tombstone counter; only a rehash or a
    /// split resets it.
    fn used(&self) -> usize {
        usize::from(self.items) + usize::from(self.tombstones)
    }

    /// True once deletions have left enough tombstones behind that the
    /// directory should replace this table with a rehashed copy.
    pub(crate) fn needs_rehash(&self) -> bool {
        usize::from(self.tombstones) > MAX_TOMBSTONES
    }

    /// Probes for `key`, returning the group and slot holding its entry.
    ///
    /// Shared by every keyed operation: scan each probed group for slots
    /// whose verification byte matches, compare full keys on those, and
    /// stop at the first group with a free slot — an insertion of this
    /// key would not have moved past it.
    fn find_slot(&self, key: &K, hash: u64) -> Option<(usize, usize)> {
        let pattern = Pattern::new(top_hash(hash));
        let mut probe = Probe::new(hash);
        loop {
            let group = &self.groups[probe.group];
            let matches = group.header.find(pattern);
            debug_assert!(matches.is_valid());
            for slot in matches {
                if matches!(&group.slots[slot], Some((k, _)) if k == key) {
                    return Some((probe.group, slot));
                }
            }
            if group.header.has_free_slots() {
                return None;
            }
            probe.advance();
        }
    }

    /// Returns the value stored for `key`, if present. `hash` must be the
    /// key's hash under the container seed.
    pub(crate) fn get(&self, key: &K, hash: u64) -> Option<&V> {
        let (group, slot) = self.find_slot(key, hash)?;
        match &self.groups[group].slots[slot] {
            Some((_, value)) => Some(value),
            None => None,
        }
    }

    pub(crate) fn get_mut(&mut self, key: &K, hash: u64) -> Option<&mut V> {
        let (group, slot) = self.find_slot(key, hash)?;
        match &mut self.groups[group].slots[slot] {
            Some((_, value)) => Some(value),
            None => None,
        }
    }

    /// Replaces the value stored for `key` and returns the previous one.
    /// Never inserts; hands `value` back when the key is absent.
    pub(crate) fn swap(&mut self, key: &K, value: V, hash: u64) -> Result<V, V> {
        if let Some((group, slot)) = self.find_slot(key, hash) {
            if let Some((_, stored)) = self.groups[group].slots[slot].as_mut() {
                return Ok(core::mem::replace(stored, value));
            }
        }
        Err(value)
    }

    /// Adds an entry to the table. Requires that the key is not already
    /// present; `insert` callers establish that with `swap` first.
    ///
    /// Fails without probing once occupancy crosses the split trigger,
    /// handing the entry back so the directory can split this table.
    /// Otherwise claims the lowest unused slot (free or tombstone) of the
    /// first group that has one.
    pub(crate) fn add(&mut self, entry: (K, V), hash: u64) -> Result<(), (K, V)> {
        if self.used() > MAX_USED {
            return Err(entry);
        }
        let mut probe = Probe::new(hash);
        let (group, slot) = loop {
            let mut unused = self.groups[probe.group].header.find_unused();
            debug_assert!(unused.is_valid());
            match unused.next() {
                Some(slot) => break (probe.group, slot),
                None => probe.advance(),
            }
        };

        let g = &mut self.groups[group];
        debug_assert!(g.slots[slot].is_none());
        g.header = g.header.set(slot, top_hash(hash));
        g.slots[slot] = Some(entry);
        self.items += 1;
        Ok(())
    }

    /// Deletes `key`, leaving a tombstone so later probe chains still
    /// pass through this slot. The payload is dropped immediately rather
    /// than marked-and-skipped, so it releases whatever it held.
    pub(crate) fn del(&mut self, key: &K, hash: u64) -> Option<V> {
        let (group, slot) = self.find_slot(key, hash)?;
        let g = &mut self.groups[group];
        let (_, value) = g.slots[slot].take()?;
        g.header = g.header.set(slot, TOMBSTONE);
        self.tombstones += 1;
        self.items -= 1;
        Some(value)
    }

    /// Splits into two tables one level deeper, routing every entry by
    /// the first hash bit the directory is not yet using for this table.
    ///
    /// The halves start empty of tombstones and each receives at most the
    /// parent's item count, so re-insertion cannot fail; a failure means
    /// hashing or accounting is broken and aborts.
    pub(crate) fn split(self, seed: Seed) -> (Table<K, V>, Table<K, V>) {
        let bit = 1u64 << (TABLE_HASH_BITS + u32::from(self.depth));
        let mut low = Table::new(self.depth + 1);
        let mut high = Table::new(self.depth + 1);
        for entry in self.into_entries() {
            let hash = seed.hash(&entry.0);
            let target = if hash & bit == 0 { &mut low } else { &mut high };
            if target.add(entry, hash).is_err() {
                panic!("split re-insertion failed");
            }
        }
        (low, high)
    }

    /// Rebuilds the table at the same depth, dropping all tombstones.
    pub(crate) fn rehash(self, seed: Seed) -> Table<K, V> {
        let depth = self.depth;
        let mut fresh = Table::new(depth);
        for entry in self.into_entries() {
            let hash = seed.hash(&entry.0);
            if fresh.add(entry, hash).is_err() {
                panic!("rehash re-insertion failed");
            }
        }
        fresh
    }

    /// Consumes the table, yielding its entries in group-then-slot order.
    /// Only split and rehash observe this order; it is never exposed.
    fn into_entries(self) -> impl Iterator<Item = (K, V)> {
        self.groups.into_vec().into_iter().flat_map(|mut group| {
            group
                .header
                .find_used()
                .filter_map(move |slot| group.slots[slot].take())
        })
    }
}
