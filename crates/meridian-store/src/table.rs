//! The per-entity table: primary arena + secondary indices.

use crate::{Key, StoreError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Bound;

/// A row stored in a [`Table`].
///
/// Rows declare their secondary indices through [`Row::index_entries`]; the
/// table re-derives the entries on every mutation and reconciles the index
/// maps against them.
pub trait Row: Clone {
    /// Typed id wrapper over the table-assigned integer.
    type Id: Copy + Ord + fmt::Debug + From<u64> + Into<u64>;

    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Declared secondary indices. Queries and produced index entries are
    /// validated against this list, so a misspelled name surfaces as
    /// [`StoreError::UnknownIndex`] instead of an empty result.
    const INDICES: &'static [IndexSpec];

    fn id(&self) -> Self::Id;

    /// Current secondary-index entries for this row.
    fn index_entries(&self) -> Vec<IndexEntry>;
}

/// Declared shape of one secondary index of a row type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: &'static str,
    pub unique: bool,
}

impl IndexSpec {
    pub const fn unique(name: &'static str) -> Self {
        Self { name, unique: true }
    }

    pub const fn ranged(name: &'static str) -> Self {
        Self {
            name,
            unique: false,
        }
    }
}

/// One secondary-index entry of a row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub index: &'static str,
    pub key: Key,
    pub unique: bool,
}

impl IndexEntry {
    pub fn unique(index: &'static str, key: Key) -> Self {
        Self {
            index,
            key,
            unique: true,
        }
    }

    pub fn ranged(index: &'static str, key: Key) -> Self {
        Self {
            index,
            key,
            unique: false,
        }
    }
}

/// Primary arena plus ordered secondary indices for one entity type.
pub struct Table<T: Row> {
    rows: BTreeMap<u64, T>,
    next_id: u64,
    unique: BTreeMap<&'static str, BTreeMap<Key, u64>>,
    ranged: BTreeMap<&'static str, BTreeSet<(Key, u64)>>,
}

impl<T: Row> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Row> Table<T> {
    pub fn new() -> Self {
        let mut unique = BTreeMap::new();
        let mut ranged = BTreeMap::new();
        for spec in T::INDICES {
            if spec.unique {
                unique.insert(spec.name, BTreeMap::new());
            } else {
                ranged.insert(spec.name, BTreeSet::new());
            }
        }
        Self {
            rows: BTreeMap::new(),
            next_id: 0,
            unique,
            ranged,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Insert a new row built around the next id. Fails on a unique-key
    /// collision without assigning the id or touching any index.
    pub fn insert(&mut self, build: impl FnOnce(T::Id) -> T) -> Result<T::Id, StoreError> {
        let raw = self.next_id;
        let row = build(T::Id::from(raw));
        let entries = row.index_entries();

        for entry in &entries {
            Self::check_declared(entry)?;
        }
        for entry in entries.iter().filter(|e| e.unique) {
            if let Some(existing) = self.unique.get(entry.index).and_then(|m| m.get(&entry.key)) {
                if *existing != raw {
                    return Err(StoreError::DuplicateKey {
                        entity: T::ENTITY,
                        index: entry.index,
                    });
                }
            }
        }

        for entry in entries {
            if entry.unique {
                self.unique
                    .entry(entry.index)
                    .or_default()
                    .insert(entry.key, raw);
            } else {
                self.ranged
                    .entry(entry.index)
                    .or_default()
                    .insert((entry.key, raw));
            }
        }
        self.rows.insert(raw, row);
        self.next_id = raw + 1;
        Ok(T::Id::from(raw))
    }

    pub fn get(&self, id: T::Id) -> Result<&T, StoreError> {
        self.rows.get(&id.into()).ok_or(StoreError::NotFound {
            entity: T::ENTITY,
            id: id.into(),
        })
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.rows.get(&id.into())
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.rows.contains_key(&id.into())
    }

    /// Apply a mutator to the row and reconcile every secondary index whose
    /// key changed. The mutation is staged on a copy: a failed precondition
    /// (id change, unique collision) leaves the table untouched.
    pub fn update(
        &mut self,
        id: T::Id,
        mutate: impl FnOnce(&mut T),
    ) -> Result<(), StoreError> {
        let raw: u64 = id.into();
        let old = self
            .rows
            .get(&raw)
            .ok_or(StoreError::NotFound {
                entity: T::ENTITY,
                id: raw,
            })?
            .clone();

        let mut updated = old.clone();
        mutate(&mut updated);
        if updated.id().into() != raw {
            return Err(StoreError::IdMutation {
                entity: T::ENTITY,
                id: raw,
            });
        }

        let old_entries = old.index_entries();
        let new_entries = updated.index_entries();

        for entry in &new_entries {
            Self::check_declared(entry)?;
        }
        for entry in new_entries.iter().filter(|e| e.unique) {
            if let Some(existing) = self.unique.get(entry.index).and_then(|m| m.get(&entry.key)) {
                if *existing != raw {
                    return Err(StoreError::DuplicateKey {
                        entity: T::ENTITY,
                        index: entry.index,
                    });
                }
            }
        }

        for entry in &old_entries {
            if !new_entries.contains(entry) {
                self.drop_entry(entry, raw);
            }
        }
        for entry in new_entries {
            if entry.unique {
                self.unique
                    .entry(entry.index)
                    .or_default()
                    .insert(entry.key, raw);
            } else {
                self.ranged
                    .entry(entry.index)
                    .or_default()
                    .insert((entry.key, raw));
            }
        }
        self.rows.insert(raw, updated);
        Ok(())
    }

    /// Remove the row and every index entry pointing at it.
    pub fn remove(&mut self, id: T::Id) -> Result<T, StoreError> {
        let raw: u64 = id.into();
        let row = self.rows.remove(&raw).ok_or(StoreError::NotFound {
            entity: T::ENTITY,
            id: raw,
        })?;
        for entry in row.index_entries() {
            self.drop_entry(&entry, raw);
        }
        Ok(row)
    }

    fn check_declared(entry: &IndexEntry) -> Result<(), StoreError> {
        let declared = T::INDICES
            .iter()
            .any(|s| s.name == entry.index && s.unique == entry.unique);
        if declared {
            Ok(())
        } else {
            Err(StoreError::UnknownIndex {
                entity: T::ENTITY,
                index: entry.index,
            })
        }
    }

    fn unique_map(&self, index: &'static str) -> Result<&BTreeMap<Key, u64>, StoreError> {
        self.unique.get(index).ok_or(StoreError::UnknownIndex {
            entity: T::ENTITY,
            index,
        })
    }

    fn ranged_set(&self, index: &'static str) -> Result<&BTreeSet<(Key, u64)>, StoreError> {
        self.ranged.get(index).ok_or(StoreError::UnknownIndex {
            entity: T::ENTITY,
            index,
        })
    }

    fn drop_entry(&mut self, entry: &IndexEntry, raw: u64) {
        if entry.unique {
            if let Some(map) = self.unique.get_mut(entry.index) {
                if map.get(&entry.key) == Some(&raw) {
                    map.remove(&entry.key);
                }
            }
        } else if let Some(set) = self.ranged.get_mut(entry.index) {
            set.remove(&(entry.key.clone(), raw));
        }
    }

    /// All rows, ascending by id.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.rows.values()
    }

    /// Row with the given key in a unique index. Errors on an index name
    /// the row type never declared.
    pub fn find_unique(&self, index: &'static str, key: &Key) -> Result<Option<&T>, StoreError> {
        Ok(self
            .unique_map(index)?
            .get(key)
            .and_then(|raw| self.rows.get(raw)))
    }

    /// All rows whose key in a ranged index starts with `prefix`, ascending
    /// by (key, id).
    pub fn range_prefix<'a>(
        &'a self,
        index: &'static str,
        prefix: &'a Key,
    ) -> Result<impl Iterator<Item = &'a T> + 'a, StoreError> {
        let set = self.ranged_set(index)?;
        Ok(set
            .range((Bound::Included((prefix.clone(), 0)), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(prefix))
            .filter_map(move |(_, raw)| self.rows.get(raw)))
    }

    /// Rows from the smallest key in a ranged index upward, ascending.
    /// Expiry sweeps walk this and stop at the first non-expired row.
    pub fn iter_index<'a>(
        &'a self,
        index: &'static str,
    ) -> Result<impl Iterator<Item = &'a T> + 'a, StoreError> {
        Ok(self
            .ranged_set(index)?
            .iter()
            .filter_map(move |(_, raw)| self.rows.get(raw)))
    }

    /// Number of rows matching a ranged-index prefix.
    pub fn count_prefix(&self, index: &'static str, prefix: &Key) -> Result<usize, StoreError> {
        Ok(self.range_prefix(index, prefix)?.count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key;

    #[derive(Clone, Debug, PartialEq)]
    struct Pet {
        id: u64,
        owner: String,
        name: String,
        age: i64,
    }

    impl Row for Pet {
        type Id = u64;
        const ENTITY: &'static str = "pet";
        const INDICES: &'static [IndexSpec] = &[
            IndexSpec::unique("by_owner_and_name"),
            IndexSpec::ranged("by_owner"),
            IndexSpec::ranged("by_age"),
        ];

        fn id(&self) -> u64 {
            self.id
        }

        fn index_entries(&self) -> Vec<IndexEntry> {
            vec![
                IndexEntry::unique("by_owner_and_name", key![self.owner.as_str(), self.name.as_str()]),
                IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
                IndexEntry::ranged("by_age", key![self.age]),
            ]
        }
    }

    fn pet(id: u64, owner: &str, name: &str, age: i64) -> Pet {
        Pet {
            id,
            owner: owner.into(),
            name: name.into(),
            age,
        }
    }

    #[test]
    fn insert_assigns_monotonic_ids() {
        let mut table = Table::<Pet>::new();
        let a = table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();
        let b = table.insert(|id| pet(id, "alice", "bingo", 1)).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(table.get(0).unwrap().name, "rex");
    }

    #[test]
    fn unique_index_rejects_duplicates_without_consuming_id() {
        let mut table = Table::<Pet>::new();
        table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();
        let err = table.insert(|id| pet(id, "alice", "rex", 9)).unwrap_err();
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                entity: "pet",
                index: "by_owner_and_name"
            }
        );
        let next = table.insert(|id| pet(id, "bob", "rex", 2)).unwrap();
        assert_eq!(next, 1);
    }

    #[test]
    fn update_reindexes_changed_keys() {
        let mut table = Table::<Pet>::new();
        let id = table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();
        table.update(id, |p| p.owner = "bob".into()).unwrap();

        let alice_key = key!["alice"];
        let by_alice: Vec<_> = table.range_prefix("by_owner", &alice_key).unwrap().collect();
        assert!(by_alice.is_empty());
        let bob_key = key!["bob"];
        let by_bob: Vec<_> = table.range_prefix("by_owner", &bob_key).unwrap().collect();
        assert_eq!(by_bob.len(), 1);
        assert!(table
            .find_unique("by_owner_and_name", &key!["bob", "rex"])
            .unwrap()
            .is_some());
        assert!(table
            .find_unique("by_owner_and_name", &key!["alice", "rex"])
            .unwrap()
            .is_none());
    }

    #[test]
    fn failed_update_leaves_table_untouched() {
        let mut table = Table::<Pet>::new();
        let a = table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();
        let _b = table.insert(|id| pet(id, "bob", "rex", 2)).unwrap();

        // renaming alice's pet onto bob's unique key must fail atomically
        let err = table.update(a, |p| p.owner = "bob".into()).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
        assert_eq!(table.get(a).unwrap().owner, "alice");
        assert!(table
            .find_unique("by_owner_and_name", &key!["alice", "rex"])
            .unwrap()
            .is_some());
    }

    #[test]
    fn remove_clears_every_index() {
        let mut table = Table::<Pet>::new();
        let id = table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();
        table.remove(id).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.count_prefix("by_owner", &key!["alice"]).unwrap(), 0);
        assert!(table
            .find_unique("by_owner_and_name", &key!["alice", "rex"])
            .unwrap()
            .is_none());
        assert_eq!(
            table.get(id).unwrap_err(),
            StoreError::NotFound {
                entity: "pet",
                id: 0
            }
        );
    }

    #[test]
    fn ranged_scan_is_ordered_and_prefix_bounded() {
        let mut table = Table::<Pet>::new();
        table.insert(|id| pet(id, "alice", "rex", 5)).unwrap();
        table.insert(|id| pet(id, "alice", "bingo", 1)).unwrap();
        table.insert(|id| pet(id, "bob", "suki", 3)).unwrap();

        let ages: Vec<i64> = table.iter_index("by_age").unwrap().map(|p| p.age).collect();
        assert_eq!(ages, vec![1, 3, 5]);

        let alice_key = key!["alice"];
        let alices: Vec<&str> = table
            .range_prefix("by_owner", &alice_key)
            .unwrap()
            .map(|p| p.name.as_str())
            .collect();
        // same key "alice" for both -> tie broken by ascending id
        assert_eq!(alices, vec!["rex", "bingo"]);
    }

    #[test]
    fn undeclared_index_names_error_instead_of_returning_empty() {
        let mut table = Table::<Pet>::new();
        table.insert(|id| pet(id, "alice", "rex", 3)).unwrap();

        let expected = StoreError::UnknownIndex {
            entity: "pet",
            index: "by_onwer",
        };
        assert_eq!(
            table.range_prefix("by_onwer", &key!["alice"]).err(),
            Some(expected.clone())
        );
        assert_eq!(table.count_prefix("by_onwer", &key!["alice"]), Err(expected));
        assert_eq!(
            table.iter_index("by_agee").err(),
            Some(StoreError::UnknownIndex {
                entity: "pet",
                index: "by_agee"
            })
        );
        // a unique name queried through the ranged surface is just as wrong
        assert!(matches!(
            table.iter_index("by_owner_and_name"),
            Err(StoreError::UnknownIndex { .. })
        ));
        assert_eq!(
            table.find_unique("by_name", &key!["rex"]).err(),
            Some(StoreError::UnknownIndex {
                entity: "pet",
                index: "by_name"
            })
        );
    }
}
