//! Property test: secondary indices stay consistent with the primary arena
//! under arbitrary insert/update/remove sequences.

use meridian_store::{key, IndexEntry, IndexSpec, Row, Table};
use proptest::prelude::*;

#[derive(Clone, Debug, PartialEq)]
struct Entry {
    id: u64,
    owner: String,
    age: i64,
}

impl Row for Entry {
    type Id = u64;
    const ENTITY: &'static str = "entry";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_owner"),
        IndexSpec::ranged("by_age"),
    ];

    fn id(&self) -> u64 {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
            IndexEntry::ranged("by_age", key![self.age]),
        ]
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert { owner: u8, age: i64 },
    SetOwner { slot: usize, owner: u8 },
    SetAge { slot: usize, age: i64 },
    Remove { slot: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..4, -5i64..5).prop_map(|(owner, age)| Op::Insert { owner, age }),
        (0usize..32, 0u8..4).prop_map(|(slot, owner)| Op::SetOwner { slot, owner }),
        (0usize..32, -5i64..5).prop_map(|(slot, age)| Op::SetAge { slot, age }),
        (0usize..32).prop_map(|slot| Op::Remove { slot }),
    ]
}

fn owner_name(owner: u8) -> String {
    format!("owner{owner}")
}

/// Pick a live id by position, wrapping the slot over the current ids.
fn pick(live: &[u64], slot: usize) -> Option<u64> {
    if live.is_empty() {
        None
    } else {
        Some(live[slot % live.len()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn indices_mirror_the_arena(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let mut table = Table::<Entry>::new();

        for op in ops {
            let live: Vec<u64> = table.iter().map(|e| e.id).collect();
            match op {
                Op::Insert { owner, age } => {
                    table
                        .insert(|id| Entry {
                            id,
                            owner: owner_name(owner),
                            age,
                        })
                        .unwrap();
                }
                Op::SetOwner { slot, owner } => {
                    if let Some(id) = pick(&live, slot) {
                        table.update(id, |e| e.owner = owner_name(owner)).unwrap();
                    }
                }
                Op::SetAge { slot, age } => {
                    if let Some(id) = pick(&live, slot) {
                        table.update(id, |e| e.age = age).unwrap();
                    }
                }
                Op::Remove { slot } => {
                    if let Some(id) = pick(&live, slot) {
                        table.remove(id).unwrap();
                    }
                }
            }
        }

        // every owner scan returns exactly the matching rows, ascending by id
        for owner in 0u8..4 {
            let name = owner_name(owner);
            let scanned: Vec<u64> = table
                .range_prefix("by_owner", &key![name.as_str()])
                .unwrap()
                .map(|e| e.id)
                .collect();
            let mut expected: Vec<u64> = table
                .iter()
                .filter(|e| e.owner == name)
                .map(|e| e.id)
                .collect();
            expected.sort_unstable();
            prop_assert_eq!(scanned, expected);
        }

        // the age index covers the arena exactly once, in key order
        let ages: Vec<i64> = table.iter_index("by_age").unwrap().map(|e| e.age).collect();
        prop_assert_eq!(ages.len(), table.len());
        prop_assert!(ages.windows(2).all(|w| w[0] <= w[1]));
    }
}
