use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{
    AccountName, Asset, BudgetId, DisciplineId, DisciplineSupplyId, GrantId, Share,
};
use serde::{Deserialize, Serialize};

/// Block-bounded drip fund. Budget and grant share the same mechanics and
/// differ only in provenance, so they keep separate tables but one shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BudgetRow {
    pub id: BudgetId,
    pub owner: AccountName,
    pub balance: Asset,
    pub start_block: u32,
    pub end_block: u32,
    pub target_discipline: DisciplineId,
    pub per_block: Share,
    pub created_at: DateTime<Utc>,
}

impl Row for BudgetRow {
    type Id = BudgetId;
    const ENTITY: &'static str = "budget";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_owner"),
        IndexSpec::ranged("by_end_block"),
    ];

    fn id(&self) -> BudgetId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
            IndexEntry::ranged("by_end_block", key![self.end_block]),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantRow {
    pub id: GrantId,
    pub owner: AccountName,
    pub balance: Asset,
    pub start_block: u32,
    pub end_block: u32,
    pub target_discipline: DisciplineId,
    pub per_block: Share,
    pub created_at: DateTime<Utc>,
}

impl Row for GrantRow {
    type Id = GrantId;
    const ENTITY: &'static str = "grant";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_owner"),
        IndexSpec::ranged("by_end_block"),
    ];

    fn id(&self) -> GrantId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
            IndexEntry::ranged("by_end_block", key![self.end_block]),
        ]
    }
}

/// Time-bounded drip fund targeting one discipline; the window is wall
/// clock, converted to blocks for the per-block rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisciplineSupplyRow {
    pub id: DisciplineSupplyId,
    pub grantor: AccountName,
    pub balance: Asset,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub target_discipline: DisciplineId,
    pub per_block: Share,
    pub content_hash: String,
}

impl Row for DisciplineSupplyRow {
    type Id = DisciplineSupplyId;
    const ENTITY: &'static str = "discipline_supply";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_grantor"),
        IndexSpec::ranged("by_end_time"),
    ];

    fn id(&self) -> DisciplineSupplyId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_grantor", key![self.grantor.as_str()]),
            IndexEntry::ranged("by_end_time", key![self.end_time.timestamp()]),
        ]
    }
}
