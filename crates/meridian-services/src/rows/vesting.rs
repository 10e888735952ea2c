use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountName, Asset, Share, VestingContractId};
use serde::{Deserialize, Serialize};

/// Linear vesting schedule with a cliff. `withdrawn` only ever grows and
/// never exceeds the original total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VestingContractRow {
    pub id: VestingContractId,
    pub creator: AccountName,
    pub owner: AccountName,
    /// Remaining undelivered balance.
    pub balance: Asset,
    pub start_time: DateTime<Utc>,
    pub duration_secs: i64,
    pub cliff_secs: i64,
    pub withdrawn: Share,
}

impl Row for VestingContractRow {
    type Id = VestingContractId;
    const ENTITY: &'static str = "vesting_contract";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_creator_and_owner"),
        IndexSpec::ranged("by_owner"),
    ];

    fn id(&self) -> VestingContractId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_creator_and_owner",
                key![self.creator.as_str(), self.owner.as_str()],
            ),
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
        ]
    }
}
