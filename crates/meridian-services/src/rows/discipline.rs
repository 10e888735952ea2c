use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountName, DisciplineId, ExpertTokenId, Share};
use serde::{Deserialize, Serialize};

/// A node in the discipline tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DisciplineRow {
    pub id: DisciplineId,
    pub name: String,
    pub parent: Option<DisciplineId>,
    /// Additive aggregate of all expert token amounts in this discipline.
    pub total_expertise_amount: Share,
    /// Fund allocations that arrived while the discipline had no active
    /// research content; flushed into reward pools by a later allocation.
    pub accumulated_reward: Share,
}

impl Row for DisciplineRow {
    type Id = DisciplineId;
    const ENTITY: &'static str = "discipline";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_name"),
        IndexSpec::ranged("by_parent"),
    ];

    fn id(&self) -> DisciplineId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        let parent = self.parent.map(|p| p.0).unwrap_or(0);
        vec![
            IndexEntry::unique("by_name", key![self.name.as_str()]),
            IndexEntry::ranged("by_parent", key![self.parent.is_some(), parent]),
        ]
    }
}

/// Expertise held by one account in one discipline. Amount never goes
/// negative; spending a review or vote drains regenerating voting power,
/// not the amount itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExpertTokenRow {
    pub id: ExpertTokenId,
    pub account: AccountName,
    pub discipline_id: DisciplineId,
    pub amount: Share,
    /// Remaining voting power on the `VOTING_POWER_FULL` basis.
    pub voting_power: u16,
    pub last_vote_time: DateTime<Utc>,
}

impl Row for ExpertTokenRow {
    type Id = ExpertTokenId;
    const ENTITY: &'static str = "expert_token";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account_and_discipline"),
        IndexSpec::ranged("by_account"),
        IndexSpec::ranged("by_discipline"),
    ];

    fn id(&self) -> ExpertTokenId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_account_and_discipline",
                key![self.account.as_str(), self.discipline_id.0],
            ),
            IndexEntry::ranged("by_account", key![self.account.as_str()]),
            IndexEntry::ranged("by_discipline", key![self.discipline_id.0]),
        ]
    }
}
