use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{Asset, DisciplineId, ResearchContentId, RewardPoolId};
use serde::{Deserialize, Serialize};

/// Reward accrued for one (content, discipline) pair by the fund engines;
/// paid out to reviewers by ECI share when the content's activity window
/// closes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RewardPoolRow {
    pub id: RewardPoolId,
    pub research_content_id: ResearchContentId,
    pub discipline_id: DisciplineId,
    pub balance: Asset,
}

impl Row for RewardPoolRow {
    type Id = RewardPoolId;
    const ENTITY: &'static str = "reward_pool";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_content_and_discipline"),
        IndexSpec::ranged("by_discipline"),
        IndexSpec::ranged("by_content"),
    ];

    fn id(&self) -> RewardPoolId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_content_and_discipline",
                key![self.research_content_id.0, self.discipline_id.0],
            ),
            IndexEntry::ranged("by_discipline", key![self.discipline_id.0]),
            IndexEntry::ranged("by_content", key![self.research_content_id.0]),
        ]
    }
}
