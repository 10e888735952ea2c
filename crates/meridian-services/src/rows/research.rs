use chrono::{DateTime, Utc};
use meridian_protocol::ResearchContentType;
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{
    AccountName, DisciplineId, Percent, ResearchContentId, ResearchDisciplineRelationId,
    ResearchGroupId, ResearchId, Share,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchRow {
    pub id: ResearchId,
    pub research_group_id: ResearchGroupId,
    pub title: String,
    pub abstract_: String,
    pub permlink: String,
    /// Share of rewards routed to reviewers.
    pub review_share: Percent,
    pub dropout_compensation: Percent,
    /// Research tokens still held by the research itself; sales and dropout
    /// compensation draw from this.
    pub owned_tokens: Share,
    pub positive_reviews: u32,
    pub negative_reviews: u32,
    pub created_at: DateTime<Utc>,
}

impl Row for ResearchRow {
    type Id = ResearchId;
    const ENTITY: &'static str = "research";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_permlink"),
        IndexSpec::ranged("by_group"),
    ];

    fn id(&self) -> ResearchId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique("by_permlink", key![self.permlink.as_str()]),
            IndexEntry::ranged("by_group", key![self.research_group_id.0]),
        ]
    }
}

/// Membership of a research in one discipline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchDisciplineRelationRow {
    pub id: ResearchDisciplineRelationId,
    pub research_id: ResearchId,
    pub discipline_id: DisciplineId,
}

impl Row for ResearchDisciplineRelationRow {
    type Id = ResearchDisciplineRelationId;
    const ENTITY: &'static str = "research_discipline_relation";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_research_and_discipline"),
        IndexSpec::ranged("by_research"),
        IndexSpec::ranged("by_discipline"),
    ];

    fn id(&self) -> ResearchDisciplineRelationId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_research_and_discipline",
                key![self.research_id.0, self.discipline_id.0],
            ),
            IndexEntry::ranged("by_research", key![self.research_id.0]),
            IndexEntry::ranged("by_discipline", key![self.discipline_id.0]),
        ]
    }
}

/// Whether a content item still accrues review rewards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityState {
    Active,
    Closed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchContentRow {
    pub id: ResearchContentId,
    pub research_id: ResearchId,
    pub content_type: ResearchContentType,
    pub title: String,
    pub content: String,
    pub authors: BTreeSet<AccountName>,
    pub references: Vec<ResearchContentId>,
    pub created_at: DateTime<Utc>,
    /// Window in which reviews accrue rewards: 14 days for intermediate
    /// kinds, 60 days for a final result.
    pub activity_window_start: DateTime<Utc>,
    pub activity_window_end: DateTime<Utc>,
    pub activity_state: ActivityState,
}

impl Row for ResearchContentRow {
    type Id = ResearchContentId;
    const ENTITY: &'static str = "research_content";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_research"),
        IndexSpec::ranged("by_activity_end"),
    ];

    fn id(&self) -> ResearchContentId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_research", key![self.research_id.0]),
            IndexEntry::ranged(
                "by_activity_end",
                key![
                    self.activity_state == ActivityState::Closed,
                    self.activity_window_end.timestamp()
                ],
            ),
        ]
    }
}
