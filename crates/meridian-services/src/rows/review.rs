use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{
    AccountName, DisciplineId, ResearchContentId, ReviewId, ReviewVoteId, Share,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A peer review of one content item. The review's weight is never stored;
/// it is recomputed from expertise spent and votes received every time it
/// is needed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub research_content_id: ResearchContentId,
    pub author: AccountName,
    pub content: String,
    pub is_positive: bool,
    /// Expertise the author spent, per discipline of the research.
    pub expertise_spent: BTreeMap<DisciplineId, Share>,
    pub created_at: DateTime<Utc>,
}

impl Row for ReviewRow {
    type Id = ReviewId;
    const ENTITY: &'static str = "review";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_author_and_content"),
        IndexSpec::ranged("by_content"),
        IndexSpec::ranged("by_author"),
    ];

    fn id(&self) -> ReviewId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_author_and_content",
                key![self.author.as_str(), self.research_content_id.0],
            ),
            IndexEntry::ranged("by_content", key![self.research_content_id.0]),
            IndexEntry::ranged("by_author", key![self.author.as_str()]),
        ]
    }
}

/// An expertise-weighted vote on a review in one discipline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewVoteRow {
    pub id: ReviewVoteId,
    pub voter: AccountName,
    pub review_id: ReviewId,
    pub discipline_id: DisciplineId,
    /// Expertise the voter spent, snapshotted at vote time.
    pub weight: Share,
    pub voting_time: DateTime<Utc>,
}

impl Row for ReviewVoteRow {
    type Id = ReviewVoteId;
    const ENTITY: &'static str = "review_vote";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_voter_review_discipline"),
        IndexSpec::ranged("by_review"),
        IndexSpec::ranged("by_review_and_discipline"),
    ];

    fn id(&self) -> ReviewVoteId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_voter_review_discipline",
                key![self.voter.as_str(), self.review_id.0, self.discipline_id.0],
            ),
            IndexEntry::ranged("by_review", key![self.review_id.0]),
            IndexEntry::ranged(
                "by_review_and_discipline",
                key![self.review_id.0, self.discipline_id.0],
            ),
        ]
    }
}
