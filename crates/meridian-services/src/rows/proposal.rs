use chrono::{DateTime, Utc};
use meridian_protocol::ProposalAction;
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountName, Percent, ProposalId, ProposalVoteId, ResearchGroupId, Share};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A pending governance proposal. Only pending proposals live in the
/// table: execution, rejection and expiry all remove the row and emit a
/// `ProposalStatusChanged` virtual operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalRow {
    pub id: ProposalId,
    pub research_group_id: ResearchGroupId,
    pub action: ProposalAction,
    pub creator: AccountName,
    pub created_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
    /// Group quorum at creation time; later quorum changes do not affect
    /// proposals already open.
    pub quorum: Percent,
    /// Accumulated group-token weight of the votes cast so far.
    pub current_votes_amount: Share,
    pub voted_accounts: BTreeSet<AccountName>,
}

impl Row for ProposalRow {
    type Id = ProposalId;
    const ENTITY: &'static str = "proposal";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_group"),
        IndexSpec::ranged("by_expiration"),
    ];

    fn id(&self) -> ProposalId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_group", key![self.research_group_id.0]),
            IndexEntry::ranged("by_expiration", key![self.expiration_time.timestamp()]),
        ]
    }
}

/// One member's vote. Weight is the voter's group-token amount at vote
/// time and is never revalued.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProposalVoteRow {
    pub id: ProposalVoteId,
    pub voter: AccountName,
    pub proposal_id: ProposalId,
    pub research_group_id: ResearchGroupId,
    pub weight: Share,
    pub voting_time: DateTime<Utc>,
}

impl Row for ProposalVoteRow {
    type Id = ProposalVoteId;
    const ENTITY: &'static str = "proposal_vote";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_voter_and_proposal"),
        IndexSpec::ranged("by_proposal"),
        IndexSpec::ranged("by_voter_and_group"),
    ];

    fn id(&self) -> ProposalVoteId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_voter_and_proposal",
                key![self.voter.as_str(), self.proposal_id.0],
            ),
            IndexEntry::ranged("by_proposal", key![self.proposal_id.0]),
            IndexEntry::ranged(
                "by_voter_and_group",
                key![self.voter.as_str(), self.research_group_id.0],
            ),
        ]
    }
}
