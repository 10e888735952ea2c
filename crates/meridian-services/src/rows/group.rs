use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{
    AccountName, AssetSymbol, Percent, ResearchGroupId, ResearchGroupInviteId,
    ResearchGroupJoinRequestId, ResearchGroupTokenId, Share,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchGroupRow {
    pub id: ResearchGroupId,
    pub permlink: String,
    pub description: String,
    /// Quorum percent snapshot copied into each new proposal.
    pub quorum: Percent,
    /// Sum of every member's group-token amount.
    pub total_tokens_amount: Share,
    /// Group treasury per asset symbol.
    pub balances: BTreeMap<AssetSymbol, Share>,
}

impl Row for ResearchGroupRow {
    type Id = ResearchGroupId;
    const ENTITY: &'static str = "research_group";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_permlink")];

    fn id(&self) -> ResearchGroupId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::unique("by_permlink", key![self.permlink.as_str()])]
    }
}

/// Membership stake: one row per (owner, group).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchGroupTokenRow {
    pub id: ResearchGroupTokenId,
    pub owner: AccountName,
    pub research_group_id: ResearchGroupId,
    pub amount: Share,
}

impl Row for ResearchGroupTokenRow {
    type Id = ResearchGroupTokenId;
    const ENTITY: &'static str = "research_group_token";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_owner_and_group"),
        IndexSpec::ranged("by_group"),
        IndexSpec::ranged("by_owner"),
    ];

    fn id(&self) -> ResearchGroupTokenId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_owner_and_group",
                key![self.owner.as_str(), self.research_group_id.0],
            ),
            IndexEntry::ranged("by_group", key![self.research_group_id.0]),
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
        ]
    }
}

/// Pending invitation created by governance; approved or rejected by the
/// invitee, swept when expired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchGroupInviteRow {
    pub id: ResearchGroupInviteId,
    pub account: AccountName,
    pub research_group_id: ResearchGroupId,
    pub token_amount: Share,
    pub expiration_time: DateTime<Utc>,
}

impl Row for ResearchGroupInviteRow {
    type Id = ResearchGroupInviteId;
    const ENTITY: &'static str = "research_group_invite";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account_and_group"),
        IndexSpec::ranged("by_expiration"),
    ];

    fn id(&self) -> ResearchGroupInviteId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_account_and_group",
                key![self.account.as_str(), self.research_group_id.0],
            ),
            IndexEntry::ranged("by_expiration", key![self.expiration_time.timestamp()]),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchGroupJoinRequestRow {
    pub id: ResearchGroupJoinRequestId,
    pub account: AccountName,
    pub research_group_id: ResearchGroupId,
    pub motivation: String,
    pub expiration_time: DateTime<Utc>,
}

impl Row for ResearchGroupJoinRequestRow {
    type Id = ResearchGroupJoinRequestId;
    const ENTITY: &'static str = "research_group_join_request";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_account_and_group"),
        IndexSpec::ranged("by_expiration"),
    ];

    fn id(&self) -> ResearchGroupJoinRequestId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_account_and_group",
                key![self.account.as_str(), self.research_group_id.0],
            ),
            IndexEntry::ranged("by_expiration", key![self.expiration_time.timestamp()]),
        ]
    }
}
