use chrono::{DateTime, Utc};
use meridian_protocol::TokenSaleStatus;
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{
    AccountName, Asset, ContributionId, ResearchId, ResearchTokenId, ResearchTokenSaleId, Share,
};
use serde::{Deserialize, Serialize};

/// Personal holding of one research's tokens.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchTokenRow {
    pub id: ResearchTokenId,
    pub owner: AccountName,
    pub research_id: ResearchId,
    pub amount: Share,
}

impl Row for ResearchTokenRow {
    type Id = ResearchTokenId;
    const ENTITY: &'static str = "research_token";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_owner_and_research"),
        IndexSpec::ranged("by_research"),
        IndexSpec::ranged("by_owner"),
    ];

    fn id(&self) -> ResearchTokenId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_owner_and_research",
                key![self.owner.as_str(), self.research_id.0],
            ),
            IndexEntry::ranged("by_research", key![self.research_id.0]),
            IndexEntry::ranged("by_owner", key![self.owner.as_str()]),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchTokenSaleRow {
    pub id: ResearchTokenSaleId,
    pub research_id: ResearchId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Research tokens escrowed for distribution.
    pub balance_tokens: Share,
    pub total_collected: Asset,
    pub soft_cap: Asset,
    pub hard_cap: Asset,
    pub status: TokenSaleStatus,
}

impl Row for ResearchTokenSaleRow {
    type Id = ResearchTokenSaleId;
    const ENTITY: &'static str = "research_token_sale";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_research"),
        IndexSpec::ranged("by_start_time"),
        IndexSpec::ranged("by_end_time"),
    ];

    fn id(&self) -> ResearchTokenSaleId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_research", key![self.research_id.0]),
            IndexEntry::ranged(
                "by_start_time",
                key![
                    self.status != TokenSaleStatus::Inactive,
                    self.start_time.timestamp()
                ],
            ),
            IndexEntry::ranged(
                "by_end_time",
                key![
                    self.status != TokenSaleStatus::Active,
                    self.end_time.timestamp()
                ],
            ),
        ]
    }
}

/// One backer's stake in a sale; refunded in full if the soft cap is
/// missed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContributionRow {
    pub id: ContributionId,
    pub owner: AccountName,
    pub research_token_sale_id: ResearchTokenSaleId,
    pub amount: Asset,
    pub contribution_time: DateTime<Utc>,
}

impl Row for ContributionRow {
    type Id = ContributionId;
    const ENTITY: &'static str = "research_token_sale_contribution";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::unique("by_owner_and_sale"),
        IndexSpec::ranged("by_sale"),
    ];

    fn id(&self) -> ContributionId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::unique(
                "by_owner_and_sale",
                key![self.owner.as_str(), self.research_token_sale_id.0],
            ),
            IndexEntry::ranged("by_sale", key![self.research_token_sale_id.0]),
        ]
    }
}
