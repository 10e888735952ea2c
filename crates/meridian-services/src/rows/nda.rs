use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountName, NdaContractId, ResearchGroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdaStatus {
    /// Waiting for signatures; party A must sign before party B.
    Pending,
    Signed,
    /// Both parties signed and the contract window has opened.
    Active,
    Declined,
    Expired,
}

impl NdaStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, NdaStatus::Declined | NdaStatus::Expired)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NdaContractRow {
    pub id: NdaContractId,
    pub creator: AccountName,
    pub party_a: AccountName,
    pub party_a_research_group_id: ResearchGroupId,
    pub party_b: AccountName,
    pub party_b_research_group_id: ResearchGroupId,
    pub title: String,
    pub contract_hash: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: NdaStatus,
    pub signatures: BTreeMap<AccountName, String>,
}

impl Row for NdaContractRow {
    type Id = NdaContractId;
    const ENTITY: &'static str = "nda_contract";
    const INDICES: &'static [IndexSpec] = &[
        IndexSpec::ranged("by_party"),
        IndexSpec::ranged("by_end_date"),
        IndexSpec::ranged("by_signed_start"),
    ];

    fn id(&self) -> NdaContractId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![
            IndexEntry::ranged("by_party", key![self.party_a.as_str()]),
            IndexEntry::ranged("by_party", key![self.party_b.as_str()]),
            IndexEntry::ranged(
                "by_end_date",
                key![self.status.is_terminal(), self.end_date.timestamp()],
            ),
            IndexEntry::ranged(
                "by_signed_start",
                key![self.status == NdaStatus::Signed, self.start_date.timestamp()],
            ),
        ]
    }
}
