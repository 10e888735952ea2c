use chrono::{DateTime, Utc};
use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountId, AccountName, AssetSymbol, Authority, Share};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A chain account. Never removed once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: AccountId,
    pub name: AccountName,
    pub recovery_account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    /// Liquid balance per asset symbol.
    pub balances: BTreeMap<AssetSymbol, Share>,
    /// Common (vesting-style) tokens backing governance weight.
    pub common_tokens: Share,
    /// Aggregate of the account's expert tokens across all disciplines.
    pub expertise_tokens: Share,
    pub created_at: DateTime<Utc>,
}

impl Row for AccountRow {
    type Id = AccountId;
    const ENTITY: &'static str = "account";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_name")];

    fn id(&self) -> AccountId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::unique("by_name", key![self.name.as_str()])]
    }
}
