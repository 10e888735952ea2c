use meridian_store::{key, IndexEntry, IndexSpec, Row};
use meridian_types::{AccountName, AssetId, AssetSymbol, Share};
use serde::{Deserialize, Serialize};

/// A registered asset. The native asset is seeded at genesis with no
/// issuer restrictions; everything else is issued by its registrant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRow {
    pub id: AssetId,
    pub symbol: AssetSymbol,
    pub precision: u8,
    pub issuer: AccountName,
    pub description: String,
    pub current_supply: Share,
}

impl Row for AssetRow {
    type Id = AssetId;
    const ENTITY: &'static str = "asset";
    const INDICES: &'static [IndexSpec] = &[IndexSpec::unique("by_symbol")];

    fn id(&self) -> AssetId {
        self.id
    }

    fn index_entries(&self) -> Vec<IndexEntry> {
        vec![IndexEntry::unique("by_symbol", key![self.symbol.as_str()])]
    }
}
