//! Entity row definitions.
//!
//! Each row implements [`meridian_store::Row`], declaring its secondary
//! indices; the index names used here are the only ones the services query.

mod account;
mod asset_registry;
mod discipline;
mod fund;
mod group;
mod nda;
mod proposal;
mod research;
mod review;
mod reward;
mod token_sale;
mod vesting;

pub use account::AccountRow;
pub use asset_registry::AssetRow;
pub use discipline::{DisciplineRow, ExpertTokenRow};
pub use fund::{BudgetRow, DisciplineSupplyRow, GrantRow};
pub use group::{
    ResearchGroupInviteRow, ResearchGroupJoinRequestRow, ResearchGroupRow, ResearchGroupTokenRow,
};
pub use nda::{NdaContractRow, NdaStatus};
pub use proposal::{ProposalRow, ProposalVoteRow};
pub use research::{
    ActivityState, ResearchContentRow, ResearchDisciplineRelationRow, ResearchRow,
};
pub use review::{ReviewRow, ReviewVoteRow};
pub use reward::RewardPoolRow;
pub use token_sale::{ContributionRow, ResearchTokenRow, ResearchTokenSaleRow};
pub use vesting::VestingContractRow;

use crate::ChainError;
use meridian_types::{Asset, AssetSymbol, Share};
use std::collections::BTreeMap;

/// Per-symbol balance book shared by accounts and research groups.
pub(crate) fn credit_balance(balances: &mut BTreeMap<AssetSymbol, Share>, amount: &Asset) {
    *balances.entry(amount.symbol.clone()).or_insert(0) += amount.amount;
}

/// Sufficiency guard. Table updates stage infallible closures, so every
/// debit is checked here first and applied with [`debit_balance_unchecked`]
/// inside the closure.
pub(crate) fn ensure_sufficient(
    balances: &BTreeMap<AssetSymbol, Share>,
    holder: &str,
    amount: &Asset,
) -> Result<(), ChainError> {
    let available = balances.get(&amount.symbol).copied().unwrap_or(0);
    if available < amount.amount {
        return Err(ChainError::InsufficientFunds {
            account: holder.to_owned(),
            symbol: amount.symbol.as_str().to_owned(),
            available,
            required: amount.amount,
        });
    }
    Ok(())
}

/// Empty entries are dropped so the serialized map stays canonical.
pub(crate) fn debit_balance_unchecked(
    balances: &mut BTreeMap<AssetSymbol, Share>,
    amount: &Asset,
) {
    let available = balances.get(&amount.symbol).copied().unwrap_or(0);
    let remaining = available - amount.amount;
    if remaining <= 0 {
        balances.remove(&amount.symbol);
    } else {
        balances.insert(amount.symbol.clone(), remaining);
    }
}

pub(crate) fn balance_of(balances: &BTreeMap<AssetSymbol, Share>, symbol: &AssetSymbol) -> Share {
    balances.get(symbol).copied().unwrap_or(0)
}
