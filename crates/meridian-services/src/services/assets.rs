use crate::rows::AssetRow;
use crate::{ChainError, ServiceRegistry};
use meridian_store::{key, Row};
use meridian_types::config::NATIVE_SYMBOL;
use meridian_types::{AccountName, Asset, AssetId, AssetSymbol};
use tracing::info;

pub struct AssetService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl AssetService<'_> {
    pub fn get_by_symbol(&self, symbol: &AssetSymbol) -> Result<AssetRow, ChainError> {
        self.reg
            .assets
            .find_unique("by_symbol", &key![symbol.as_str()])?
            .cloned()
            .ok_or_else(|| ChainError::not_found_by_key(AssetRow::ENTITY, symbol.as_str()))
    }

    pub fn check_registered(&self, symbol: &AssetSymbol) -> Result<(), ChainError> {
        self.get_by_symbol(symbol).map(|_| ())
    }

    pub fn create_asset(
        &mut self,
        issuer: &AccountName,
        symbol: &AssetSymbol,
        precision: u8,
        description: &str,
    ) -> Result<AssetId, ChainError> {
        if symbol.as_str() == NATIVE_SYMBOL {
            return Err(ChainError::InvalidState("the native symbol is reserved"));
        }
        self.reg.accounts().check_existence(issuer)?;
        if self
            .reg
            .assets
            .find_unique("by_symbol", &key![symbol.as_str()])?
            .is_some()
        {
            return Err(ChainError::already_exists(AssetRow::ENTITY, symbol.as_str()));
        }
        let id = self.reg.assets.insert(|id| AssetRow {
            id,
            symbol: symbol.clone(),
            precision,
            issuer: issuer.clone(),
            description: description.to_owned(),
            current_supply: 0,
        })?;
        info!(asset = %symbol, issuer = %issuer, "asset registered");
        Ok(id)
    }

    /// Mint new supply to a recipient; only the registering issuer may
    /// issue.
    pub fn issue(
        &mut self,
        issuer: &AccountName,
        amount: &Asset,
        recipient: &AccountName,
    ) -> Result<(), ChainError> {
        if amount.amount <= 0 {
            return Err(ChainError::InvalidAmount(amount.amount));
        }
        let asset = self.get_by_symbol(&amount.symbol)?;
        if &asset.issuer != issuer {
            return Err(ChainError::InvalidState("only the registering issuer can issue"));
        }
        self.reg.accounts().increase_balance(recipient, amount)?;
        self.reg
            .assets
            .update(asset.id, |row| row.current_supply += amount.amount)?;
        Ok(())
    }
}
