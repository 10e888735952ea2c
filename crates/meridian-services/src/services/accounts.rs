use crate::rows::{balance_of, credit_balance, debit_balance_unchecked, ensure_sufficient, AccountRow};
use crate::{ChainError, ServiceRegistry};
use meridian_store::{key, Row};
use meridian_types::config::ACCOUNT_CREATION_FEE;
use meridian_types::{AccountId, AccountName, Asset, Authority, Share};
use tracing::info;

pub struct AccountService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl AccountService<'_> {
    pub fn get(&self, id: AccountId) -> Result<AccountRow, ChainError> {
        Ok(self.reg.accounts.get(id)?.clone())
    }

    pub fn get_by_name(&self, name: &AccountName) -> Result<AccountRow, ChainError> {
        self.reg
            .accounts
            .find_unique("by_name", &key![name.as_str()])?
            .cloned()
            .ok_or_else(|| ChainError::not_found_by_key(AccountRow::ENTITY, name.as_str()))
    }

    pub fn exists(&self, name: &AccountName) -> Result<bool, ChainError> {
        Ok(self
            .reg
            .accounts
            .find_unique("by_name", &key![name.as_str()])?
            .is_some())
    }

    pub fn check_existence(&self, name: &AccountName) -> Result<(), ChainError> {
        if !self.exists(name)? {
            return Err(ChainError::not_found_by_key(AccountRow::ENTITY, name.as_str()));
        }
        Ok(())
    }

    /// Create an account. The fee leaves the creator's liquid balance and
    /// becomes the new account's common tokens.
    pub fn create_account(
        &mut self,
        creator: &AccountName,
        name: &AccountName,
        fee: &Asset,
        owner: Authority,
        active: Authority,
        posting: Authority,
    ) -> Result<AccountId, ChainError> {
        if self.exists(name)? {
            return Err(ChainError::already_exists(AccountRow::ENTITY, name.as_str()));
        }
        let creator_row = self.get_by_name(creator)?;
        if !fee.is_native() {
            return Err(ChainError::InvalidState(
                "account creation fee must be paid in the native asset",
            ));
        }
        if fee.amount < ACCOUNT_CREATION_FEE {
            return Err(ChainError::FeeTooLow {
                paid: fee.amount,
                minimum: ACCOUNT_CREATION_FEE,
            });
        }
        ensure_sufficient(&creator_row.balances, creator.as_str(), fee)?;

        let now = self.reg.clock.head_block_time;
        if fee.amount > 0 {
            self.reg
                .accounts
                .update(creator_row.id, |row| {
                    debit_balance_unchecked(&mut row.balances, fee)
                })?;
        }
        let id = self.reg.accounts.insert(|id| AccountRow {
            id,
            name: name.clone(),
            recovery_account: creator.clone(),
            owner,
            active,
            posting,
            balances: Default::default(),
            common_tokens: fee.amount,
            expertise_tokens: 0,
            created_at: now,
        })?;
        info!(account = %name, creator = %creator, "account created");
        Ok(id)
    }

    /// Replace authority key sets wholesale; `None` leaves a level as is.
    pub fn update_authorities(
        &mut self,
        name: &AccountName,
        owner: Option<Authority>,
        active: Option<Authority>,
        posting: Option<Authority>,
    ) -> Result<(), ChainError> {
        let id = self.get_by_name(name)?.id;
        self.reg.accounts.update(id, |row| {
            if let Some(owner) = owner {
                row.owner = owner;
            }
            if let Some(active) = active {
                row.active = active;
            }
            if let Some(posting) = posting {
                row.posting = posting;
            }
        })?;
        Ok(())
    }

    pub fn balance(
        &self,
        name: &AccountName,
        symbol: &meridian_types::AssetSymbol,
    ) -> Result<Share, ChainError> {
        Ok(self
            .reg
            .accounts
            .find_unique("by_name", &key![name.as_str()])?
            .map(|row| balance_of(&row.balances, symbol))
            .unwrap_or(0))
    }

    pub fn increase_balance(&mut self, name: &AccountName, amount: &Asset) -> Result<(), ChainError> {
        let id = self.get_by_name(name)?.id;
        self.reg
            .accounts
            .update(id, |row| credit_balance(&mut row.balances, amount))?;
        Ok(())
    }

    pub fn decrease_balance(&mut self, name: &AccountName, amount: &Asset) -> Result<(), ChainError> {
        let row = self.get_by_name(name)?;
        ensure_sufficient(&row.balances, name.as_str(), amount)?;
        self.reg
            .accounts
            .update(row.id, |row| debit_balance_unchecked(&mut row.balances, amount))?;
        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        if amount.amount <= 0 {
            return Err(ChainError::InvalidAmount(amount.amount));
        }
        if !amount.is_native() {
            self.reg.assets().check_registered(&amount.symbol)?;
        }
        self.check_existence(to)?;
        self.decrease_balance(from, amount)?;
        self.increase_balance(to, amount)?;
        Ok(())
    }

    /// Convert liquid native balance into the recipient's common tokens.
    pub fn transfer_to_common_tokens(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        if !amount.is_native() {
            return Err(ChainError::InvalidState(
                "only the native asset converts to common tokens",
            ));
        }
        let to_id = self.get_by_name(to)?.id;
        self.decrease_balance(from, amount)?;
        self.reg
            .accounts
            .update(to_id, |row| row.common_tokens += amount.amount)?;
        Ok(())
    }

    /// Convert common tokens back into liquid native balance.
    pub fn withdraw_common_tokens(
        &mut self,
        account: &AccountName,
        amount: Share,
    ) -> Result<(), ChainError> {
        if amount <= 0 {
            return Err(ChainError::InvalidAmount(amount));
        }
        let row = self.get_by_name(account)?;
        if row.common_tokens < amount {
            return Err(ChainError::InsufficientTokens {
                holder: account.as_str().to_owned(),
                available: row.common_tokens,
                required: amount,
            });
        }
        self.reg.accounts.update(row.id, |row| {
            row.common_tokens -= amount;
            credit_balance(&mut row.balances, &Asset::native(amount));
        })?;
        Ok(())
    }

    pub(crate) fn adjust_expertise_total(
        &mut self,
        name: &AccountName,
        delta: Share,
    ) -> Result<(), ChainError> {
        let id = self.get_by_name(name)?.id;
        self.reg
            .accounts
            .update(id, |row| row.expertise_tokens += delta)?;
        Ok(())
    }
}
