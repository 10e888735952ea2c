use crate::rows::VestingContractRow;
use crate::{ChainError, ServiceRegistry};
use meridian_protocol::VirtualOperation;
use meridian_store::{key, Row};
use meridian_types::{AccountName, Asset, Share, VestingContractId};
use tracing::info;

pub struct VestingService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl VestingService<'_> {
    pub fn get(&self, id: VestingContractId) -> Result<VestingContractRow, ChainError> {
        Ok(self.reg.vesting_contracts.get(id)?.clone())
    }

    pub fn contracts_of_owner(
        &self,
        owner: &AccountName,
    ) -> Result<Vec<VestingContractRow>, ChainError> {
        Ok(self
            .reg
            .vesting_contracts
            .range_prefix("by_owner", &key![owner.as_str()])?
            .cloned()
            .collect())
    }

    pub fn create_contract(
        &mut self,
        creator: &AccountName,
        owner: &AccountName,
        balance: &Asset,
        duration_secs: i64,
        cliff_secs: i64,
    ) -> Result<VestingContractId, ChainError> {
        if !balance.is_native() {
            return Err(ChainError::InvalidState("vesting is denominated in the native asset"));
        }
        if balance.amount <= 0 {
            return Err(ChainError::InvalidAmount(balance.amount));
        }
        self.reg.accounts().check_existence(owner)?;
        if self
            .reg
            .vesting_contracts
            .find_unique("by_creator_and_owner", &key![creator.as_str(), owner.as_str()])?
            .is_some()
        {
            return Err(ChainError::already_exists(
                VestingContractRow::ENTITY,
                format!("{}/{}", creator, owner),
            ));
        }
        self.reg.accounts().decrease_balance(creator, balance)?;

        let now = self.reg.clock.head_block_time;
        let id = self.reg.vesting_contracts.insert(|id| VestingContractRow {
            id,
            creator: creator.clone(),
            owner: owner.clone(),
            balance: balance.clone(),
            start_time: now,
            duration_secs,
            cliff_secs,
            withdrawn: 0,
        })?;
        info!(contract = id.0, creator = %creator, owner = %owner, "vesting contract created");
        Ok(id)
    }

    /// Withdraw vested balance. Linear unlock after the cliff:
    /// `vested = total * elapsed / duration`, and at most
    /// `vested - withdrawn` is available. `withdrawn` only ever grows.
    pub fn withdraw(
        &mut self,
        owner: &AccountName,
        contract_id: VestingContractId,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        if amount.amount <= 0 {
            return Err(ChainError::InvalidAmount(amount.amount));
        }
        let contract = self.get(contract_id)?;
        if &contract.owner != owner {
            return Err(ChainError::InvalidState("vesting contract belongs to another owner"));
        }
        let now = self.reg.clock.head_block_time;
        let elapsed = (now - contract.start_time).num_seconds();
        if elapsed < contract.cliff_secs {
            return Err(ChainError::WindowViolation("vesting cliff has not passed"));
        }

        let total = contract.balance.amount + contract.withdrawn;
        let vested: Share = if elapsed >= contract.duration_secs {
            total
        } else {
            (total as i128 * elapsed as i128 / contract.duration_secs as i128) as Share
        };
        let available = vested - contract.withdrawn;
        if amount.amount > available {
            return Err(ChainError::InsufficientTokens {
                holder: owner.as_str().to_owned(),
                available,
                required: amount.amount,
            });
        }

        if contract.balance.amount == amount.amount {
            self.reg.vesting_contracts.remove(contract_id)?;
        } else {
            self.reg.vesting_contracts.update(contract_id, |row| {
                row.balance.amount -= amount.amount;
                row.withdrawn += amount.amount;
            })?;
        }
        self.reg.accounts().increase_balance(owner, amount)?;
        self.reg.emit(VirtualOperation::VestingWithdrawn {
            vesting_contract_id: contract_id,
            owner: owner.clone(),
            amount: amount.clone(),
        });
        Ok(())
    }
}
