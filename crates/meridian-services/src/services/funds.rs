use crate::rows::{BudgetRow, DisciplineSupplyRow, GrantRow};
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Utc};
use meridian_protocol::{FundKind, VirtualOperation};
use meridian_store::key;
use meridian_types::config::{BLOCK_INTERVAL_SECS, MAX_FUNDS_PER_OWNER, MIN_FUND_PER_BLOCK};
use meridian_types::{
    AccountName, Asset, BudgetId, DisciplineId, DisciplineSupplyId, GrantId, Share,
};
use tracing::{debug, info};

pub struct FundService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

/// Shared creation-time validation for the drip engines: computes the
/// per-block rate and rejects anything that could not pay the minimum
/// every block. Runs before any balance moves.
fn per_block_rate(balance: &Asset, blocks: i64) -> Result<Share, ChainError> {
    if blocks <= 0 {
        return Err(ChainError::WindowViolation("fund window must span at least one block"));
    }
    let per_block = balance.amount / blocks;
    if per_block < MIN_FUND_PER_BLOCK {
        return Err(ChainError::FundTooThin { per_block });
    }
    Ok(per_block)
}

impl FundService<'_> {
    pub fn get_budget(&self, id: BudgetId) -> Result<BudgetRow, ChainError> {
        Ok(self.reg.budgets.get(id)?.clone())
    }

    pub fn get_grant(&self, id: GrantId) -> Result<GrantRow, ChainError> {
        Ok(self.reg.grants.get(id)?.clone())
    }

    pub fn get_supply(&self, id: DisciplineSupplyId) -> Result<DisciplineSupplyRow, ChainError> {
        Ok(self.reg.discipline_supplies.get(id)?.clone())
    }

    fn validate_block_fund(
        &mut self,
        owner: &AccountName,
        balance: &Asset,
        start_block: u32,
        end_block: u32,
        discipline: DisciplineId,
        owner_fund_count: usize,
    ) -> Result<(u32, Share), ChainError> {
        if !balance.is_native() {
            return Err(ChainError::InvalidState("funds are denominated in the native asset"));
        }
        if balance.amount <= 0 {
            return Err(ChainError::InvalidAmount(balance.amount));
        }
        self.reg.disciplines().check_existence(discipline)?;
        if owner_fund_count >= MAX_FUNDS_PER_OWNER {
            return Err(ChainError::TooManyFunds {
                owner: owner.as_str().to_owned(),
            });
        }
        // a window opening in the past starts now
        let start = start_block.max(self.reg.clock.head_block_number);
        if start >= end_block {
            return Err(ChainError::WindowViolation("fund window has already closed"));
        }
        let per_block = per_block_rate(balance, (end_block - start) as i64)?;
        Ok((start, per_block))
    }

    pub fn create_budget(
        &mut self,
        owner: &AccountName,
        balance: &Asset,
        start_block: u32,
        end_block: u32,
        discipline: DisciplineId,
    ) -> Result<BudgetId, ChainError> {
        let count = self
            .reg
            .budgets
            .count_prefix("by_owner", &key![owner.as_str()])?;
        let (start, per_block) =
            self.validate_block_fund(owner, balance, start_block, end_block, discipline, count)?;
        self.reg.accounts().decrease_balance(owner, balance)?;

        let now = self.reg.clock.head_block_time;
        let id = self.reg.budgets.insert(|id| BudgetRow {
            id,
            owner: owner.clone(),
            balance: balance.clone(),
            start_block: start,
            end_block,
            target_discipline: discipline,
            per_block,
            created_at: now,
        })?;
        info!(budget = id.0, owner = %owner, per_block, "budget created");
        Ok(id)
    }

    pub fn create_grant(
        &mut self,
        owner: &AccountName,
        balance: &Asset,
        start_block: u32,
        end_block: u32,
        discipline: DisciplineId,
    ) -> Result<GrantId, ChainError> {
        let count = self
            .reg
            .grants
            .count_prefix("by_owner", &key![owner.as_str()])?;
        let (start, per_block) =
            self.validate_block_fund(owner, balance, start_block, end_block, discipline, count)?;
        self.reg.accounts().decrease_balance(owner, balance)?;

        let now = self.reg.clock.head_block_time;
        let id = self.reg.grants.insert(|id| GrantRow {
            id,
            owner: owner.clone(),
            balance: balance.clone(),
            start_block: start,
            end_block,
            target_discipline: discipline,
            per_block,
            created_at: now,
        })?;
        info!(grant = id.0, owner = %owner, per_block, "grant created");
        Ok(id)
    }

    pub fn create_discipline_supply(
        &mut self,
        grantor: &AccountName,
        balance: &Asset,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        discipline: DisciplineId,
        content_hash: &str,
    ) -> Result<DisciplineSupplyId, ChainError> {
        if !balance.is_native() {
            return Err(ChainError::InvalidState("funds are denominated in the native asset"));
        }
        if balance.amount <= 0 {
            return Err(ChainError::InvalidAmount(balance.amount));
        }
        self.reg.disciplines().check_existence(discipline)?;
        let count = self
            .reg
            .discipline_supplies
            .count_prefix("by_grantor", &key![grantor.as_str()])?;
        if count >= MAX_FUNDS_PER_OWNER {
            return Err(ChainError::TooManyFunds {
                owner: grantor.as_str().to_owned(),
            });
        }
        let start = start_time.max(self.reg.clock.head_block_time);
        if start >= end_time {
            return Err(ChainError::WindowViolation("fund window has already closed"));
        }
        let blocks = (end_time - start).num_seconds() / BLOCK_INTERVAL_SECS;
        let per_block = per_block_rate(balance, blocks)?;
        self.reg.accounts().decrease_balance(grantor, balance)?;

        let id = self
            .reg
            .discipline_supplies
            .insert(|id| DisciplineSupplyRow {
                id,
                grantor: grantor.clone(),
                balance: balance.clone(),
                start_time: start,
                end_time,
                target_discipline: discipline,
                per_block,
                content_hash: content_hash.to_owned(),
            })?;
        info!(supply = id.0, grantor = %grantor, per_block, "discipline supply created");
        Ok(id)
    }

    /// Drip one block's allocation from every active fund, in table order:
    /// budgets, then grants, then supplies, each ascending by id. A fund
    /// pays `min(per_block, balance)` and its row is erased exactly when
    /// the balance reaches zero.
    pub fn allocate_funds(&mut self) -> Result<(), ChainError> {
        let head = self.reg.clock.head_block_number;
        let now = self.reg.clock.head_block_time;

        let due_budgets: Vec<_> = self
            .reg
            .budgets
            .iter()
            .filter(|b| b.start_block <= head && head <= b.end_block)
            .map(|b| (b.id.0, b.per_block, b.balance.amount, b.target_discipline))
            .collect();
        for (raw_id, per_block, balance, discipline) in due_budgets {
            let id = BudgetId(raw_id);
            let pay = per_block.min(balance);
            self.route_allocation(FundKind::Budget, raw_id, discipline, pay)?;
            if balance - pay == 0 {
                self.reg.budgets.remove(id)?;
            } else {
                self.reg
                    .budgets
                    .update(id, |row| row.balance.amount -= pay)?;
            }
        }

        let due_grants: Vec<_> = self
            .reg
            .grants
            .iter()
            .filter(|g| g.start_block <= head && head <= g.end_block)
            .map(|g| (g.id.0, g.per_block, g.balance.amount, g.target_discipline))
            .collect();
        for (raw_id, per_block, balance, discipline) in due_grants {
            let id = GrantId(raw_id);
            let pay = per_block.min(balance);
            self.route_allocation(FundKind::Grant, raw_id, discipline, pay)?;
            if balance - pay == 0 {
                self.reg.grants.remove(id)?;
            } else {
                self.reg.grants.update(id, |row| row.balance.amount -= pay)?;
            }
        }

        let due_supplies: Vec<_> = self
            .reg
            .discipline_supplies
            .iter()
            .filter(|s| s.start_time <= now && now < s.end_time)
            .map(|s| (s.id.0, s.per_block, s.balance.amount, s.target_discipline))
            .collect();
        for (raw_id, per_block, balance, discipline) in due_supplies {
            let id = DisciplineSupplyId(raw_id);
            let pay = per_block.min(balance);
            self.route_allocation(FundKind::DisciplineSupply, raw_id, discipline, pay)?;
            if balance - pay == 0 {
                self.reg.discipline_supplies.remove(id)?;
            } else {
                self.reg
                    .discipline_supplies
                    .update(id, |row| row.balance.amount -= pay)?;
            }
        }
        Ok(())
    }

    fn route_allocation(
        &mut self,
        kind: FundKind,
        fund_id: u64,
        discipline: DisciplineId,
        pay: Share,
    ) -> Result<(), ChainError> {
        let parked = self.reg.disciplines().take_accumulated_reward(discipline)?;
        let total = pay + parked;
        let placed = self.reg.rewards().credit_discipline(discipline, total)?;
        if !placed {
            self.reg.disciplines().accumulate_reward(discipline, total)?;
        }
        debug!(?kind, fund_id, discipline = discipline.0, pay, "fund allocation");
        self.reg.emit(VirtualOperation::FundAllocated {
            kind,
            fund_id,
            target_discipline: discipline,
            amount: Asset::native(pay),
        });
        Ok(())
    }

    /// Refund expired funds that still carry a balance. Budgets and grants
    /// refund their owner; a supply's remainder goes into its discipline's
    /// reward pools when any content is active, otherwise back to the
    /// grantor.
    pub fn expire_due_funds(&mut self) -> Result<(), ChainError> {
        let head = self.reg.clock.head_block_number;
        let now = self.reg.clock.head_block_time;

        let expired_budgets: Vec<_> = self
            .reg
            .budgets
            .iter_index("by_end_block")?
            .take_while(|b| b.end_block < head)
            .map(|b| b.id)
            .collect();
        for id in expired_budgets {
            let row = self.reg.budgets.remove(id)?;
            if row.balance.amount > 0 {
                self.reg.accounts().increase_balance(&row.owner, &row.balance)?;
            }
        }

        let expired_grants: Vec<_> = self
            .reg
            .grants
            .iter_index("by_end_block")?
            .take_while(|g| g.end_block < head)
            .map(|g| g.id)
            .collect();
        for id in expired_grants {
            let row = self.reg.grants.remove(id)?;
            if row.balance.amount > 0 {
                self.reg.accounts().increase_balance(&row.owner, &row.balance)?;
            }
        }

        let expired_supplies: Vec<_> = self
            .reg
            .discipline_supplies
            .iter_index("by_end_time")?
            .take_while(|s| s.end_time <= now)
            .map(|s| s.id)
            .collect();
        for id in expired_supplies {
            let row = self.reg.discipline_supplies.remove(id)?;
            if row.balance.amount > 0 {
                let placed = self
                    .reg
                    .rewards()
                    .credit_discipline(row.target_discipline, row.balance.amount)?;
                if !placed {
                    self.reg.accounts().increase_balance(&row.grantor, &row.balance)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_accounts, ALICE};
    use meridian_types::config::native_symbol;

    fn fund_fixture(balance: Share) -> (ServiceRegistry, AccountName, DisciplineId) {
        let mut reg = registry_with_accounts(&[(ALICE, balance)]);
        let d = reg.disciplines().create_discipline("physics", None).unwrap();
        (reg, AccountName::from(ALICE), d)
    }

    #[test]
    fn thin_fund_fails_before_any_debit() {
        let (mut reg, alice, d) = fund_fixture(500);
        // 5 units over 10 blocks is below the per-block minimum of 1
        let err = reg
            .funds()
            .create_grant(&alice, &Asset::native(5), 0, 10, d)
            .unwrap_err();
        assert!(matches!(err, ChainError::FundTooThin { per_block: 0 }));
        assert_eq!(reg.accounts().balance(&alice, &native_symbol()).unwrap(), 500);
    }

    #[test]
    fn allocation_never_overshoots_and_erases_at_zero() {
        let (mut reg, alice, d) = fund_fixture(1000);
        // 100 over 3 blocks: per_block 33; pays 33, 33, 33, then the
        // remaining 1 and erases the row
        let id = reg
            .funds()
            .create_grant(&alice, &Asset::native(100), 1, 4, d)
            .unwrap();

        let expected = [67, 34, 1];
        for remaining in expected {
            reg.advance_clock(1);
            reg.funds().allocate_funds().unwrap();
            assert_eq!(reg.funds().get_grant(id).unwrap().balance.amount, remaining);
        }
        reg.advance_clock(1);
        reg.funds().allocate_funds().unwrap();
        assert!(reg.funds().get_grant(id).is_err());
        assert_eq!(reg.disciplines().get(d).unwrap().accumulated_reward, 100);
    }

    #[test]
    fn grant_disburses_exactly_its_balance() {
        let (mut reg, alice, d) = fund_fixture(500);
        let id = reg
            .funds()
            .create_grant(&alice, &Asset::native(400), 10, 50, d)
            .unwrap();
        assert_eq!(reg.funds().get_grant(id).unwrap().per_block, 10);
        assert_eq!(reg.accounts().balance(&alice, &native_symbol()).unwrap(), 100);

        for _ in 0..55 {
            reg.advance_clock(1);
            reg.funds().allocate_funds().unwrap();
            reg.funds().expire_due_funds().unwrap();
        }
        // 40 allocations of 10 each; nothing refunded, nothing left over
        assert!(reg.funds().get_grant(id).is_err());
        assert_eq!(reg.disciplines().get(d).unwrap().accumulated_reward, 400);
        assert_eq!(reg.accounts().balance(&alice, &native_symbol()).unwrap(), 100);
    }

    #[test]
    fn expired_fund_refunds_the_remainder() {
        let (mut reg, alice, d) = fund_fixture(1000);
        reg.funds()
            .create_budget(&alice, &Asset::native(100), 1, 3, d)
            .unwrap();
        // only block 1 pays (per_block 50) before the window closes
        reg.advance_clock(1);
        reg.funds().allocate_funds().unwrap();
        reg.advance_clock(3);
        reg.funds().expire_due_funds().unwrap();

        assert_eq!(reg.disciplines().get(d).unwrap().accumulated_reward, 50);
        assert_eq!(reg.accounts().balance(&alice, &native_symbol()).unwrap(), 950);
    }
}
