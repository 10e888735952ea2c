use crate::rows::ExpertTokenRow;
use crate::{ChainError, ServiceRegistry};
use meridian_store::{key, Row};
use meridian_types::config::{PERCENT_100, VOTE_REGENERATION_SECS, VOTING_POWER_FULL};
use meridian_types::{AccountName, DisciplineId, Percent, Share};
use tracing::{debug, info};

pub struct ExpertiseService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl ExpertiseService<'_> {
    pub fn find_token(
        &self,
        account: &AccountName,
        discipline: DisciplineId,
    ) -> Result<Option<ExpertTokenRow>, ChainError> {
        Ok(self
            .reg
            .expert_tokens
            .find_unique(
                "by_account_and_discipline",
                &key![account.as_str(), discipline.0],
            )?
            .cloned())
    }

    pub fn get_token(
        &self,
        account: &AccountName,
        discipline: DisciplineId,
    ) -> Result<ExpertTokenRow, ChainError> {
        self.find_token(account, discipline)?.ok_or_else(|| {
            ChainError::not_found_by_key(
                ExpertTokenRow::ENTITY,
                format!("{}/{}", account, discipline),
            )
        })
    }

    pub fn tokens_of_account(&self, account: &AccountName) -> Result<Vec<ExpertTokenRow>, ChainError> {
        Ok(self
            .reg
            .expert_tokens
            .range_prefix("by_account", &key![account.as_str()])?
            .cloned()
            .collect())
    }

    /// Award expertise: creates the token on first award, tops it up
    /// otherwise. Keeps the account and discipline aggregates in sync.
    pub fn award(
        &mut self,
        awardee: &AccountName,
        discipline: DisciplineId,
        amount: Share,
    ) -> Result<(), ChainError> {
        if amount <= 0 {
            return Err(ChainError::InvalidAmount(amount));
        }
        self.reg.accounts().check_existence(awardee)?;
        self.reg.disciplines().check_existence(discipline)?;

        let now = self.reg.clock.head_block_time;
        match self.find_token(awardee, discipline)? {
            Some(token) => {
                self.reg
                    .expert_tokens
                    .update(token.id, |row| row.amount += amount)?;
            }
            None => {
                self.reg.expert_tokens.insert(|id| ExpertTokenRow {
                    id,
                    account: awardee.clone(),
                    discipline_id: discipline,
                    amount,
                    voting_power: VOTING_POWER_FULL as u16,
                    last_vote_time: now,
                })?;
            }
        }
        self.reg.accounts().adjust_expertise_total(awardee, amount)?;
        self.reg.disciplines().adjust_total_expertise(discipline, amount)?;
        info!(account = %awardee, discipline = discipline.0, amount, "expertise awarded");
        Ok(())
    }

    /// Work out how much expertise a spend of `weight` of the account's
    /// regenerating voting power buys, without mutating anything. Callers
    /// spending across several disciplines plan every spend first so a
    /// rejection leaves no partial drain.
    pub(crate) fn plan_spend(
        &self,
        account: &AccountName,
        discipline: DisciplineId,
        weight: Percent,
    ) -> Result<SpendPlan, ChainError> {
        let token = self.get_token(account, discipline)?;
        let now = self.reg.clock.head_block_time;

        let elapsed = (now - token.last_vote_time).num_seconds().max(0);
        let regenerated =
            token.voting_power as i64 + elapsed * VOTING_POWER_FULL / VOTE_REGENERATION_SECS;
        let current_power = regenerated.min(VOTING_POWER_FULL);

        let used_power = current_power * weight.0 as i64 / PERCENT_100 as i64;
        if used_power <= 0 {
            return Err(ChainError::InvalidState(
                "voting power too drained to cast this weight",
            ));
        }
        let spent = (token.amount as i128 * used_power as i128 / PERCENT_100 as i128) as Share;
        if spent <= 0 {
            return Err(ChainError::InvalidState(
                "expertise too small to register a contribution",
            ));
        }
        Ok(SpendPlan {
            token_id: token.id,
            new_power: (current_power - used_power) as u16,
            spent,
        })
    }

    pub(crate) fn commit_spend(&mut self, plan: &SpendPlan) -> Result<(), ChainError> {
        let now = self.reg.clock.head_block_time;
        self.reg.expert_tokens.update(plan.token_id, |row| {
            row.voting_power = plan.new_power;
            row.last_vote_time = now;
        })?;
        debug!(token = plan.token_id.0, spent = plan.spent, "voting power spent");
        Ok(())
    }

    /// Spend a share of the account's regenerating voting power in one
    /// discipline and return the expertise amount that buys. The token
    /// amount itself is untouched; only voting power drains.
    pub fn spend_voting_power(
        &mut self,
        account: &AccountName,
        discipline: DisciplineId,
        weight: Percent,
    ) -> Result<Share, ChainError> {
        let plan = self.plan_spend(account, discipline, weight)?;
        self.commit_spend(&plan)?;
        Ok(plan.spent)
    }
}

/// A validated, not-yet-applied voting power drain.
pub(crate) struct SpendPlan {
    pub(crate) token_id: meridian_types::ExpertTokenId,
    pub(crate) new_power: u16,
    pub(crate) spent: Share,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_accounts, ALICE};

    fn setup() -> (ServiceRegistry, AccountName, DisciplineId) {
        let mut reg = registry_with_accounts(&[(ALICE, 0)]);
        let d = reg.disciplines().create_discipline("physics", None).unwrap();
        (reg, AccountName::from(ALICE), d)
    }

    #[test]
    fn award_keeps_aggregates_in_sync() {
        let (mut reg, alice, d) = setup();
        reg.expertise().award(&alice, d, 1000).unwrap();
        reg.expertise().award(&alice, d, 500).unwrap();

        let token = reg.expertise().get_token(&alice, d).unwrap();
        assert_eq!(token.amount, 1500);
        assert_eq!(reg.accounts().get_by_name(&alice).unwrap().expertise_tokens, 1500);
        assert_eq!(reg.disciplines().get(d).unwrap().total_expertise_amount, 1500);
    }

    #[test]
    fn full_power_spend_uses_the_whole_amount() {
        let (mut reg, alice, d) = setup();
        reg.expertise().award(&alice, d, 1000).unwrap();

        let spent = reg
            .expertise()
            .spend_voting_power(&alice, d, Percent(PERCENT_100))
            .unwrap();
        assert_eq!(spent, 1000);

        let token = reg.expertise().get_token(&alice, d).unwrap();
        assert_eq!(token.voting_power, 0);
        // amount itself is untouched
        assert_eq!(token.amount, 1000);
    }

    #[test]
    fn drained_power_rejects_until_regenerated() {
        let (mut reg, alice, d) = setup();
        reg.expertise().award(&alice, d, 1000).unwrap();
        reg.expertise()
            .spend_voting_power(&alice, d, Percent(PERCENT_100))
            .unwrap();

        let err = reg
            .expertise()
            .spend_voting_power(&alice, d, Percent(PERCENT_100))
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidState(_)));

        // a day of regeneration restores a fifth of full power
        reg.advance_clock((60 * 60 * 24 / 3) as u32);
        let spent = reg
            .expertise()
            .spend_voting_power(&alice, d, Percent(PERCENT_100))
            .unwrap();
        assert_eq!(spent, 200);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            /// Under any spend/regenerate interleaving, voting power stays
            /// on its scale and a spend never exceeds the token amount.
            #[test]
            fn voting_power_stays_within_bounds(
                amount in 1i64..100_000,
                steps in proptest::collection::vec((0u32..50_000, 1u16..=PERCENT_100), 1..20),
            ) {
                let (mut reg, alice, d) = setup();
                reg.expertise().award(&alice, d, amount).unwrap();

                for (blocks, weight) in steps {
                    reg.advance_clock(blocks);
                    if let Ok(spent) = reg.expertise().spend_voting_power(&alice, d, Percent(weight)) {
                        prop_assert!(spent > 0 && spent <= amount);
                    }
                    let token = reg.expertise().get_token(&alice, d).unwrap();
                    prop_assert!(token.voting_power <= VOTING_POWER_FULL as u16);
                }
            }
        }
    }
}
