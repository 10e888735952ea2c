use crate::rows::RewardPoolRow;
use crate::{ChainError, ServiceRegistry};
use meridian_protocol::VirtualOperation;
use meridian_store::key;
use meridian_types::{Asset, DisciplineId, ResearchContentId, Share};
use tracing::{debug, info};

pub struct RewardService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl RewardService<'_> {
    pub fn pools_of_content(
        &self,
        content: ResearchContentId,
    ) -> Result<Vec<RewardPoolRow>, ChainError> {
        Ok(self
            .reg
            .reward_pools
            .range_prefix("by_content", &key![content.0])?
            .cloned()
            .collect())
    }

    fn credit_pool(
        &mut self,
        content: ResearchContentId,
        discipline: DisciplineId,
        amount: Share,
    ) -> Result<(), ChainError> {
        match self
            .reg
            .reward_pools
            .find_unique("by_content_and_discipline", &key![content.0, discipline.0])?
            .map(|p| p.id)
        {
            Some(pool_id) => {
                self.reg
                    .reward_pools
                    .update(pool_id, |row| row.balance.amount += amount)?;
            }
            None => {
                self.reg.reward_pools.insert(|id| RewardPoolRow {
                    id,
                    research_content_id: content,
                    discipline_id: discipline,
                    balance: Asset::native(amount),
                })?;
            }
        }
        Ok(())
    }

    /// Spread an allocation across the discipline's active content, evenly
    /// by content in ascending id order with the flooring remainder on the
    /// first. Returns false when the discipline has no active content and
    /// nothing was placed.
    pub(crate) fn credit_discipline(
        &mut self,
        discipline: DisciplineId,
        amount: Share,
    ) -> Result<bool, ChainError> {
        if amount <= 0 {
            return Ok(true);
        }
        let mut active: Vec<ResearchContentId> = Vec::new();
        for research in self.reg.researches().researches_in_discipline(discipline)? {
            for content in self.reg.contents().active_contents_of_research(research)? {
                active.push(content.id);
            }
        }
        if active.is_empty() {
            return Ok(false);
        }
        active.sort();

        let n = active.len() as Share;
        let each = amount / n;
        let remainder = amount % n;
        for (i, content) in active.iter().enumerate() {
            let slice = if i == 0 { each + remainder } else { each };
            if slice > 0 {
                self.credit_pool(*content, discipline, slice)?;
            }
        }
        debug!(discipline = discipline.0, amount, contents = active.len(), "allocation placed");
        Ok(true)
    }

    /// Pay out every pool of a content item to its reviewers, pro rata by
    /// positive ECI weight. Pools whose discipline attracted no positive
    /// weight park their balance on the discipline instead of burning it.
    pub(crate) fn distribute_content_pools(
        &mut self,
        content: ResearchContentId,
    ) -> Result<(), ChainError> {
        let pools = self.pools_of_content(content)?;
        for pool in pools {
            let samples = self
                .reg
                .reviews()
                .discipline_samples(content, pool.discipline_id)?;
            let mut shares: Vec<(meridian_types::ReviewId, i64)> = Vec::new();
            let mut total_weight: i64 = 0;
            for sample in &samples {
                if let Some(weight) =
                    meridian_eci::review_weight(sample.review_id, &samples)
                {
                    if weight > 0 {
                        shares.push((sample.review_id, weight));
                        total_weight += weight;
                    }
                }
            }

            if total_weight <= 0 {
                self.reg
                    .disciplines()
                    .accumulate_reward(pool.discipline_id, pool.balance.amount)?;
                self.reg.reward_pools.remove(pool.id)?;
                continue;
            }

            let mut paid: Share = 0;
            for (i, (review_id, weight)) in shares.iter().enumerate() {
                let reward = if i == shares.len() - 1 {
                    // last recipient takes the flooring remainder
                    pool.balance.amount - paid
                } else {
                    (pool.balance.amount as i128 * *weight as i128 / total_weight as i128) as Share
                };
                paid += reward;
                if reward <= 0 {
                    continue;
                }
                let author = self.reg.reviews().get(*review_id)?.author;
                let payout = Asset::native(reward);
                self.reg.accounts().increase_balance(&author, &payout)?;
                self.reg.emit(VirtualOperation::ReviewRewardDistributed {
                    review_id: *review_id,
                    author: author.clone(),
                    discipline_id: pool.discipline_id,
                    reward: payout,
                });
                info!(
                    review = review_id.0,
                    author = %author,
                    reward,
                    "review reward distributed"
                );
            }
            self.reg.reward_pools.remove(pool.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_research, ALICE, BOB, CAROL};
    use meridian_protocol::ResearchContentType;
    use meridian_types::config::{native_symbol, PERCENT_100};
    use meridian_types::{AccountName, Percent};

    #[test]
    fn pool_distribution_pays_reviewers_by_weight() {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let discipline = reg.researches().disciplines_of(research).unwrap()[0];
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        let carol = AccountName::from(CAROL);
        reg.expertise().award(&bob, discipline, 900).unwrap();
        reg.expertise().award(&carol, discipline, 100).unwrap();

        let content = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::Milestone,
                "M1",
                "data",
                &[alice],
                &[],
            )
            .unwrap();
        reg.reviews()
            .make_review(&bob, content, "good", true, Percent(PERCENT_100))
            .unwrap();
        reg.reviews()
            .make_review(&carol, content, "fine", true, Percent(PERCENT_100))
            .unwrap();

        reg.rewards().credit_discipline(discipline, 1000).unwrap();
        reg.rewards().distribute_content_pools(content).unwrap();

        let bob_reward = reg.accounts().balance(&bob, &native_symbol()).unwrap();
        let carol_reward = reg.accounts().balance(&carol, &native_symbol()).unwrap();
        assert_eq!(bob_reward + carol_reward, 1000);
        assert!(bob_reward > carol_reward);
        assert!(reg.rewards().pools_of_content(content).unwrap().is_empty());
    }

    #[test]
    fn negative_only_reviews_park_the_pool_on_the_discipline() {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let discipline = reg.researches().disciplines_of(research).unwrap()[0];
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        reg.expertise().award(&bob, discipline, 500).unwrap();

        let content = reg
            .contents()
            .create_content(
                research,
                ResearchContentType::Milestone,
                "M1",
                "data",
                &[alice],
                &[],
            )
            .unwrap();
        reg.reviews()
            .make_review(&bob, content, "flawed", false, Percent(PERCENT_100))
            .unwrap();

        reg.rewards().credit_discipline(discipline, 300).unwrap();
        reg.rewards().distribute_content_pools(content).unwrap();

        assert_eq!(reg.accounts().balance(&bob, &native_symbol()).unwrap(), 0);
        assert_eq!(reg.disciplines().get(discipline).unwrap().accumulated_reward, 300);
    }
}
