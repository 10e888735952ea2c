use crate::rows::{ActivityState, ReviewRow, ReviewVoteRow};
use crate::{ChainError, ServiceRegistry};
use meridian_eci::{review_weight, ReviewSample};
use meridian_store::{key, Row};
use meridian_types::{AccountName, DisciplineId, Percent, ResearchContentId, ReviewId, Share};
use std::collections::BTreeMap;
use tracing::info;

pub struct ReviewService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl ReviewService<'_> {
    pub fn get(&self, id: ReviewId) -> Result<ReviewRow, ChainError> {
        Ok(self.reg.reviews.get(id)?.clone())
    }

    pub fn reviews_of_content(
        &self,
        content: ResearchContentId,
    ) -> Result<Vec<ReviewRow>, ChainError> {
        Ok(self
            .reg
            .reviews
            .range_prefix("by_content", &key![content.0])?
            .cloned()
            .collect())
    }

    /// Publish a review, spending the author's regenerating voting power in
    /// every research discipline where they hold expertise. All spends are
    /// planned before anything drains, so rejection leaves no partial
    /// state.
    pub fn make_review(
        &mut self,
        author: &AccountName,
        content: ResearchContentId,
        text: &str,
        is_positive: bool,
        weight: Percent,
    ) -> Result<ReviewId, ChainError> {
        let content_row = self.reg.contents().get(content)?;
        if content_row.activity_state != ActivityState::Active {
            return Err(ChainError::WindowViolation("content review window has closed"));
        }
        if self
            .reg
            .reviews
            .find_unique("by_author_and_content", &key![author.as_str(), content.0])?
            .is_some()
        {
            return Err(ChainError::already_exists(ReviewRow::ENTITY, author.as_str()));
        }

        let disciplines = self.reg.researches().disciplines_of(content_row.research_id)?;
        let mut plans = Vec::new();
        let mut expertise_spent = BTreeMap::new();
        for discipline in disciplines {
            if self.reg.expertise().find_token(author, discipline)?.is_none() {
                continue;
            }
            let plan = self.reg.expertise().plan_spend(author, discipline, weight)?;
            expertise_spent.insert(discipline, plan.spent);
            plans.push(plan);
        }
        if plans.is_empty() {
            return Err(ChainError::InvalidState(
                "reviewer holds no expertise in the research's disciplines",
            ));
        }

        for plan in &plans {
            self.reg.expertise().commit_spend(plan)?;
        }
        let now = self.reg.clock.head_block_time;
        let id = self.reg.reviews.insert(|id| ReviewRow {
            id,
            research_content_id: content,
            author: author.clone(),
            content: text.to_owned(),
            is_positive,
            expertise_spent,
            created_at: now,
        })?;
        self.reg
            .researches()
            .record_review(content_row.research_id, is_positive)?;
        info!(review = id.0, content = content.0, author = %author, "review published");
        Ok(id)
    }

    /// Vote on a review in one of its disciplines, spending the voter's
    /// expertise there. One vote per (voter, review, discipline).
    pub fn vote_for_review(
        &mut self,
        voter: &AccountName,
        review: ReviewId,
        discipline: DisciplineId,
        weight: Percent,
    ) -> Result<(), ChainError> {
        let review_row = self.get(review)?;
        if !review_row.expertise_spent.contains_key(&discipline) {
            return Err(ChainError::InvalidReference(
                "review carries no expertise in this discipline",
            ));
        }
        if &review_row.author == voter {
            return Err(ChainError::InvalidState("authors cannot vote on their own review"));
        }
        if self
            .reg
            .review_votes
            .find_unique(
                "by_voter_review_discipline",
                &key![voter.as_str(), review.0, discipline.0],
            )?
            .is_some()
        {
            return Err(ChainError::DuplicateVote {
                voter: voter.as_str().to_owned(),
                target: format!("review {}", review),
            });
        }

        let spent = self.reg.expertise().spend_voting_power(voter, discipline, weight)?;
        let now = self.reg.clock.head_block_time;
        self.reg.review_votes.insert(|id| ReviewVoteRow {
            id,
            voter: voter.clone(),
            review_id: review,
            discipline_id: discipline,
            weight: spent,
            voting_time: now,
        })?;
        Ok(())
    }

    fn votes_received(
        &self,
        review: ReviewId,
        discipline: DisciplineId,
    ) -> Result<Share, ChainError> {
        Ok(self
            .reg
            .review_votes
            .range_prefix("by_review_and_discipline", &key![review.0, discipline.0])?
            .map(|vote| vote.weight)
            .sum())
    }

    /// Current ECI weight of a review in one discipline, recomputed from
    /// the live sibling reviews and votes.
    pub fn current_weight(
        &self,
        review: ReviewId,
        discipline: DisciplineId,
    ) -> Result<Option<i64>, ChainError> {
        let review_row = self.get(review)?;
        let samples = self.discipline_samples(review_row.research_content_id, discipline)?;
        Ok(review_weight(review, &samples))
    }

    /// Current ECI weights of a review across all its disciplines.
    pub fn current_weights(&self, review: ReviewId) -> Result<BTreeMap<DisciplineId, i64>, ChainError> {
        let review_row = self.get(review)?;
        let mut weights = BTreeMap::new();
        for discipline in review_row.expertise_spent.keys() {
            if let Some(weight) = review_weight(
                review,
                &self.discipline_samples(review_row.research_content_id, *discipline)?,
            ) {
                weights.insert(*discipline, weight);
            }
        }
        Ok(weights)
    }

    /// Samples for every sibling review on `content` that spent expertise
    /// in `discipline`, ascending by review id.
    pub(crate) fn discipline_samples(
        &self,
        content: ResearchContentId,
        discipline: DisciplineId,
    ) -> Result<Vec<ReviewSample>, ChainError> {
        let mut samples = Vec::new();
        for sibling in self.reg.reviews.range_prefix("by_content", &key![content.0])? {
            if let Some(&spent) = sibling.expertise_spent.get(&discipline) {
                samples.push(ReviewSample {
                    review_id: sibling.id,
                    expertise_spent: spent,
                    votes_received: self.votes_received(sibling.id, discipline)?,
                    is_positive: sibling.is_positive,
                });
            }
        }
        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_research, ALICE, BOB, CAROL, DAVE};
    use meridian_protocol::ResearchContentType;
    use meridian_types::config::PERCENT_100;

    fn reviewed_content() -> (ServiceRegistry, ResearchContentId, ReviewId, DisciplineId) {
        let (mut reg, _group, research) = registry_with_research(ALICE);
        let discipline = reg.researches().disciplines_of(research).unwrap()[0];
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        let carol = AccountName::from(CAROL);
        reg.expertise().award(&bob, discipline, 1000).unwrap();
        reg.expertise().award(&carol, discipline, 500).unwrap();

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
        let review = reg
            .reviews()
            .make_review(&bob, content, "solid work", true, Percent(PERCENT_100))
            .unwrap();
        (reg, content, review, discipline)
    }

    #[test]
    fn review_spends_expertise_and_counts_on_the_research() {
        let (mut reg, content, review, discipline) = reviewed_content();
        let row = reg.reviews().get(review).unwrap();
        assert_eq!(row.expertise_spent.get(&discipline), Some(&1000));

        let research = reg.contents().get(content).unwrap().research_id;
        assert_eq!(reg.researches().get(research).unwrap().positive_reviews, 1);

        // a lone review's weight equals its spent expertise
        assert_eq!(reg.reviews().current_weight(review, discipline).unwrap(), Some(1000));
    }

    #[test]
    fn reviewer_without_expertise_is_rejected() {
        let (mut reg, content, _review, _discipline) = reviewed_content();
        let alice = AccountName::from(ALICE);
        let err = reg
            .reviews()
            .make_review(&alice, content, "me too", true, Percent(PERCENT_100))
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidState(_)));
    }

    #[test]
    fn late_vote_changes_the_recomputed_weight() {
        let (mut reg, content, review, discipline) = reviewed_content();
        let carol = AccountName::from(CAROL);
        let dave = AccountName::from(DAVE);
        reg.expertise().award(&dave, discipline, 800).unwrap();

        // a sibling review makes the curator term live (n = 2)
        reg.reviews()
            .make_review(&carol, content, "needs work", false, Percent(PERCENT_100))
            .unwrap();
        let before = reg.reviews().current_weight(review, discipline).unwrap().unwrap();

        reg.reviews()
            .vote_for_review(&dave, review, discipline, Percent(PERCENT_100))
            .unwrap();
        let after = reg.reviews().current_weight(review, discipline).unwrap().unwrap();
        assert_ne!(before, after);
        assert!(after > before);
    }

    #[test]
    fn double_vote_is_rejected() {
        let (mut reg, _content, review, discipline) = reviewed_content();
        let carol = AccountName::from(CAROL);
        reg.reviews()
            .vote_for_review(&carol, review, discipline, Percent(PERCENT_100 / 2))
            .unwrap();
        let err = reg
            .reviews()
            .vote_for_review(&carol, review, discipline, Percent(PERCENT_100 / 2))
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateVote { .. }));
    }
}
