use crate::rows::{ResearchDisciplineRelationRow, ResearchRow};
use crate::{ChainError, ServiceRegistry};
use meridian_store::{key, Row};
use meridian_types::config::PERCENT_100;
use meridian_types::{DisciplineId, Percent, ResearchGroupId, ResearchId, Share};
use tracing::info;

pub struct ResearchService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl ResearchService<'_> {
    pub fn get(&self, id: ResearchId) -> Result<ResearchRow, ChainError> {
        Ok(self.reg.researches.get(id)?.clone())
    }

    pub fn get_by_permlink(&self, permlink: &str) -> Result<ResearchRow, ChainError> {
        self.reg
            .researches
            .find_unique("by_permlink", &key![permlink])?
            .cloned()
            .ok_or_else(|| ChainError::not_found_by_key(ResearchRow::ENTITY, permlink))
    }

    pub fn researches_of_group(
        &self,
        group: ResearchGroupId,
    ) -> Result<Vec<ResearchRow>, ChainError> {
        Ok(self
            .reg
            .researches
            .range_prefix("by_group", &key![group.0])?
            .cloned()
            .collect())
    }

    /// The research must belong to the acting group; governance actions
    /// assert this before touching it.
    pub fn get_of_group(
        &self,
        id: ResearchId,
        group: ResearchGroupId,
    ) -> Result<ResearchRow, ChainError> {
        let research = self.get(id)?;
        if research.research_group_id != group {
            return Err(ChainError::InvalidState("research belongs to another group"));
        }
        Ok(research)
    }

    pub fn create_research(
        &mut self,
        group: ResearchGroupId,
        title: &str,
        abstract_: &str,
        permlink: &str,
        review_share: Percent,
        dropout_compensation: Percent,
        disciplines: &[DisciplineId],
    ) -> Result<ResearchId, ChainError> {
        self.reg.groups.get(group)?;
        if self
            .reg
            .researches
            .find_unique("by_permlink", &key![permlink])?
            .is_some()
        {
            return Err(ChainError::already_exists(ResearchRow::ENTITY, permlink));
        }
        if disciplines.is_empty() {
            return Err(ChainError::InvalidState("research needs at least one discipline"));
        }
        for discipline in disciplines {
            self.reg.disciplines().check_existence(*discipline)?;
        }

        let now = self.reg.clock.head_block_time;
        let id = self.reg.researches.insert(|id| ResearchRow {
            id,
            research_group_id: group,
            title: title.to_owned(),
            abstract_: abstract_.to_owned(),
            permlink: permlink.to_owned(),
            review_share,
            dropout_compensation,
            owned_tokens: PERCENT_100 as Share,
            positive_reviews: 0,
            negative_reviews: 0,
            created_at: now,
        })?;
        for discipline in disciplines {
            self.reg
                .research_discipline_relations
                .insert(|rel_id| ResearchDisciplineRelationRow {
                    id: rel_id,
                    research_id: id,
                    discipline_id: *discipline,
                })?;
        }
        info!(research = permlink, group = group.0, "research created");
        Ok(id)
    }

    pub fn disciplines_of(&self, id: ResearchId) -> Result<Vec<DisciplineId>, ChainError> {
        Ok(self
            .reg
            .research_discipline_relations
            .range_prefix("by_research", &key![id.0])?
            .map(|rel| rel.discipline_id)
            .collect())
    }

    pub fn researches_in_discipline(
        &self,
        discipline: DisciplineId,
    ) -> Result<Vec<ResearchId>, ChainError> {
        Ok(self
            .reg
            .research_discipline_relations
            .range_prefix("by_discipline", &key![discipline.0])?
            .map(|rel| rel.research_id)
            .collect())
    }

    pub(crate) fn change_review_share(
        &mut self,
        id: ResearchId,
        review_share: Percent,
    ) -> Result<(), ChainError> {
        if !review_share.is_valid() {
            return Err(ChainError::InvalidPercent(review_share.0));
        }
        self.reg
            .researches
            .update(id, |row| row.review_share = review_share)?;
        Ok(())
    }

    pub(crate) fn decrease_owned_tokens(
        &mut self,
        id: ResearchId,
        amount: Share,
    ) -> Result<(), ChainError> {
        let research = self.get(id)?;
        if research.owned_tokens < amount {
            return Err(ChainError::InsufficientTokens {
                holder: research.permlink,
                available: research.owned_tokens,
                required: amount,
            });
        }
        self.reg
            .researches
            .update(id, |row| row.owned_tokens -= amount)?;
        Ok(())
    }

    pub(crate) fn increase_owned_tokens(
        &mut self,
        id: ResearchId,
        amount: Share,
    ) -> Result<(), ChainError> {
        self.reg
            .researches
            .update(id, |row| row.owned_tokens += amount)?;
        Ok(())
    }

    pub(crate) fn record_review(&mut self, id: ResearchId, is_positive: bool) -> Result<(), ChainError> {
        self.reg.researches.update(id, |row| {
            if is_positive {
                row.positive_reviews += 1;
            } else {
                row.negative_reviews += 1;
            }
        })?;
        Ok(())
    }
}
