use crate::rows::{ContributionRow, ResearchTokenRow, ResearchTokenSaleRow};
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Utc};
use meridian_protocol::{TokenSaleStatus, VirtualOperation};
use meridian_store::{key, Row};
use meridian_types::{AccountName, Asset, ResearchId, ResearchTokenSaleId, Share};
use tracing::info;

pub struct TokenSaleService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl TokenSaleService<'_> {
    pub fn get_sale(&self, id: ResearchTokenSaleId) -> Result<ResearchTokenSaleRow, ChainError> {
        Ok(self.reg.research_token_sales.get(id)?.clone())
    }

    pub fn find_research_token(
        &self,
        owner: &AccountName,
        research: ResearchId,
    ) -> Result<Option<ResearchTokenRow>, ChainError> {
        Ok(self
            .reg
            .research_tokens
            .find_unique("by_owner_and_research", &key![owner.as_str(), research.0])?
            .cloned())
    }

    pub fn contributions_of_sale(
        &self,
        sale: ResearchTokenSaleId,
    ) -> Result<Vec<ContributionRow>, ChainError> {
        Ok(self
            .reg
            .contributions
            .range_prefix("by_sale", &key![sale.0])?
            .cloned()
            .collect())
    }

    /// Escrow part of the research's owned tokens and open the sale. At
    /// most one non-terminal sale per research.
    pub(crate) fn start_sale(
        &mut self,
        research: ResearchId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        amount_for_sale: Share,
        soft_cap: Asset,
        hard_cap: Asset,
    ) -> Result<ResearchTokenSaleId, ChainError> {
        let now = self.reg.clock.head_block_time;
        if end_time <= now {
            return Err(ChainError::WindowViolation("token sale window has already closed"));
        }
        let open_sale = self
            .reg
            .research_token_sales
            .range_prefix("by_research", &key![research.0])?
            .any(|s| {
                matches!(
                    s.status,
                    TokenSaleStatus::Inactive | TokenSaleStatus::Active
                )
            });
        if open_sale {
            return Err(ChainError::InvalidState("research already has an open token sale"));
        }
        self.reg.researches().decrease_owned_tokens(research, amount_for_sale)?;

        let status = if start_time <= now {
            TokenSaleStatus::Active
        } else {
            TokenSaleStatus::Inactive
        };
        let id = self.reg.research_token_sales.insert(|id| ResearchTokenSaleRow {
            id,
            research_id: research,
            start_time,
            end_time,
            balance_tokens: amount_for_sale,
            total_collected: Asset::native(0),
            soft_cap,
            hard_cap,
            status,
        })?;
        info!(sale = id.0, research = research.0, amount_for_sale, "token sale opened");
        Ok(id)
    }

    /// Contribute to an active sale. Contributions are capped at the hard
    /// cap; hitting it settles the sale immediately.
    pub fn contribute(
        &mut self,
        contributor: &AccountName,
        sale_id: ResearchTokenSaleId,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        if amount.amount <= 0 {
            return Err(ChainError::InvalidAmount(amount.amount));
        }
        if !amount.is_native() {
            return Err(ChainError::InvalidState("token sales collect the native asset"));
        }
        let sale = self.get_sale(sale_id)?;
        if sale.status != TokenSaleStatus::Active {
            return Err(ChainError::InvalidState("token sale is not accepting contributions"));
        }
        let remaining = sale.hard_cap.amount - sale.total_collected.amount;
        let accepted = amount.amount.min(remaining);
        if accepted <= 0 {
            return Err(ChainError::InvalidState("token sale hard cap reached"));
        }
        let accepted_asset = Asset::native(accepted);
        self.reg.accounts().decrease_balance(contributor, &accepted_asset)?;

        let now = self.reg.clock.head_block_time;
        match self
            .reg
            .contributions
            .find_unique("by_owner_and_sale", &key![contributor.as_str(), sale_id.0])?
            .map(|c| c.id)
        {
            Some(existing) => {
                self.reg
                    .contributions
                    .update(existing, |row| row.amount.amount += accepted)?;
            }
            None => {
                self.reg.contributions.insert(|id| ContributionRow {
                    id,
                    owner: contributor.clone(),
                    research_token_sale_id: sale_id,
                    amount: accepted_asset.clone(),
                    contribution_time: now,
                })?;
            }
        }
        self.reg
            .research_token_sales
            .update(sale_id, |row| row.total_collected.amount += accepted)?;

        let collected = sale.total_collected.amount + accepted;
        if collected >= sale.hard_cap.amount {
            self.finish_sale(sale_id)?;
        }
        Ok(())
    }

    /// Activate sales whose window opened, then settle sales whose window
    /// closed: at or above the soft cap tokens distribute pro rata,
    /// otherwise every contribution is refunded.
    pub fn process_sales(&mut self) -> Result<(), ChainError> {
        let now = self.reg.clock.head_block_time;

        let to_activate: Vec<_> = self
            .reg
            .research_token_sales
            .range_prefix("by_start_time", &key![false])?
            .take_while(|s| s.start_time <= now)
            .map(|s| s.id)
            .collect();
        for id in to_activate {
            self.reg
                .research_token_sales
                .update(id, |row| row.status = TokenSaleStatus::Active)?;
        }

        let to_settle: Vec<_> = self
            .reg
            .research_token_sales
            .range_prefix("by_end_time", &key![false])?
            .take_while(|s| s.end_time <= now)
            .map(|s| (s.id, s.total_collected.amount >= s.soft_cap.amount))
            .collect();
        for (id, reached_soft_cap) in to_settle {
            if reached_soft_cap {
                self.finish_sale(id)?;
            } else {
                self.refund_sale(id)?;
            }
        }
        Ok(())
    }

    /// Distribute escrowed tokens pro rata by contribution and credit the
    /// collected total to the research group's treasury.
    fn finish_sale(&mut self, sale_id: ResearchTokenSaleId) -> Result<(), ChainError> {
        let sale = self.get_sale(sale_id)?;
        let contributions = self.contributions_of_sale(sale_id)?;
        let total = sale.total_collected.amount;

        let mut distributed: Share = 0;
        for (i, contribution) in contributions.iter().enumerate() {
            let tokens = if i == contributions.len() - 1 {
                sale.balance_tokens - distributed
            } else {
                (contribution.amount.amount as i128 * sale.balance_tokens as i128 / total as i128)
                    as Share
            };
            distributed += tokens;
            if tokens > 0 {
                self.grant_research_tokens(&contribution.owner, sale.research_id, tokens)?;
            }
            self.reg.contributions.remove(contribution.id)?;
        }

        let group = self.reg.researches().get(sale.research_id)?.research_group_id;
        self.reg.groups().credit_group(group, &sale.total_collected)?;
        self.reg
            .research_token_sales
            .update(sale_id, |row| row.status = TokenSaleStatus::Finished)?;
        self.reg.emit(VirtualOperation::TokenSaleFinished {
            research_id: sale.research_id,
            research_token_sale_id: sale_id,
            new_status: TokenSaleStatus::Finished,
            total_collected: sale.total_collected.clone(),
        });
        info!(sale = sale_id.0, collected = total, "token sale finished");
        Ok(())
    }

    /// Soft cap missed: every contributor gets their money back and the
    /// escrowed tokens return to the research.
    fn refund_sale(&mut self, sale_id: ResearchTokenSaleId) -> Result<(), ChainError> {
        let sale = self.get_sale(sale_id)?;
        for contribution in self.contributions_of_sale(sale_id)? {
            self.reg
                .accounts()
                .increase_balance(&contribution.owner, &contribution.amount)?;
            self.reg.emit(VirtualOperation::TokenSaleRefunded {
                research_token_sale_id: sale_id,
                contributor: contribution.owner.clone(),
                amount: contribution.amount.clone(),
            });
            self.reg.contributions.remove(contribution.id)?;
        }
        self.reg
            .researches()
            .increase_owned_tokens(sale.research_id, sale.balance_tokens)?;
        self.reg
            .research_token_sales
            .update(sale_id, |row| row.status = TokenSaleStatus::Expired)?;
        self.reg.emit(VirtualOperation::TokenSaleFinished {
            research_id: sale.research_id,
            research_token_sale_id: sale_id,
            new_status: TokenSaleStatus::Expired,
            total_collected: sale.total_collected.clone(),
        });
        info!(sale = sale_id.0, "token sale refunded");
        Ok(())
    }

    /// Create or top up a personal research token holding.
    pub(crate) fn grant_research_tokens(
        &mut self,
        owner: &AccountName,
        research: ResearchId,
        amount: Share,
    ) -> Result<(), ChainError> {
        match self.find_research_token(owner, research)?.map(|t| t.id) {
            Some(token_id) => {
                self.reg
                    .research_tokens
                    .update(token_id, |row| row.amount += amount)?;
            }
            None => {
                self.reg.research_tokens.insert(|id| ResearchTokenRow {
                    id,
                    owner: owner.clone(),
                    research_id: research,
                    amount,
                })?;
            }
        }
        Ok(())
    }

    /// Convert personal research tokens back into research-owned tokens.
    pub fn transfer_tokens_to_research(
        &mut self,
        owner: &AccountName,
        research: ResearchId,
        amount: Share,
    ) -> Result<(), ChainError> {
        if amount <= 0 {
            return Err(ChainError::InvalidAmount(amount));
        }
        let token = self.find_research_token(owner, research)?.ok_or_else(|| {
            ChainError::not_found_by_key(ResearchTokenRow::ENTITY, owner.as_str())
        })?;
        if token.amount < amount {
            return Err(ChainError::InsufficientTokens {
                holder: owner.as_str().to_owned(),
                available: token.amount,
                required: amount,
            });
        }
        if token.amount == amount {
            self.reg.research_tokens.remove(token.id)?;
        } else {
            self.reg
                .research_tokens
                .update(token.id, |row| row.amount -= amount)?;
        }
        self.reg.researches().increase_owned_tokens(research, amount)?;
        Ok(())
    }
}
