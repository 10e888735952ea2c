use crate::rows::{
    balance_of, credit_balance, debit_balance_unchecked, ensure_sufficient, ResearchGroupInviteRow,
    ResearchGroupJoinRequestRow, ResearchGroupRow, ResearchGroupTokenRow,
};
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Duration, Utc};
use meridian_protocol::{GroupTokenShare, VirtualOperation};
use meridian_store::{key, Row};
use meridian_types::config::{INVITE_LIFETIME_SECS, JOIN_REQUEST_LIFETIME_SECS, PERCENT_100};
use meridian_types::{
    AccountName, Asset, Percent, ResearchGroupId, ResearchGroupInviteId,
    ResearchGroupJoinRequestId, Share,
};
use tracing::{debug, info};

pub struct GroupService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl GroupService<'_> {
    pub fn get(&self, id: ResearchGroupId) -> Result<ResearchGroupRow, ChainError> {
        Ok(self.reg.groups.get(id)?.clone())
    }

    pub fn get_by_permlink(&self, permlink: &str) -> Result<ResearchGroupRow, ChainError> {
        self.reg
            .groups
            .find_unique("by_permlink", &key![permlink])?
            .cloned()
            .ok_or_else(|| ChainError::not_found_by_key(ResearchGroupRow::ENTITY, permlink))
    }

    pub fn create_group(
        &mut self,
        creator: &AccountName,
        permlink: &str,
        description: &str,
        quorum: Percent,
        tokens_amount: Share,
    ) -> Result<ResearchGroupId, ChainError> {
        if tokens_amount <= 0 {
            return Err(ChainError::InvalidAmount(tokens_amount));
        }
        if !quorum.is_valid() || quorum.0 == 0 {
            return Err(ChainError::InvalidPercent(quorum.0));
        }
        self.reg.accounts().check_existence(creator)?;
        if self.reg.groups.find_unique("by_permlink", &key![permlink])?.is_some() {
            return Err(ChainError::already_exists(ResearchGroupRow::ENTITY, permlink));
        }

        let id = self.reg.groups.insert(|id| ResearchGroupRow {
            id,
            permlink: permlink.to_owned(),
            description: description.to_owned(),
            quorum,
            total_tokens_amount: tokens_amount,
            balances: Default::default(),
        })?;
        self.reg.group_tokens.insert(|token_id| ResearchGroupTokenRow {
            id: token_id,
            owner: creator.clone(),
            research_group_id: id,
            amount: tokens_amount,
        })?;
        info!(group = permlink, creator = %creator, "research group created");
        Ok(id)
    }

    pub fn member_token(
        &self,
        account: &AccountName,
        group: ResearchGroupId,
    ) -> Result<ResearchGroupTokenRow, ChainError> {
        self.reg
            .group_tokens
            .find_unique("by_owner_and_group", &key![account.as_str(), group.0])?
            .cloned()
            .ok_or_else(|| ChainError::NotAMember {
                account: account.as_str().to_owned(),
                group: group.0,
            })
    }

    pub fn is_member(
        &self,
        account: &AccountName,
        group: ResearchGroupId,
    ) -> Result<bool, ChainError> {
        Ok(self
            .reg
            .group_tokens
            .find_unique("by_owner_and_group", &key![account.as_str(), group.0])?
            .is_some())
    }

    pub fn member_tokens(
        &self,
        group: ResearchGroupId,
    ) -> Result<Vec<ResearchGroupTokenRow>, ChainError> {
        Ok(self
            .reg
            .group_tokens
            .range_prefix("by_group", &key![group.0])?
            .cloned()
            .collect())
    }

    /// Grant tokens to an account, creating the membership row on first
    /// grant. The group total grows by the same amount.
    pub(crate) fn add_member_tokens(
        &mut self,
        account: &AccountName,
        group: ResearchGroupId,
        amount: Share,
    ) -> Result<(), ChainError> {
        if amount <= 0 {
            return Err(ChainError::InvalidAmount(amount));
        }
        self.reg.groups.get(group)?;
        match self
            .reg
            .group_tokens
            .find_unique("by_owner_and_group", &key![account.as_str(), group.0])?
            .map(|t| t.id)
        {
            Some(token_id) => {
                self.reg
                    .group_tokens
                    .update(token_id, |row| row.amount += amount)?;
            }
            None => {
                self.reg.group_tokens.insert(|id| ResearchGroupTokenRow {
                    id,
                    owner: account.clone(),
                    research_group_id: group,
                    amount,
                })?;
            }
        }
        self.reg
            .groups
            .update(group, |row| row.total_tokens_amount += amount)?;
        Ok(())
    }

    pub(crate) fn change_quorum(
        &mut self,
        group: ResearchGroupId,
        quorum: Percent,
    ) -> Result<(), ChainError> {
        if !quorum.is_valid() || quorum.0 == 0 {
            return Err(ChainError::InvalidPercent(quorum.0));
        }
        self.reg.groups.update(group, |row| row.quorum = quorum)?;
        Ok(())
    }

    pub fn group_balance(&self, group: ResearchGroupId, symbol: &meridian_types::AssetSymbol) -> Share {
        self.reg
            .groups
            .find(group)
            .map(|row| balance_of(&row.balances, symbol))
            .unwrap_or(0)
    }

    pub(crate) fn credit_group(
        &mut self,
        group: ResearchGroupId,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        self.reg
            .groups
            .update(group, |row| credit_balance(&mut row.balances, amount))?;
        Ok(())
    }

    pub(crate) fn debit_group(
        &mut self,
        group: ResearchGroupId,
        amount: &Asset,
    ) -> Result<(), ChainError> {
        let row = self.reg.groups.get(group)?;
        ensure_sufficient(&row.balances, &row.permlink, amount)?;
        self.reg
            .groups
            .update(group, |row| debit_balance_unchecked(&mut row.balances, amount))?;
        Ok(())
    }

    /// Reassign every member's stake by percent of the current total. The
    /// share list must cover exactly the current membership; rounding
    /// remainder goes to the first listed member so the total is preserved.
    pub(crate) fn rebalance_tokens(
        &mut self,
        group: ResearchGroupId,
        shares: &[GroupTokenShare],
    ) -> Result<(), ChainError> {
        let row = self.reg.groups.get(group)?.clone();
        let members = self.member_tokens(group)?;
        if members.len() != shares.len() {
            return Err(ChainError::InvalidState(
                "rebalance must cover exactly the current membership",
            ));
        }
        let mut planned: Vec<(meridian_types::ResearchGroupTokenId, Share)> = Vec::new();
        let mut assigned: Share = 0;
        for share in shares {
            let token = self.member_token(&share.owner, group)?;
            let amount = share.share.of(row.total_tokens_amount);
            assigned += amount;
            planned.push((token.id, amount));
        }
        // flooring remainder lands on the first listed member
        if let Some(first) = planned.first_mut() {
            first.1 += row.total_tokens_amount - assigned;
        }
        for (token_id, amount) in planned {
            self.reg.group_tokens.update(token_id, |t| t.amount = amount)?;
        }
        Ok(())
    }

    /// Remove a member. Their stake converts into personal research tokens
    /// of each of the group's researches, scaled by the member's share of
    /// the group and the research's dropout compensation percent. Pending
    /// proposal votes by the member in this group are withdrawn.
    pub(crate) fn dropout_member(
        &mut self,
        member: &AccountName,
        group: ResearchGroupId,
    ) -> Result<(), ChainError> {
        let token = self.member_token(member, group)?;
        let total = self.reg.groups.get(group)?.total_tokens_amount;
        let member_share = Percent((token.amount * PERCENT_100 as i64 / total).min(PERCENT_100 as i64) as u16);

        let researches: Vec<_> = self
            .reg
            .researches
            .range_prefix("by_group", &key![group.0])?
            .map(|r| (r.id, r.owned_tokens, r.dropout_compensation))
            .collect();
        for (research_id, owned_tokens, compensation) in researches {
            let of_member = member_share.of(owned_tokens);
            let tokens = compensation.of(of_member);
            if tokens <= 0 {
                continue;
            }
            self.reg.researches.update(research_id, |r| r.owned_tokens -= tokens)?;
            self.reg
                .token_sales()
                .grant_research_tokens(member, research_id, tokens)?;
        }

        self.reg.proposals().remove_votes_of(member, group)?;
        self.reg.group_tokens.remove(token.id)?;
        self.reg
            .groups
            .update(group, |row| row.total_tokens_amount -= token.amount)?;
        self.reg.emit(VirtualOperation::MemberDroppedOut {
            research_group_id: group,
            member: member.clone(),
            converted_share: token.amount,
        });
        info!(group = group.0, member = %member, "member dropped out");
        Ok(())
    }

    // ---- invites ----

    pub fn get_invite(
        &self,
        id: ResearchGroupInviteId,
    ) -> Result<ResearchGroupInviteRow, ChainError> {
        Ok(self.reg.group_invites.get(id)?.clone())
    }

    pub(crate) fn create_invite(
        &mut self,
        invitee: &AccountName,
        group: ResearchGroupId,
        token_amount: Share,
    ) -> Result<ResearchGroupInviteId, ChainError> {
        self.reg.accounts().check_existence(invitee)?;
        if self.is_member(invitee, group)? {
            return Err(ChainError::InvalidState("invitee is already a member"));
        }
        if self
            .reg
            .group_invites
            .find_unique("by_account_and_group", &key![invitee.as_str(), group.0])?
            .is_some()
        {
            return Err(ChainError::already_exists(
                ResearchGroupInviteRow::ENTITY,
                invitee.as_str(),
            ));
        }
        let expiration = self.reg.clock.head_block_time + Duration::seconds(INVITE_LIFETIME_SECS);
        let id = self.reg.group_invites.insert(|id| ResearchGroupInviteRow {
            id,
            account: invitee.clone(),
            research_group_id: group,
            token_amount,
            expiration_time: expiration,
        })?;
        Ok(id)
    }

    pub fn approve_invite(
        &mut self,
        id: ResearchGroupInviteId,
        invitee: &AccountName,
    ) -> Result<(), ChainError> {
        let invite = self.get_invite(id)?;
        if &invite.account != invitee {
            return Err(ChainError::InvalidState("invite belongs to another account"));
        }
        if invite.expiration_time <= self.reg.clock.head_block_time {
            return Err(ChainError::WindowViolation("invite has expired"));
        }
        self.add_member_tokens(invitee, invite.research_group_id, invite.token_amount)?;
        self.reg.group_invites.remove(id)?;
        info!(group = invite.research_group_id.0, account = %invitee, "invite approved");
        Ok(())
    }

    pub fn reject_invite(
        &mut self,
        id: ResearchGroupInviteId,
        invitee: &AccountName,
    ) -> Result<(), ChainError> {
        let invite = self.get_invite(id)?;
        if &invite.account != invitee {
            return Err(ChainError::InvalidState("invite belongs to another account"));
        }
        self.reg.group_invites.remove(id)?;
        Ok(())
    }

    /// Remove every invite whose expiration is at or before `now`.
    pub fn clear_expired_invites(&mut self, now: DateTime<Utc>) -> Result<usize, ChainError> {
        let expired: Vec<_> = self
            .reg
            .group_invites
            .iter_index("by_expiration")?
            .take_while(|invite| invite.expiration_time <= now)
            .map(|invite| invite.id)
            .collect();
        for id in &expired {
            self.reg.group_invites.remove(*id)?;
        }
        Ok(expired.len())
    }

    // ---- join requests ----

    pub fn create_join_request(
        &mut self,
        account: &AccountName,
        group: ResearchGroupId,
        motivation: &str,
    ) -> Result<ResearchGroupJoinRequestId, ChainError> {
        self.reg.accounts().check_existence(account)?;
        self.reg.groups.get(group)?;
        if self.is_member(account, group)? {
            return Err(ChainError::InvalidState("requester is already a member"));
        }
        if self
            .reg
            .group_join_requests
            .find_unique("by_account_and_group", &key![account.as_str(), group.0])?
            .is_some()
        {
            return Err(ChainError::already_exists(
                ResearchGroupJoinRequestRow::ENTITY,
                account.as_str(),
            ));
        }
        let expiration =
            self.reg.clock.head_block_time + Duration::seconds(JOIN_REQUEST_LIFETIME_SECS);
        let id = self
            .reg
            .group_join_requests
            .insert(|id| ResearchGroupJoinRequestRow {
                id,
                account: account.clone(),
                research_group_id: group,
                motivation: motivation.to_owned(),
                expiration_time: expiration,
            })?;
        Ok(id)
    }

    /// A group member turns down a join request.
    pub fn reject_join_request(
        &mut self,
        id: ResearchGroupJoinRequestId,
        rejector: &AccountName,
        group: ResearchGroupId,
    ) -> Result<(), ChainError> {
        let request = self.reg.group_join_requests.get(id)?.clone();
        if request.research_group_id != group {
            return Err(ChainError::InvalidState("join request targets another group"));
        }
        if !self.is_member(rejector, group)? {
            return Err(ChainError::NotAMember {
                account: rejector.as_str().to_owned(),
                group: group.0,
            });
        }
        self.reg.group_join_requests.remove(id)?;
        debug!(group = group.0, account = %request.account, "join request rejected");
        Ok(())
    }

    pub fn clear_expired_join_requests(&mut self, now: DateTime<Utc>) -> Result<usize, ChainError> {
        let expired: Vec<_> = self
            .reg
            .group_join_requests
            .iter_index("by_expiration")?
            .take_while(|req| req.expiration_time <= now)
            .map(|req| req.id)
            .collect();
        for id in &expired {
            self.reg.group_join_requests.remove(*id)?;
        }
        Ok(expired.len())
    }
}
