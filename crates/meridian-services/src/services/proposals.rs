use crate::rows::{ProposalRow, ProposalVoteRow};
use crate::services::executor;
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Utc};
use meridian_protocol::{ProposalAction, ProposalStatus, VirtualOperation};
use meridian_store::key;
use meridian_types::config::{PERCENT_100, PROPOSAL_LIFETIME_MAX_SECS, PROPOSAL_LIFETIME_MIN_SECS};
use meridian_types::{AccountName, Percent, ProposalId, ResearchGroupId, Share};
use tracing::info;

pub struct ProposalService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl ProposalService<'_> {
    pub fn get(&self, id: ProposalId) -> Result<ProposalRow, ChainError> {
        Ok(self.reg.proposals.get(id)?.clone())
    }

    pub fn proposals_of_group(
        &self,
        group: ResearchGroupId,
    ) -> Result<Vec<ProposalRow>, ChainError> {
        Ok(self
            .reg
            .proposals
            .range_prefix("by_group", &key![group.0])?
            .cloned()
            .collect())
    }

    /// Open a proposal. The group's quorum is snapshotted into the row so
    /// later quorum changes leave open proposals untouched.
    pub fn create_proposal(
        &mut self,
        creator: &AccountName,
        group: ResearchGroupId,
        action: ProposalAction,
        expiration_time: DateTime<Utc>,
    ) -> Result<ProposalId, ChainError> {
        let group_row = self.reg.groups().get(group)?;
        if !self.reg.groups().is_member(creator, group)? {
            return Err(ChainError::NotAMember {
                account: creator.as_str().to_owned(),
                group: group.0,
            });
        }
        let now = self.reg.clock.head_block_time;
        let lifetime = (expiration_time - now).num_seconds();
        if !(PROPOSAL_LIFETIME_MIN_SECS..=PROPOSAL_LIFETIME_MAX_SECS).contains(&lifetime) {
            return Err(ChainError::WindowViolation(
                "proposal lifetime must be between one and ten days",
            ));
        }

        let id = self.reg.proposals.insert(|id| ProposalRow {
            id,
            research_group_id: group,
            action,
            creator: creator.clone(),
            created_at: now,
            expiration_time,
            quorum: group_row.quorum,
            current_votes_amount: 0,
            voted_accounts: Default::default(),
        })?;
        info!(proposal = id.0, group = group.0, creator = %creator, "proposal created");
        Ok(id)
    }

    /// Cast a vote weighted by the voter's current group-token amount. A
    /// proposal that reaches quorum executes immediately and is removed.
    pub fn vote_for(
        &mut self,
        voter: &AccountName,
        group: ResearchGroupId,
        proposal_id: ProposalId,
    ) -> Result<(), ChainError> {
        let proposal = self.get(proposal_id)?;
        if proposal.research_group_id != group {
            return Err(ChainError::InvalidState("proposal belongs to another group"));
        }
        if proposal.expiration_time <= self.reg.clock.head_block_time {
            return Err(ChainError::WindowViolation("proposal has expired"));
        }
        if proposal.voted_accounts.contains(voter) {
            return Err(ChainError::DuplicateVote {
                voter: voter.as_str().to_owned(),
                target: format!("proposal {}", proposal_id),
            });
        }
        let weight = self.reg.groups().member_token(voter, group)?.amount;

        let now = self.reg.clock.head_block_time;
        let vote_id = self.reg.proposal_votes.insert(|id| ProposalVoteRow {
            id,
            voter: voter.clone(),
            proposal_id,
            research_group_id: group,
            weight,
            voting_time: now,
        })?;
        self.reg.proposals.update(proposal_id, |row| {
            row.current_votes_amount += weight;
            row.voted_accounts.insert(voter.clone());
        })?;

        if self.is_quorum_reached(proposal_id)? {
            // A failed action must not leave the triggering vote behind:
            // unwind it so the whole operation is a no-op.
            if let Err(err) = self.execute(proposal_id) {
                self.reg.proposal_votes.remove(vote_id)?;
                self.reg.proposals.update(proposal_id, |row| {
                    row.current_votes_amount -= weight;
                    row.voted_accounts.remove(voter);
                })?;
                return Err(err);
            }
        }
        Ok(())
    }

    /// Normalized vote share vs the quorum percent:
    /// `100% * votes / group total tokens >= quorum`.
    fn is_quorum_reached(&self, proposal_id: ProposalId) -> Result<bool, ChainError> {
        let proposal = self.reg.proposals.get(proposal_id)?;
        let total = self
            .reg
            .groups
            .get(proposal.research_group_id)?
            .total_tokens_amount;
        if total <= 0 {
            return Ok(false);
        }
        let share =
            Percent((proposal.current_votes_amount * PERCENT_100 as Share / total).min(PERCENT_100 as Share) as u16);
        Ok(share.0 >= proposal.quorum.0)
    }

    fn execute(&mut self, proposal_id: ProposalId) -> Result<(), ChainError> {
        let proposal = self.reg.proposals.get(proposal_id)?.clone();
        executor::execute_action(self.reg, proposal.research_group_id, &proposal.action)?;
        self.remove_with_votes(proposal_id)?;
        self.reg.emit(VirtualOperation::ProposalStatusChanged {
            research_group_id: proposal.research_group_id,
            proposal_id,
            new_status: ProposalStatus::Executed,
        });
        info!(proposal = proposal_id.0, "proposal executed");
        Ok(())
    }

    fn remove_with_votes(&mut self, proposal_id: ProposalId) -> Result<(), ChainError> {
        let votes: Vec<_> = self
            .reg
            .proposal_votes
            .range_prefix("by_proposal", &key![proposal_id.0])?
            .map(|v| v.id)
            .collect();
        for vote in votes {
            self.reg.proposal_votes.remove(vote)?;
        }
        self.reg.proposals.remove(proposal_id)?;
        Ok(())
    }

    /// Sweep proposals whose expiration is at or before `now`, walking the
    /// expiration index so cost is proportional to the expired count.
    pub fn clear_expired_proposals(&mut self, now: DateTime<Utc>) -> Result<usize, ChainError> {
        let expired: Vec<_> = self
            .reg
            .proposals
            .iter_index("by_expiration")?
            .take_while(|p| p.expiration_time <= now)
            .map(|p| (p.id, p.research_group_id))
            .collect();
        for (id, group) in &expired {
            self.remove_with_votes(*id)?;
            self.reg.emit(VirtualOperation::ProposalStatusChanged {
                research_group_id: *group,
                proposal_id: *id,
                new_status: ProposalStatus::Expired,
            });
        }
        Ok(expired.len())
    }

    /// Withdraw every pending vote a voter holds in one group; used when a
    /// member drops out so their stale weight cannot tip a quorum later.
    pub(crate) fn remove_votes_of(
        &mut self,
        voter: &AccountName,
        group: ResearchGroupId,
    ) -> Result<(), ChainError> {
        let votes: Vec<(meridian_types::ProposalVoteId, ProposalId, Share)> = self
            .reg
            .proposal_votes
            .range_prefix("by_voter_and_group", &key![voter.as_str(), group.0])?
            .map(|v| (v.id, v.proposal_id, v.weight))
            .collect();
        for (vote_id, proposal_id, weight) in votes {
            self.reg.proposal_votes.remove(vote_id)?;
            if self.reg.proposals.contains(proposal_id) {
                self.reg.proposals.update(proposal_id, |row| {
                    row.current_votes_amount -= weight;
                    row.voted_accounts.remove(voter);
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_group, ALICE, BOB};
    use chrono::Duration;
    use meridian_types::Asset;

    fn open_proposal(
        reg: &mut ServiceRegistry,
        group: ResearchGroupId,
        creator: &AccountName,
        days: i64,
    ) -> ProposalId {
        let expiration = reg.clock().head_block_time + Duration::days(days);
        reg.proposals()
            .create_proposal(
                creator,
                group,
                ProposalAction::ChangeQuorum {
                    quorum: Percent::from_whole(75),
                },
                expiration,
            )
            .unwrap()
    }

    #[test]
    fn lifetime_bounds_are_enforced() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let too_short = reg.clock().head_block_time + Duration::hours(12);
        let err = reg
            .proposals()
            .create_proposal(
                &alice,
                group,
                ProposalAction::ChangeQuorum {
                    quorum: Percent::from_whole(75),
                },
                too_short,
            )
            .unwrap_err();
        assert!(matches!(err, ChainError::WindowViolation(_)));
    }

    #[test]
    fn sole_member_vote_reaches_quorum_and_executes() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let proposal = open_proposal(&mut reg, group, &alice, 3);

        reg.proposals().vote_for(&alice, group, proposal).unwrap();
        // executed: proposal gone, quorum changed
        assert!(reg.proposals().get(proposal).is_err());
        assert_eq!(reg.groups().get(group).unwrap().quorum, Percent::from_whole(75));
    }

    #[test]
    fn double_vote_is_rejected() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        // bring in a second member so one vote cannot reach the 50% quorum
        reg.groups().add_member_tokens(&bob, group, 30_000).unwrap();
        let proposal = open_proposal(&mut reg, group, &bob, 3);

        reg.proposals().vote_for(&alice, group, proposal).unwrap();
        let err = reg.proposals().vote_for(&alice, group, proposal).unwrap_err();
        assert!(matches!(err, ChainError::DuplicateVote { .. }));
    }

    #[test]
    fn expiration_sweep_removes_exactly_the_expired() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let early = open_proposal(&mut reg, group, &alice, 2);
        let late = open_proposal(&mut reg, group, &alice, 9);

        let now = reg.clock().head_block_time + Duration::days(3);
        let swept = reg.proposals().clear_expired_proposals(now).unwrap();
        assert_eq!(swept, 1);
        assert!(reg.proposals().get(early).is_err());
        assert!(reg.proposals().get(late).is_ok());
    }

    #[test]
    fn snapshot_weight_is_not_revalued() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        reg.groups().add_member_tokens(&bob, group, 30_000).unwrap();
        let proposal = open_proposal(&mut reg, group, &bob, 3);

        reg.proposals().vote_for(&alice, group, proposal).unwrap();
        let snapshot = reg.proposals().get(proposal).unwrap().current_votes_amount;
        // alice's stake grows after the vote; the recorded weight stays
        reg.groups().add_member_tokens(&alice, group, 5_000).unwrap();
        assert_eq!(
            reg.proposals().get(proposal).unwrap().current_votes_amount,
            snapshot
        );
    }

    #[test]
    fn failed_execution_unwinds_the_triggering_vote() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        // treasury is empty, so the quorum-triggered payout must fail
        let expiration = reg.clock().head_block_time + Duration::days(3);
        let proposal = reg
            .proposals()
            .create_proposal(
                &alice,
                group,
                ProposalAction::SendFunds {
                    recipient: bob.clone(),
                    funds: Asset::native(1_000),
                },
                expiration,
            )
            .unwrap();

        let err = reg.proposals().vote_for(&alice, group, proposal).unwrap_err();
        assert!(matches!(err, ChainError::InsufficientFunds { .. }));

        // the proposal is still open with no trace of the failed vote
        let row = reg.proposals().get(proposal).unwrap();
        assert_eq!(row.current_votes_amount, 0);
        assert!(row.voted_accounts.is_empty());

        // once the treasury can cover it, the same vote goes through
        reg.groups().credit_group(group, &Asset::native(1_000)).unwrap();
        reg.proposals().vote_for(&alice, group, proposal).unwrap();
        assert!(reg.proposals().get(proposal).is_err());
        assert_eq!(
            reg.accounts().balance(&bob, &meridian_types::config::native_symbol()).unwrap(),
            1_000
        );
    }

    #[test]
    fn send_funds_action_pays_from_the_group_treasury() {
        let (mut reg, group) = registry_with_group(ALICE);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        reg.groups().credit_group(group, &Asset::native(500)).unwrap();

        let expiration = reg.clock().head_block_time + Duration::days(3);
        let proposal = reg
            .proposals()
            .create_proposal(
                &alice,
                group,
                ProposalAction::SendFunds {
                    recipient: bob.clone(),
                    funds: Asset::native(200),
                },
                expiration,
            )
            .unwrap();
        reg.proposals().vote_for(&alice, group, proposal).unwrap();

        assert_eq!(
            reg.groups().group_balance(group, &meridian_types::config::native_symbol()),
            300
        );
        assert_eq!(
            reg.accounts().balance(&bob, &meridian_types::config::native_symbol()).unwrap(),
            200
        );
    }
}
