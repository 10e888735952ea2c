//! Typed proposal action payloads.
//!
//! A proposal carries exactly one of these; the governance executor matches
//! on the variant once quorum is reached. The acting research group is the
//! proposal's own group, so actions never name it redundantly.

use crate::{ProtocolError, ResearchContentType};
use chrono::{DateTime, Utc};
use meridian_types::{
    AccountName, Asset, DisciplineId, Percent, ResearchContentId, ResearchId, Share,
};
use serde::{Deserialize, Serialize};

/// New token share for one member in a rebalance action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTokenShare {
    pub owner: AccountName,
    pub share: Percent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ProposalAction {
    /// Invite an account to the group with a token share, pending approval.
    InviteMember {
        invitee: AccountName,
        token_share: Percent,
    },
    /// Remove a member; their group tokens convert into personal research
    /// tokens with dropout compensation.
    DropoutMember { member: AccountName },
    /// Change the group's quorum percent for future proposals.
    ChangeQuorum { quorum: Percent },
    /// Change the review share percent of one of the group's researches.
    ChangeReviewShare {
        research_id: ResearchId,
        review_share: Percent,
    },
    /// Start a new research under the group.
    StartResearch {
        title: String,
        abstract_: String,
        permlink: String,
        review_share: Percent,
        dropout_compensation: Percent,
        disciplines: Vec<DisciplineId>,
    },
    /// Pay out of the group balance to an account.
    SendFunds { recipient: AccountName, funds: Asset },
    /// Reassign every member's token share; must cover all members.
    RebalanceGroupTokens { shares: Vec<GroupTokenShare> },
    /// Publish research content under one of the group's researches.
    CreateResearchMaterial {
        research_id: ResearchId,
        content_type: ResearchContentType,
        title: String,
        content: String,
        authors: Vec<AccountName>,
        references: Vec<ResearchContentId>,
    },
    /// Offer part of a research's owned tokens for sale.
    StartTokenSale {
        research_id: ResearchId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        amount_for_sale: Share,
        soft_cap: Asset,
        hard_cap: Asset,
    },
}

impl ProposalAction {
    /// Shape checks independent of chain state.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            ProposalAction::InviteMember {
                invitee,
                token_share,
            } => {
                check_name(invitee)?;
                check_percent(*token_share)?;
                if token_share.0 == 0 {
                    return Err(ProtocolError::InvalidPercent(0));
                }
                Ok(())
            }
            ProposalAction::DropoutMember { member } => check_name(member),
            ProposalAction::ChangeQuorum { quorum } => {
                check_percent(*quorum)?;
                if quorum.0 == 0 {
                    return Err(ProtocolError::InvalidPercent(0));
                }
                Ok(())
            }
            ProposalAction::ChangeReviewShare { review_share, .. } => check_percent(*review_share),
            ProposalAction::StartResearch {
                title,
                permlink,
                review_share,
                dropout_compensation,
                disciplines,
                ..
            } => {
                check_not_empty("title", title)?;
                check_not_empty("permlink", permlink)?;
                check_percent(*review_share)?;
                check_percent(*dropout_compensation)?;
                if disciplines.is_empty() {
                    return Err(ProtocolError::EmptyField("disciplines"));
                }
                Ok(())
            }
            ProposalAction::SendFunds { recipient, funds } => {
                check_name(recipient)?;
                check_positive(funds.amount)
            }
            ProposalAction::RebalanceGroupTokens { shares } => {
                if shares.is_empty() {
                    return Err(ProtocolError::EmptyField("shares"));
                }
                let total: u32 = shares.iter().map(|s| s.share.0 as u32).sum();
                if total != meridian_types::config::PERCENT_100 as u32 {
                    return Err(ProtocolError::InvalidPercent(total.min(u16::MAX as u32) as u16));
                }
                for share in shares {
                    check_name(&share.owner)?;
                }
                Ok(())
            }
            ProposalAction::CreateResearchMaterial {
                title,
                content,
                authors,
                ..
            } => {
                check_not_empty("title", title)?;
                check_not_empty("content", content)?;
                if authors.is_empty() {
                    return Err(ProtocolError::EmptyField("authors"));
                }
                for author in authors {
                    check_name(author)?;
                }
                Ok(())
            }
            ProposalAction::StartTokenSale {
                start_time,
                end_time,
                amount_for_sale,
                soft_cap,
                hard_cap,
                ..
            } => {
                if end_time <= start_time {
                    return Err(ProtocolError::InvalidWindow(
                        "token sale end time must be after start time",
                    ));
                }
                check_positive(*amount_for_sale)?;
                check_positive(soft_cap.amount)?;
                check_positive(hard_cap.amount)?;
                if soft_cap.amount > hard_cap.amount {
                    return Err(ProtocolError::CapsInverted);
                }
                Ok(())
            }
        }
    }
}

pub(crate) fn check_name(name: &AccountName) -> Result<(), ProtocolError> {
    if !name.is_valid() {
        return Err(ProtocolError::InvalidAccountName(name.0.clone()));
    }
    Ok(())
}

pub(crate) fn check_percent(percent: Percent) -> Result<(), ProtocolError> {
    if !percent.is_valid() {
        return Err(ProtocolError::InvalidPercent(percent.0));
    }
    Ok(())
}

pub(crate) fn check_positive(amount: Share) -> Result<(), ProtocolError> {
    if amount <= 0 {
        return Err(ProtocolError::NonPositiveAmount(amount));
    }
    Ok(())
}

pub(crate) fn check_not_empty(field: &'static str, value: &str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::EmptyField(field));
    }
    Ok(())
}
