//! Governance action execution: the single place a quorum-approved
//! proposal turns into state changes.

use crate::{ChainError, ServiceRegistry};
use meridian_protocol::ProposalAction;
use meridian_types::ResearchGroupId;
use tracing::debug;

pub(crate) fn execute_action(
    reg: &mut ServiceRegistry,
    group: ResearchGroupId,
    action: &ProposalAction,
) -> Result<(), ChainError> {
    debug!(group = group.0, "executing proposal action");
    match action {
        ProposalAction::InviteMember {
            invitee,
            token_share,
        } => {
            let total = reg.groups().get(group)?.total_tokens_amount;
            let amount = token_share.of(total).max(1);
            reg.groups().create_invite(invitee, group, amount)?;
            Ok(())
        }
        ProposalAction::DropoutMember { member } => reg.groups().dropout_member(member, group),
        ProposalAction::ChangeQuorum { quorum } => reg.groups().change_quorum(group, *quorum),
        ProposalAction::ChangeReviewShare {
            research_id,
            review_share,
        } => {
            reg.researches().get_of_group(*research_id, group)?;
            reg.researches().change_review_share(*research_id, *review_share)
        }
        ProposalAction::StartResearch {
            title,
            abstract_,
            permlink,
            review_share,
            dropout_compensation,
            disciplines,
        } => {
            reg.researches().create_research(
                group,
                title,
                abstract_,
                permlink,
                *review_share,
                *dropout_compensation,
                disciplines,
            )?;
            Ok(())
        }
        ProposalAction::SendFunds { recipient, funds } => {
            reg.accounts().check_existence(recipient)?;
            reg.groups().debit_group(group, funds)?;
            reg.accounts().increase_balance(recipient, funds)?;
            Ok(())
        }
        ProposalAction::RebalanceGroupTokens { shares } => {
            reg.groups().rebalance_tokens(group, shares)
        }
        ProposalAction::CreateResearchMaterial {
            research_id,
            content_type,
            title,
            content,
            authors,
            references,
        } => {
            reg.researches().get_of_group(*research_id, group)?;
            reg.contents().create_content(
                *research_id,
                *content_type,
                title,
                content,
                authors,
                references,
            )?;
            Ok(())
        }
        ProposalAction::StartTokenSale {
            research_id,
            start_time,
            end_time,
            amount_for_sale,
            soft_cap,
            hard_cap,
        } => {
            reg.researches().get_of_group(*research_id, group)?;
            reg.token_sales().start_sale(
                *research_id,
                *start_time,
                *end_time,
                *amount_for_sale,
                soft_cap.clone(),
                hard_cap.clone(),
            )?;
            Ok(())
        }
    }
}
