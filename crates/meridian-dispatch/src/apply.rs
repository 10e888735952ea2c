//! Operation application: validate, authorize, evaluate.
//!
//! Exactly one evaluator per operation variant, routed through a static
//! exhaustive match. Evaluators are deterministic functions of the
//! operation and the pre-state reached through the registry.

use crate::DispatchError;
use meridian_protocol::Operation;
use meridian_services::{ChainError, ServiceRegistry};
use meridian_types::{AccountName, AssetSymbol, AuthorityKind, ResearchGroupId, SigningKey};
use std::collections::BTreeSet;
use tracing::debug;

/// Apply one operation on behalf of the given already-verified signing
/// keys. Rejection at any stage leaves the registry untouched.
pub fn apply_operation(
    reg: &mut ServiceRegistry,
    op: &Operation,
    signed: &BTreeSet<SigningKey>,
) -> Result<(), DispatchError> {
    op.validate()?;
    authorize(reg, op, signed)?;
    evaluate(reg, op)
}

/// Check the signing keys against the stored authority of the account the
/// operation names. A higher authority level always covers a lower one:
/// owner keys may act at active and posting level, active keys at
/// posting level.
fn authorize(
    reg: &mut ServiceRegistry,
    op: &Operation,
    signed: &BTreeSet<SigningKey>,
) -> Result<(), DispatchError> {
    let required = op.required_authority();
    let account = reg.accounts().get_by_name(&required.account)?;
    let candidates: &[&meridian_types::Authority] = match required.kind {
        AuthorityKind::Owner => &[&account.owner],
        AuthorityKind::Active => &[&account.active, &account.owner],
        AuthorityKind::Posting => &[&account.posting, &account.active, &account.owner],
    };
    if candidates.iter().any(|auth| auth.is_satisfied_by(signed)) {
        debug!(account = %required.account, kind = ?required.kind, "operation authorized");
        return Ok(());
    }
    Err(DispatchError::MissingAuthority {
        account: required.account.as_str().to_owned(),
        kind: required.kind,
    })
}

fn ensure_member(
    reg: &mut ServiceRegistry,
    account: &AccountName,
    group: ResearchGroupId,
) -> Result<(), DispatchError> {
    if !reg.groups().is_member(account, group)? {
        return Err(ChainError::NotAMember {
            account: account.as_str().to_owned(),
            group: group.0,
        }
        .into());
    }
    Ok(())
}

fn evaluate(reg: &mut ServiceRegistry, op: &Operation) -> Result<(), DispatchError> {
    match op {
        Operation::CreateAccount {
            creator,
            new_account_name,
            fee,
            owner,
            active,
            posting,
        } => {
            reg.accounts().create_account(
                creator,
                new_account_name,
                fee,
                owner.clone(),
                active.clone(),
                posting.clone(),
            )?;
        }
        Operation::UpdateAccount {
            account,
            owner,
            active,
            posting,
        } => {
            reg.accounts().update_authorities(
                account,
                owner.clone(),
                active.clone(),
                posting.clone(),
            )?;
        }
        Operation::Transfer {
            from, to, amount, ..
        } => {
            reg.accounts().transfer(from, to, amount)?;
        }
        Operation::TransferToCommonTokens { from, to, amount } => {
            reg.accounts().transfer_to_common_tokens(from, to, amount)?;
        }
        Operation::WithdrawCommonTokens {
            account,
            total_common_tokens_amount,
        } => {
            reg.accounts()
                .withdraw_common_tokens(account, *total_common_tokens_amount)?;
        }
        Operation::CreateDiscipline {
            creator,
            name,
            parent,
        } => {
            reg.accounts().check_existence(creator)?;
            reg.disciplines().create_discipline(name, *parent)?;
        }
        Operation::CreateResearchGroup {
            creator,
            permlink,
            description,
            quorum,
            tokens_amount,
        } => {
            reg.groups()
                .create_group(creator, permlink, description, *quorum, *tokens_amount)?;
        }
        Operation::CreateProposal {
            creator,
            research_group_id,
            action,
            expiration_time,
        } => {
            reg.proposals().create_proposal(
                creator,
                *research_group_id,
                action.clone(),
                *expiration_time,
            )?;
        }
        Operation::VoteProposal {
            voter,
            research_group_id,
            proposal_id,
        } => {
            reg.proposals()
                .vote_for(voter, *research_group_id, *proposal_id)?;
        }
        Operation::CreateResearch {
            creator,
            research_group_id,
            title,
            abstract_,
            permlink,
            review_share,
            dropout_compensation,
            disciplines,
        } => {
            ensure_member(reg, creator, *research_group_id)?;
            reg.researches().create_research(
                *research_group_id,
                title,
                abstract_,
                permlink,
                *review_share,
                *dropout_compensation,
                disciplines,
            )?;
        }
        Operation::CreateResearchContent {
            creator,
            research_id,
            content_type,
            title,
            content,
            authors,
            references,
        } => {
            let research = reg.researches().get(*research_id)?;
            ensure_member(reg, creator, research.research_group_id)?;
            reg.contents().create_content(
                *research_id,
                *content_type,
                title,
                content,
                authors,
                references,
            )?;
        }
        Operation::MakeReview {
            author,
            research_content_id,
            content,
            is_positive,
            weight,
        } => {
            reg.reviews()
                .make_review(author, *research_content_id, content, *is_positive, *weight)?;
        }
        Operation::VoteForReview {
            voter,
            review_id,
            discipline_id,
            weight,
        } => {
            reg.reviews()
                .vote_for_review(voter, *review_id, *discipline_id, *weight)?;
        }
        Operation::CreateGrant {
            owner,
            balance,
            start_block,
            end_block,
            target_discipline,
        } => {
            reg.funds()
                .create_grant(owner, balance, *start_block, *end_block, *target_discipline)?;
        }
        Operation::CreateBudget {
            owner,
            balance,
            start_block,
            end_block,
            target_discipline,
        } => {
            reg.funds()
                .create_budget(owner, balance, *start_block, *end_block, *target_discipline)?;
        }
        Operation::CreateDisciplineSupply {
            grantor,
            balance,
            start_time,
            end_time,
            target_discipline,
            content_hash,
        } => {
            reg.funds().create_discipline_supply(
                grantor,
                balance,
                *start_time,
                *end_time,
                *target_discipline,
                content_hash,
            )?;
        }
        Operation::CreateAward {
            grantor,
            awardee,
            discipline_id,
            expertise_amount,
        } => {
            reg.accounts().check_existence(grantor)?;
            reg.expertise()
                .award(awardee, *discipline_id, *expertise_amount)?;
        }
        Operation::ContributeToTokenSale {
            contributor,
            research_token_sale_id,
            amount,
        } => {
            reg.token_sales()
                .contribute(contributor, *research_token_sale_id, amount)?;
        }
        Operation::CreateVestingContract {
            creator,
            owner,
            balance,
            vesting_duration_secs,
            vesting_cliff_secs,
        } => {
            reg.vesting().create_contract(
                creator,
                owner,
                balance,
                *vesting_duration_secs,
                *vesting_cliff_secs,
            )?;
        }
        Operation::WithdrawVesting {
            owner,
            vesting_contract_id,
            amount,
        } => {
            reg.vesting().withdraw(owner, *vesting_contract_id, amount)?;
        }
        Operation::CreateNdaContract {
            creator,
            party_a,
            party_a_research_group_id,
            party_b,
            party_b_research_group_id,
            title,
            contract_hash,
            start_date,
            end_date,
        } => {
            reg.ndas().create_contract(
                creator,
                party_a,
                *party_a_research_group_id,
                party_b,
                *party_b_research_group_id,
                title,
                contract_hash,
                *start_date,
                *end_date,
            )?;
        }
        Operation::SignNdaContract {
            contract_id,
            signee,
            signature,
        } => {
            reg.ndas().sign(*contract_id, signee, signature)?;
        }
        Operation::DeclineNdaContract {
            contract_id,
            signee,
        } => {
            reg.ndas().decline(*contract_id, signee)?;
        }
        Operation::ApproveResearchGroupInvite { invite_id, invitee } => {
            reg.groups().approve_invite(*invite_id, invitee)?;
        }
        Operation::RejectResearchGroupInvite { invite_id, invitee } => {
            reg.groups().reject_invite(*invite_id, invitee)?;
        }
        Operation::CreateResearchGroupJoinRequest {
            account,
            research_group_id,
            motivation,
        } => {
            reg.groups()
                .create_join_request(account, *research_group_id, motivation)?;
        }
        Operation::RejectResearchGroupJoinRequest {
            request_id,
            rejector,
            research_group_id,
        } => {
            reg.groups()
                .reject_join_request(*request_id, rejector, *research_group_id)?;
        }
        Operation::TransferResearchTokensToResearchGroup {
            owner,
            research_id,
            amount,
        } => {
            reg.token_sales()
                .transfer_tokens_to_research(owner, *research_id, *amount)?;
        }
        Operation::CreateAsset {
            issuer,
            symbol,
            precision,
            description,
        } => {
            let symbol = AssetSymbol::new(symbol.clone());
            reg.assets()
                .create_asset(issuer, &symbol, *precision, description)?;
        }
        Operation::IssueAsset {
            issuer,
            amount,
            recipient,
        } => {
            reg.assets().issue(issuer, amount, recipient)?;
        }
    }
    Ok(())
}
