//! The closed operation union and its per-variant validation.

use crate::proposal_action::{check_name, check_not_empty, check_percent, check_positive};
use crate::{ProposalAction, ProtocolError, ResearchContentType};
use chrono::{DateTime, Utc};
use meridian_types::{
    AccountName, Asset, Authority, AuthorityKind, DisciplineId, NdaContractId, Percent,
    ProposalId, ResearchContentId, ResearchGroupId, ResearchGroupInviteId,
    ResearchGroupJoinRequestId, ResearchId, ResearchTokenSaleId, ReviewId, Share,
    VestingContractId,
};
use serde::{Deserialize, Serialize};

/// The authority an operation demands: which account must have signed, and
/// at which level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredAuthority {
    pub account: AccountName,
    pub kind: AuthorityKind,
}

impl RequiredAuthority {
    pub fn owner(account: &AccountName) -> Self {
        Self {
            account: account.clone(),
            kind: AuthorityKind::Owner,
        }
    }

    pub fn active(account: &AccountName) -> Self {
        Self {
            account: account.clone(),
            kind: AuthorityKind::Active,
        }
    }

    pub fn posting(account: &AccountName) -> Self {
        Self {
            account: account.clone(),
            kind: AuthorityKind::Posting,
        }
    }
}

/// Every operation the core can apply. Closed set: dispatch matches this
/// enum exhaustively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    CreateAccount {
        creator: AccountName,
        new_account_name: AccountName,
        fee: Asset,
        owner: Authority,
        active: Authority,
        posting: Authority,
    },
    UpdateAccount {
        account: AccountName,
        owner: Option<Authority>,
        active: Option<Authority>,
        posting: Option<Authority>,
    },
    Transfer {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        memo: String,
    },
    TransferToCommonTokens {
        from: AccountName,
        to: AccountName,
        amount: Asset,
    },
    WithdrawCommonTokens {
        account: AccountName,
        total_common_tokens_amount: Share,
    },
    CreateDiscipline {
        creator: AccountName,
        name: String,
        parent: Option<DisciplineId>,
    },
    CreateResearchGroup {
        creator: AccountName,
        permlink: String,
        description: String,
        quorum: Percent,
        tokens_amount: Share,
    },
    CreateProposal {
        creator: AccountName,
        research_group_id: ResearchGroupId,
        action: ProposalAction,
        expiration_time: DateTime<Utc>,
    },
    VoteProposal {
        voter: AccountName,
        research_group_id: ResearchGroupId,
        proposal_id: ProposalId,
    },
    CreateResearch {
        creator: AccountName,
        research_group_id: ResearchGroupId,
        title: String,
        abstract_: String,
        permlink: String,
        review_share: Percent,
        dropout_compensation: Percent,
        disciplines: Vec<DisciplineId>,
    },
    CreateResearchContent {
        creator: AccountName,
        research_id: ResearchId,
        content_type: ResearchContentType,
        title: String,
        content: String,
        authors: Vec<AccountName>,
        references: Vec<ResearchContentId>,
    },
    MakeReview {
        author: AccountName,
        research_content_id: ResearchContentId,
        content: String,
        is_positive: bool,
        /// Share of the author's regenerated voting power to spend, whole
        /// percent basis.
        weight: Percent,
    },
    VoteForReview {
        voter: AccountName,
        review_id: ReviewId,
        discipline_id: DisciplineId,
        weight: Percent,
    },
    CreateGrant {
        owner: AccountName,
        balance: Asset,
        start_block: u32,
        end_block: u32,
        target_discipline: DisciplineId,
    },
    CreateBudget {
        owner: AccountName,
        balance: Asset,
        start_block: u32,
        end_block: u32,
        target_discipline: DisciplineId,
    },
    CreateDisciplineSupply {
        grantor: AccountName,
        balance: Asset,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        target_discipline: DisciplineId,
        content_hash: String,
    },
    CreateAward {
        grantor: AccountName,
        awardee: AccountName,
        discipline_id: DisciplineId,
        expertise_amount: Share,
    },
    ContributeToTokenSale {
        contributor: AccountName,
        research_token_sale_id: ResearchTokenSaleId,
        amount: Asset,
    },
    CreateVestingContract {
        creator: AccountName,
        owner: AccountName,
        balance: Asset,
        vesting_duration_secs: i64,
        vesting_cliff_secs: i64,
    },
    WithdrawVesting {
        owner: AccountName,
        vesting_contract_id: VestingContractId,
        amount: Asset,
    },
    CreateNdaContract {
        creator: AccountName,
        party_a: AccountName,
        party_a_research_group_id: ResearchGroupId,
        party_b: AccountName,
        party_b_research_group_id: ResearchGroupId,
        title: String,
        contract_hash: String,
        start_date: Option<DateTime<Utc>>,
        end_date: DateTime<Utc>,
    },
    SignNdaContract {
        contract_id: NdaContractId,
        signee: AccountName,
        signature: String,
    },
    DeclineNdaContract {
        contract_id: NdaContractId,
        signee: AccountName,
    },
    ApproveResearchGroupInvite {
        invite_id: ResearchGroupInviteId,
        invitee: AccountName,
    },
    RejectResearchGroupInvite {
        invite_id: ResearchGroupInviteId,
        invitee: AccountName,
    },
    CreateResearchGroupJoinRequest {
        account: AccountName,
        research_group_id: ResearchGroupId,
        motivation: String,
    },
    RejectResearchGroupJoinRequest {
        request_id: ResearchGroupJoinRequestId,
        rejector: AccountName,
        research_group_id: ResearchGroupId,
    },
    TransferResearchTokensToResearchGroup {
        owner: AccountName,
        research_id: ResearchId,
        amount: Share,
    },
    CreateAsset {
        issuer: AccountName,
        symbol: String,
        precision: u8,
        description: String,
    },
    IssueAsset {
        issuer: AccountName,
        amount: Asset,
        recipient: AccountName,
    },
}

impl Operation {
    /// Stateless shape validation; stateful preconditions are asserted by
    /// the services when the evaluator runs.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Operation::CreateAccount {
                creator,
                new_account_name,
                fee,
                owner,
                active,
                posting,
            } => {
                check_name(creator)?;
                check_name(new_account_name)?;
                if fee.amount < 0 {
                    return Err(ProtocolError::NonPositiveAmount(fee.amount));
                }
                for auth in [owner, active, posting] {
                    if !auth.is_well_formed() {
                        return Err(ProtocolError::EmptyField("authority"));
                    }
                }
                Ok(())
            }
            Operation::UpdateAccount {
                account,
                owner,
                active,
                posting,
            } => {
                check_name(account)?;
                for auth in [owner, active, posting].into_iter().flatten() {
                    if !auth.is_well_formed() {
                        return Err(ProtocolError::EmptyField("authority"));
                    }
                }
                Ok(())
            }
            Operation::Transfer {
                from, to, amount, ..
            } => {
                check_name(from)?;
                check_name(to)?;
                check_positive(amount.amount)
            }
            Operation::TransferToCommonTokens { from, to, amount } => {
                check_name(from)?;
                check_name(to)?;
                check_positive(amount.amount)
            }
            Operation::WithdrawCommonTokens {
                account,
                total_common_tokens_amount,
            } => {
                check_name(account)?;
                if *total_common_tokens_amount < 0 {
                    return Err(ProtocolError::NonPositiveAmount(*total_common_tokens_amount));
                }
                Ok(())
            }
            Operation::CreateDiscipline { creator, name, .. } => {
                check_name(creator)?;
                check_not_empty("name", name)
            }
            Operation::CreateResearchGroup {
                creator,
                permlink,
                quorum,
                tokens_amount,
                ..
            } => {
                check_name(creator)?;
                check_not_empty("permlink", permlink)?;
                check_percent(*quorum)?;
                if quorum.0 == 0 {
                    return Err(ProtocolError::InvalidPercent(0));
                }
                check_positive(*tokens_amount)
            }
            Operation::CreateProposal {
                creator, action, ..
            } => {
                check_name(creator)?;
                action.validate()
            }
            Operation::VoteProposal { voter, .. } => check_name(voter),
            Operation::CreateResearch {
                creator,
                title,
                permlink,
                review_share,
                dropout_compensation,
                disciplines,
                ..
            } => {
                check_name(creator)?;
                check_not_empty("title", title)?;
                check_not_empty("permlink", permlink)?;
                check_percent(*review_share)?;
                check_percent(*dropout_compensation)?;
                if disciplines.is_empty() {
                    return Err(ProtocolError::EmptyField("disciplines"));
                }
                Ok(())
            }
            Operation::CreateResearchContent {
                creator,
                title,
                content,
                authors,
                ..
            } => {
                check_name(creator)?;
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
            Operation::MakeReview {
                author,
                content,
                weight,
                ..
            } => {
                check_name(author)?;
                check_not_empty("content", content)?;
                check_percent(*weight)?;
                if weight.0 == 0 {
                    return Err(ProtocolError::InvalidPercent(0));
                }
                Ok(())
            }
            Operation::VoteForReview { voter, weight, .. } => {
                check_name(voter)?;
                check_percent(*weight)?;
                if weight.0 == 0 {
                    return Err(ProtocolError::InvalidPercent(0));
                }
                Ok(())
            }
            Operation::CreateGrant {
                owner,
                balance,
                start_block,
                end_block,
                ..
            }
            | Operation::CreateBudget {
                owner,
                balance,
                start_block,
                end_block,
                ..
            } => {
                check_name(owner)?;
                check_positive(balance.amount)?;
                if start_block >= end_block {
                    return Err(ProtocolError::InvalidWindow(
                        "fund start block must be before end block",
                    ));
                }
                Ok(())
            }
            Operation::CreateDisciplineSupply {
                grantor,
                balance,
                start_time,
                end_time,
                content_hash,
                ..
            } => {
                check_name(grantor)?;
                check_positive(balance.amount)?;
                check_not_empty("content_hash", content_hash)?;
                if end_time <= start_time {
                    return Err(ProtocolError::InvalidWindow(
                        "discipline supply end time must be after start time",
                    ));
                }
                Ok(())
            }
            Operation::CreateAward {
                grantor,
                awardee,
                expertise_amount,
                ..
            } => {
                check_name(grantor)?;
                check_name(awardee)?;
                check_positive(*expertise_amount)
            }
            Operation::ContributeToTokenSale {
                contributor,
                amount,
                ..
            } => {
                check_name(contributor)?;
                check_positive(amount.amount)
            }
            Operation::CreateVestingContract {
                creator,
                owner,
                balance,
                vesting_duration_secs,
                vesting_cliff_secs,
            } => {
                check_name(creator)?;
                check_name(owner)?;
                check_positive(balance.amount)?;
                check_positive(*vesting_duration_secs)?;
                if *vesting_cliff_secs < 0 || vesting_cliff_secs > vesting_duration_secs {
                    return Err(ProtocolError::InvalidWindow(
                        "vesting cliff must lie within the vesting duration",
                    ));
                }
                Ok(())
            }
            Operation::WithdrawVesting { owner, amount, .. } => {
                check_name(owner)?;
                check_positive(amount.amount)
            }
            Operation::CreateNdaContract {
                creator,
                party_a,
                party_b,
                title,
                contract_hash,
                start_date,
                end_date,
                ..
            } => {
                check_name(creator)?;
                check_name(party_a)?;
                check_name(party_b)?;
                if party_a == party_b {
                    return Err(ProtocolError::InvalidWindow(
                        "NDA parties must be distinct accounts",
                    ));
                }
                check_not_empty("title", title)?;
                check_not_empty("contract_hash", contract_hash)?;
                if let Some(start) = start_date {
                    if end_date <= start {
                        return Err(ProtocolError::InvalidWindow(
                            "NDA end date must be after start date",
                        ));
                    }
                }
                Ok(())
            }
            Operation::SignNdaContract {
                signee, signature, ..
            } => {
                check_name(signee)?;
                check_not_empty("signature", signature)
            }
            Operation::DeclineNdaContract { signee, .. } => check_name(signee),
            Operation::ApproveResearchGroupInvite { invitee, .. }
            | Operation::RejectResearchGroupInvite { invitee, .. } => check_name(invitee),
            Operation::CreateResearchGroupJoinRequest {
                account,
                motivation,
                ..
            } => {
                check_name(account)?;
                check_not_empty("motivation", motivation)
            }
            Operation::RejectResearchGroupJoinRequest { rejector, .. } => check_name(rejector),
            Operation::TransferResearchTokensToResearchGroup { owner, amount, .. } => {
                check_name(owner)?;
                check_positive(*amount)
            }
            Operation::CreateAsset {
                issuer,
                symbol,
                precision,
                ..
            } => {
                check_name(issuer)?;
                let sym = meridian_types::AssetSymbol::new(symbol.clone());
                if !sym.is_valid() {
                    return Err(ProtocolError::InvalidAssetSymbol(symbol.clone()));
                }
                if *precision > 12 {
                    return Err(ProtocolError::InvalidWindow(
                        "asset precision must be at most 12",
                    ));
                }
                Ok(())
            }
            Operation::IssueAsset {
                issuer,
                amount,
                recipient,
            } => {
                check_name(issuer)?;
                check_name(recipient)?;
                check_positive(amount.amount)
            }
        }
    }

    /// Which account must have signed this operation, and at which level.
    pub fn required_authority(&self) -> RequiredAuthority {
        match self {
            Operation::CreateAccount { creator, .. } => RequiredAuthority::active(creator),
            Operation::UpdateAccount { account, owner, .. } => {
                // replacing the owner key set needs the owner authority
                if owner.is_some() {
                    RequiredAuthority::owner(account)
                } else {
                    RequiredAuthority::active(account)
                }
            }
            Operation::Transfer { from, .. } => RequiredAuthority::active(from),
            Operation::TransferToCommonTokens { from, .. } => RequiredAuthority::active(from),
            Operation::WithdrawCommonTokens { account, .. } => RequiredAuthority::active(account),
            Operation::CreateDiscipline { creator, .. } => RequiredAuthority::active(creator),
            Operation::CreateResearchGroup { creator, .. } => RequiredAuthority::active(creator),
            Operation::CreateProposal { creator, .. } => RequiredAuthority::active(creator),
            Operation::VoteProposal { voter, .. } => RequiredAuthority::active(voter),
            Operation::CreateResearch { creator, .. } => RequiredAuthority::active(creator),
            Operation::CreateResearchContent { creator, .. } => RequiredAuthority::active(creator),
            Operation::MakeReview { author, .. } => RequiredAuthority::posting(author),
            Operation::VoteForReview { voter, .. } => RequiredAuthority::posting(voter),
            Operation::CreateGrant { owner, .. } => RequiredAuthority::active(owner),
            Operation::CreateBudget { owner, .. } => RequiredAuthority::active(owner),
            Operation::CreateDisciplineSupply { grantor, .. } => RequiredAuthority::active(grantor),
            Operation::CreateAward { grantor, .. } => RequiredAuthority::active(grantor),
            Operation::ContributeToTokenSale { contributor, .. } => {
                RequiredAuthority::active(contributor)
            }
            Operation::CreateVestingContract { creator, .. } => RequiredAuthority::active(creator),
            Operation::WithdrawVesting { owner, .. } => RequiredAuthority::active(owner),
            Operation::CreateNdaContract { creator, .. } => RequiredAuthority::active(creator),
            Operation::SignNdaContract { signee, .. } => RequiredAuthority::active(signee),
            Operation::DeclineNdaContract { signee, .. } => RequiredAuthority::active(signee),
            Operation::ApproveResearchGroupInvite { invitee, .. } => {
                RequiredAuthority::active(invitee)
            }
            Operation::RejectResearchGroupInvite { invitee, .. } => {
                RequiredAuthority::active(invitee)
            }
            Operation::CreateResearchGroupJoinRequest { account, .. } => {
                RequiredAuthority::active(account)
            }
            Operation::RejectResearchGroupJoinRequest { rejector, .. } => {
                RequiredAuthority::active(rejector)
            }
            Operation::TransferResearchTokensToResearchGroup { owner, .. } => {
                RequiredAuthority::active(owner)
            }
            Operation::CreateAsset { issuer, .. } => RequiredAuthority::active(issuer),
            Operation::IssueAsset { issuer, .. } => RequiredAuthority::active(issuer),
        }
    }
}
