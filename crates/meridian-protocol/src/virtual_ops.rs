//! Virtual operations: side effects the core produced on its own, emitted
//! to observers so external indexers can follow money and state without
//! re-deriving the rules.

use crate::{ProposalStatus, TokenSaleStatus};
use meridian_types::{
    AccountName, Asset, DisciplineId, ProposalId, ResearchGroupId, ResearchId,
    ResearchTokenSaleId, ReviewId, Share, VestingContractId,
};
use serde::{Deserialize, Serialize};

/// Which kind of fund a per-block allocation came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundKind {
    Budget,
    Grant,
    DisciplineSupply,
}

/// Events the core emits as a consequence of applying operations or
/// advancing the block clock. Never submitted from outside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "virtual_op", rename_all = "snake_case")]
pub enum VirtualOperation {
    /// A fund paid its per-block slice into a discipline's reward pool.
    FundAllocated {
        kind: FundKind,
        fund_id: u64,
        target_discipline: DisciplineId,
        amount: Asset,
    },
    /// A proposal left the `Pending` state.
    ProposalStatusChanged {
        research_group_id: ResearchGroupId,
        proposal_id: ProposalId,
        new_status: ProposalStatus,
    },
    /// A token sale settled; tokens were distributed pro rata.
    TokenSaleFinished {
        research_id: ResearchId,
        research_token_sale_id: ResearchTokenSaleId,
        new_status: TokenSaleStatus,
        total_collected: Asset,
    },
    /// A token sale missed its soft cap; one contributor was refunded.
    TokenSaleRefunded {
        research_token_sale_id: ResearchTokenSaleId,
        contributor: AccountName,
        amount: Asset,
    },
    /// A review earned a payout from a discipline's reward pool.
    ReviewRewardDistributed {
        review_id: ReviewId,
        author: AccountName,
        discipline_id: DisciplineId,
        reward: Asset,
    },
    /// Vested balance was withdrawn to its owner.
    VestingWithdrawn {
        vesting_contract_id: VestingContractId,
        owner: AccountName,
        amount: Asset,
    },
    /// A member left a group through a dropout action; their group tokens
    /// were converted into research token compensation.
    MemberDroppedOut {
        research_group_id: ResearchGroupId,
        member: AccountName,
        converted_share: Share,
    },
}

impl VirtualOperation {
    /// Stable label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            VirtualOperation::FundAllocated { .. } => "fund_allocated",
            VirtualOperation::ProposalStatusChanged { .. } => "proposal_status_changed",
            VirtualOperation::TokenSaleFinished { .. } => "token_sale_finished",
            VirtualOperation::TokenSaleRefunded { .. } => "token_sale_refunded",
            VirtualOperation::ReviewRewardDistributed { .. } => "review_reward_distributed",
            VirtualOperation::VestingWithdrawn { .. } => "vesting_withdrawn",
            VirtualOperation::MemberDroppedOut { .. } => "member_dropped_out",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_ops_round_trip_through_json() {
        let op = VirtualOperation::FundAllocated {
            kind: FundKind::Grant,
            fund_id: 7,
            target_discipline: DisciplineId(2),
            amount: Asset::native(40),
        };
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"virtual_op\":\"fund_allocated\""));
        let back: VirtualOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }

    #[test]
    fn labels_are_stable() {
        let op = VirtualOperation::VestingWithdrawn {
            vesting_contract_id: VestingContractId(1),
            owner: AccountName::from("alice"),
            amount: Asset::native(5),
        };
        assert_eq!(op.label(), "vesting_withdrawn");
    }
}
