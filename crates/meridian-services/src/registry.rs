//! The service registry: single owner of all state.
//!
//! Evaluators receive `&mut ServiceRegistry` and reach every service
//! through it; nothing in the core resolves state through globals. The
//! registry also collects virtual operations emitted while applying an
//! operation or advancing the block clock, for the dispatch layer to
//! hand to observers.

use crate::rows::*;
use crate::services::{
    AccountService, AssetService, ContentService, DisciplineService, ExpertiseService,
    FundService, GroupService, NdaService, ProposalService, ResearchService, RewardService,
    ReviewService, TokenSaleService, VestingService,
};
use meridian_protocol::VirtualOperation;
use meridian_store::Table;
use meridian_types::BlockClock;
use tracing::debug;

#[derive(Default)]
pub struct ServiceRegistry {
    pub(crate) clock: BlockClock,
    pub(crate) accounts: Table<AccountRow>,
    pub(crate) disciplines: Table<DisciplineRow>,
    pub(crate) expert_tokens: Table<ExpertTokenRow>,
    pub(crate) groups: Table<ResearchGroupRow>,
    pub(crate) group_tokens: Table<ResearchGroupTokenRow>,
    pub(crate) group_invites: Table<ResearchGroupInviteRow>,
    pub(crate) group_join_requests: Table<ResearchGroupJoinRequestRow>,
    pub(crate) researches: Table<ResearchRow>,
    pub(crate) research_discipline_relations: Table<ResearchDisciplineRelationRow>,
    pub(crate) research_contents: Table<ResearchContentRow>,
    pub(crate) reviews: Table<ReviewRow>,
    pub(crate) review_votes: Table<ReviewVoteRow>,
    pub(crate) proposals: Table<ProposalRow>,
    pub(crate) proposal_votes: Table<ProposalVoteRow>,
    pub(crate) budgets: Table<BudgetRow>,
    pub(crate) grants: Table<GrantRow>,
    pub(crate) discipline_supplies: Table<DisciplineSupplyRow>,
    pub(crate) research_tokens: Table<ResearchTokenRow>,
    pub(crate) research_token_sales: Table<ResearchTokenSaleRow>,
    pub(crate) contributions: Table<ContributionRow>,
    pub(crate) vesting_contracts: Table<VestingContractRow>,
    pub(crate) nda_contracts: Table<NdaContractRow>,
    pub(crate) assets: Table<AssetRow>,
    pub(crate) reward_pools: Table<RewardPoolRow>,
    pub(crate) virtual_ops: Vec<VirtualOperation>,
}

impl ServiceRegistry {
    pub fn new(clock: BlockClock) -> Self {
        Self {
            clock,
            ..Self::default()
        }
    }

    pub fn genesis() -> Self {
        Self::new(BlockClock::genesis())
    }

    pub fn clock(&self) -> &BlockClock {
        &self.clock
    }

    /// Advance head block number and time by whole blocks.
    pub fn advance_clock(&mut self, blocks: u32) {
        self.clock.advance(blocks);
    }

    /// Record a side effect for observers.
    pub(crate) fn emit(&mut self, op: VirtualOperation) {
        debug!(virtual_op = op.label(), "emitting virtual operation");
        self.virtual_ops.push(op);
    }

    /// Take everything emitted since the last drain, in emission order.
    pub fn drain_virtual_ops(&mut self) -> Vec<VirtualOperation> {
        std::mem::take(&mut self.virtual_ops)
    }

    pub fn accounts(&mut self) -> AccountService<'_> {
        AccountService { reg: self }
    }

    pub fn disciplines(&mut self) -> DisciplineService<'_> {
        DisciplineService { reg: self }
    }

    pub fn expertise(&mut self) -> ExpertiseService<'_> {
        ExpertiseService { reg: self }
    }

    pub fn groups(&mut self) -> GroupService<'_> {
        GroupService { reg: self }
    }

    pub fn researches(&mut self) -> ResearchService<'_> {
        ResearchService { reg: self }
    }

    pub fn contents(&mut self) -> ContentService<'_> {
        ContentService { reg: self }
    }

    pub fn reviews(&mut self) -> ReviewService<'_> {
        ReviewService { reg: self }
    }

    pub fn proposals(&mut self) -> ProposalService<'_> {
        ProposalService { reg: self }
    }

    pub fn funds(&mut self) -> FundService<'_> {
        FundService { reg: self }
    }

    pub fn token_sales(&mut self) -> TokenSaleService<'_> {
        TokenSaleService { reg: self }
    }

    pub fn vesting(&mut self) -> VestingService<'_> {
        VestingService { reg: self }
    }

    pub fn ndas(&mut self) -> NdaService<'_> {
        NdaService { reg: self }
    }

    pub fn assets(&mut self) -> AssetService<'_> {
        AssetService { reg: self }
    }

    pub fn rewards(&mut self) -> RewardService<'_> {
        RewardService { reg: self }
    }
}
