//! End-of-block driver scenarios: fund drips, token sale settlement and
//! vesting, driven block by block through `run_blocks`.

mod common;

use anyhow::Result;
use common::{active, registry};
use meridian_dispatch::{apply_operation, block};
use meridian_protocol::{Operation, ProposalAction, TokenSaleStatus, VirtualOperation};
use meridian_types::config::native_symbol;
use meridian_types::{
    AccountName, Asset, GrantId, Percent, ProposalId, ResearchTokenSaleId, VestingContractId,
};

#[test]
fn grant_drips_per_block_and_erases_at_zero() -> Result<()> {
    let mut reg = registry(&[("alice", 1000)], &["physics"]);
    let physics = reg.disciplines().get_by_name("physics")?.id;

    // 100 over blocks 1..4: per_block 33, final block pays the remaining 1
    apply_operation(
        &mut reg,
        &Operation::CreateGrant {
            owner: AccountName::from("alice"),
            balance: Asset::native(100),
            start_block: 1,
            end_block: 4,
            target_discipline: physics,
        },
        &active("alice"),
    )?;

    let emitted = block::run_blocks(&mut reg, 5)?;
    let payouts: Vec<i64> = emitted
        .iter()
        .filter_map(|op| match op {
            VirtualOperation::FundAllocated { amount, .. } => Some(amount.amount),
            _ => None,
        })
        .collect();
    assert_eq!(payouts, vec![33, 33, 33, 1]);

    assert!(reg.funds().get_grant(GrantId(0)).is_err());
    // no active content in the discipline, so the drip parks on it
    assert_eq!(reg.disciplines().get(physics)?.accumulated_reward, 100);
    assert_eq!(
        reg.accounts()
            .balance(&AccountName::from("alice"), &native_symbol()).unwrap(),
        900
    );
    Ok(())
}

#[test]
fn token_sale_settles_through_the_driver() -> Result<()> {
    let mut reg = registry(&[("alice", 1000), ("bob", 1000)], &["physics"]);
    let physics = reg.disciplines().get_by_name("physics")?.id;

    apply_operation(
        &mut reg,
        &Operation::CreateResearchGroup {
            creator: AccountName::from("alice"),
            permlink: "lab".to_owned(),
            description: String::new(),
            quorum: Percent::from_whole(50),
            tokens_amount: 10_000,
        },
        &active("alice"),
    )?;
    let group = reg.groups().get_by_permlink("lab")?.id;
    apply_operation(
        &mut reg,
        &Operation::CreateResearch {
            creator: AccountName::from("alice"),
            research_group_id: group,
            title: "interferometry".to_owned(),
            abstract_: "wiggles".to_owned(),
            permlink: "interferometry".to_owned(),
            review_share: Percent::from_whole(10),
            dropout_compensation: Percent::from_whole(5),
            disciplines: vec![physics],
        },
        &active("alice"),
    )?;
    let research = reg.researches().get_by_permlink("interferometry")?.id;

    let now = reg.clock().head_block_time;
    apply_operation(
        &mut reg,
        &Operation::CreateProposal {
            creator: AccountName::from("alice"),
            research_group_id: group,
            action: ProposalAction::StartTokenSale {
                research_id: research,
                start_time: now,
                end_time: now + chrono::Duration::days(2),
                amount_for_sale: 5_000,
                soft_cap: Asset::native(100),
                hard_cap: Asset::native(400),
            },
            expiration_time: now + chrono::Duration::days(3),
        },
        &active("alice"),
    )?;
    apply_operation(
        &mut reg,
        &Operation::VoteProposal {
            voter: AccountName::from("alice"),
            research_group_id: group,
            proposal_id: ProposalId(0),
        },
        &active("alice"),
    )?;
    let sale = ResearchTokenSaleId(0);
    assert_eq!(
        reg.token_sales().get_sale(sale)?.status,
        TokenSaleStatus::Active
    );

    // hitting the hard cap settles without waiting for the window
    apply_operation(
        &mut reg,
        &Operation::ContributeToTokenSale {
            contributor: AccountName::from("bob"),
            research_token_sale_id: sale,
            amount: Asset::native(500),
        },
        &active("bob"),
    )?;

    reg.advance_clock(1);
    let emitted = block::process_block_end(&mut reg)?;
    assert!(emitted.iter().any(|op| matches!(
        op,
        VirtualOperation::TokenSaleFinished {
            new_status: TokenSaleStatus::Finished,
            ..
        }
    )));

    let bob = AccountName::from("bob");
    assert_eq!(reg.accounts().balance(&bob, &native_symbol()).unwrap(), 600);
    assert_eq!(reg.groups().group_balance(group, &native_symbol()), 400);
    assert_eq!(
        reg.token_sales()
            .find_research_token(&bob, research)?
            .map(|t| t.amount),
        Some(5_000)
    );
    Ok(())
}

#[test]
fn vesting_unlocks_linearly_with_the_clock() -> Result<()> {
    let mut reg = registry(&[("alice", 1000), ("bob", 0)], &[]);
    apply_operation(
        &mut reg,
        &Operation::CreateVestingContract {
            creator: AccountName::from("alice"),
            owner: AccountName::from("bob"),
            balance: Asset::native(900),
            vesting_duration_secs: 900,
            vesting_cliff_secs: 0,
        },
        &active("alice"),
    )?;

    // 100 blocks = 300 seconds = a third of the duration
    block::run_blocks(&mut reg, 100)?;
    let bob = AccountName::from("bob");

    let over = Operation::WithdrawVesting {
        owner: bob.clone(),
        vesting_contract_id: VestingContractId(0),
        amount: Asset::native(301),
    };
    assert!(apply_operation(&mut reg, &over, &active("bob")).is_err());

    apply_operation(
        &mut reg,
        &Operation::WithdrawVesting {
            owner: bob.clone(),
            vesting_contract_id: VestingContractId(0),
            amount: Asset::native(300),
        },
        &active("bob"),
    )?;
    assert_eq!(reg.accounts().balance(&bob, &native_symbol()).unwrap(), 300);

    let emitted = block::run_blocks(&mut reg, 1)?;
    assert!(emitted.iter().any(|op| matches!(
        op,
        VirtualOperation::VestingWithdrawn { amount, .. } if amount.amount == 300
    )));
    Ok(())
}

#[test]
fn expired_proposals_are_swept_in_expiration_order() -> Result<()> {
    let mut reg = registry(&[("alice", 1000)], &[]);
    apply_operation(
        &mut reg,
        &Operation::CreateResearchGroup {
            creator: AccountName::from("alice"),
            permlink: "lab".to_owned(),
            description: String::new(),
            quorum: Percent::from_whole(100),
            tokens_amount: 10_000,
        },
        &active("alice"),
    )?;
    let group = reg.groups().get_by_permlink("lab")?.id;

    let now = reg.clock().head_block_time;
    for (permlink, days) in [("one", 1), ("two", 2)] {
        apply_operation(
            &mut reg,
            &Operation::CreateProposal {
                creator: AccountName::from("alice"),
                research_group_id: group,
                action: ProposalAction::ChangeQuorum {
                    quorum: Percent::from_whole(60),
                },
                expiration_time: now + chrono::Duration::days(days),
            },
            &active("alice"),
        )
        .map_err(|e| anyhow::anyhow!("{permlink}: {e}"))?;
    }

    // a day and a half later only the first proposal is gone
    let blocks = (chrono::Duration::hours(36).num_seconds() / 3) as u32;
    reg.advance_clock(blocks);
    let emitted = block::process_block_end(&mut reg)?;
    let expired: Vec<ProposalId> = emitted
        .iter()
        .filter_map(|op| match op {
            VirtualOperation::ProposalStatusChanged { proposal_id, .. } => Some(*proposal_id),
            _ => None,
        })
        .collect();
    assert_eq!(expired, vec![ProposalId(0)]);
    assert!(reg.proposals().get(ProposalId(0)).is_err());
    assert!(reg.proposals().get(ProposalId(1)).is_ok());
    Ok(())
}
