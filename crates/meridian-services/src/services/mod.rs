//! One service per entity family. Services are thin accessors constructed
//! only by [`crate::ServiceRegistry`]; evaluators and the block driver call
//! them instead of touching tables, so every precondition is asserted on
//! the single mutation path.

mod accounts;
mod assets;
mod contents;
mod disciplines;
mod executor;
mod expertise;
mod funds;
mod groups;
mod ndas;
mod proposals;
mod researches;
mod reviews;
mod rewards;
mod token_sales;
mod vesting;

pub use accounts::AccountService;
pub use assets::AssetService;
pub use contents::ContentService;
pub use disciplines::DisciplineService;
pub use expertise::ExpertiseService;
pub use funds::FundService;
pub use groups::GroupService;
pub use ndas::NdaService;
pub use proposals::ProposalService;
pub use researches::ResearchService;
pub use reviews::ReviewService;
pub use rewards::RewardService;
pub use token_sales::TokenSaleService;
pub use vesting::VestingService;
