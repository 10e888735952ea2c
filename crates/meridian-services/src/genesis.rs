//! Genesis seeding.
//!
//! Everything else enters the state through operations; genesis is the only
//! other door, and it runs once before the first block.

use crate::rows::AccountRow;
use crate::{ChainError, ServiceRegistry};
use meridian_store::Row;
use meridian_types::{AccountName, Asset, Authority, Share, SigningKey};
use tracing::info;

#[derive(Clone, Debug)]
pub struct GenesisAccount {
    pub name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    /// Initial liquid native balance.
    pub balance: Share,
}

impl GenesisAccount {
    /// Account whose three authorities are single keys named
    /// `<name>-owner`, `<name>-active` and `<name>-posting`.
    pub fn with_default_keys(name: &str, balance: Share) -> Self {
        let name = AccountName::from(name);
        Self {
            owner: Authority::single(SigningKey::new(format!("{name}-owner"))),
            active: Authority::single(SigningKey::new(format!("{name}-active"))),
            posting: Authority::single(SigningKey::new(format!("{name}-posting"))),
            name,
            balance,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GenesisState {
    pub accounts: Vec<GenesisAccount>,
    pub disciplines: Vec<String>,
}

/// Seed accounts and root disciplines into a fresh registry.
pub fn initialize(reg: &mut ServiceRegistry, genesis: &GenesisState) -> Result<(), ChainError> {
    let created_at = reg.clock().head_block_time;
    for account in &genesis.accounts {
        if reg.accounts().exists(&account.name)? {
            return Err(ChainError::already_exists(
                AccountRow::ENTITY,
                account.name.as_str(),
            ));
        }
        reg.accounts.insert(|id| AccountRow {
            id,
            name: account.name.clone(),
            recovery_account: account.name.clone(),
            owner: account.owner.clone(),
            active: account.active.clone(),
            posting: account.posting.clone(),
            balances: Default::default(),
            common_tokens: 0,
            expertise_tokens: 0,
            created_at,
        })?;
        if account.balance > 0 {
            reg.accounts()
                .increase_balance(&account.name, &Asset::native(account.balance))?;
        }
    }
    for name in &genesis.disciplines {
        reg.disciplines().create_discipline(name, None)?;
    }
    info!(
        accounts = genesis.accounts.len(),
        disciplines = genesis.disciplines.len(),
        "genesis state initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_accounts_with_balances_and_disciplines() {
        let mut reg = ServiceRegistry::genesis();
        initialize(
            &mut reg,
            &GenesisState {
                accounts: vec![
                    GenesisAccount::with_default_keys("alice", 500),
                    GenesisAccount::with_default_keys("bob", 0),
                ],
                disciplines: vec!["physics".to_owned(), "biology".to_owned()],
            },
        )
        .unwrap();

        let alice = AccountName::from("alice");
        assert_eq!(
            reg.accounts()
                .balance(&alice, &meridian_types::config::native_symbol()).unwrap(),
            500
        );
        assert!(reg.disciplines().get_by_name("biology").is_ok());
    }

    #[test]
    fn duplicate_genesis_account_is_rejected() {
        let mut reg = ServiceRegistry::genesis();
        let state = GenesisState {
            accounts: vec![
                GenesisAccount::with_default_keys("alice", 0),
                GenesisAccount::with_default_keys("alice", 0),
            ],
            disciplines: vec![],
        };
        assert!(initialize(&mut reg, &state).is_err());
    }
}
