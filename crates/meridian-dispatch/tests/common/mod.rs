#![allow(dead_code)]

use meridian_services::genesis::{self, GenesisAccount, GenesisState};
use meridian_services::ServiceRegistry;
use meridian_types::{Share, SigningKey};
use std::collections::BTreeSet;

/// Registry seeded with accounts whose keys follow the
/// `<name>-{owner,active,posting}` naming of [`GenesisAccount::with_default_keys`].
///
/// Run with `RUST_LOG=meridian=debug` to see the service-level traces.
pub fn registry(accounts: &[(&str, Share)], disciplines: &[&str]) -> ServiceRegistry {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let mut reg = ServiceRegistry::genesis();
    genesis::initialize(
        &mut reg,
        &GenesisState {
            accounts: accounts
                .iter()
                .map(|(name, balance)| GenesisAccount::with_default_keys(name, *balance))
                .collect(),
            disciplines: disciplines.iter().map(|d| d.to_string()).collect(),
        },
    )
    .expect("genesis");
    reg
}

pub fn keys(names: &[&str]) -> BTreeSet<SigningKey> {
    names.iter().map(|n| SigningKey::new(*n)).collect()
}

pub fn active(name: &str) -> BTreeSet<SigningKey> {
    [SigningKey::new(format!("{name}-active"))].into_iter().collect()
}

pub fn posting(name: &str) -> BTreeSet<SigningKey> {
    [SigningKey::new(format!("{name}-posting"))].into_iter().collect()
}
