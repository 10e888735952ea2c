use crate::rows::{NdaContractRow, NdaStatus};
use crate::{ChainError, ServiceRegistry};
use chrono::{DateTime, Utc};
use meridian_store::key;
use meridian_types::{AccountName, NdaContractId, ResearchGroupId};
use tracing::info;

pub struct NdaService<'a> {
    pub(crate) reg: &'a mut ServiceRegistry,
}

impl NdaService<'_> {
    pub fn get(&self, id: NdaContractId) -> Result<NdaContractRow, ChainError> {
        Ok(self.reg.nda_contracts.get(id)?.clone())
    }

    pub fn contracts_of_party(
        &self,
        party: &AccountName,
    ) -> Result<Vec<NdaContractRow>, ChainError> {
        Ok(self
            .reg
            .nda_contracts
            .range_prefix("by_party", &key![party.as_str()])?
            .cloned()
            .collect())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn create_contract(
        &mut self,
        creator: &AccountName,
        party_a: &AccountName,
        party_a_group: ResearchGroupId,
        party_b: &AccountName,
        party_b_group: ResearchGroupId,
        title: &str,
        contract_hash: &str,
        start_date: Option<DateTime<Utc>>,
        end_date: DateTime<Utc>,
    ) -> Result<NdaContractId, ChainError> {
        self.reg.accounts().check_existence(party_a)?;
        self.reg.accounts().check_existence(party_b)?;
        self.reg.groups.get(party_a_group)?;
        self.reg.groups.get(party_b_group)?;
        if creator != party_a && creator != party_b {
            return Err(ChainError::InvalidState("NDA creator must be one of the parties"));
        }
        let now = self.reg.clock.head_block_time;
        let start = start_date.unwrap_or(now);
        if end_date <= start || end_date <= now {
            return Err(ChainError::WindowViolation("NDA window has already closed"));
        }

        let id = self.reg.nda_contracts.insert(|id| NdaContractRow {
            id,
            creator: creator.clone(),
            party_a: party_a.clone(),
            party_a_research_group_id: party_a_group,
            party_b: party_b.clone(),
            party_b_research_group_id: party_b_group,
            title: title.to_owned(),
            contract_hash: contract_hash.to_owned(),
            start_date: start,
            end_date,
            status: NdaStatus::Pending,
            signatures: Default::default(),
        })?;
        info!(contract = id.0, party_a = %party_a, party_b = %party_b, "NDA contract created");
        Ok(id)
    }

    /// Record a party's signature. Party A signs first; the contract
    /// becomes `Signed` once both have signed.
    pub fn sign(
        &mut self,
        id: NdaContractId,
        signee: &AccountName,
        signature: &str,
    ) -> Result<(), ChainError> {
        let contract = self.get(id)?;
        if contract.status != NdaStatus::Pending {
            return Err(ChainError::InvalidState("NDA contract is not pending"));
        }
        if signee != &contract.party_a && signee != &contract.party_b {
            return Err(ChainError::InvalidState("signee is not a party to this NDA"));
        }
        if contract.signatures.contains_key(signee) {
            return Err(ChainError::InvalidState("party has already signed"));
        }
        if signee == &contract.party_b && !contract.signatures.contains_key(&contract.party_a) {
            return Err(ChainError::InvalidState("party A must sign before party B"));
        }

        let both_signed = signee == &contract.party_b;
        let signee = signee.clone();
        let signature = signature.to_owned();
        self.reg.nda_contracts.update(id, move |row| {
            row.signatures.insert(signee, signature);
            if both_signed {
                row.status = NdaStatus::Signed;
            }
        })?;
        Ok(())
    }

    /// Either party may decline while the contract is pending.
    pub fn decline(&mut self, id: NdaContractId, signee: &AccountName) -> Result<(), ChainError> {
        let contract = self.get(id)?;
        if contract.status != NdaStatus::Pending {
            return Err(ChainError::InvalidState("NDA contract is not pending"));
        }
        if signee != &contract.party_a && signee != &contract.party_b {
            return Err(ChainError::InvalidState("signee is not a party to this NDA"));
        }
        self.reg
            .nda_contracts
            .update(id, |row| row.status = NdaStatus::Declined)?;
        info!(contract = id.0, party = %signee, "NDA contract declined");
        Ok(())
    }

    /// Expire non-terminal contracts whose end date has passed, then
    /// activate signed contracts whose window has opened. Expiry runs
    /// first so a signed contract that is already past its end never
    /// activates.
    pub fn process_windows(&mut self, now: DateTime<Utc>) -> Result<usize, ChainError> {
        let due: Vec<_> = self
            .reg
            .nda_contracts
            .range_prefix("by_end_date", &key![false])?
            .take_while(|c| c.end_date <= now)
            .map(|c| c.id)
            .collect();
        for id in &due {
            self.reg
                .nda_contracts
                .update(*id, |row| row.status = NdaStatus::Expired)?;
        }
        let opened: Vec<_> = self
            .reg
            .nda_contracts
            .range_prefix("by_signed_start", &key![true])?
            .take_while(|c| c.start_date <= now)
            .map(|c| c.id)
            .collect();
        for id in &opened {
            self.reg
                .nda_contracts
                .update(*id, |row| row.status = NdaStatus::Active)?;
        }
        Ok(due.len() + opened.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{registry_with_accounts, ALICE, BOB};
    use chrono::Duration;
    use meridian_types::Percent;

    fn nda_fixture() -> (ServiceRegistry, AccountName, AccountName, NdaContractId) {
        let mut reg = registry_with_accounts(&[(ALICE, 100), (BOB, 100)]);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        let group_a = reg
            .groups()
            .create_group(&alice, "lab-a", "", Percent::from_whole(50), 100)
            .unwrap();
        let group_b = reg
            .groups()
            .create_group(&bob, "lab-b", "", Percent::from_whole(50), 100)
            .unwrap();
        let end = reg.clock().head_block_time + Duration::days(30);
        let id = reg
            .ndas()
            .create_contract(&alice, &alice, group_a, &bob, group_b, "NDA", "hash", None, end)
            .unwrap();
        (reg, alice, bob, id)
    }

    #[test]
    fn party_order_is_enforced() {
        let (mut reg, alice, bob, id) = nda_fixture();
        let err = reg.ndas().sign(id, &bob, "sig-b").unwrap_err();
        assert!(matches!(err, ChainError::InvalidState(_)));

        reg.ndas().sign(id, &alice, "sig-a").unwrap();
        reg.ndas().sign(id, &bob, "sig-b").unwrap();
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Signed);
    }

    #[test]
    fn decline_while_pending_only() {
        let (mut reg, alice, bob, id) = nda_fixture();
        reg.ndas().sign(id, &alice, "sig-a").unwrap();
        reg.ndas().decline(id, &bob).unwrap();
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Declined);

        let err = reg.ndas().sign(id, &bob, "sig-b").unwrap_err();
        assert!(matches!(err, ChainError::InvalidState(_)));
    }

    #[test]
    fn signed_contract_activates_when_its_window_opens() {
        let mut reg = registry_with_accounts(&[(ALICE, 100), (BOB, 100)]);
        let alice = AccountName::from(ALICE);
        let bob = AccountName::from(BOB);
        let group_a = reg
            .groups()
            .create_group(&alice, "lab-a", "", Percent::from_whole(50), 100)
            .unwrap();
        let group_b = reg
            .groups()
            .create_group(&bob, "lab-b", "", Percent::from_whole(50), 100)
            .unwrap();
        let now = reg.clock().head_block_time;
        let start = now + Duration::days(10);
        let end = now + Duration::days(30);
        let id = reg
            .ndas()
            .create_contract(
                &alice,
                &alice,
                group_a,
                &bob,
                group_b,
                "NDA",
                "hash",
                Some(start),
                end,
            )
            .unwrap();
        reg.ndas().sign(id, &alice, "sig-a").unwrap();
        reg.ndas().sign(id, &bob, "sig-b").unwrap();

        // fully signed but the window has not opened yet
        reg.ndas().process_windows(now + Duration::days(5)).unwrap();
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Signed);

        let processed = reg.ndas().process_windows(start).unwrap();
        assert_eq!(processed, 1);
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Active);

        reg.ndas().process_windows(end).unwrap();
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Expired);
    }

    #[test]
    fn window_processing_expires_pending_contracts() {
        let (mut reg, _alice, _bob, id) = nda_fixture();
        let end = reg.ndas().get(id).unwrap().end_date;
        let expired = reg.ndas().process_windows(end).unwrap();
        assert_eq!(expired, 1);
        assert_eq!(reg.ndas().get(id).unwrap().status, NdaStatus::Expired);
    }
}
