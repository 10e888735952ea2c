//! Typed object ids.
//!
//! Every entity family gets its own id newtype so a `ResearchId` can never
//! be passed where a `DisciplineId` is expected. The inner value is the
//! table-assigned sequential id.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! object_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

object_id!(DisciplineId);
object_id!(ExpertTokenId);
object_id!(ResearchGroupId);
object_id!(ResearchGroupTokenId);
object_id!(ResearchGroupInviteId);
object_id!(ResearchGroupJoinRequestId);
object_id!(ResearchId);
object_id!(ResearchDisciplineRelationId);
object_id!(ResearchContentId);
object_id!(ReviewId);
object_id!(ReviewVoteId);
object_id!(ProposalId);
object_id!(ProposalVoteId);
object_id!(BudgetId);
object_id!(GrantId);
object_id!(DisciplineSupplyId);
object_id!(ResearchTokenId);
object_id!(ResearchTokenSaleId);
object_id!(ContributionId);
object_id!(VestingContractId);
object_id!(NdaContractId);
object_id!(AssetId);
object_id!(RewardPoolId);
object_id!(AccountId);

/// Account name, the human-facing unique key of an account row.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountName(pub String);

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Chain account names: 3..=24 chars, lowercase alphanumeric plus `-`
    /// and `.`, starting with a letter.
    pub fn is_valid(&self) -> bool {
        let name = &self.0;
        if name.len() < 3 || name.len() > 24 {
            return false;
        }
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            _ => return false,
        }
        name.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_name_validation() {
        assert!(AccountName::from("alice").is_valid());
        assert!(AccountName::from("alice-2.lab").is_valid());
        assert!(!AccountName::from("al").is_valid());
        assert!(!AccountName::from("9alice").is_valid());
        assert!(!AccountName::from("Alice").is_valid());
    }

    #[test]
    fn ids_are_transparent_in_json() {
        let id = ResearchId(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }
}
