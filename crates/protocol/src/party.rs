use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use crate::{Error, Result};

/// Opaque stable public identifier for a party.
///
/// Identities are a string of decimal digits, interpreted as a
/// big integer purely for sorting (see [`PartyDescriptor::index`]).
/// Identities are globally unique and known out-of-band, via
/// configuration and the handshake exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyIdentity(String);

impl PartyIdentity {
    /// Create a new party identity, validating it is a decimal integer.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidPartyIdentity(id));
        }
        Ok(Self(id))
    }

    /// The raw decimal-digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret this identity as a big integer, used for the
    /// canonical deterministic party ordering.
    fn as_big_uint(&self) -> BigUint {
        // Validated at construction time, so this cannot fail.
        BigUint::from_str(&self.0).expect("validated decimal identity")
    }
}

impl FromStr for PartyIdentity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl std::fmt::Display for PartyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialOrd for PartyIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PartyIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_big_uint().cmp(&other.as_big_uint())
    }
}

/// A party participating in one session, frozen for the session's
/// duration.
///
/// The `index` is the party's 0-based rank after sorting all known
/// parties (including the local one) by the big-integer interpretation
/// of their identity. This ordering is canonical: every node computes
/// the same `sorted_parties` given the same membership, so indices
/// agree across the network without further negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyDescriptor {
    /// Stable identity of the party.
    pub id: PartyIdentity,
    /// Human-readable moniker, always `"moniker_" + id`.
    pub moniker: String,
    /// 0-based rank after canonical sort.
    pub index: usize,
}

impl PartyDescriptor {
    /// Build the sorted, indexed descriptor list for a set of
    /// identities. `local_id` must be present in `ids` or this
    /// returns [`Error::LocalNotInSet`].
    pub fn sorted_parties(
        ids: impl IntoIterator<Item = PartyIdentity>,
        local_id: &PartyIdentity,
    ) -> Result<Vec<PartyDescriptor>> {
        let mut ids: Vec<PartyIdentity> = ids.into_iter().collect();
        if !ids.contains(local_id) {
            return Err(Error::LocalNotInSet);
        }
        ids.sort();
        ids.dedup();
        Ok(ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| {
                let moniker = format!("moniker_{id}");
                PartyDescriptor { id, moniker, index }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PartyIdentity {
        PartyIdentity::new(s).unwrap()
    }

    #[test]
    fn sorts_by_big_integer_not_lexicographic() {
        // Lexicographically "9" > "10", but numerically 9 < 10.
        let parties = PartyDescriptor::sorted_parties(
            vec![id("10"), id("9"), id("2")],
            &id("9"),
        )
        .unwrap();
        let ordered: Vec<_> =
            parties.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ordered, vec!["2", "9", "10"]);
        assert_eq!(
            parties.iter().find(|p| p.id == id("9")).unwrap().index,
            1
        );
    }

    #[test]
    fn deterministic_for_any_permutation() {
        let a = PartyDescriptor::sorted_parties(
            vec![id("3"), id("1"), id("2")],
            &id("1"),
        )
        .unwrap();
        let b = PartyDescriptor::sorted_parties(
            vec![id("1"), id("2"), id("3")],
            &id("1"),
        )
        .unwrap();
        let c = PartyDescriptor::sorted_parties(
            vec![id("2"), id("3"), id("1")],
            &id("1"),
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn moniker_is_derived_from_id() {
        let parties =
            PartyDescriptor::sorted_parties(vec![id("42")], &id("42"))
                .unwrap();
        assert_eq!(parties[0].moniker, "moniker_42");
    }

    #[test]
    fn local_not_in_set_is_rejected() {
        let err = PartyDescriptor::sorted_parties(
            vec![id("1"), id("2")],
            &id("99"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::LocalNotInSet));
    }
}
