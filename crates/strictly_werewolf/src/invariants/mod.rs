//! Properties of a werewolf table that hold after every transition.
//!
//! Each invariant is a zero-sized type so a whole set can be named as a
//! tuple and checked without allocating unless something is broken.

use derive_more::Display;

/// A property a state of type `S` must satisfy.
pub trait Invariant<S> {
    /// True when `state` satisfies the property.
    fn holds(state: &S) -> bool;

    /// What the property promises, phrased as a statement.
    fn description() -> &'static str;
}

/// A broken property, carrying its statement.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{description}")]
pub struct InvariantViolation {
    /// The statement that no longer holds.
    pub description: String,
}

impl InvariantViolation {
    /// Wraps a statement.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Several invariants checked in one pass.
pub trait InvariantSet<S> {
    /// Every violated statement, in declaration order.
    fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>>;
}

macro_rules! invariant_tuple {
    ($($name:ident),+) => {
        impl<S, $($name: Invariant<S>),+> InvariantSet<S> for ($($name,)+) {
            fn check_all(state: &S) -> Result<(), Vec<InvariantViolation>> {
                let broken: Vec<InvariantViolation> = [
                    $((<$name as Invariant<S>>::holds(state), <$name as Invariant<S>>::description())),+
                ]
                .into_iter()
                .filter(|(held, _)| !held)
                .map(|(_, text)| InvariantViolation::new(text))
                .collect();
                if broken.is_empty() { Ok(()) } else { Err(broken) }
            }
        }
    };
}

invariant_tuple!(A);
invariant_tuple!(A, B);
invariant_tuple!(A, B, C);
invariant_tuple!(A, B, C, D);

pub mod dead_list;
pub mod role_count;
pub mod vote_ledger;
pub mod winner_consistent;

pub use dead_list::DeadListConsistentInvariant;
pub use role_count::RoleCountInvariant;
pub use vote_ledger::VoteLedgerInvariant;
pub use winner_consistent::WinnerConsistentInvariant;

/// Everything the engine checks after a transition.
pub type WerewolfInvariants = (
    DeadListConsistentInvariant,
    WinnerConsistentInvariant,
    VoteLedgerInvariant,
    RoleCountInvariant,
);
