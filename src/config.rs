//! Strategies for seeding consensus and local variables before the first
//! ADMM iteration.
//!
//! Registered as a solver option the same way this workspace registers its
//! mu-update and step-size strategies elsewhere: a small `FromStr` enum that
//! implements [`crate::OptionTrait`] by hand, rather than going through
//! [`macros::build_option_enum`] (that macro builds trait-object dispatch
//! tables for strategies with their own state; these three policies are one
//! `match` each in [`crate::term_store::TermStore`], nothing to dispatch).

use std::str::FromStr;

/// How to populate the consensus (`z`) and local (`x`) arrays before
/// iteration 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialValue {
    /// Every variable starts at `0.0`.
    #[default]
    Zero,
    /// Every variable is drawn independently and uniformly from `[0, 1]`,
    /// using the reasoner's seeded RNG.
    Random,
    /// Every variable starts at its current value in the backing
    /// [`crate::atom_store::AtomValues`] store (a warm start).
    Atom,
}

impl FromStr for InitialValue {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zero" => Ok(Self::Zero),
            "random" => Ok(Self::Random),
            "atom" => Ok(Self::Atom),
            _ => Err("expected one of: zero, random, atom"),
        }
    }
}

impl crate::OptionTrait for InitialValue {}
