//! Turning a list of votes into one decision.
//!
//! The engine collects every module's vote first and then hands the whole
//! list, as [`Ballot`]s naming the module behind each vote, to a
//! [`VoteStrategy`] together with the identity and action being decided.
//! The stock strategies only count votes, so for them the answer never
//! depends on the order the modules ran in. A custom strategy may weight
//! modules by name or vary its policy by action.

use std::fmt;

use keyward_types::{Action, Identity, Vote};

/// One module's vote, labelled with the module's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot<'a> {
    pub module: &'a str,
    pub vote: Vote,
}

impl<'a> Ballot<'a> {
    pub fn new(module: &'a str, vote: Vote) -> Self {
        Self { module, vote }
    }
}

/// Vote counts for one decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub grants: usize,
    pub denies: usize,
    pub abstains: usize,
}

impl VoteTally {
    pub fn of(votes: impl IntoIterator<Item = Vote>) -> Self {
        votes.into_iter().fold(Self::default(), |mut t, vote| {
            match vote {
                Vote::Grant => t.grants += 1,
                Vote::Deny => t.denies += 1,
                Vote::Abstain => t.abstains += 1,
            }
            t
        })
    }

    pub fn of_ballots(ballots: &[Ballot<'_>]) -> Self {
        Self::of(ballots.iter().map(|b| b.vote))
    }

    pub fn total(&self) -> usize {
        self.grants + self.denies + self.abstains
    }
}

impl fmt::Display for VoteTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} grant / {} deny / {} abstain",
            self.grants, self.denies, self.abstains
        )
    }
}

/// An aggregation policy over module votes.
pub trait VoteStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// `true` to authorize `action` for `identity`.
    ///
    /// `ballots` is in module registration order and is empty when no
    /// modules are registered.
    fn decide(
        &self,
        identity: &Identity,
        action: &Action,
        ballots: &[Ballot<'_>],
    ) -> bool;
}

/// Any deny vetoes; otherwise at least one grant is required.
///
/// Abstentions are ignored. No modules, or only abstentions, means denied.
/// This is the engine's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct VetoStrategy;

impl VoteStrategy for VetoStrategy {
    fn name(&self) -> &str {
        "veto"
    }

    fn decide(&self, _: &Identity, _: &Action, ballots: &[Ballot<'_>]) -> bool {
        let tally = VoteTally::of_ballots(ballots);
        tally.denies == 0 && tally.grants > 0
    }
}

/// More grants than denies, with at least one grant. Abstentions are
/// ignored and a tie is a denial.
#[derive(Debug, Clone, Copy, Default)]
pub struct MajorityStrategy;

impl VoteStrategy for MajorityStrategy {
    fn name(&self) -> &str {
        "majority"
    }

    fn decide(&self, _: &Identity, _: &Action, ballots: &[Ballot<'_>]) -> bool {
        let tally = VoteTally::of_ballots(ballots);
        tally.grants > tally.denies
    }
}

/// Every module must grant. A single abstention is enough to deny, and so
/// is having no modules at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnanimousStrategy;

impl VoteStrategy for UnanimousStrategy {
    fn name(&self) -> &str {
        "unanimous"
    }

    fn decide(&self, _: &Identity, _: &Action, ballots: &[Ballot<'_>]) -> bool {
        !ballots.is_empty() && ballots.iter().all(|b| b.vote == Vote::Grant)
    }
}
