//! Vote-based authorization for Keyward.
//!
//! An [`AuthorizationEngine`] holds an ordered list of
//! [`AuthorizationModule`]s. To decide whether an identity may perform an
//! action, it asks every module for a [`Vote`](keyward_types::Vote) and lets
//! a [`VoteStrategy`] aggregate them:
//!
//! ```text
//! (identity, action) ──→ RoleModule ───────→ Abstain ─┐
//!                    ├─→ PermissionModule ─→ Grant ───┼─→ VetoStrategy ─→ true
//!                    └─→ custom closure ──→ Abstain ─┘
//! ```
//!
//! The default [`VetoStrategy`] is fail-closed: any deny wins, and without
//! at least one grant the answer is no.

mod engine;
mod module;
mod strategy;

pub use engine::AuthorizationEngine;
pub use module::{AuthorizationModule, PermissionModule, RoleModule};
pub use strategy::{
    Ballot, MajorityStrategy, UnanimousStrategy, VetoStrategy, VoteStrategy,
    VoteTally,
};
