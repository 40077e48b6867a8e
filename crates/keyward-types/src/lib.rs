//! Shared vocabulary for Keyward.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identifiers** ([`SessionId`], [`Principal`], [`RoleId`]): opaque
//!   newtypes that can't be mixed up with each other.
//! - **Identity** ([`Identity`]): who a caller turned out to be after
//!   authentication, plus what they were granted.
//! - **Authorization** ([`Permission`], [`Action`], [`Vote`]): what a caller
//!   wants to do and how modules weigh in on it.
//!
//! # Architecture
//!
//! ```text
//! Authentication (keyward-authc) ──→ Identity ──→ Authorization (keyward-authz)
//!                                       │
//!                                       ▼
//!                         Session lifecycle (keyward-session)
//! ```
//!
//! Nothing here performs I/O or holds locks. Everything is a plain value.

mod id;
mod identity;
mod permission;
mod vote;

pub use id::{Principal, RoleId, SessionId};
pub use identity::Identity;
pub use permission::{Action, NamedPermission, Permission};
pub use vote::Vote;
