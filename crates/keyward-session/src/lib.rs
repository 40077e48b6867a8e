//! Session lifecycle management for Keyward.
//!
//! This crate owns everything about a session between "started" and
//! "gone":
//!
//! 1. **Records** ([`Session`]) with timestamps, host, attributes, and state
//! 2. **Persistence** through the pluggable [`SessionStore`] contract
//! 3. **Lifecycle** ([`SessionManager`]): start, touch, attributes, stop,
//!    and lazy idle-timeout validation on every access
//! 4. **Creation** through a replaceable [`SessionFactory`]
//! 5. **Notifications** to [`SessionListener`]s, with failure isolation
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (keyward)            ← logs in, then binds an identity to a session
//!     ↕
//! Validation scheduler        ← calls validate_sessions() on an interval
//!     ↕
//! Session Layer (this crate)  ← owns session state and expiration
//!     ↕
//! SessionStore (host-provided)
//! ```

mod clock;
mod error;
mod factory;
mod listener;
mod manager;
mod session;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{SessionError, StoreError};
pub use factory::{RandomIdFactory, SessionFactory};
pub use listener::{
    DispatchReport, ListenerError, ListenerFailure, ListenerId,
    ListenerRegistry, SessionEvent, SessionListener,
};
pub use manager::SessionManager;
pub use session::{Session, SessionConfig, SessionInit, SessionState};
pub use store::{MemorySessionStore, SessionStore};
