//! Pure hunt-session engine: identity resolution, interest-weighted
//! challenge selection, completion-ledger derivations, and step gating.
//! No I/O lives here; the API crate feeds this from its store.

pub mod identity;
pub mod ledger;
pub mod progression;
pub mod selector;

pub use identity::OwningIdentity;
pub use ledger::{challenge_status, completed_challenge_ids, leaderboard, CompletionStatus};
pub use progression::{derive_steps, Step, StepCursor, StepStatus};
pub use selector::select;
