//! Client-side status polling.
//!
//! Reconstructs a four-step visual state machine from the single
//! progress percentage the status endpoint reports, detects terminal
//! states, and owns its own cancellation. The demo fallback for an
//! unreachable server lives here and only here — the server-side
//! pipeline can never produce demo content.

pub mod state;
pub mod fallback;
pub mod poller;

pub use state::*;
pub use fallback::*;
pub use poller::*;
