//! # Container Fetch State
//!
//! Whether a container's rendered children are known to match the remote
//! node, and whether a children fetch is in flight.
//!
//! | state | event | next | effect |
//! |---|---|---|---|
//! | `Clean`, `Dirty` | `Invalidate` | `Dirty` | |
//! | `FetchPending(t)` | `Invalidate` | `FetchPendingDirty(t)` | |
//! | `Dirty` | `Settle` | `Clean` | |
//! | `Dirty` | `Issue(t)` | `FetchPending(t)` | |
//! | `FetchPending(t)` | `Complete(t)` | `Clean` | `Render` |
//! | `FetchPendingDirty(t)` | `Complete(t)` | `Dirty` | `Refetch` |
//!
//! A fetch failure from either pending state goes back to `Dirty` with
//! [`FetchEffect::Abandon`]; the next refresh retries. Completions for a
//! ticket the container is not waiting on are discarded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of one children fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FetchTicket(pub u64);

impl fmt::Display for FetchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fetch#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    Clean,
    #[default]
    Dirty,
    FetchPending(FetchTicket),
    /// Invalidated while the fetch was in flight
    FetchPendingDirty(FetchTicket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEvent {
    /// The remote children changed
    Invalidate,
    /// Children are known without fetching (the node has none)
    Settle,
    Issue(FetchTicket),
    Complete(FetchTicket),
    Fail(FetchTicket),
}

/// What the mirror has to do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchEffect {
    None,
    /// Render the fetched window
    Render,
    /// Drop the stale window and fetch again
    Refetch,
    /// Ignore the event
    Discard,
    /// Keep the last rendered children
    Abandon,
}

impl FetchState {
    pub fn transition(self, event: FetchEvent) -> (FetchState, FetchEffect) {
        use FetchEffect as E;
        use FetchEvent as Ev;
        use FetchState as S;

        match (self, event) {
            (S::Clean | S::Dirty, Ev::Invalidate) => (S::Dirty, E::None),
            (S::FetchPending(t) | S::FetchPendingDirty(t), Ev::Invalidate) => {
                (S::FetchPendingDirty(t), E::None)
            }

            (S::Clean | S::Dirty, Ev::Settle) => (S::Clean, E::None),

            (S::Clean | S::Dirty, Ev::Issue(t)) => (S::FetchPending(t), E::None),

            (S::FetchPending(t), Ev::Complete(c)) if t == c => (S::Clean, E::Render),
            (S::FetchPendingDirty(t), Ev::Complete(c)) if t == c => (S::Dirty, E::Refetch),

            (S::FetchPending(t) | S::FetchPendingDirty(t), Ev::Fail(c)) if t == c => {
                (S::Dirty, E::Abandon)
            }

            (state, _) => (state, E::Discard),
        }
    }

    /// Children must be fetched again before they can be trusted
    pub fn is_dirty(&self) -> bool {
        matches!(self, FetchState::Dirty | FetchState::FetchPendingDirty(_))
    }

    pub fn pending(&self) -> Option<FetchTicket> {
        match self {
            FetchState::FetchPending(t) | FetchState::FetchPendingDirty(t) => Some(*t),
            FetchState::Clean | FetchState::Dirty => None,
        }
    }
}
