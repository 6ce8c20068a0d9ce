//! Session lifecycle.
//!
//! ```text
//!            commit()              engine ok
//!   Open ───────────────▶ Committing ─────────▶ Committed
//!    │  ▲                     │  │
//!    │  └─────────────────────┘  │ fatal engine failure
//!    │   conflict / retryable    ▼
//!    └──────── abort() ──────▶ Aborted
//! ```
//!
//! `Committed` and `Aborted` are terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Accepting staging operations and reads.
    Open,
    /// A commit is in flight; mutations are rejected.
    Committing,
    Committed,
    Aborted,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Open, Committing)
                | (Open, Aborted)
                | (Committing, Committed)
                | (Committing, Open)
                | (Committing, Aborted)
        )
    }

    /// Move to `next`, or hand back the current state if the move is not
    /// allowed.
    pub fn transition(self, next: SessionState) -> Result<SessionState, SessionState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}
