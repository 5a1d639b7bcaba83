//! Cycle-phase role: which leg is currently accumulating vs releasing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The active leg's direction for the current cycle. `hedge` never appears
/// here — it is a separate, non-flipping leg the coordinator always keeps
/// balanced against `source` and `dest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveRole {
    /// Accumulating inventory on the source venue.
    Source,
    /// Releasing inventory on the destination venue.
    Dest,
}

impl fmt::Display for ActiveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Dest => write!(f, "dest"),
        }
    }
}
