//! Common type definitions for Trellis.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Feature tier of the proxy fleet the configuration is compiled for.
///
/// Certain upstream features (active health checks, slow start, session
/// cookies, request queueing) are only available on the commercial tier.
/// The validator rejects them in [`Tier::Oss`] mode and the compiler only
/// emits them in [`Tier::Commercial`] mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Open-source tier
    #[default]
    Oss,
    /// Commercial tier with dynamic endpoint updates and active health checks
    Commercial,
}

impl Tier {
    /// Returns true for the commercial tier
    pub fn is_commercial(self) -> bool {
        matches!(self, Tier::Commercial)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Oss => write!(f, "oss"),
            Tier::Commercial => write!(f, "commercial"),
        }
    }
}
