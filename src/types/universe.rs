//! Universe numbering across the wire and API layers

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 1-indexed universe number as used by the lighting server's GraphQL API.
///
/// Art-Net numbers universes from 0 on the wire while the API numbers the same
/// physical universe from 1. All conversions between the two go through this
/// type so the offset is applied in exactly one place.
///
/// ```rust
/// use lightcheck::ApiUniverse;
///
/// let api = ApiUniverse::new(1).unwrap();
/// assert_eq!(api.wire(), 0);
/// assert_eq!(ApiUniverse::from_wire(0), Some(api));
/// assert!(ApiUniverse::new(0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct ApiUniverse(u16);

impl ApiUniverse {
    /// Create an API universe; `0` is not a valid API universe.
    pub fn new(universe: u16) -> Option<Self> {
        (universe != 0).then_some(Self(universe))
    }

    /// Convert a 0-indexed wire universe into its API number.
    pub fn from_wire(wire: u16) -> Option<Self> {
        wire.checked_add(1).map(Self)
    }

    /// The 1-indexed API number.
    pub fn get(self) -> u16 {
        self.0
    }

    /// The 0-indexed wire universe carried in Art-Net packets.
    pub fn wire(self) -> u16 {
        self.0 - 1
    }
}

impl fmt::Display for ApiUniverse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "universe {} (wire {})", self.0, self.wire())
    }
}

impl TryFrom<u16> for ApiUniverse {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "API universes start at 1".to_string())
    }
}

impl From<ApiUniverse> for u16 {
    fn from(universe: ApiUniverse) -> Self {
        universe.0
    }
}
