//! Province name handling.
//!
//! [`normalize_name`] strips accents and case from free text.
//! [`ProvinceAliases`] maps normalized variants onto a [`CanonicalKey`],
//! the join key shared by the geometry, trip and population datasets.

mod aliases;
mod normalize;

pub use aliases::ProvinceAliases;
pub use normalize::{normalize_name, normalize_value};

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized, lower-case, accent-free province identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(pub(crate) String);

impl CanonicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}
