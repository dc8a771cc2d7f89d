//! Stat identifier module.
//!
//! Provides the `StatId` type, an interned stat name. Uses `Arc<str>` so
//! names can be shared between the stat graph, the dependency graph and the
//! resolved sheet without copying.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Interned string identifier for stats.
///
/// A `StatId` keeps the spelling it was created with. Lookups inside the
/// engine go through [`StatId::key`], which folds case, so `Strength` and
/// `strength` name the same stat.
///
/// # Examples
///
/// ```rust
/// use statsheet::StatId;
///
/// let dex = StatId::new("dexterity");
/// let dex2: StatId = "dexterity".into();
/// assert_eq!(dex, dex2);
///
/// let carry = StatId::new("carryMultiplier");
/// assert_eq!(carry.key(), "carrymultiplier");
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatId(Arc<str>);

impl Serialize for StatId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StatId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(StatId::from(s))
    }
}

impl StatId {
    /// Create a new `StatId` from a string slice.
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this `StatId`, as originally spelled.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The case-folded lookup key for this name.
    pub fn key(&self) -> String {
        fold(&self.0)
    }

    /// Whether this name matches `other` ignoring case.
    pub fn matches(&self, other: &str) -> bool {
        fold(&self.0) == fold(other)
    }
}

/// Case-fold a stat, class or formula identifier for lookup.
pub(crate) fn fold(name: &str) -> String {
    name.to_lowercase()
}

impl From<&str> for StatId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StatId {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl std::fmt::Display for StatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
