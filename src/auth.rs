//! Authorization boundary.
//!
//! Whether a user may recompute a character is decided outside the engine.
//! [`crate::Recomputer`] asks an [`EditPermission`] first and never loads or
//! evaluates anything when it says no.

use crate::record::CharacterId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Identifier of the user asking for a recompute.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides whether a user may edit (and so recompute) a character.
#[cfg_attr(test, mockall::automock)]
pub trait EditPermission: Send + Sync {
    fn can_edit(&self, character: &CharacterId, user: &UserId) -> bool;
}

/// Permits everything. For trusted callers such as batch jobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl EditPermission for AllowAll {
    fn can_edit(&self, _character: &CharacterId, _user: &UserId) -> bool {
        true
    }
}

/// Permits only users registered as editors of a character.
///
/// # Examples
///
/// ```rust
/// use statsheet::auth::{EditPermission, OwnerOnly, UserId};
/// use statsheet::CharacterId;
///
/// let mut policy = OwnerOnly::new();
/// let hero = CharacterId::new("hero");
/// policy.grant(hero.clone(), UserId::new("alice"));
///
/// assert!(policy.can_edit(&hero, &UserId::new("alice")));
/// assert!(!policy.can_edit(&hero, &UserId::new("bob")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct OwnerOnly {
    editors: HashMap<CharacterId, HashSet<UserId>>,
}

impl OwnerOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, character: CharacterId, user: UserId) {
        self.editors.entry(character).or_default().insert(user);
    }

    pub fn revoke(&mut self, character: &CharacterId, user: &UserId) {
        if let Some(users) = self.editors.get_mut(character) {
            users.remove(user);
        }
    }
}

impl EditPermission for OwnerOnly {
    fn can_edit(&self, character: &CharacterId, user: &UserId) -> bool {
        self.editors
            .get(character)
            .map(|users| users.contains(user))
            .unwrap_or(false)
    }
}
