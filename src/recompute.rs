//! Recompute entry point.
//!
//! [`Recomputer`] ties the engine to its collaborators: check the caller may
//! edit the character, load a snapshot, recompute it. It performs no writes;
//! the caller persists the returned sheet as a whole.

use crate::auth::{EditPermission, UserId};
use crate::engine::Engine;
use crate::error::StatError;
use crate::loader::RecordLoader;
use crate::record::CharacterId;
use crate::resolved::StatSheet;
use tracing::{info, info_span, warn};

/// Authorization, loading and evaluation for one character at a time.
///
/// Calls for different characters are independent and may run in
/// parallel. Serializing calls for the same character is up to the caller.
///
/// # Examples
///
/// ```rust
/// use statsheet::auth::{OwnerOnly, UserId};
/// use statsheet::loader::InMemoryLoader;
/// use statsheet::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
/// use statsheet::{CharacterId, Engine, Recomputer, StatError};
///
/// let hero = CharacterId::new("hero");
/// let loader = InMemoryLoader::new();
/// loader.insert(hero.clone(), CharacterRecords {
///     attributes: vec![StatRecord::new("strength")],
///     effects: vec![EffectRecord::value("strength", Operation::Base, 15.0)],
///     ..Default::default()
/// });
/// let mut owners = OwnerOnly::new();
/// owners.grant(hero.clone(), UserId::new("alice"));
///
/// let recomputer = Recomputer::new(Engine::default(), loader, owners);
/// let sheet = recomputer.recompute(&UserId::new("alice"), &hero).unwrap();
/// assert_eq!(sheet.attribute("strength").unwrap().result, 15.0);
///
/// let denied = recomputer.recompute(&UserId::new("mallory"), &hero);
/// assert!(matches!(denied, Err(StatError::PermissionDenied { .. })));
/// ```
pub struct Recomputer<L, P> {
    engine: Engine,
    loader: L,
    permissions: P,
}

impl<L: RecordLoader, P: EditPermission> Recomputer<L, P> {
    pub fn new(engine: Engine, loader: L, permissions: P) -> Self {
        Self {
            engine,
            loader,
            permissions,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Recompute `character` on behalf of `user`.
    pub fn recompute(&self, user: &UserId, character: &CharacterId) -> Result<StatSheet, StatError> {
        let _span = info_span!("recompute", %character, %user).entered();

        if !self.permissions.can_edit(character, user) {
            warn!("recompute denied");
            return Err(StatError::PermissionDenied {
                character: character.clone(),
            });
        }

        let records = self.loader.load(character)?;
        info!(
            effects = records.effects.len(),
            proficiencies = records.proficiencies.len(),
            "recompute started"
        );
        let run = self.engine.run(&records);
        info!(
            stats = run.sheet.len(),
            poisoned = run.sheet.poisoned().len(),
            cycles = run.graph.cycles().len(),
            "character recomputed"
        );
        Ok(run.sheet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MockEditPermission;
    use crate::loader::MockRecordLoader;
    use crate::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
    use mockall::predicate::eq;

    #[test]
    fn test_denied_never_loads() {
        let mut permissions = MockEditPermission::new();
        permissions.expect_can_edit().times(1).return_const(false);
        let mut loader = MockRecordLoader::new();
        loader.expect_load().never();

        let recomputer = Recomputer::new(Engine::default(), loader, permissions);
        let result = recomputer.recompute(&UserId::new("eve"), &CharacterId::new("hero"));
        assert_eq!(
            result,
            Err(StatError::PermissionDenied {
                character: CharacterId::new("hero")
            })
        );
    }

    #[test]
    fn test_allowed_loads_requested_character() {
        let mut permissions = MockEditPermission::new();
        permissions.expect_can_edit().return_const(true);
        let mut loader = MockRecordLoader::new();
        loader
            .expect_load()
            .with(eq(CharacterId::new("hero")))
            .times(1)
            .returning(|_| {
                Ok(CharacterRecords {
                    attributes: vec![StatRecord::new("constitution")],
                    effects: vec![EffectRecord::value("constitution", Operation::Base, 14.0)],
                    ..Default::default()
                })
            });

        let recomputer = Recomputer::new(Engine::default(), loader, permissions);
        let sheet = recomputer
            .recompute(&UserId::new("alice"), &CharacterId::new("hero"))
            .unwrap();
        assert_eq!(sheet.attribute("constitution").unwrap().modifier, Some(2.0));
    }

    #[test]
    fn test_loader_error_propagates() {
        let mut permissions = MockEditPermission::new();
        permissions.expect_can_edit().return_const(true);
        let mut loader = MockRecordLoader::new();
        loader
            .expect_load()
            .returning(|id| Err(StatError::CharacterNotFound(id.clone())));

        let recomputer = Recomputer::new(Engine::default(), loader, permissions);
        let result = recomputer.recompute(&UserId::new("alice"), &CharacterId::new("ghost"));
        assert!(matches!(result, Err(StatError::CharacterNotFound(_))));
    }
}
