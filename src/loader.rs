//! Record loading.
//!
//! Storage is not the engine's concern. A [`RecordLoader`] hands over one
//! consistent snapshot of a character's records, already filtered to
//! enabled effects and enabled skill/save proficiencies.

use crate::error::StatError;
use crate::record::{CharacterId, CharacterRecords};
use std::collections::HashMap;
use std::io::Read;
use std::sync::RwLock;

/// Source of character records.
#[cfg_attr(test, mockall::automock)]
pub trait RecordLoader: Send + Sync {
    /// Load a snapshot of the character's records.
    fn load(&self, character: &CharacterId) -> Result<CharacterRecords, StatError>;
}

/// Thread-safe in-memory snapshots.
///
/// # Examples
///
/// ```rust
/// use statsheet::loader::{InMemoryLoader, RecordLoader};
/// use statsheet::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
/// use statsheet::CharacterId;
///
/// let loader = InMemoryLoader::new();
/// let id = CharacterId::new("c-1");
/// loader.insert(id.clone(), CharacterRecords {
///     attributes: vec![StatRecord::new("strength")],
///     effects: vec![EffectRecord::value("strength", Operation::Base, 10.0).disabled()],
///     ..Default::default()
/// });
///
/// let records = loader.load(&id).unwrap();
/// assert!(records.effects.is_empty());
/// assert!(loader.load(&CharacterId::new("missing")).is_err());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    snapshots: RwLock<HashMap<CharacterId, CharacterRecords>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or replace a character's records.
    pub fn insert(&self, character: CharacterId, records: CharacterRecords) {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.insert(character, records);
    }

    pub fn remove(&self, character: &CharacterId) -> Option<CharacterRecords> {
        let mut snapshots = self
            .snapshots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        snapshots.remove(character)
    }
}

impl RecordLoader for InMemoryLoader {
    fn load(&self, character: &CharacterId) -> Result<CharacterRecords, StatError> {
        let snapshots = self
            .snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut records = snapshots
            .get(character)
            .cloned()
            .ok_or_else(|| StatError::CharacterNotFound(character.clone()))?;
        records.retain_applicable();
        Ok(records)
    }
}

/// Snapshots read from a JSON document of the form
/// `{ "<character id>": { "attributes": [...], "effects": [...], ... } }`.
#[derive(Debug, Default)]
pub struct JsonLoader {
    inner: InMemoryLoader,
}

impl JsonLoader {
    pub fn from_json_str(json: &str) -> Result<Self, StatError> {
        let snapshots: HashMap<CharacterId, CharacterRecords> =
            serde_json::from_str(json).map_err(|e| StatError::Load(e.to_string()))?;
        Ok(Self::from_snapshots(snapshots))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StatError> {
        let snapshots: HashMap<CharacterId, CharacterRecords> =
            serde_json::from_reader(reader).map_err(|e| StatError::Load(e.to_string()))?;
        Ok(Self::from_snapshots(snapshots))
    }

    fn from_snapshots(snapshots: HashMap<CharacterId, CharacterRecords>) -> Self {
        Self {
            inner: InMemoryLoader {
                snapshots: RwLock::new(snapshots),
            },
        }
    }

    pub fn characters(&self) -> Vec<CharacterId> {
        let snapshots = self
            .inner
            .snapshots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut ids: Vec<CharacterId> = snapshots.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl RecordLoader for JsonLoader {
    fn load(&self, character: &CharacterId) -> Result<CharacterRecords, StatError> {
        self.inner.load(character)
    }
}
