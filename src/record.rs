//! Raw records consumed by one recompute.
//!
//! These mirror what a loader fetches for a character: the stat
//! definitions, class levels, effects and proficiencies. Records are
//! read-only inputs; the engine never writes back into them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the character whose stats are being recomputed.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A named stat definition (attribute, skill or damage multiplier).
///
/// Stat records carry no numbers: every value comes from effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub name: String,
}

impl StatRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Levels held in one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassLevelRecord {
    #[serde(alias = "name")]
    pub class_name: String,
    pub level: u32,
}

impl ClassLevelRecord {
    pub fn new(class_name: impl Into<String>, level: u32) -> Self {
        Self {
            class_name: class_name.into(),
            level,
        }
    }
}

/// What an effect does to its target stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Largest base wins.
    Base,
    /// Summed.
    Add,
    /// Multiplied together, or classified on damage multipliers.
    Mul,
    /// Raises the floor.
    Min,
    /// Lowers the ceiling.
    Max,
    Advantage,
    Disadvantage,
    Fail,
    PassiveAdd,
    /// Opaque condition text, counted but not evaluated.
    Conditional,
}

impl Operation {
    /// Operations that count occurrences; their magnitude is irrelevant.
    pub fn is_counter(self) -> bool {
        matches!(
            self,
            Operation::Advantage | Operation::Disadvantage | Operation::Fail
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Base => "base",
            Operation::Add => "add",
            Operation::Mul => "mul",
            Operation::Min => "min",
            Operation::Max => "max",
            Operation::Advantage => "advantage",
            Operation::Disadvantage => "disadvantage",
            Operation::Fail => "fail",
            Operation::PassiveAdd => "passiveAdd",
            Operation::Conditional => "conditional",
        };
        f.write_str(name)
    }
}

fn enabled_by_default() -> bool {
    true
}

/// A single modifier on one stat.
///
/// `value` takes precedence when it is finite; otherwise `calculation`
/// is evaluated as a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectRecord {
    /// Name of the target stat.
    #[serde(alias = "stat")]
    pub target: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calculation: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl EffectRecord {
    /// An enabled effect with a fixed value.
    pub fn value(target: impl Into<String>, operation: Operation, value: f64) -> Self {
        Self {
            target: target.into(),
            operation,
            value: Some(value),
            calculation: None,
            enabled: true,
        }
    }

    /// An enabled effect whose value comes from a formula.
    pub fn calculation(
        target: impl Into<String>,
        operation: Operation,
        calculation: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            operation,
            value: None,
            calculation: Some(calculation.into()),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Kinds of proficiency a character can hold.
///
/// Only skill and save proficiencies reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProficiencyType {
    Skill,
    Save,
    Armor,
    Weapon,
    Tool,
    Language,
}

impl ProficiencyType {
    pub fn affects_skills(self) -> bool {
        matches!(self, ProficiencyType::Skill | ProficiencyType::Save)
    }
}

/// A grant raising a skill's proficiency multiplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyRecord {
    #[serde(alias = "name")]
    pub target: String,
    #[serde(rename = "type")]
    pub kind: ProficiencyType,
    /// Multiplier on the proficiency bonus: 0, 0.5, 1 or 2 in practice.
    pub value: f64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl ProficiencyRecord {
    pub fn new(target: impl Into<String>, kind: ProficiencyType, value: f64) -> Self {
        Self {
            target: target.into(),
            kind,
            value,
            enabled: true,
        }
    }
}

/// Everything a loader returns for one character.
///
/// # Examples
///
/// ```rust
/// use statsheet::CharacterRecords;
///
/// let json = r#"{
///     "attributes": [{ "name": "strength" }],
///     "effects": [{ "stat": "strength", "operation": "base", "value": 15 }]
/// }"#;
/// let records: CharacterRecords = serde_json::from_str(json).unwrap();
/// assert_eq!(records.attributes.len(), 1);
/// assert!(records.effects[0].enabled);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CharacterRecords {
    pub attributes: Vec<StatRecord>,
    pub skills: Vec<StatRecord>,
    pub damage_multipliers: Vec<StatRecord>,
    pub class_levels: Vec<ClassLevelRecord>,
    pub effects: Vec<EffectRecord>,
    pub proficiencies: Vec<ProficiencyRecord>,
}

impl CharacterRecords {
    /// Apply the loader pre-filters: enabled effects only, enabled skill
    /// and save proficiencies only.
    pub fn retain_applicable(&mut self) {
        self.effects.retain(|effect| effect.enabled);
        self.proficiencies
            .retain(|prof| prof.enabled && prof.kind.affects_skills());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serde_names() {
        let op: Operation = serde_json::from_str("\"passiveAdd\"").unwrap();
        assert_eq!(op, Operation::PassiveAdd);
        assert_eq!(op.to_string(), "passiveAdd");
        assert!(serde_json::from_str::<Operation>("\"divide\"").is_err());
    }

    #[test]
    fn test_effect_record_aliases() {
        let json = r#"{"stat": "dexterity", "operation": "add", "calculation": "level / 2"}"#;
        let effect: EffectRecord = serde_json::from_str(json).unwrap();
        assert_eq!(effect.target, "dexterity");
        assert_eq!(effect.value, None);
        assert_eq!(effect.calculation.as_deref(), Some("level / 2"));
        assert!(effect.enabled);
    }

    #[test]
    fn test_retain_applicable() {
        let mut records = CharacterRecords {
            effects: vec![
                EffectRecord::value("strength", Operation::Base, 10.0),
                EffectRecord::value("strength", Operation::Add, 2.0).disabled(),
            ],
            proficiencies: vec![
                ProficiencyRecord::new("athletics", ProficiencyType::Skill, 1.0),
                ProficiencyRecord::new("strengthSave", ProficiencyType::Save, 1.0),
                ProficiencyRecord::new("longsword", ProficiencyType::Weapon, 1.0),
            ],
            ..Default::default()
        };
        records.retain_applicable();
        assert_eq!(records.effects.len(), 1);
        assert_eq!(records.proficiencies.len(), 2);
    }
}
