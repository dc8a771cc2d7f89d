//! Per-recompute character state.
//!
//! [`CharacterState`] is the in-memory stat graph for one recompute: every
//! stat keyed by category and case-folded name, the effect arena, and the
//! class levels. It is built from loader records, then effects and
//! proficiencies are attached to their target stats. It is owned by a single
//! recompute and dropped afterwards.

use crate::formula::FormulaValue;
use crate::record::{CharacterRecords, ClassLevelRecord, EffectRecord, ProficiencyRecord};
use crate::stat::{Accumulator, EffectIdx, Stat, StatCategory};
use crate::stat_id::{fold, StatId};
use std::collections::HashMap;
use tracing::debug;

/// Index of a stat in [`CharacterState`].
pub type StatIdx = usize;

/// An effect attached to a stat, with its per-recompute result.
#[derive(Debug, Clone)]
pub struct EffectSlot {
    pub record: EffectRecord,
    pub computed: bool,
    pub result: FormulaValue,
}

/// A class and the levels held in it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassLevel {
    pub name: String,
    pub level: u32,
}

/// The stat graph of one character for one recompute.
///
/// # Examples
///
/// ```rust
/// use statsheet::record::{CharacterRecords, ClassLevelRecord, StatRecord};
/// use statsheet::state::CharacterState;
/// use statsheet::StatCategory;
///
/// let records = CharacterRecords {
///     attributes: vec![StatRecord::new("strength"), StatRecord::new("Strength")],
///     class_levels: vec![
///         ClassLevelRecord::new("fighter", 3),
///         ClassLevelRecord::new("wizard", 2),
///     ],
///     ..Default::default()
/// };
/// let state = CharacterState::from_records(&records);
/// assert_eq!(state.len(), 1); // first-seen-wins
/// assert!(state.find(StatCategory::Attribute, "STRENGTH").is_some());
/// assert_eq!(state.total_level(), 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CharacterState {
    stats: Vec<Stat>,
    index: HashMap<(StatCategory, String), StatIdx>,
    effects: Vec<EffectSlot>,
    classes: Vec<ClassLevel>,
    class_index: HashMap<String, usize>,
    total_level: u32,
}

impl CharacterState {
    /// Build the stat graph from raw stat and class records.
    ///
    /// Within a category the first record of a given name wins and later
    /// ones are dropped; the same holds for classes, and only distinct
    /// classes count towards the total level. No effects are attached.
    pub fn build(records: &CharacterRecords) -> Self {
        let mut state = Self::default();

        let categories = [
            (StatCategory::Attribute, &records.attributes),
            (StatCategory::Skill, &records.skills),
            (StatCategory::DamageMultiplier, &records.damage_multipliers),
        ];
        for (category, stat_records) in categories {
            for record in stat_records {
                state.insert_stat(category, &record.name);
            }
        }

        for class in &records.class_levels {
            state.insert_class(class);
        }

        state
    }

    /// Build the stat graph and attach every applicable effect and
    /// proficiency.
    pub fn from_records(records: &CharacterRecords) -> Self {
        let mut state = Self::build(records);
        state.attach_effects(&records.effects);
        state.attach_proficiencies(&records.proficiencies);
        state
    }

    fn insert_stat(&mut self, category: StatCategory, name: &str) {
        let key = (category, fold(name));
        if self.index.contains_key(&key) {
            debug!(%category, stat = name, "duplicate stat record dropped");
            return;
        }
        let idx = self.stats.len();
        self.stats.push(Stat::new(StatId::new(name), category));
        self.index.insert(key, idx);
    }

    fn insert_class(&mut self, class: &ClassLevelRecord) {
        let key = fold(&class.class_name);
        if self.class_index.contains_key(&key) {
            debug!(class = %class.class_name, "duplicate class record dropped");
            return;
        }
        self.class_index.insert(key, self.classes.len());
        self.classes.push(ClassLevel {
            name: class.class_name.clone(),
            level: class.level,
        });
        self.total_level += class.level;
    }

    /// Attach enabled effects to their target stats, preserving order.
    ///
    /// The target is looked up as an attribute, then a skill, then a damage
    /// multiplier. Effects naming no known stat are dropped. Returns the
    /// number of effects attached.
    pub fn attach_effects(&mut self, effects: &[EffectRecord]) -> usize {
        let mut attached = 0;
        for effect in effects.iter().filter(|effect| effect.enabled) {
            let Some(idx) = self.find_any(&effect.target) else {
                debug!(target_stat = %effect.target, operation = %effect.operation, "effect targets no stat, dropped");
                continue;
            };
            let effect_idx: EffectIdx = self.effects.len();
            self.effects.push(EffectSlot {
                record: effect.clone(),
                computed: false,
                result: FormulaValue::default(),
            });
            self.stats[idx].effects.push(effect_idx);
            attached += 1;
        }
        attached
    }

    /// Attach enabled skill and save proficiencies to their skills.
    ///
    /// Returns the number of proficiencies attached.
    pub fn attach_proficiencies(&mut self, proficiencies: &[ProficiencyRecord]) -> usize {
        let mut attached = 0;
        for prof in proficiencies {
            if !prof.enabled || !prof.kind.affects_skills() {
                continue;
            }
            let Some(idx) = self.find(StatCategory::Skill, &prof.target) else {
                debug!(target_stat = %prof.target, "proficiency targets no skill, dropped");
                continue;
            };
            if let Accumulator::Skill(acc) = &mut self.stats[idx].accumulator {
                acc.proficiencies.push(prof.value);
                attached += 1;
            }
        }
        attached
    }

    /// Find a stat by category and name, ignoring case.
    pub fn find(&self, category: StatCategory, name: &str) -> Option<StatIdx> {
        self.index.get(&(category, fold(name))).copied()
    }

    /// Find a stat of any category, attributes first.
    pub fn find_any(&self, name: &str) -> Option<StatIdx> {
        let key = fold(name);
        StatCategory::LOOKUP_ORDER
            .iter()
            .find_map(|category| self.index.get(&(*category, key.clone())).copied())
    }

    pub fn stat(&self, idx: StatIdx) -> &Stat {
        &self.stats[idx]
    }

    pub(crate) fn stat_mut(&mut self, idx: StatIdx) -> &mut Stat {
        &mut self.stats[idx]
    }

    /// All stats: attributes, then skills, then damage multipliers, each in
    /// load order.
    pub fn stats(&self) -> &[Stat] {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn effect(&self, idx: EffectIdx) -> &EffectSlot {
        &self.effects[idx]
    }

    pub(crate) fn effect_mut(&mut self, idx: EffectIdx) -> &mut EffectSlot {
        &mut self.effects[idx]
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Level in the named class, ignoring case.
    pub fn class_level(&self, class_name: &str) -> Option<u32> {
        self.class_index
            .get(&fold(class_name))
            .map(|&i| self.classes[i].level)
    }

    pub fn classes(&self) -> &[ClassLevel] {
        &self.classes
    }

    /// Sum of levels across distinct classes.
    pub fn total_level(&self) -> u32 {
        self.total_level
    }
}
