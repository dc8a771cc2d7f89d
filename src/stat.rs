//! Stats and their accumulators.
//!
//! A [`Stat`] is one node of the character's stat graph. While it is being
//! computed its effects are folded into a category-specific
//! [`Accumulator`]; a combiner then turns the accumulator into the final
//! result (see [`crate::combine`]).

use crate::formula::FormulaValue;
use crate::record::Operation;
use crate::stat_id::StatId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three kinds of stat a character has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatCategory {
    Attribute,
    Skill,
    DamageMultiplier,
}

impl StatCategory {
    /// Lookup order used when an effect names a stat.
    pub const LOOKUP_ORDER: [StatCategory; 3] = [
        StatCategory::Attribute,
        StatCategory::Skill,
        StatCategory::DamageMultiplier,
    ];
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatCategory::Attribute => f.write_str("attribute"),
            StatCategory::Skill => f.write_str("skill"),
            StatCategory::DamageMultiplier => f.write_str("damageMultiplier"),
        }
    }
}

/// Where a stat is in its one-way `Uncomputed -> Computing -> Computed` walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Progress {
    #[default]
    Uncomputed,
    /// On the active resolution path. Re-entering here is a cycle.
    Computing,
    Computed,
}

/// NaN-propagating maximum, used where the larger value wins.
pub(crate) fn poisoned_max(current: f64, candidate: f64) -> f64 {
    if current.is_nan() || candidate.is_nan() {
        f64::NAN
    } else if candidate > current {
        candidate
    } else {
        current
    }
}

/// NaN-propagating minimum, used where the smaller value wins.
pub(crate) fn poisoned_min(current: f64, candidate: f64) -> f64 {
    if current.is_nan() || candidate.is_nan() {
        f64::NAN
    } else if candidate < current {
        candidate
    } else {
        current
    }
}

/// Clamp to `[min, max]`; a NaN bound poisons the value. When the bounds
/// cross, the ceiling wins.
pub(crate) fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if min.is_nan() || max.is_nan() {
        return f64::NAN;
    }
    let mut value = value;
    if value < min {
        value = min;
    }
    if value > max {
        value = max;
    }
    value
}

/// Accumulators for an attribute such as `strength` or `speed`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeAccumulator {
    pub base: f64,
    pub add: f64,
    pub mul: f64,
    pub min: f64,
    pub max: f64,
    /// `floor((result - 10) / 2)`, set by the combiner.
    pub modifier: f64,
}

impl Default for AttributeAccumulator {
    fn default() -> Self {
        Self {
            base: 0.0,
            add: 0.0,
            mul: 1.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            modifier: 0.0,
        }
    }
}

/// Accumulators for a skill or saving throw.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillAccumulator {
    /// Granted proficiency multipliers, in aggregation order.
    pub proficiencies: Vec<f64>,
    /// Largest granted multiplier, set by the combiner.
    pub proficiency: f64,
    pub add: f64,
    pub mul: f64,
    pub min: f64,
    pub max: f64,
    pub advantage: u32,
    pub disadvantage: u32,
    pub fail: u32,
    pub passive_add: f64,
    pub conditional: u32,
}

impl Default for SkillAccumulator {
    fn default() -> Self {
        Self {
            proficiencies: Vec::new(),
            proficiency: 0.0,
            add: 0.0,
            mul: 1.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            advantage: 0,
            disadvantage: 0,
            fail: 0,
            passive_add: 0.0,
            conditional: 0,
        }
    }
}

/// Accumulators for a damage multiplier such as `fireMultiplier`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageMultiplierAccumulator {
    pub immunity_count: u32,
    pub resistance_count: u32,
    pub vulnerability_count: u32,
}

/// Category-specific accumulator state.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Attribute(AttributeAccumulator),
    Skill(SkillAccumulator),
    DamageMultiplier(DamageMultiplierAccumulator),
}

impl Accumulator {
    pub fn for_category(category: StatCategory) -> Self {
        match category {
            StatCategory::Attribute => Accumulator::Attribute(AttributeAccumulator::default()),
            StatCategory::Skill => Accumulator::Skill(SkillAccumulator::default()),
            StatCategory::DamageMultiplier => {
                Accumulator::DamageMultiplier(DamageMultiplierAccumulator::default())
            }
        }
    }

    pub fn category(&self) -> StatCategory {
        match self {
            Accumulator::Attribute(_) => StatCategory::Attribute,
            Accumulator::Skill(_) => StatCategory::Skill,
            Accumulator::DamageMultiplier(_) => StatCategory::DamageMultiplier,
        }
    }

    /// Fold one effect result into the accumulators.
    ///
    /// Returns `false` when this category has no accumulator for the
    /// operation; the effect is then a no-op.
    pub fn apply(&mut self, operation: Operation, value: &FormulaValue) -> bool {
        let n = value.as_number();
        match self {
            Accumulator::Attribute(acc) => match operation {
                Operation::Base => acc.base = poisoned_max(acc.base, n),
                Operation::Add => acc.add += n,
                Operation::Mul => acc.mul *= n,
                Operation::Min => acc.min = poisoned_max(acc.min, n),
                Operation::Max => acc.max = poisoned_min(acc.max, n),
                Operation::Advantage
                | Operation::Disadvantage
                | Operation::Fail
                | Operation::PassiveAdd
                | Operation::Conditional => return false,
            },
            Accumulator::Skill(acc) => match operation {
                // a skill's base always comes from its proficiency
                Operation::Base => return false,
                Operation::Add => acc.add += n,
                Operation::Mul => acc.mul *= n,
                Operation::Min => acc.min = poisoned_max(acc.min, n),
                Operation::Max => acc.max = poisoned_min(acc.max, n),
                Operation::Advantage => acc.advantage += 1,
                Operation::Disadvantage => acc.disadvantage += 1,
                Operation::Fail => acc.fail += 1,
                Operation::PassiveAdd => acc.passive_add += n,
                Operation::Conditional => acc.conditional += 1,
            },
            Accumulator::DamageMultiplier(acc) => match operation {
                Operation::Mul => {
                    if n == 0.0 {
                        acc.immunity_count += 1;
                    } else if n == 0.5 {
                        acc.resistance_count += 1;
                    } else if n == 2.0 {
                        acc.vulnerability_count += 1;
                    } else {
                        return false;
                    }
                }
                Operation::Base
                | Operation::Add
                | Operation::Min
                | Operation::Max
                | Operation::Advantage
                | Operation::Disadvantage
                | Operation::Fail
                | Operation::PassiveAdd
                | Operation::Conditional => return false,
            },
        }
        true
    }
}

/// Index of an effect in [`crate::state::CharacterState`]'s effect arena.
pub type EffectIdx = usize;

/// One effect contribution, as folded into a stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub operation: Operation,
    pub value: FormulaValue,
    /// Whether the stat's category had an accumulator for this operation.
    pub applied: bool,
}

/// A computable stat of one character, valid for one recompute.
#[derive(Debug, Clone)]
pub struct Stat {
    name: StatId,
    progress: Progress,
    result: f64,
    pub(crate) effects: Vec<EffectIdx>,
    pub(crate) contributions: Vec<Contribution>,
    pub(crate) accumulator: Accumulator,
}

impl Stat {
    pub fn new(name: StatId, category: StatCategory) -> Self {
        Self {
            name,
            progress: Progress::Uncomputed,
            result: 0.0,
            effects: Vec::new(),
            contributions: Vec::new(),
            accumulator: Accumulator::for_category(category),
        }
    }

    pub fn name(&self) -> &StatId {
        &self.name
    }

    pub fn category(&self) -> StatCategory {
        self.accumulator.category()
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn is_computed(&self) -> bool {
        self.progress == Progress::Computed
    }

    pub fn is_computing(&self) -> bool {
        self.progress == Progress::Computing
    }

    /// Final value; `NaN` when poisoned by a cycle.
    pub fn result(&self) -> f64 {
        self.result
    }

    /// The attribute modifier, if this is an attribute.
    pub fn modifier(&self) -> Option<f64> {
        match &self.accumulator {
            Accumulator::Attribute(acc) => Some(acc.modifier),
            _ => None,
        }
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.accumulator
    }

    /// Effects targeting this stat, in aggregation order.
    pub fn effects(&self) -> &[EffectIdx] {
        &self.effects
    }

    pub fn contributions(&self) -> &[Contribution] {
        &self.contributions
    }

    pub(crate) fn begin(&mut self) {
        debug_assert_eq!(self.progress, Progress::Uncomputed);
        self.progress = Progress::Computing;
    }

    /// Record and fold one effect result.
    pub(crate) fn apply(&mut self, operation: Operation, value: FormulaValue) {
        let applied = self.accumulator.apply(operation, &value);
        self.contributions.push(Contribution {
            operation,
            value,
            applied,
        });
    }

    /// Terminal state for a stat re-entered on its own resolution path.
    pub(crate) fn poison(&mut self) {
        self.result = f64::NAN;
        if let Accumulator::Attribute(acc) = &mut self.accumulator {
            acc.modifier = f64::NAN;
        }
        self.progress = Progress::Computed;
    }

    pub(crate) fn finish(&mut self, result: f64) {
        self.result = result;
        self.progress = Progress::Computed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> FormulaValue {
        FormulaValue::Number(n)
    }

    #[test]
    fn test_attribute_defaults() {
        let acc = AttributeAccumulator::default();
        assert_eq!(acc.mul, 1.0);
        assert_eq!(acc.min, f64::NEG_INFINITY);
        assert_eq!(acc.max, f64::INFINITY);
    }

    #[test]
    fn test_attribute_fold() {
        let mut acc = Accumulator::for_category(StatCategory::Attribute);
        assert!(acc.apply(Operation::Base, &num(10.0)));
        assert!(acc.apply(Operation::Base, &num(12.0)));
        assert!(acc.apply(Operation::Base, &num(8.0)));
        assert!(acc.apply(Operation::Add, &num(2.0)));
        assert!(acc.apply(Operation::Mul, &num(1.5)));
        assert!(acc.apply(Operation::Min, &num(3.0)));
        assert!(acc.apply(Operation::Min, &num(1.0)));
        assert!(acc.apply(Operation::Max, &num(30.0)));
        assert!(acc.apply(Operation::Max, &num(40.0)));
        assert!(!acc.apply(Operation::Advantage, &num(1.0)));

        let Accumulator::Attribute(acc) = acc else {
            panic!("expected attribute accumulator");
        };
        assert_eq!(acc.base, 12.0);
        assert_eq!(acc.add, 2.0);
        assert_eq!(acc.mul, 1.5);
        assert_eq!(acc.min, 3.0);
        assert_eq!(acc.max, 30.0);
    }

    #[test]
    fn test_skill_counters() {
        let mut acc = Accumulator::for_category(StatCategory::Skill);
        acc.apply(Operation::Advantage, &num(1.0));
        acc.apply(Operation::Advantage, &num(1.0));
        acc.apply(Operation::Disadvantage, &num(1.0));
        acc.apply(Operation::Fail, &num(1.0));
        acc.apply(Operation::PassiveAdd, &num(5.0));
        acc.apply(Operation::Conditional, &FormulaValue::Text("underwater".into()));
        assert!(!acc.apply(Operation::Base, &num(4.0)));

        let Accumulator::Skill(acc) = acc else {
            panic!("expected skill accumulator");
        };
        assert_eq!(acc.advantage, 2);
        assert_eq!(acc.disadvantage, 1);
        assert_eq!(acc.fail, 1);
        assert_eq!(acc.passive_add, 5.0);
        assert_eq!(acc.conditional, 1);
    }

    #[test]
    fn test_damage_multiplier_classification() {
        let mut acc = Accumulator::for_category(StatCategory::DamageMultiplier);
        assert!(acc.apply(Operation::Mul, &num(0.0)));
        assert!(acc.apply(Operation::Mul, &num(0.5)));
        assert!(acc.apply(Operation::Mul, &num(2.0)));
        assert!(!acc.apply(Operation::Mul, &num(3.0)));
        assert!(!acc.apply(Operation::Add, &num(1.0)));

        assert_eq!(
            acc,
            Accumulator::DamageMultiplier(DamageMultiplierAccumulator {
                immunity_count: 1,
                resistance_count: 1,
                vulnerability_count: 1,
            })
        );
    }

    #[test]
    fn test_text_poisons_accumulators() {
        let mut acc = Accumulator::for_category(StatCategory::Attribute);
        acc.apply(Operation::Base, &num(10.0));
        acc.apply(Operation::Base, &FormulaValue::Text("foobar".into()));
        let Accumulator::Attribute(acc) = acc else {
            panic!("expected attribute accumulator");
        };
        assert!(acc.base.is_nan());
    }

    #[test]
    fn test_clamp_ceiling_wins_when_bounds_cross() {
        assert_eq!(clamp(5.0, 10.0, 8.0), 8.0);
        assert_eq!(clamp(5.0, f64::NEG_INFINITY, f64::INFINITY), 5.0);
        assert!(clamp(5.0, f64::NAN, f64::INFINITY).is_nan());
    }

    #[test]
    fn test_stat_progress() {
        let mut stat = Stat::new(StatId::new("strength"), StatCategory::Attribute);
        assert_eq!(stat.progress(), Progress::Uncomputed);
        stat.begin();
        assert!(stat.is_computing());
        stat.poison();
        assert!(stat.is_computed());
        assert!(!stat.is_computing());
        assert!(stat.result().is_nan());
        assert!(stat.modifier().map(f64::is_nan).unwrap_or(false));
    }
}
