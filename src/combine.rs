//! Combiners: the per-category rules that turn folded accumulators into a
//! final stat value.

use crate::stat::{
    clamp, AttributeAccumulator, DamageMultiplierAccumulator, SkillAccumulator,
};

/// `(base + add) * mul`, clamped, then floored unless `floored` is false.
/// Also sets the modifier, `floor((result - 10) / 2)`.
pub fn combine_attribute(acc: &mut AttributeAccumulator, floored: bool) -> f64 {
    let mut result = clamp((acc.base + acc.add) * acc.mul, acc.min, acc.max);
    if floored {
        result = result.floor();
    }
    acc.modifier = ((result - 10.0) / 2.0).floor();
    result
}

/// Proficiency bonus times the best granted proficiency, plus adds, times
/// muls, clamped and then floored. Also records the winning proficiency.
pub fn combine_skill(acc: &mut SkillAccumulator, proficiency_bonus: f64) -> f64 {
    acc.proficiency = acc
        .proficiencies
        .iter()
        .fold(0.0, |best, &value| if value > best { value } else { best });
    let base = proficiency_bonus * acc.proficiency;
    clamp((base + acc.add) * acc.mul, acc.min, acc.max).floor()
}

/// Any immunity gives 0. Otherwise resistance alone halves, vulnerability
/// alone doubles, and both or neither cancel out to 1.
pub fn combine_damage_multiplier(acc: &DamageMultiplierAccumulator) -> f64 {
    if acc.immunity_count > 0 {
        return 0.0;
    }
    match (acc.resistance_count > 0, acc.vulnerability_count > 0) {
        (true, false) => 0.5,
        (false, true) => 2.0,
        (true, true) | (false, false) => 1.0,
    }
}
