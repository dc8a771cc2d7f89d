//! Resolved stat results.
//!
//! A [`StatSheet`] is what a recompute hands back for persistence: every
//! stat's final value, keyed by category and name, with the breakdown of the
//! effects that produced it.

use crate::formula::serde_number;
use crate::stat::{Accumulator, Contribution, Stat, StatCategory};
use crate::stat_id::StatId;
use crate::state::CharacterState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Skill-only results besides the final value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillTally {
    #[serde(with = "serde_number")]
    pub proficiency: f64,
    pub advantage: u32,
    pub disadvantage: u32,
    pub fail: u32,
    #[serde(with = "serde_number")]
    pub passive_add: f64,
    pub conditional: u32,
}

/// A resolved stat value with its breakdown.
///
/// `result` is `NaN` for a stat caught in, or fed by, a dependency cycle or
/// an unresolvable formula. Non-finite numbers serialize as `"NaN"`,
/// `"Infinity"` or `"-Infinity"` so a saved sheet reads back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStat {
    pub name: StatId,
    pub category: StatCategory,
    #[serde(with = "serde_number")]
    pub result: f64,

    /// Attribute modifier, `floor((result - 10) / 2)`.
    #[serde(
        rename = "mod",
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_number::option"
    )]
    pub modifier: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillTally>,

    /// Effect contributions in the order they were folded.
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

impl From<&Stat> for ResolvedStat {
    fn from(stat: &Stat) -> Self {
        let skill = match stat.accumulator() {
            Accumulator::Skill(acc) => Some(SkillTally {
                proficiency: acc.proficiency,
                advantage: acc.advantage,
                disadvantage: acc.disadvantage,
                fail: acc.fail,
                passive_add: acc.passive_add,
                conditional: acc.conditional,
            }),
            Accumulator::Attribute(_) | Accumulator::DamageMultiplier(_) => None,
        };
        Self {
            name: stat.name().clone(),
            category: stat.category(),
            result: stat.result(),
            modifier: stat.modifier(),
            skill,
            contributions: stat.contributions().to_vec(),
        }
    }
}

/// Final stats of one character, per category, keyed by stat name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatSheet {
    pub attributes: BTreeMap<String, ResolvedStat>,
    pub skills: BTreeMap<String, ResolvedStat>,
    pub damage_multipliers: BTreeMap<String, ResolvedStat>,
}

impl StatSheet {
    /// Collect every stat of an evaluated state.
    pub fn from_state(state: &CharacterState) -> Self {
        let mut sheet = Self::default();
        for stat in state.stats() {
            sheet
                .category_mut(stat.category())
                .insert(stat.name().as_str().to_string(), ResolvedStat::from(stat));
        }
        sheet
    }

    pub fn category(&self, category: StatCategory) -> &BTreeMap<String, ResolvedStat> {
        match category {
            StatCategory::Attribute => &self.attributes,
            StatCategory::Skill => &self.skills,
            StatCategory::DamageMultiplier => &self.damage_multipliers,
        }
    }

    fn category_mut(&mut self, category: StatCategory) -> &mut BTreeMap<String, ResolvedStat> {
        match category {
            StatCategory::Attribute => &mut self.attributes,
            StatCategory::Skill => &mut self.skills,
            StatCategory::DamageMultiplier => &mut self.damage_multipliers,
        }
    }

    /// Look up a stat by name, ignoring case. Keys keep the spelling of the
    /// record that defined the stat.
    pub fn get(&self, category: StatCategory, name: &str) -> Option<&ResolvedStat> {
        let stats = self.category(category);
        stats
            .get(name)
            .or_else(|| stats.values().find(|stat| stat.name.matches(name)))
    }

    pub fn attribute(&self, name: &str) -> Option<&ResolvedStat> {
        self.get(StatCategory::Attribute, name)
    }

    pub fn skill(&self, name: &str) -> Option<&ResolvedStat> {
        self.get(StatCategory::Skill, name)
    }

    pub fn damage_multiplier(&self, name: &str) -> Option<&ResolvedStat> {
        self.get(StatCategory::DamageMultiplier, name)
    }

    /// Number of stats across all categories.
    pub fn len(&self) -> usize {
        self.attributes.len() + self.skills.len() + self.damage_multipliers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stats whose result is `NaN`, in category then name order.
    pub fn poisoned(&self) -> Vec<&ResolvedStat> {
        StatCategory::LOOKUP_ORDER
            .iter()
            .flat_map(|category| self.category(*category).values())
            .filter(|stat| stat.result.is_nan())
            .collect()
    }
}
