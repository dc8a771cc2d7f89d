//! Recursive stat evaluation.
//!
//! The [`Evaluator`] drives every stat through
//! `Uncomputed -> Computing -> Computed`. Computing a stat resolves its
//! effects in order; an effect with a formula binds identifiers through the
//! evaluator, which recursively computes the stats they name. Dependencies
//! are therefore discovered depth-first from formula text, and the active
//! resolution path doubles as the cycle detector: reaching a stat that is
//! still `Computing` cuts the cycle there by making that stat `NaN`.
//!
//! All traversal state lives in the evaluator and the [`CharacterState`] it
//! borrows, so concurrent recomputes never share anything.

use crate::combine::{combine_attribute, combine_damage_multiplier, combine_skill};
use crate::config::EngineConfig;
use crate::formula::{self, Bindings, FormulaValue};
use crate::graph::{format_cycle_path, DependencyGraph, StatRef};
use crate::record::Operation;
use crate::stat::{Accumulator, EffectIdx, Progress, StatCategory};
use crate::state::{CharacterState, StatIdx};
use tracing::{debug, trace, warn};

/// Memoizing, cycle-detecting evaluator over one [`CharacterState`].
///
/// # Examples
///
/// ```rust
/// use statsheet::evaluator::Evaluator;
/// use statsheet::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
/// use statsheet::state::CharacterState;
/// use statsheet::{EngineConfig, StatCategory};
///
/// let records = CharacterRecords {
///     attributes: vec![StatRecord::new("strength"), StatRecord::new("carry")],
///     effects: vec![
///         EffectRecord::value("strength", Operation::Base, 14.0),
///         EffectRecord::calculation("carry", Operation::Base, "strength * 15"),
///     ],
///     ..Default::default()
/// };
/// let mut state = CharacterState::from_records(&records);
/// let config = EngineConfig::default();
///
/// let mut evaluator = Evaluator::new(&mut state, &config);
/// evaluator.resolve_all();
/// drop(evaluator);
///
/// let carry = state.find(StatCategory::Attribute, "carry").unwrap();
/// assert_eq!(state.stat(carry).result(), 210.0);
/// ```
pub struct Evaluator<'a> {
    state: &'a mut CharacterState,
    config: &'a EngineConfig,
    graph: DependencyGraph,
    /// Stats currently `Computing`, outermost first.
    path: Vec<StatIdx>,
}

impl<'a> Evaluator<'a> {
    pub fn new(state: &'a mut CharacterState, config: &'a EngineConfig) -> Self {
        let mut graph = DependencyGraph::new();
        for stat in state.stats() {
            graph.add_node(StatRef::new(stat.category(), stat.name().clone()));
        }
        Self {
            state,
            config,
            graph,
            path: Vec::new(),
        }
    }

    /// Compute every stat: attributes, then skills, then damage multipliers.
    pub fn resolve_all(&mut self) {
        for idx in 0..self.state.len() {
            self.resolve(idx);
        }
    }

    /// Drive one stat to `Computed`, computing whatever it depends on first.
    pub fn resolve(&mut self, idx: StatIdx) {
        match self.state.stat(idx).progress() {
            Progress::Computed => return,
            Progress::Computing => {
                self.cut_cycle(idx);
                return;
            }
            Progress::Uncomputed => {}
        }

        self.state.stat_mut(idx).begin();
        self.path.push(idx);

        let effects = self.state.stat(idx).effects().to_vec();
        for effect_idx in effects {
            let value = self.resolve_effect(effect_idx);
            // a cycle through this stat already made it terminal
            if self.state.stat(idx).is_computed() {
                break;
            }
            let operation = self.state.effect(effect_idx).record.operation;
            self.state.stat_mut(idx).apply(operation, value);
        }

        if !self.state.stat(idx).is_computed() {
            self.combine(idx);
        }
        self.path.pop();

        let stat = self.state.stat(idx);
        trace!(stat = %stat.name(), category = %stat.category(), result = stat.result(), "stat computed");
    }

    /// Hand back the dependencies discovered so far.
    pub fn into_graph(self) -> DependencyGraph {
        self.graph
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn state(&self) -> &CharacterState {
        self.state
    }

    fn stat_ref(&self, idx: StatIdx) -> StatRef {
        let stat = self.state.stat(idx);
        StatRef::new(stat.category(), stat.name().clone())
    }

    fn cut_cycle(&mut self, idx: StatIdx) {
        let start = self.path.iter().position(|&i| i == idx).unwrap_or(0);
        let mut cycle: Vec<StatRef> = self.path[start..]
            .iter()
            .map(|&i| self.stat_ref(i))
            .collect();
        cycle.push(self.stat_ref(idx));

        warn!(cycle = %format_cycle_path(&cycle), "dependency cycle, stat set to NaN");
        self.graph.record_cycle(cycle);
        self.state.stat_mut(idx).poison();
    }

    /// Resolve an effect's value, once per recompute.
    fn resolve_effect(&mut self, effect_idx: EffectIdx) -> FormulaValue {
        let slot = self.state.effect(effect_idx);
        if slot.computed {
            return slot.result.clone();
        }
        let operation = slot.record.operation;
        let value = slot.record.value.filter(|v| v.is_finite());
        let calculation = slot.record.calculation.clone();

        let result = if let Some(value) = value {
            FormulaValue::Number(value)
        } else if operation == Operation::Conditional {
            FormulaValue::Text(calculation.unwrap_or_default())
        } else if operation.is_counter() {
            FormulaValue::Number(1.0)
        } else if let Some(calculation) = calculation {
            formula::evaluate(&calculation, self)
        } else {
            FormulaValue::default()
        };

        let slot = self.state.effect_mut(effect_idx);
        slot.computed = true;
        slot.result = result.clone();
        result
    }

    fn combine(&mut self, idx: StatIdx) {
        let proficiency_bonus = match self.state.stat(idx).category() {
            StatCategory::Skill => self.proficiency_bonus(),
            StatCategory::Attribute | StatCategory::DamageMultiplier => 0.0,
        };
        let floored = !self
            .config
            .is_unfloored(self.state.stat(idx).name().as_str());

        let stat = self.state.stat_mut(idx);
        // forcing the proficiency bonus may have closed a cycle through this skill
        if stat.is_computed() {
            return;
        }
        let result = match &mut stat.accumulator {
            Accumulator::Attribute(acc) => combine_attribute(acc, floored),
            Accumulator::Skill(acc) => combine_skill(acc, proficiency_bonus),
            Accumulator::DamageMultiplier(acc) => combine_damage_multiplier(acc),
        };
        stat.finish(result);
    }

    fn proficiency_bonus(&mut self) -> f64 {
        let config = self.config;
        let name = &config.proficiency_bonus_attribute;
        match self.state.find(StatCategory::Attribute, name) {
            Some(idx) => self.force(idx),
            None => {
                debug!(attribute = %name, "no proficiency bonus attribute, using 0");
                0.0
            }
        }
    }

    /// Resolve `idx` on behalf of the stat at the top of the path.
    fn force(&mut self, idx: StatIdx) -> f64 {
        if let Some(&current) = self.path.last() {
            let dependent = self.stat_ref(current);
            let dependency = self.stat_ref(idx);
            self.graph.add_dependency(dependent, dependency);
        }
        self.resolve(idx);
        self.state.stat(idx).result()
    }
}

impl Bindings for Evaluator<'_> {
    /// Resolution order: attribute, `<attribute>mod`, skill, damage
    /// multiplier, `<class>level(s)`, `level`.
    fn bind(&mut self, identifier: &str) -> Option<f64> {
        if let Some(idx) = self.state.find(StatCategory::Attribute, identifier) {
            return Some(self.force(idx));
        }

        // a `...mod` name never falls through to skills or damage multipliers
        if let Some(attribute) = identifier.strip_suffix("mod").filter(|n| !n.is_empty()) {
            let modifier = match self.state.find(StatCategory::Attribute, attribute) {
                Some(idx) => {
                    self.force(idx);
                    self.state.stat(idx).modifier().unwrap_or(f64::NAN)
                }
                None => f64::NAN,
            };
            return Some(modifier);
        }

        if let Some(idx) = self.state.find(StatCategory::Skill, identifier) {
            return Some(self.force(idx));
        }

        if let Some(idx) = self.state.find(StatCategory::DamageMultiplier, identifier) {
            return Some(self.force(idx));
        }

        let class = identifier
            .strip_suffix("levels")
            .or_else(|| identifier.strip_suffix("level"))
            .filter(|n| !n.is_empty());
        if let Some(level) = class.and_then(|c| self.state.class_level(c)) {
            return Some(f64::from(level));
        }

        if identifier == "level" {
            return Some(f64::from(self.state.total_level()));
        }

        None
    }
}
