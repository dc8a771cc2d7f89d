//! The stat engine.
//!
//! [`Engine`] runs one full recompute over a set of records: build the stat
//! graph, attach effects and proficiencies, evaluate every stat, collect the
//! sheet. It keeps no state between calls, so one engine can serve any
//! number of characters, in parallel if the caller wants.

use crate::config::EngineConfig;
use crate::evaluator::Evaluator;
use crate::graph::DependencyGraph;
use crate::record::CharacterRecords;
use crate::resolved::StatSheet;
use crate::state::CharacterState;
use tracing::debug;

/// Everything one evaluation produced.
#[derive(Debug, Clone)]
pub struct Recomputation {
    pub sheet: StatSheet,
    pub graph: DependencyGraph,
}

/// Stateless recompute engine.
///
/// # Examples
///
/// ```rust
/// use statsheet::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
/// use statsheet::Engine;
///
/// let records = CharacterRecords {
///     attributes: vec![StatRecord::new("strength")],
///     effects: vec![
///         EffectRecord::value("strength", Operation::Base, 10.0),
///         EffectRecord::value("strength", Operation::Base, 12.0),
///         EffectRecord::value("strength", Operation::Add, 2.0),
///     ],
///     ..Default::default()
/// };
///
/// let sheet = Engine::default().recompute(&records);
/// let strength = sheet.attribute("strength").unwrap();
/// assert_eq!(strength.result, 14.0);
/// assert_eq!(strength.modifier, Some(2.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the stat graph with every effect and proficiency attached.
    pub fn prepare(&self, records: &CharacterRecords) -> CharacterState {
        CharacterState::from_records(records)
    }

    /// Compute every stat of `state`, returning the dependencies found.
    pub fn evaluate(&self, state: &mut CharacterState) -> DependencyGraph {
        let mut evaluator = Evaluator::new(state, &self.config);
        evaluator.resolve_all();
        evaluator.into_graph()
    }

    /// Full recompute, keeping the dependency graph.
    pub fn run(&self, records: &CharacterRecords) -> Recomputation {
        let mut state = self.prepare(records);
        let graph = self.evaluate(&mut state);
        let sheet = StatSheet::from_state(&state);
        debug!(
            stats = sheet.len(),
            effects = state.effect_count(),
            dependencies = graph.edge_count(),
            cycles = graph.cycles().len(),
            "recompute finished"
        );
        Recomputation { sheet, graph }
    }

    /// Full recompute from scratch.
    pub fn recompute(&self, records: &CharacterRecords) -> StatSheet {
        self.run(records).sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{EffectRecord, Operation, StatRecord};

    #[test]
    fn test_custom_unfloored_attribute() {
        let records = CharacterRecords {
            attributes: vec![StatRecord::new("speedFactor"), StatRecord::new("carryMultiplier")],
            effects: vec![
                EffectRecord::value("speedFactor", Operation::Base, 1.0),
                EffectRecord::value("speedFactor", Operation::Mul, 1.5),
                EffectRecord::value("carryMultiplier", Operation::Base, 1.0),
                EffectRecord::value("carryMultiplier", Operation::Mul, 1.5),
            ],
            ..Default::default()
        };
        let config = EngineConfig {
            unfloored_attributes: vec!["speedfactor".to_string()],
            ..Default::default()
        };
        let sheet = Engine::new(config).recompute(&records);
        assert_eq!(sheet.attribute("speedFactor").unwrap().result, 1.5);
        assert_eq!(sheet.attribute("carryMultiplier").unwrap().result, 1.0);
    }

    #[test]
    fn test_run_reports_cycles() {
        let records = CharacterRecords {
            attributes: vec![StatRecord::new("a"), StatRecord::new("b")],
            effects: vec![
                EffectRecord::calculation("a", Operation::Add, "b"),
                EffectRecord::calculation("b", Operation::Add, "a"),
            ],
            ..Default::default()
        };
        let run = Engine::default().run(&records);
        assert_eq!(run.graph.cycles().len(), 1);
        assert_eq!(run.sheet.poisoned().len(), 2);
    }

    #[test]
    fn test_prepare_does_not_compute() {
        let records = CharacterRecords {
            attributes: vec![StatRecord::new("strength")],
            effects: vec![EffectRecord::value("strength", Operation::Base, 10.0)],
            ..Default::default()
        };
        let state = Engine::default().prepare(&records);
        assert!(state.stats().iter().all(|s| !s.is_computed()));
        assert_eq!(state.effect_count(), 1);
    }
}
