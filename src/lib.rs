//! # statsheet - Character Stat Computation Engine
//!
//! Recomputes every derived stat of a tabletop-RPG character from raw
//! records:
//! - **Attributes** such as `strength` or `speed`, with their modifier
//! - **Skills** and saving throws, driven by the proficiency bonus
//! - **Damage multipliers** such as `fireMultiplier`
//!
//! ## Core Concepts
//!
//! ### Stat Pipeline
//!
//! ```text
//! [CharacterRecords] → [CharacterState] → [Evaluator] → [StatSheet]
//! ```
//!
//! 1. **Records** name the stats and carry effects and proficiencies
//! 2. **Effects** are folded into per-category accumulators; an effect value
//!    may be a formula referencing other stats
//! 3. **Combiners** turn accumulators into final results
//!
//! ### Key Features
//!
//! - **Lazy dependencies**: formulas compute the stats they name on demand
//! - **Cycle cutting**: a stat re-entered on its own resolution path becomes
//!   `NaN` instead of failing the recompute
//! - **Memoization**: every stat and effect is evaluated at most once
//! - **Isolation**: recomputes share nothing, so characters can be
//!   processed in parallel
//!
//! ## Example
//!
//! ```rust
//! use statsheet::record::{CharacterRecords, EffectRecord, Operation, StatRecord};
//! use statsheet::Engine;
//!
//! let records = CharacterRecords {
//!     attributes: vec![StatRecord::new("strength"), StatRecord::new("proficiencyBonus")],
//!     skills: vec![StatRecord::new("athletics")],
//!     effects: vec![
//!         EffectRecord::value("strength", Operation::Base, 16.0),
//!         EffectRecord::value("proficiencyBonus", Operation::Base, 2.0),
//!         EffectRecord::calculation("athletics", Operation::Add, "strengthMod"),
//!     ],
//!     ..Default::default()
//! };
//!
//! let sheet = Engine::default().recompute(&records);
//! assert_eq!(sheet.attribute("strength").unwrap().modifier, Some(3.0));
//! assert_eq!(sheet.skill("athletics").unwrap().result, 3.0);
//! ```
//!
//! ## Modules
//!
//! - [`record`] - Raw input records
//! - [`loader`] - Record sources
//! - [`auth`] - Edit permission checks
//! - [`state`] - Per-recompute stat graph
//! - [`stat`] - Stats and accumulators
//! - [`formula`] - Formula evaluation
//! - [`evaluator`] - Recursive, cycle-detecting evaluation
//! - [`combine`] - Per-category combiners
//! - [`graph`] - Discovered dependency graph
//! - [`resolved`] - Resolved stat results
//! - [`engine`] - One full recompute
//! - [`recompute`] - Authorized recompute entry point
//! - [`config`] - Engine configuration
//! - [`error`] - Error types

pub mod auth;
pub mod combine;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod graph;
pub mod loader;
pub mod record;
pub mod recompute;
pub mod resolved;
pub mod stat;
pub mod stat_id;
pub mod state;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::{Engine, Recomputation};
pub use error::{FormulaError, StatError};
pub use formula::FormulaValue;
pub use record::{CharacterId, CharacterRecords};
pub use recompute::Recomputer;
pub use resolved::{ResolvedStat, StatSheet};
pub use stat::StatCategory;
pub use stat_id::StatId;
