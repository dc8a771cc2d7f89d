//! Cycle detection example: what happens with circular formulas
//!
//! This example shows:
//! - A cycle `a -> b -> c -> a` cut at the re-entered stat
//! - Every stat on and downstream of the cycle ending up `NaN`
//! - Unrelated stats computing normally
//! - Reading the discovered dependency graph back

use statsheet::graph::{format_cycle_path, StatRef};
use statsheet::record::{EffectRecord, Operation, StatRecord};
use statsheet::{CharacterRecords, Engine, StatCategory};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    println!("=== Setting up circular formulas ===\n");
    let records = CharacterRecords {
        attributes: ["a", "b", "c", "d", "e"].into_iter().map(StatRecord::new).collect(),
        effects: vec![
            EffectRecord::value("a", Operation::Base, 10.0),
            EffectRecord::calculation("a", Operation::Add, "b"),
            EffectRecord::calculation("b", Operation::Base, "c + 20"),
            EffectRecord::calculation("c", Operation::Base, "a + 30"),
            EffectRecord::calculation("d", Operation::Base, "a * 2"),
            EffectRecord::value("e", Operation::Base, 12.0),
        ],
        ..Default::default()
    };
    println!("a: 10 (base) + b");
    println!("b: c + 20");
    println!("c: a + 30  (closes a -> b -> c -> a)");
    println!("d: a * 2   (downstream of the cycle)");
    println!("e: 12      (independent)\n");

    let run = Engine::default().run(&records);

    println!("=== Results ===\n");
    for (name, stat) in &run.sheet.attributes {
        println!("{}: {}", name, stat.result);
    }

    println!("\n=== Cycles cut ===\n");
    for cycle in run.graph.cycles() {
        println!("{}", format_cycle_path(cycle));
    }

    println!("\n=== Strongly connected groups ===\n");
    for group in run.graph.cyclic_groups() {
        let names: Vec<String> = group.iter().map(ToString::to_string).collect();
        println!("{{{}}}", names.join(", "));
    }

    let a = StatRef::new(StatCategory::Attribute, "a");
    let dependents: Vec<String> = run
        .graph
        .dependents_of(&a)
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("\nStats that read a: {}", dependents.join(", "));
}
