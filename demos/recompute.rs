//! Recompute example: a full character sheet from JSON records
//!
//! This example shows:
//! - Loading character snapshots with `JsonLoader`
//! - Gating recomputes on edit permission
//! - Reading attributes, skills and damage multipliers off the sheet
//!
//! Run with `RUST_LOG=statsheet=debug` to see the engine's logs.

use anyhow::Context;
use statsheet::auth::{OwnerOnly, UserId};
use statsheet::loader::JsonLoader;
use statsheet::{CharacterId, Engine, Recomputer, StatSheet};
use tracing_subscriber::EnvFilter;

const PARTY: &str = include_str!("data/party.json");

fn print_sheet(sheet: &StatSheet) {
    println!("  Attributes:");
    for (name, stat) in &sheet.attributes {
        match stat.modifier {
            Some(modifier) => println!("    {:<18} {:>6} ({:+})", name, stat.result, modifier),
            None => println!("    {:<18} {:>6}", name, stat.result),
        }
    }

    println!("  Skills:");
    for (name, stat) in &sheet.skills {
        let tally = stat.skill.clone().unwrap_or_default();
        println!(
            "    {:<18} {:>+6}  prof x{}  adv {} dis {} cond {}",
            name, stat.result, tally.proficiency, tally.advantage, tally.disadvantage, tally.conditional
        );
    }

    println!("  Damage multipliers:");
    for (name, stat) in &sheet.damage_multipliers {
        println!("    {:<18} x{}", name, stat.result);
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let loader = JsonLoader::from_json_str(PARTY).context("reading party snapshot")?;
    let characters = loader.characters();

    let dm = UserId::new("dm");
    let mut owners = OwnerOnly::new();
    for character in &characters {
        owners.grant(character.clone(), dm.clone());
    }

    let recomputer = Recomputer::new(Engine::default(), loader, owners);

    for character in &characters {
        println!("=== {} ===", character);
        let sheet = recomputer
            .recompute(&dm, character)
            .with_context(|| format!("recomputing {character}"))?;
        print_sheet(&sheet);

        let poisoned: Vec<&str> = sheet.poisoned().iter().map(|s| s.name.as_str()).collect();
        if !poisoned.is_empty() {
            println!("  Poisoned by cycles: {}", poisoned.join(", "));
        }
        println!();
    }

    println!("=== Unauthorized ===");
    match recomputer.recompute(&UserId::new("player2"), &CharacterId::new("hero")) {
        Ok(_) => println!("  unexpectedly allowed"),
        Err(e) => println!("  {e}"),
    }

    Ok(())
}
