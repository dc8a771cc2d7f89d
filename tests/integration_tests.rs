use statsheet::auth::{AllowAll, OwnerOnly, UserId};
use statsheet::loader::{InMemoryLoader, JsonLoader};
use statsheet::record::{
    ClassLevelRecord, EffectRecord, Operation, ProficiencyRecord, ProficiencyType, StatRecord,
};
use statsheet::*;

fn attributes(names: &[&str]) -> Vec<StatRecord> {
    names.iter().map(|n| StatRecord::new(*n)).collect()
}

/// A small but complete character.
fn fighter() -> CharacterRecords {
    CharacterRecords {
        attributes: attributes(&["strength", "dexterity", "proficiencyBonus", "armorClass", "carryMultiplier"]),
        skills: attributes(&["athletics", "stealth", "strengthSave"]),
        damage_multipliers: attributes(&["fireMultiplier", "coldMultiplier", "poisonMultiplier"]),
        class_levels: vec![
            ClassLevelRecord::new("fighter", 3),
            ClassLevelRecord::new("rogue", 2),
        ],
        effects: vec![
            EffectRecord::value("strength", Operation::Base, 10.0),
            EffectRecord::value("strength", Operation::Base, 12.0),
            EffectRecord::value("strength", Operation::Add, 2.0),
            EffectRecord::value("dexterity", Operation::Base, 15.0),
            EffectRecord::calculation("proficiencyBonus", Operation::Base, "2 + floor((level - 1) / 4)"),
            EffectRecord::value("armorClass", Operation::Base, 10.0),
            EffectRecord::calculation("armorClass", Operation::Add, "dexterityMod"),
            EffectRecord::value("carryMultiplier", Operation::Base, 1.0),
            EffectRecord::value("carryMultiplier", Operation::Mul, 1.5),
            EffectRecord::calculation("athletics", Operation::Add, "strengthMod"),
            EffectRecord::calculation("stealth", Operation::Add, "dexterityMod + rogueLevels"),
            EffectRecord::calculation("stealth", Operation::Disadvantage, "1"),
            EffectRecord::value("fireMultiplier", Operation::Mul, 0.5),
            EffectRecord::value("fireMultiplier", Operation::Mul, 2.0),
            EffectRecord::value("coldMultiplier", Operation::Mul, 0.5),
            EffectRecord::value("poisonMultiplier", Operation::Mul, 0.0),
            EffectRecord::value("poisonMultiplier", Operation::Mul, 0.5),
            EffectRecord::value("poisonMultiplier", Operation::Mul, 2.0),
        ],
        proficiencies: vec![
            ProficiencyRecord::new("athletics", ProficiencyType::Skill, 1.0),
            ProficiencyRecord::new("athletics", ProficiencyType::Skill, 2.0),
            ProficiencyRecord::new("strengthSave", ProficiencyType::Save, 1.0),
        ],
    }
}

#[test]
fn test_attribute_largest_base_plus_add() {
    let sheet = Engine::default().recompute(&fighter());
    let strength = sheet.attribute("strength").unwrap();
    assert_eq!(strength.result, 14.0);
    assert_eq!(strength.modifier, Some(2.0));
}

#[test]
fn test_formula_referencing_modifier() {
    let sheet = Engine::default().recompute(&fighter());
    // 10 + floor((15 - 10) / 2)
    assert_eq!(sheet.attribute("armorClass").unwrap().result, 12.0);
}

#[test]
fn test_total_level_and_class_levels() {
    let sheet = Engine::default().recompute(&fighter());
    assert_eq!(sheet.attribute("proficiencyBonus").unwrap().result, 3.0);
    // dexterityMod 2 + rogueLevels 2
    let stealth = sheet.skill("stealth").unwrap();
    assert_eq!(stealth.result, 4.0);
    assert_eq!(stealth.skill.as_ref().unwrap().disadvantage, 1);
}

#[test]
fn test_skill_takes_best_proficiency() {
    let sheet = Engine::default().recompute(&fighter());
    let athletics = sheet.skill("athletics").unwrap();
    // 3 * 2 + strengthMod 2
    assert_eq!(athletics.result, 8.0);
    assert_eq!(athletics.skill.as_ref().unwrap().proficiency, 2.0);
    assert_eq!(sheet.skill("strengthSave").unwrap().result, 3.0);
}

#[test]
fn test_damage_multipliers() {
    let sheet = Engine::default().recompute(&fighter());
    assert_eq!(sheet.damage_multiplier("fireMultiplier").unwrap().result, 1.0);
    assert_eq!(sheet.damage_multiplier("coldMultiplier").unwrap().result, 0.5);
    assert_eq!(sheet.damage_multiplier("poisonMultiplier").unwrap().result, 0.0);
}

#[test]
fn test_carry_multiplier_keeps_fraction() {
    let sheet = Engine::default().recompute(&fighter());
    assert_eq!(sheet.attribute("carryMultiplier").unwrap().result, 1.5);
}

#[test]
fn test_every_stat_is_computed() {
    let records = fighter();
    let engine = Engine::default();
    let mut state = engine.prepare(&records);
    engine.evaluate(&mut state);
    assert!(state.stats().iter().all(|stat| stat.is_computed()));
    assert_eq!(engine.recompute(&records).len(), 11);
}

#[test]
fn test_recompute_is_idempotent() {
    let engine = Engine::default();
    let first = engine.recompute(&fighter());
    let second = engine.recompute(&fighter());
    assert_eq!(format!("{:?}", first), format!("{:?}", second));
}

#[test]
fn test_plain_skill_with_proficiency_bonus() {
    let records = CharacterRecords {
        attributes: attributes(&["proficiencyBonus"]),
        skills: attributes(&["arcana"]),
        effects: vec![EffectRecord::value("proficiencyBonus", Operation::Base, 2.0)],
        proficiencies: vec![ProficiencyRecord::new("arcana", ProficiencyType::Skill, 1.0)],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    assert_eq!(sheet.skill("arcana").unwrap().result, 2.0);
}

#[test]
fn test_formula_referencing_attribute() {
    let records = CharacterRecords {
        attributes: attributes(&["strength", "carry"]),
        effects: vec![
            EffectRecord::value("strength", Operation::Base, 14.0),
            EffectRecord::calculation("carry", Operation::Base, "strength + 2"),
        ],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    assert_eq!(sheet.attribute("carry").unwrap().result, 16.0);
}

#[test]
fn test_unresolvable_formula_is_text() {
    let records = CharacterRecords {
        attributes: attributes(&["strength"]),
        effects: vec![EffectRecord::calculation("strength", Operation::Add, "foobar + 1")],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    let strength = sheet.attribute("strength").unwrap();
    assert_eq!(
        strength.contributions[0].value,
        FormulaValue::Text("foobar + 1".to_string())
    );
    assert!(strength.result.is_nan());
}

#[test]
fn test_cycle_yields_nan_and_completes() {
    let records = CharacterRecords {
        attributes: attributes(&["a", "b", "c"]),
        effects: vec![
            EffectRecord::calculation("a", Operation::Base, "b"),
            EffectRecord::calculation("b", Operation::Base, "a"),
            EffectRecord::value("c", Operation::Base, 8.0),
        ],
        ..Default::default()
    };
    let run = Engine::default().run(&records);
    assert!(run.sheet.attribute("a").unwrap().result.is_nan());
    assert!(run.sheet.attribute("b").unwrap().result.is_nan());
    assert_eq!(run.sheet.attribute("c").unwrap().result, 8.0);
    assert_eq!(run.graph.cyclic_groups().len(), 1);
}

#[test]
fn test_names_are_case_insensitive() {
    let records = CharacterRecords {
        attributes: attributes(&["Strength", "STRENGTH"]),
        effects: vec![
            EffectRecord::value("strength", Operation::Base, 18.0),
            EffectRecord::value("sTrEnGtH", Operation::Add, 1.0),
        ],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.attribute("Strength").unwrap().result, 19.0);
    assert_eq!(sheet.attribute("strength").unwrap().result, 19.0);
}

#[test]
fn test_effect_on_unknown_stat_is_dropped() {
    let records = CharacterRecords {
        attributes: attributes(&["strength"]),
        effects: vec![
            EffectRecord::value("strength", Operation::Base, 11.0),
            EffectRecord::value("wisdom", Operation::Base, 11.0),
        ],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    assert_eq!(sheet.len(), 1);
    assert_eq!(sheet.attribute("strength").unwrap().modifier, Some(0.0));
}

#[test]
fn test_sheet_serializes_for_persistence() {
    let sheet = Engine::default().recompute(&fighter());
    let json = serde_json::to_value(&sheet).unwrap();
    assert_eq!(json["attributes"]["strength"]["result"], 14.0);
    assert_eq!(json["attributes"]["strength"]["mod"], 2.0);
    assert_eq!(json["damageMultipliers"]["coldMultiplier"]["result"], 0.5);
}

#[test]
fn test_cyclic_sheet_survives_persistence() {
    let records = CharacterRecords {
        attributes: attributes(&["a", "b", "c"]),
        effects: vec![
            EffectRecord::calculation("a", Operation::Base, "b"),
            EffectRecord::calculation("b", Operation::Base, "a"),
            EffectRecord::value("c", Operation::Base, 8.0),
        ],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);

    let json = serde_json::to_string(&sheet).unwrap();
    assert!(!json.contains("null"));

    let restored: StatSheet = serde_json::from_str(&json).unwrap();
    assert!(restored.attribute("a").unwrap().result.is_nan());
    assert!(restored.attribute("b").unwrap().modifier.unwrap().is_nan());
    assert_eq!(restored.attribute("c").unwrap().result, 8.0);
    assert_eq!(format!("{:?}", restored), format!("{:?}", sheet));
}

#[test]
fn test_skill_clamped_before_floor() {
    let records = CharacterRecords {
        skills: attributes(&["sleightOfHand"]),
        effects: vec![
            EffectRecord::value("sleightOfHand", Operation::Add, 7.0),
            EffectRecord::value("sleightOfHand", Operation::Max, 4.5),
        ],
        ..Default::default()
    };
    let sheet = Engine::default().recompute(&records);
    assert_eq!(sheet.skill("sleightOfHand").unwrap().result, 4.0);
}

#[test]
fn test_json_loader_end_to_end() {
    let loader = JsonLoader::from_json_str(
        r#"{
            "hero": {
                "attributes": [{ "name": "wisdom" }, { "name": "proficiencyBonus" }],
                "skills": [{ "name": "perception" }],
                "effects": [
                    { "stat": "wisdom", "operation": "base", "value": 13 },
                    { "stat": "wisdom", "operation": "add", "value": 4, "enabled": false },
                    { "stat": "proficiencyBonus", "operation": "base", "value": 2 },
                    { "stat": "perception", "operation": "add", "calculation": "wisdomMod" }
                ],
                "proficiencies": [
                    { "name": "perception", "type": "skill", "value": 1 },
                    { "name": "perception", "type": "tool", "value": 2 }
                ]
            }
        }"#,
    )
    .unwrap();

    let recomputer = Recomputer::new(Engine::default(), loader, AllowAll);
    let sheet = recomputer
        .recompute(&UserId::new("dm"), &CharacterId::new("hero"))
        .unwrap();
    assert_eq!(sheet.attribute("wisdom").unwrap().result, 13.0);
    assert_eq!(sheet.skill("perception").unwrap().result, 3.0);
}

#[test]
fn test_permission_denied() {
    let hero = CharacterId::new("hero");
    let loader = InMemoryLoader::new();
    loader.insert(hero.clone(), fighter());

    let recomputer = Recomputer::new(Engine::default(), loader, OwnerOnly::new());
    let result = recomputer.recompute(&UserId::new("stranger"), &hero);
    assert_eq!(result, Err(StatError::PermissionDenied { character: hero }));
}

#[test]
fn test_parallel_recomputes_are_independent() {
    let loader = InMemoryLoader::new();
    let mut ids = Vec::new();
    for i in 0..8 {
        let id = CharacterId::new(format!("c-{i}"));
        let mut records = fighter();
        records
            .effects
            .push(EffectRecord::value("strength", Operation::Add, f64::from(i)));
        loader.insert(id.clone(), records);
        ids.push(id);
    }
    let recomputer = Recomputer::new(Engine::default(), loader, AllowAll);
    let user = UserId::new("batch");

    let results: Vec<f64> = std::thread::scope(|scope| {
        let handles: Vec<_> = ids
            .iter()
            .map(|id| {
                let recomputer = &recomputer;
                let user = &user;
                scope.spawn(move || {
                    recomputer
                        .recompute(user, id)
                        .unwrap()
                        .attribute("strength")
                        .unwrap()
                        .result
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result, 14.0 + i as f64);
    }
}
