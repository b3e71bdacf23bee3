//! Integration tests for town generation
//!
//! These tests drive the public pipeline end to end:
//! - Same seed, same town
//! - Gates, walls and streets agree with each other
//! - Ward placement rules hold on hand-built layouts
//! - Configuration overrides and error classification

use towngen::city::model::{generate, Features, Model};
use towngen::city::output::CityPlan;
use towngen::city::ward::{Ward, WardKind};
use towngen::core::config::GeneratorConfig;
use towngen::core::error::TownError;
use towngen::core::types::{Point, PointId};
use towngen::spatial::arena::Ring;

fn config(patches: usize) -> GeneratorConfig {
    GeneratorConfig::default().with_patches(patches)
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_same_seed_same_plan() {
    let config = config(15);
    let a = CityPlan::from_model(&generate(&config, 42).unwrap(), 42);
    let b = CityPlan::from_model(&generate(&config, 42).unwrap(), 42);
    assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
}

#[test]
fn test_seeds_differ() {
    let config = config(15);
    let a = CityPlan::from_model(&generate(&config, 1).unwrap(), 1);
    let b = CityPlan::from_model(&generate(&config, 2).unwrap(), 2);
    assert_ne!(a.patches, b.patches);
}

// ============================================================================
// Walls, gates and streets
// ============================================================================

#[test]
fn test_gates_lie_on_their_walls() {
    for seed in 0..5 {
        let model = generate(&config(15), seed).unwrap();
        let border = model.border.as_ref().unwrap();
        assert!(!border.gates.is_empty(), "seed {} has no gates", seed);
        for gate in &border.gates {
            assert!(border.shape.contains(*gate));
        }
        if let Some(castle) = &model.castle {
            for gate in &castle.gates {
                assert!(castle.shape.contains(*gate));
            }
        }
        // Border gates come first
        assert_eq!(&model.gates[..border.gates.len()], border.gates.as_slice());
    }
}

#[test]
fn test_every_gate_gets_a_street() {
    let model = generate(&config(15), 42).unwrap();
    assert_eq!(model.streets.len(), model.gates.len());
    for (street, gate) in model.streets.iter().zip(&model.gates) {
        // Streets run from the plaza end back to their gate
        assert_eq!(street.last(), Some(gate));
    }
    assert!(!model.arteries.is_empty());
}

#[test]
fn test_inner_patches_are_walled() {
    let mut config = config(15);
    config.walls = Some(true);
    let model = generate(&config, 8).unwrap();
    assert!(model.wall().is_some());
    for &id in &model.inner {
        let patch = model.patch(id).unwrap();
        assert!(patch.within_city && patch.within_walls);
    }
}

#[test]
fn test_unwalled_town_has_open_border() {
    let mut config = config(15);
    config.walls = Some(false);
    let model = generate(&config, 8).unwrap();
    assert!(model.wall().is_none());
    let border = model.border.as_ref().unwrap();
    assert!(!border.real);
    assert!(border.towers.is_empty());
}

#[test]
fn test_single_patch_wall_follows_patch() {
    let mut config = config(1);
    config.plaza = Some(true);
    config.citadel = Some(false);
    config.walls = Some(true);
    let model = generate(&config, 3).unwrap();

    let inner = model.patch(model.inner[0]).unwrap();
    let border = model.border.as_ref().unwrap();
    assert_eq!(border.shape, inner.ring);
    assert!(!border.gates.is_empty());
}

#[test]
fn test_citadel_is_a_castle() {
    let mut config = config(15);
    config.citadel = Some(true);
    let model = generate(&config, 21).unwrap();
    let citadel = model.citadel_patch().unwrap();
    assert!(citadel.is(WardKind::Castle));
    assert!(model.castle.as_ref().is_some_and(|c| c.real));
    assert!(!model.inner.contains(&citadel.id));
}

#[test]
fn test_tiny_towns_generate_without_citadel() {
    for patches in 1..3 {
        for seed in 0..5 {
            let model = generate(&config(patches), seed).unwrap();
            assert!(!model.features.citadel);
            assert!(model.citadel.is_none());
        }
    }
}

// ============================================================================
// Wards
// ============================================================================

#[test]
fn test_every_patch_has_a_ward() {
    let model = generate(&config(15), 42).unwrap();
    assert!(model.patches.iter().all(|p| p.ward.is_some()));
    for &id in &model.inner {
        assert!(!model.patch(id).unwrap().is(WardKind::Common));
    }
}

#[test]
fn test_plaza_is_a_market() {
    let mut config = config(15);
    config.plaza = Some(true);
    let model = generate(&config, 13).unwrap();
    assert!(model.plaza_patch().unwrap().is(WardKind::Market));
}

/// Three unit squares in a row, all inside the town
fn row_of_three() -> Model {
    let features = Features {
        plaza: false,
        citadel: false,
        walls: false,
    };
    let mut model = Model::new(&config(3), features);
    let bottom: Vec<PointId> = (0..4).map(|x| model.arena.alloc(Point::new(x as f64 * 10.0, 0.0))).collect();
    let top: Vec<PointId> = (0..4).map(|x| model.arena.alloc(Point::new(x as f64 * 10.0, 10.0))).collect();
    for x in 0..3 {
        let id = model.add_patch(Ring::new(vec![bottom[x], bottom[x + 1], top[x + 1], top[x]]));
        model.inner.push(id);
        model.patch_mut(id).unwrap().within_city = true;
    }
    model
}

#[test]
fn test_markets_never_touch() {
    let mut model = row_of_three();
    let first = model.inner[0];
    model.patch_mut(first).unwrap().ward = Some(Ward {
        kind: WardKind::Market,
        profile: None,
        buildings: Vec::new(),
    });

    let middle = model.patch(model.inner[1]).unwrap();
    let last = model.patch(model.inner[2]).unwrap();
    assert_eq!(WardKind::Market.rate(&model, middle), f64::INFINITY);
    assert!(WardKind::Market.rate(&model, last).is_finite());
}

#[test]
fn test_generated_markets_never_touch() {
    for seed in 0..6 {
        let model = generate(&config(15), seed).unwrap();
        let markets: Vec<_> = model.patches.iter().filter(|p| p.is(WardKind::Market)).collect();
        for (i, a) in markets.iter().enumerate() {
            for b in &markets[i + 1..] {
                assert!(!a.borders(b), "seed {}: markets {:?} and {:?} touch", seed, a.id, b.id);
            }
        }
    }
}

#[test]
fn test_military_goes_anywhere_without_fortifications() {
    let model = row_of_three();
    // No wall and no citadel: anywhere will do
    let patch = model.patch(model.inner[1]).unwrap();
    assert_eq!(WardKind::Military.rate(&model, patch), 0.0);
}

#[test]
fn test_building_coordinates_are_finite() {
    let model = generate(&config(15), 42).unwrap();
    let plan = CityPlan::from_model(&model, 42);
    assert!(plan.summary().buildings > 0);
    for patch in &plan.patches {
        for building in &patch.buildings {
            for &[x, y] in building {
                assert!(x.is_finite() && y.is_finite());
            }
        }
    }
}

// ============================================================================
// Configuration and errors
// ============================================================================

#[test]
fn test_toml_overrides() {
    let config = GeneratorConfig::from_toml_str("patch_count = 20\nwalls = false\n").unwrap();
    assert_eq!(config.patch_count, 20);
    assert_eq!(config.walls, Some(false));
    assert_eq!(config.max_attempts, GeneratorConfig::default().max_attempts);
}

#[test]
fn test_invalid_config_rejected_before_generation() {
    let mut config = config(15);
    config.max_attempts = 0;
    let err = generate(&config, 1).unwrap_err();
    assert!(matches!(err, TownError::Config(_)));
    assert!(!err.is_retryable());

    let mut tiny = self::config(2);
    tiny.citadel = Some(true);
    assert!(matches!(generate(&tiny, 1), Err(TownError::Config(_))));
}

#[test]
fn test_error_classification() {
    assert!(TownError::Geometry("bad".into()).is_retryable());
    assert!(TownError::Routing {
        from: PointId(0),
        to: PointId(1)
    }
    .is_retryable());
    assert!(TownError::Split {
        a: PointId(0),
        b: PointId(1)
    }
    .is_retryable());

    let exhausted = TownError::RetriesExhausted {
        attempts: 3,
        last: Box::new(TownError::Geometry("bad".into())),
    };
    assert!(!exhausted.is_retryable());
    assert!(exhausted.to_string().contains("3 attempts"));
}
