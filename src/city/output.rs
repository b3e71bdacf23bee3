//! Plain-coordinate snapshot of a generated town
//!
//! The model works with vertex handles; the plan resolves every handle to
//! coordinates so it can be serialized and drawn without the arena.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::city::model::{Features, Model};
use crate::city::wall::CurtainWall;
use crate::city::ward::WardKind;
use crate::core::error::Result;
use crate::core::types::{Point, PointId};
use crate::spatial::arena::PointArena;
use crate::spatial::polygon::Polygon;
use crate::spatial::validation::{GeometricValidator, ValidationError};

pub type Coord = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchPlan {
    pub id: u32,
    pub ward: Option<WardKind>,
    pub label: Option<String>,
    pub within_city: bool,
    pub within_walls: bool,
    pub outline: Vec<Coord>,
    pub buildings: Vec<Vec<Coord>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallPlan {
    pub real: bool,
    pub outline: Vec<Coord>,
    pub gates: Vec<Coord>,
    pub towers: Vec<Coord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityPlan {
    pub seed: u64,
    pub attempts: u32,
    pub features: Features,
    pub city_radius: f64,
    pub patches: Vec<PatchPlan>,
    pub border: Option<WallPlan>,
    pub castle: Option<WallPlan>,
    pub gates: Vec<Coord>,
    pub streets: Vec<Vec<Coord>>,
    pub roads: Vec<Vec<Coord>>,
    pub arteries: Vec<Vec<Coord>>,
}

/// Counts for a quick look at a plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub patches: usize,
    pub city_patches: usize,
    pub walled_patches: usize,
    pub buildings: usize,
    pub gates: usize,
    pub towers: usize,
    pub streets: usize,
    pub roads: usize,
    pub arteries: usize,
    pub wards: BTreeMap<String, usize>,
}

/// A building footprint that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct FootprintIssue {
    pub patch: u32,
    pub building: usize,
    pub error: ValidationError,
}

impl CityPlan {
    pub fn from_model(model: &Model, seed: u64) -> Self {
        let arena = &model.arena;
        let path = |ids: &Vec<PointId>| coords(arena, ids);

        let patches = model
            .patches
            .iter()
            .map(|patch| {
                let ward = patch.ward.as_ref();
                PatchPlan {
                    id: patch.id.0,
                    ward: ward.map(|w| w.kind),
                    label: ward.and_then(|w| w.label()).map(str::to_owned),
                    within_city: patch.within_city,
                    within_walls: patch.within_walls,
                    outline: coords(arena, &patch.ring.vertices),
                    buildings: ward
                        .map(|w| w.buildings.iter().map(polygon_coords).collect())
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self {
            seed,
            attempts: model.attempts,
            features: model.features,
            city_radius: model.city_radius,
            patches,
            border: model.border.as_ref().map(|w| wall_plan(arena, w)),
            castle: model.castle.as_ref().map(|w| wall_plan(arena, w)),
            gates: coords(arena, &model.gates),
            streets: model.streets.iter().map(path).collect(),
            roads: model.roads.iter().map(path).collect(),
            arteries: model.arteries.iter().map(path).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary {
            patches: self.patches.len(),
            gates: self.gates.len(),
            streets: self.streets.len(),
            roads: self.roads.len(),
            arteries: self.arteries.len(),
            ..Default::default()
        };

        for patch in &self.patches {
            summary.city_patches += patch.within_city as usize;
            summary.walled_patches += patch.within_walls as usize;
            summary.buildings += patch.buildings.len();
            if let Some(label) = &patch.label {
                *summary.wards.entry(label.clone()).or_default() += 1;
            }
        }
        summary.towers = self
            .border
            .iter()
            .chain(&self.castle)
            .map(|w| w.towers.len())
            .sum();

        summary
    }

    /// Footprints that are degenerate or cross themselves
    ///
    /// Winding is not checked: footprints keep the orientation of the cuts
    /// that produced them.
    pub fn footprint_issues(&self) -> Vec<FootprintIssue> {
        let mut issues = Vec::new();
        for patch in &self.patches {
            for (building, outline) in patch.buildings.iter().enumerate() {
                let points: Vec<Point> = outline.iter().map(|&[x, y]| Point::new(x, y)).collect();
                for error in GeometricValidator::validate_polygon(&points) {
                    if matches!(error, ValidationError::ClockwiseWinding) {
                        continue;
                    }
                    issues.push(FootprintIssue {
                        patch: patch.id,
                        building,
                        error,
                    });
                }
            }
        }
        issues
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} patches ({} in town, {} walled), {} buildings",
            self.patches, self.city_patches, self.walled_patches, self.buildings
        )?;
        writeln!(
            f,
            "{} gates, {} towers, {} streets, {} roads, {} arteries",
            self.gates, self.towers, self.streets, self.roads, self.arteries
        )?;
        for (label, count) in &self.wards {
            writeln!(f, "  {:<16}{}", label, count)?;
        }
        Ok(())
    }
}

fn coords(arena: &PointArena, ids: &[PointId]) -> Vec<Coord> {
    ids.iter()
        .map(|&id| {
            let p = arena.get(id);
            [p.x, p.y]
        })
        .collect()
}

fn polygon_coords(polygon: &Polygon) -> Vec<Coord> {
    polygon.vertices.iter().map(|p| [p.x, p.y]).collect()
}

fn wall_plan(arena: &PointArena, wall: &CurtainWall) -> WallPlan {
    WallPlan {
        real: wall.real,
        outline: coords(arena, &wall.shape.vertices),
        gates: coords(arena, &wall.gates),
        towers: coords(arena, &wall.towers),
    }
}
