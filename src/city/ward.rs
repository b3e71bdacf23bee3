//! Ward archetypes: what a patch is used for and what gets built on it
//!
//! The set of archetypes is closed. Each one is described by three things
//! dispatched through [`WardKind`]:
//! - a block profile drawn when the ward is founded (common wards only)
//! - an optional location rating used during assignment, lower is better
//! - a geometry routine producing building footprints

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::city::building::{
    create_alleys, create_ortho, merge_footprints, BlockProfile, SubdivisionLimits, ALLEY, MAIN_STREET,
    REGULAR_STREET,
};
use crate::city::cutter;
use crate::city::model::Model;
use crate::city::patch::Patch;
use crate::core::error::Result;
use crate::core::random::RandomSource;
use crate::core::types::Point;
use crate::spatial::polygon::{distance_to_line, Polygon};

/// Footprint vertices closer than this are merged
const SIMPLIFY_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WardKind {
    Craftsmen,
    Merchant,
    Slum,
    Patriciate,
    Administration,
    Military,
    Gate,
    Market,
    Cathedral,
    Castle,
    Park,
    Farm,
    /// Open countryside, nothing is built
    Common,
}

/// Order in which archetypes are handed out to the unassigned city patches
///
/// Lightly shuffled per town; once exhausted every further patch becomes a
/// [`WardKind::Slum`].
#[rustfmt::skip]
pub const WARD_DECK: [WardKind; 36] = {
    use WardKind::*;
    [
        Craftsmen, Craftsmen, Merchant, Craftsmen, Craftsmen, Cathedral,
        Craftsmen, Craftsmen, Craftsmen, Craftsmen, Craftsmen,
        Craftsmen, Craftsmen, Craftsmen, Administration, Craftsmen,
        Slum, Craftsmen, Slum, Patriciate, Market,
        Slum, Craftsmen, Craftsmen, Craftsmen, Slum,
        Craftsmen, Craftsmen, Craftsmen, Military, Slum,
        Craftsmen, Park, Patriciate, Market, Merchant,
    ]
};

impl WardKind {
    /// Map label, `None` for open countryside
    pub fn label(self) -> Option<&'static str> {
        match self {
            WardKind::Craftsmen => Some("Craftsmen"),
            WardKind::Merchant => Some("Merchant"),
            WardKind::Slum => Some("Slum"),
            WardKind::Patriciate => Some("Patriciate"),
            WardKind::Administration => Some("Administration"),
            WardKind::Military => Some("Military"),
            WardKind::Gate => Some("Gate"),
            WardKind::Market => Some("Market"),
            WardKind::Cathedral => Some("Temple"),
            WardKind::Castle => Some("Castle"),
            WardKind::Park => Some("Park"),
            WardKind::Farm => Some("Farm"),
            WardKind::Common => None,
        }
    }

    /// Draw the block profile of a freshly founded ward
    ///
    /// Only archetypes that subdivide their block with alleys have one. The
    /// draws are taken in a fixed order: two for the area, one for the chaos.
    pub fn draw_profile(self, rng: &mut dyn RandomSource) -> Option<BlockProfile> {
        let (area_base, area_spread, chaos_base, chaos_spread, size_chaos, empty_prob) = match self {
            WardKind::Craftsmen => (10.0, 80.0, 0.5, 0.2, 0.6, 0.04),
            WardKind::Merchant => (50.0, 60.0, 0.5, 0.3, 0.7, 0.15),
            WardKind::Slum => (10.0, 30.0, 0.6, 0.4, 0.8, 0.03),
            WardKind::Patriciate => (80.0, 30.0, 0.5, 0.3, 0.8, 0.2),
            WardKind::Administration => (80.0, 30.0, 0.1, 0.3, 0.3, 0.04),
            WardKind::Gate => (10.0, 50.0, 0.5, 0.3, 0.7, 0.04),
            _ => return None,
        };
        let min_area = area_base + area_spread * rng.float() * rng.float();
        let grid_chaos = chaos_base + rng.float() * chaos_spread;
        Some(BlockProfile {
            min_area,
            grid_chaos,
            size_chaos,
            empty_prob,
        })
    }

    /// Whether assignment ranks patches for this archetype
    ///
    /// Unrated archetypes take a random unassigned patch.
    pub fn is_rated(self) -> bool {
        !matches!(self, WardKind::Craftsmen | WardKind::Gate | WardKind::Park)
    }

    /// Suitability of `patch` for this archetype, lower is better
    ///
    /// `f64::INFINITY` forbids the location.
    pub fn rate(self, model: &Model, patch: &Patch) -> f64 {
        let shape = patch.shape(&model.arena);
        let plaza = model.plaza_patch();
        let focus = plaza.map_or_else(|| model.center_point(), |p| p.shape(&model.arena).center());

        match self {
            WardKind::Market => {
                // One market should not touch another
                let crowded = model
                    .inner
                    .iter()
                    .filter_map(|&id| model.patch(id))
                    .any(|p| p.is(WardKind::Market) && p.borders(patch));
                if crowded {
                    return f64::INFINITY;
                }
                // ... and shouldn't be much larger than the plaza
                match plaza {
                    Some(plaza) => shape.area() / plaza.shape(&model.arena).area(),
                    None => shape.distance(&model.center_point()),
                }
            }
            WardKind::Cathedral => match plaza {
                Some(plaza) if patch.borders(plaza) => -1.0 / shape.area(),
                _ => shape.distance(&focus) * shape.area(),
            },
            WardKind::Administration => match plaza {
                Some(plaza) if patch.borders(plaza) => 0.0,
                _ => shape.distance(&focus),
            },
            WardKind::Merchant => shape.distance(&focus),
            WardKind::Slum => -shape.distance(&focus),
            WardKind::Military => {
                let citadel = model.citadel_patch();
                let wall = model.wall();
                if citadel.is_some_and(|c| c.borders(patch)) {
                    0.0
                } else if wall.is_some_and(|w| w.borders(patch)) {
                    1.0
                } else if citadel.is_none() && wall.is_none() {
                    0.0
                } else {
                    f64::INFINITY
                }
            }
            WardKind::Patriciate => {
                // Prefers parks next door, avoids slums
                let mut rate = 0.0;
                for p in &model.patches {
                    if p.id != patch.id && p.borders(patch) {
                        match p.kind() {
                            Some(WardKind::Park) => rate -= 1.0,
                            Some(WardKind::Slum) => rate += 1.0,
                            _ => {}
                        }
                    }
                }
                rate
            }
            _ => 0.0,
        }
    }
}

/// A ward founded on a patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ward {
    pub kind: WardKind,
    pub profile: Option<BlockProfile>,
    pub buildings: Vec<Polygon>,
}

impl Ward {
    pub fn new(kind: WardKind, rng: &mut dyn RandomSource) -> Self {
        Self {
            kind,
            profile: kind.draw_profile(rng),
            buildings: Vec::new(),
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        self.kind.label()
    }
}

/// Building footprints for the ward of `patch`, already simplified
pub fn build_geometry(
    model: &Model,
    patch: &Patch,
    rng: &mut dyn RandomSource,
    limits: SubdivisionLimits,
) -> Result<Vec<Polygon>> {
    let Some(ward) = &patch.ward else {
        return Ok(Vec::new());
    };

    let buildings = match ward.kind {
        WardKind::Common => Vec::new(),
        WardKind::Military => {
            let block = city_block(model, patch);
            let profile = BlockProfile {
                min_area: block.area().sqrt() * (1.0 + rng.float()),
                grid_chaos: 0.1 + rng.float() * 0.3,
                size_chaos: 0.3,
                empty_prob: 0.25,
            };
            create_alleys(&block, &profile, rng, limits)?
        }
        WardKind::Castle => {
            let block = patch.shape(&model.arena).shrink_eq(MAIN_STREET * 2.0);
            create_ortho(&block, block.area().sqrt() * 4.0, 0.6, rng, limits)?
        }
        WardKind::Cathedral => {
            if rng.chance(0.4) {
                let thickness = 2.0 + rng.float() * 4.0;
                cutter::ring(&city_block(model, patch), thickness)
            } else {
                create_ortho(&city_block(model, patch), 50.0, 0.8, rng, limits)?
            }
        }
        WardKind::Market => merge_footprints(&[market_monument(&patch.shape(&model.arena), rng)]),
        WardKind::Park => {
            let block = city_block(model, patch);
            let groves = if block.compactness() >= 0.7 {
                cutter::radial(&block, block.centroid(), ALLEY)
            } else {
                cutter::semi_radial(&block, ALLEY)
            };
            merge_footprints(&groves)
        }
        WardKind::Farm => {
            let shape = patch.shape(&model.arena);
            let mut housing = Polygon::rect(4.0, 4.0);
            let corner = shape.vertices[rng.int(0, shape.len() as i64 - 1).max(0) as usize];
            let pos = corner.lerp(&shape.centroid(), 0.3 + rng.float() * 0.4);
            housing.rotate(rng.float() * PI);
            housing.offset(pos);
            merge_footprints(&create_ortho(&housing, 8.0, 0.5, rng, limits)?)
        }
        WardKind::Craftsmen
        | WardKind::Merchant
        | WardKind::Slum
        | WardKind::Patriciate
        | WardKind::Administration
        | WardKind::Gate => {
            let Some(profile) = ward.profile else {
                return Ok(Vec::new());
            };
            let block = city_block(model, patch);
            let lots = create_alleys(&block, &profile, rng, limits)?;
            if model.is_enclosed(patch) {
                lots
            } else {
                filter_outskirts(model, patch, lots, rng)
            }
        }
    };

    Ok(buildings.iter().map(|b| b.simplify(SIMPLIFY_THRESHOLD)).collect())
}

/// A statue or fountain on the market square
fn market_monument(shape: &Polygon, rng: &mut dyn RandomSource) -> Polygon {
    let statue = rng.chance(0.6);
    // Statues are always pushed toward an edge, fountains sometimes
    let offset = statue || rng.chance(0.3);

    let edge = shape.longest_edge();
    let v0 = shape.vertices[edge];
    let v1 = shape.vertices[shape.next_index(edge)];

    let mut object = if statue {
        let mut rect = Polygon::rect(1.0 + rng.float(), 1.0 + rng.float());
        rect.rotate((v1.y - v0.y).atan2(v1.x - v0.x));
        rect
    } else {
        Polygon::circle(1.0 + rng.float())
    };

    let centroid = shape.centroid();
    if offset {
        let gravity = v0.midpoint(&v1);
        object.offset(centroid.lerp(&gravity, 0.2 + rng.float() * 0.4));
    } else {
        object.offset(centroid);
    }
    object
}

/// The patch inset by half the width of the street running along each edge
///
/// Edges on the wall keep a main street's distance, edges facing the plaza
/// or an artery are main streets, other edges are regular streets inside
/// the town and alleys outside.
pub fn city_block(model: &Model, patch: &Patch) -> Polygon {
    let wall = model.wall();
    let inner_patch = wall.is_none() || patch.within_walls;
    let plaza = model.plaza_patch();

    let inset: Vec<f64> = patch
        .ring
        .edges()
        .map(|(_, v0, v1)| {
            if wall.is_some_and(|w| w.borders_by(patch, v0, v1)) {
                return MAIN_STREET / 2.0;
            }
            let on_street = (inner_patch && plaza.is_some_and(|p| p.ring.find_edge(v1, v0).is_some()))
                || model.on_artery(v0, v1);
            let width = if on_street {
                MAIN_STREET
            } else if inner_patch {
                REGULAR_STREET
            } else {
                ALLEY
            };
            width / 2.0
        })
        .collect();

    let shape = patch.shape(&model.arena);
    if shape.is_convex() {
        shape.shrink(&inset)
    } else {
        shape.buffer(&inset)
    }
}

/// Edge of a patch that pulls buildings toward it
struct PopulatedEdge {
    origin: Point,
    dir: Point,
    /// Largest weighted distance from the edge line to any patch vertex
    reach: f64,
}

/// Thin out buildings of a ward on the edge of town
///
/// Buildings stay dense along streets and next to other city patches and
/// thin out toward open country.
pub fn filter_outskirts(model: &Model, patch: &Patch, buildings: Vec<Polygon>, rng: &mut dyn RandomSource) -> Vec<Polygon> {
    let shape = patch.shape(&model.arena);
    let mut populated: Vec<PopulatedEdge> = Vec::new();

    for (i, v1, v2) in patch.ring.edges() {
        let factor = if model.on_artery(v1, v2) {
            1.0
        } else {
            match model.neighbour(patch, v1) {
                Some(n) if n.within_city => {
                    if model.is_enclosed(n) {
                        1.0
                    } else {
                        0.4
                    }
                }
                _ => continue,
            }
        };

        let origin = shape.vertices[i];
        let dir = shape.vertices[shape.next_index(i)] - origin;
        let mut reach = f64::NEG_INFINITY;
        for (j, &id) in patch.ring.vertices.iter().enumerate() {
            let d = if id != v1 && id != v2 {
                distance_to_line(origin, dir, shape.vertices[j]) * factor
            } else {
                0.0
            };
            reach = reach.max(d);
        }
        // A flat ring has nothing to measure against
        if reach > 0.0 {
            populated.push(PopulatedEdge { origin, dir, reach });
        }
    }

    // 1 at gates, random for vertices deep inside the town, 0 on open country
    let density: Vec<f64> = patch
        .ring
        .vertices
        .iter()
        .map(|&v| {
            if model.gates.contains(&v) {
                1.0
            } else if model
                .patch_by_vertex(v)
                .iter()
                .all(|&id| model.patch(id).is_some_and(|p| p.within_city))
            {
                2.0 * rng.float()
            } else {
                0.0
            }
        })
        .collect();

    buildings
        .into_iter()
        .filter(|building| {
            let mut min_dist = 1.0;
            for edge in &populated {
                for v in &building.vertices {
                    let dist = distance_to_line(edge.origin, edge.dir, *v) / edge.reach;
                    if dist < min_dist {
                        min_dist = dist;
                    }
                }
            }

            let weights = shape.interpolate(&building.center());
            let p: f64 = density.iter().zip(&weights).map(|(d, w)| d * w).sum();
            let roll = rng.fuzzy(1.0);
            // Open country keeps nothing
            p > 0.0 && roll > min_dist / p
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::seeded;

    #[test]
    fn test_deck_composition() {
        let count = |kind| WARD_DECK.iter().filter(|&&k| k == kind).count();
        assert_eq!(count(WardKind::Craftsmen), 21);
        assert_eq!(count(WardKind::Slum), 5);
        assert_eq!(count(WardKind::Market), 2);
        assert_eq!(count(WardKind::Merchant), 2);
        assert_eq!(count(WardKind::Patriciate), 2);
        assert_eq!(count(WardKind::Cathedral), 1);
        assert_eq!(count(WardKind::Military), 1);
        assert_eq!(count(WardKind::Park), 1);
    }

    #[test]
    fn test_labels() {
        assert_eq!(WardKind::Cathedral.label(), Some("Temple"));
        assert_eq!(WardKind::Castle.label(), Some("Castle"));
        assert_eq!(WardKind::Common.label(), None);
    }

    #[test]
    fn test_profile_ranges() {
        let mut rng = seeded(17);
        for _ in 0..200 {
            let p = WardKind::Craftsmen.draw_profile(&mut rng).unwrap();
            assert!((10.0..90.0).contains(&p.min_area));
            assert!((0.5..0.7).contains(&p.grid_chaos));
            assert_eq!(p.size_chaos, 0.6);
            assert_eq!(p.empty_prob, 0.04);

            let p = WardKind::Slum.draw_profile(&mut rng).unwrap();
            assert!((10.0..40.0).contains(&p.min_area));
            assert!((0.6..1.0).contains(&p.grid_chaos));
        }
    }

    #[test]
    fn test_special_wards_draw_nothing() {
        let mut a = seeded(5);
        let mut b = seeded(5);
        for kind in [WardKind::Market, WardKind::Castle, WardKind::Park, WardKind::Farm, WardKind::Common] {
            assert!(Ward::new(kind, &mut a).profile.is_none());
        }
        assert_eq!(a.float().to_bits(), b.float().to_bits());
    }

    #[test]
    fn test_unrated_kinds() {
        assert!(!WardKind::Craftsmen.is_rated());
        assert!(!WardKind::Gate.is_rated());
        assert!(!WardKind::Park.is_rated());
        assert!(WardKind::Slum.is_rated());
        assert!(WardKind::Market.is_rated());
    }

    #[test]
    fn test_monument_stays_on_square() {
        let square = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 20.0),
            Point::new(0.0, 20.0),
        ]);
        let mut rng = seeded(8);
        for _ in 0..50 {
            let m = market_monument(&square, &mut rng);
            let c = m.center();
            assert!(c.x > 5.0 && c.x < 15.0);
            assert!(c.y > -1.0 && c.y < 15.0);
            assert!(m.area().abs() > 0.9);
        }
    }
}
