//! Building lots: recursive subdivision of a city block into footprints
//!
//! Both subdividers walk an explicit work stack instead of recursing, and
//! take their random draws in depth-first order: a half is fully subdivided
//! before its sibling is even measured.

use std::f64::consts::PI;

use geo::BooleanOps;
use geo_types::{Coord, LineString, MultiPolygon};
use serde::{Deserialize, Serialize};

use crate::city::cutter;
use crate::core::error::{Result, TownError};
use crate::core::random::RandomSource;
use crate::core::types::Point;
use crate::spatial::polygon::Polygon;

/// Half of these widths is inset from each side of a street
pub const MAIN_STREET: f64 = 2.0;
pub const REGULAR_STREET: f64 = 1.0;
pub const ALLEY: f64 = 0.6;

/// Pieces are grown by this factor before merging so shared edges overlap
const MERGE_INFLATION: f64 = 1.001;

/// Sizing and regularity of the lots in a ward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockProfile {
    /// Target lot area
    pub min_area: f64,
    /// 0 = lots cut straight through the middle, 1 = skewed and off-center cuts
    pub grid_chaos: f64,
    /// Spread of lot areas around `min_area`
    pub size_chaos: f64,
    /// Probability that a finished lot is left empty
    pub empty_prob: f64,
}

/// Upper bounds on the work one subdivision may do
#[derive(Debug, Clone, Copy)]
pub struct SubdivisionLimits {
    pub max_steps: usize,
    pub max_retries: usize,
}

enum AlleyTask {
    Cut { poly: Polygon, split: bool },
    Measure(Polygon),
}

/// Split a block along its longest edges until every piece is lot-sized
///
/// Cuts that qualify as `split` leave an alley between the halves.
pub fn create_alleys(
    block: &Polygon,
    profile: &BlockProfile,
    rng: &mut dyn RandomSource,
    limits: SubdivisionLimits,
) -> Result<Vec<Polygon>> {
    let mut lots = Vec::new();
    let mut stack = vec![AlleyTask::Cut {
        poly: block.clone(),
        split: true,
    }];
    let mut steps = 0;

    while let Some(task) = stack.pop() {
        match task {
            AlleyTask::Cut { poly, split } => {
                steps += 1;
                if steps > limits.max_steps {
                    return Err(TownError::Geometry(format!(
                        "alley subdivision exceeded {} cuts",
                        limits.max_steps
                    )));
                }

                let v = poly.longest_edge();
                let spread = 0.8 * profile.grid_chaos;
                let ratio = (1.0 - spread) / 2.0 + rng.float() * spread;

                // Small blocks are cut square to keep buildings rectangular
                let angle_spread = if poly.area() < profile.min_area * 4.0 {
                    0.0
                } else {
                    PI / 6.0 * profile.grid_chaos
                };
                let angle = (rng.float() - 0.5) * angle_spread;

                let gap = if split { ALLEY } else { 0.0 };
                let halves = cutter::bisect(&poly, v, ratio, angle, gap);
                stack.extend(halves.into_iter().rev().map(AlleyTask::Measure));
            }
            AlleyTask::Measure(half) => {
                let area = half.area();
                let threshold = profile.min_area * 2f64.powf(4.0 * profile.size_chaos * (rng.float() - 0.5));
                if area < threshold {
                    if !rng.chance(profile.empty_prob) {
                        lots.push(half);
                    }
                } else {
                    let split = area > profile.min_area / (rng.float() * rng.float());
                    stack.push(AlleyTask::Cut { poly: half, split });
                }
            }
        }
    }

    Ok(lots)
}

enum OrthoTask {
    Slice(Polygon),
    Measure(Polygon),
}

/// Slice a block into lots aligned with its longest edge
///
/// Every cut runs along one of two fixed perpendicular axes. Lots smaller
/// than `min_block_area` are kept with probability `fill`; a pass that keeps
/// nothing is repeated.
pub fn create_ortho(
    poly: &Polygon,
    min_block_area: f64,
    fill: f64,
    rng: &mut dyn RandomSource,
    limits: SubdivisionLimits,
) -> Result<Vec<Polygon>> {
    if poly.area() < min_block_area {
        return Ok(vec![poly.clone()]);
    }

    let c1 = poly.vector(poly.longest_edge());
    let c2 = c1.rotate90();

    for _ in 0..limits.max_retries {
        let lots = ortho_pass(poly, c1, c2, min_block_area, fill, rng, limits.max_steps)?;
        if !lots.is_empty() {
            return Ok(lots);
        }
    }

    Err(TownError::Geometry(format!(
        "orthogonal slicing kept no lot in {} passes",
        limits.max_retries
    )))
}

fn ortho_pass(
    poly: &Polygon,
    c1: Point,
    c2: Point,
    min_block_area: f64,
    fill: f64,
    rng: &mut dyn RandomSource,
    max_steps: usize,
) -> Result<Vec<Polygon>> {
    let mut lots = Vec::new();
    let mut stack = vec![OrthoTask::Slice(poly.clone())];
    let mut steps = 0;

    while let Some(task) = stack.pop() {
        match task {
            OrthoTask::Slice(poly) => {
                steps += 1;
                if steps > max_steps {
                    return Err(TownError::Geometry(format!(
                        "orthogonal slicing exceeded {} cuts",
                        max_steps
                    )));
                }

                let i0 = poly.longest_edge();
                let v0 = poly.vertices[i0];
                let v1 = poly.vertices[poly.next_index(i0)];
                let v = v1 - v0;

                let ratio = 0.4 + rng.float() * 0.2;
                let p1 = v0.lerp(&v1, ratio);

                // Cut across the edge, along whichever axis is closer to perpendicular
                let c = if v.dot(&c1).abs() < v.dot(&c2).abs() { c1 } else { c2 };

                let halves = poly.cut(p1, p1 + c, 0.0);
                stack.extend(halves.into_iter().rev().map(OrthoTask::Measure));
            }
            OrthoTask::Measure(half) => {
                if half.area() < min_block_area * 2f64.powf(rng.normal() * 2.0 - 1.0) {
                    if rng.chance(fill) {
                        lots.push(half);
                    }
                } else {
                    stack.push(OrthoTask::Slice(half));
                }
            }
        }
    }

    Ok(lots)
}

/// Fuse touching pieces into single building outlines
///
/// Each piece is scaled up slightly about its centroid so that pieces sharing
/// an edge overlap, then everything is unioned. Pieces that stay apart come
/// back as separate outlines, all counter-clockwise.
pub fn merge_footprints(pieces: &[Polygon]) -> Vec<Polygon> {
    let mut merged: Option<MultiPolygon<f64>> = None;
    for piece in pieces.iter().filter(|p| p.len() >= 3) {
        let grown = MultiPolygon::new(vec![to_geo(&inflate(piece, MERGE_INFLATION))]);
        merged = Some(match merged {
            Some(acc) => acc.union(&grown),
            None => grown,
        });
    }

    let Some(merged) = merged else {
        return Vec::new();
    };
    merged
        .0
        .iter()
        .filter_map(|poly| {
            let ring = &poly.exterior().0;
            // geo rings repeat the first coordinate at the end
            let open = ring.len().saturating_sub(1);
            if open < 3 {
                return None;
            }
            let outline = Polygon::new(ring[..open].iter().map(|c| Point::new(c.x, c.y)).collect());
            Some(if outline.area() < 0.0 { outline.reversed() } else { outline })
        })
        .collect()
}

fn inflate(poly: &Polygon, factor: f64) -> Polygon {
    let c = poly.centroid();
    Polygon::new(poly.vertices.iter().map(|&v| c + (v - c) * factor).collect())
}

fn to_geo(poly: &Polygon) -> geo_types::Polygon<f64> {
    let ring: Vec<Coord<f64>> = poly.vertices.iter().map(|v| Coord { x: v.x, y: v.y }).collect();
    geo_types::Polygon::new(LineString::new(ring), Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::seeded;

    const LIMITS: SubdivisionLimits = SubdivisionLimits {
        max_steps: 20_000,
        max_retries: 64,
    };

    fn block() -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(60.0, 0.0),
            Point::new(60.0, 40.0),
            Point::new(0.0, 40.0),
        ])
    }

    fn profile() -> BlockProfile {
        BlockProfile {
            min_area: 50.0,
            grid_chaos: 0.5,
            size_chaos: 0.6,
            empty_prob: 0.0,
        }
    }

    #[test]
    fn test_alleys_stay_inside_block() {
        let mut rng = seeded(11);
        let lots = create_alleys(&block(), &profile(), &mut rng, LIMITS).unwrap();
        assert!(lots.len() > 4);

        let total: f64 = lots.iter().map(|l| l.area()).sum();
        assert!(total <= block().area() + 1e-6);
        for lot in &lots {
            assert!(lot.area() > -1e-9);
            for v in &lot.vertices {
                assert!(v.x > -1e-6 && v.x < 60.0 + 1e-6);
                assert!(v.y > -1e-6 && v.y < 40.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_alleys_are_deterministic() {
        let a = create_alleys(&block(), &profile(), &mut seeded(3), LIMITS).unwrap();
        let b = create_alleys(&block(), &profile(), &mut seeded(3), LIMITS).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_alley_step_cap_is_geometry_error() {
        let limits = SubdivisionLimits {
            max_steps: 1,
            max_retries: 1,
        };
        let result = create_alleys(&block(), &profile(), &mut seeded(3), limits);
        assert!(matches!(result, Err(TownError::Geometry(_))));
    }

    #[test]
    fn test_ortho_small_block_is_single_lot() {
        let lots = create_ortho(&block(), 10_000.0, 0.5, &mut seeded(1), LIMITS).unwrap();
        assert_eq!(lots, vec![block()]);
    }

    #[test]
    fn test_ortho_full_fill_covers_block() {
        let lots = create_ortho(&block(), 200.0, 1.0, &mut seeded(9), LIMITS).unwrap();
        assert!(lots.len() > 1);
        let total: f64 = lots.iter().map(|l| l.area()).sum();
        assert!((total - block().area()).abs() < 1e-6);
    }

    #[test]
    fn test_adjacent_pieces_merge_into_one() {
        let left = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]);
        let mut right = left.clone();
        right.offset(Point::new(1.0, 0.0));
        let merged = merge_footprints(&[left.clone(), right]);
        assert_eq!(merged.len(), 1);
        let area = merged[0].area();
        assert!(area > 2.0 && area < 2.01, "area {}", area);

        let mut far = left.clone();
        far.offset(Point::new(10.0, 0.0));
        assert_eq!(merge_footprints(&[left, far]).len(), 2);
        assert!(merge_footprints(&[]).is_empty());
    }
}
