//! Geometric validation: vertex counts, self-intersection, winding and ring membership

use super::ValidationError;
use geo::Intersects;
use geo_types::{Coord, Line};

use crate::core::types::{Point, PointId};

pub struct GeometricValidator;

impl GeometricValidator {
    /// Validate a closed outline given as its vertices
    pub fn validate_polygon(vertices: &[Point]) -> Vec<ValidationError> {
        let mut errors = Self::validate_vertex_count(vertices.len());
        if !errors.is_empty() {
            return errors; // Can't do further checks
        }

        if let Some(index) = vertices.iter().position(|v| !v.x.is_finite() || !v.y.is_finite()) {
            errors.push(ValidationError::NonFinite { index });
            return errors;
        }

        if Self::is_self_intersecting(vertices) {
            errors.push(ValidationError::SelfIntersecting {
                description: "Polygon edges cross each other".into(),
            });
        }

        if !Self::is_counter_clockwise(vertices) {
            errors.push(ValidationError::ClockwiseWinding);
        }

        errors
    }

    pub fn validate_vertex_count(count: usize) -> Vec<ValidationError> {
        if count < 3 {
            vec![ValidationError::InsufficientVertices { count, minimum: 3 }]
        } else {
            Vec::new()
        }
    }

    /// Every handle of `points` must appear on `ring`
    pub fn validate_membership(ring: &[PointId], points: &[PointId]) -> Vec<ValidationError> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| !ring.contains(p))
            .map(|(index, _)| ValidationError::NotOnRing { index })
            .collect()
    }

    /// Shoelace sum: positive area = CCW
    fn is_counter_clockwise(vertices: &[Point]) -> bool {
        let mut sum = 0.0;
        for i in 0..vertices.len() {
            let j = (i + 1) % vertices.len();
            sum += vertices[i].cross(&vertices[j]);
        }
        sum > 0.0
    }

    /// Check if polygon edges touch each other (excluding adjacent edges)
    fn is_self_intersecting(vertices: &[Point]) -> bool {
        let n = vertices.len();
        if n < 4 {
            return false; // Triangle can't self-intersect
        }

        let edges: Vec<Line<f64>> = (0..n)
            .map(|i| Line::new(to_coord(vertices[i]), to_coord(vertices[(i + 1) % n])))
            .collect();

        for i in 0..n {
            for j in (i + 2)..n {
                // The last edge shares a vertex with the first
                if i == 0 && j == n - 1 {
                    continue;
                }
                if edges[i].intersects(&edges[j]) {
                    return true;
                }
            }
        }
        false
    }
}

fn to_coord(p: Point) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}
