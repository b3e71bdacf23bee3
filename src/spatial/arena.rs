//! Shared vertex storage
//!
//! Patches, walls and streets refer to vertices by [`PointId`]. Moving a
//! vertex in the arena moves it for every ring that holds the handle, which
//! is how neighbouring patches stay glued together while walls and streets
//! are smoothed.

use serde::{Deserialize, Serialize};

use crate::core::types::{Point, PointId};
use crate::spatial::polygon::Polygon;

#[derive(Debug, Clone, Default)]
pub struct PointArena {
    points: Vec<Point>,
}

impl PointArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, p: Point) -> PointId {
        self.points.push(p);
        PointId((self.points.len() - 1) as u32)
    }

    pub fn get(&self, id: PointId) -> Point {
        self.points[id.index()]
    }

    pub fn set(&mut self, id: PointId, p: Point) {
        self.points[id.index()] = p;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Resolve handles into a coordinate polygon
    pub fn polygon(&self, ids: &[PointId]) -> Polygon {
        Polygon::new(ids.iter().map(|&id| self.get(id)).collect())
    }

    /// Smooth the vertices of `ids` at `indices`, writing the result back
    ///
    /// Every new position is computed from the current coordinates before
    /// any vertex moves.
    pub fn smooth(&mut self, ids: &[PointId], f: f64, indices: &[usize]) {
        let mut polygon = self.polygon(ids);
        polygon.smooth_vertices(f, indices);
        for &i in indices {
            if let Some(&id) = ids.get(i) {
                self.set(id, polygon.vertices[i]);
            }
        }
    }
}

/// Closed ring of vertex handles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ring {
    pub vertices: Vec<PointId>,
}

impl Ring {
    pub fn new(vertices: Vec<PointId>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn contains(&self, v: PointId) -> bool {
        self.vertices.contains(&v)
    }

    pub fn index_of(&self, v: PointId) -> Option<usize> {
        self.vertices.iter().position(|&p| p == v)
    }

    /// Directed edges `(index, from, to)`, closing the ring
    pub fn edges(&self) -> impl Iterator<Item = (usize, PointId, PointId)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (i, self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn next(&self, v: PointId) -> Option<PointId> {
        let i = self.index_of(v)?;
        Some(self.vertices[(i + 1) % self.vertices.len()])
    }

    pub fn prev(&self, v: PointId) -> Option<PointId> {
        let i = self.index_of(v)?;
        let n = self.vertices.len();
        Some(self.vertices[(i + n - 1) % n])
    }

    /// Index of the directed edge `a -> b`, if the ring has it
    pub fn find_edge(&self, a: PointId, b: PointId) -> Option<usize> {
        let i = self.index_of(a)?;
        (self.vertices[(i + 1) % self.vertices.len()] == b).then_some(i)
    }

    /// True when the rings share an edge in either direction
    pub fn borders(&self, other: &Ring) -> bool {
        let len1 = self.vertices.len();
        let len2 = other.vertices.len();
        for i in 0..len1 {
            if let Some(j) = other.index_of(self.vertices[i]) {
                let next = self.vertices[(i + 1) % len1];
                if next == other.vertices[(j + 1) % len2]
                    || next == other.vertices[(j + len2 - 1) % len2]
                {
                    return true;
                }
            }
        }
        false
    }

    /// Split along the diagonal `a`-`b`
    ///
    /// Returns `None` when either vertex is missing, they coincide or they
    /// are adjacent, since any of those would leave a degenerate half.
    pub fn split(&self, a: PointId, b: PointId) -> Option<(Ring, Ring)> {
        let mut i1 = self.index_of(a)?;
        let mut i2 = self.index_of(b)?;
        if i1 > i2 {
            std::mem::swap(&mut i1, &mut i2);
        }
        let n = self.vertices.len();
        if i1 == i2 || i2 - i1 == 1 || (i1 == 0 && i2 == n - 1) {
            return None;
        }

        let first = self.vertices[i1..=i2].to_vec();
        let mut second = self.vertices[i2..].to_vec();
        second.extend_from_slice(&self.vertices[..=i1]);
        Some((Ring::new(first), Ring::new(second)))
    }

    /// Drop every repeated handle after its first occurrence
    pub fn dedup(&mut self) {
        let mut i = 0;
        while i < self.vertices.len() {
            let v = self.vertices[i];
            let mut j = i + 1;
            while j < self.vertices.len() {
                if self.vertices[j] == v {
                    self.vertices.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
    }
}
