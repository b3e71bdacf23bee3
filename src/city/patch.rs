//! Patch: one cell of the town partition

use serde::{Deserialize, Serialize};

use crate::city::ward::{Ward, WardKind};
use crate::core::types::{PatchId, PointId};
use crate::spatial::arena::{PointArena, Ring};
use crate::spatial::polygon::Polygon;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patch {
    pub id: PatchId,
    pub ring: Ring,
    pub within_city: bool,
    pub within_walls: bool,
    pub ward: Option<Ward>,
}

impl Patch {
    pub fn new(id: PatchId, ring: Ring) -> Self {
        Self {
            id,
            ring,
            within_city: false,
            within_walls: false,
            ward: None,
        }
    }

    /// Current coordinates of the outline
    pub fn shape(&self, arena: &PointArena) -> Polygon {
        arena.polygon(&self.ring.vertices)
    }

    pub fn borders(&self, other: &Patch) -> bool {
        self.ring.borders(&other.ring)
    }

    pub fn contains(&self, v: PointId) -> bool {
        self.ring.contains(v)
    }

    pub fn kind(&self) -> Option<WardKind> {
        self.ward.as_ref().map(|w| w.kind)
    }

    pub fn is(&self, kind: WardKind) -> bool {
        self.kind() == Some(kind)
    }
}

/// Outer boundary of a group of adjacent patches
///
/// Collects every edge without a reversed twin inside the group and chains
/// them head to tail, starting from the first one found. Returns `None` when
/// the edges do not close into a loop.
pub fn circumference(patches: &[&Patch]) -> Option<Ring> {
    let mut heads: Vec<PointId> = Vec::new();
    let mut tails: Vec<PointId> = Vec::new();

    for patch in patches {
        for (_, a, b) in patch.ring.edges() {
            let inner = patches
                .iter()
                .any(|other| other.id != patch.id && other.ring.find_edge(b, a).is_some());
            if !inner {
                heads.push(a);
                tails.push(b);
            }
        }
    }

    if heads.is_empty() {
        return None;
    }

    let mut loop_ = Vec::with_capacity(heads.len());
    let mut index = 0;
    for _ in 0..heads.len() {
        loop_.push(heads[index]);
        index = heads.iter().position(|&h| h == tails[index])?;
        if index == 0 {
            return Some(Ring::new(loop_));
        }
    }

    None
}
