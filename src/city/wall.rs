//! Curtain walls: the town border, its gates and towers
//!
//! A wall follows the outline of a group of patches. A "real" wall is built
//! in stone: its outline is smoothed, the countryside in front of every gate
//! is split so a road can reach it, and it gets towers. The border of an
//! unwalled town is still computed (gates are where the streets leave town)
//! but is never real.

use serde::{Deserialize, Serialize};

use crate::city::model::Model;
use crate::city::patch::{circumference, Patch};
use crate::core::error::{Result, TownError};
use crate::core::random::RandomSource;
use crate::core::types::{PatchId, Point, PointId};
use crate::spatial::arena::{PointArena, Ring};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurtainWall {
    pub shape: Ring,
    /// `segments[i]` is true when the edge starting at vertex `i` is built
    pub segments: Vec<bool>,
    pub gates: Vec<PointId>,
    pub towers: Vec<PointId>,
    pub real: bool,
    /// Patches enclosed by the wall
    pub patches: Vec<PatchId>,
}

impl CurtainWall {
    /// Trace the outline of `patches` and place gates on it
    ///
    /// `reserved` vertices are neither smoothed nor used as gates. Fails with
    /// a geometry error when the outline cannot be traced or offers no gate
    /// position, and with a split error when a countryside patch in front of
    /// a gate cannot be divided.
    pub fn build(
        real: bool,
        model: &mut Model,
        patches: Vec<PatchId>,
        reserved: &[PointId],
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        let shape = if let [only] = patches.as_slice() {
            model
                .patch(*only)
                .map(|p| p.ring.clone())
                .ok_or_else(|| TownError::Geometry(format!("walled patch {:?} is missing", only)))?
        } else {
            let group: Vec<&Patch> = patches.iter().filter_map(|&id| model.patch(id)).collect();
            let shape = circumference(&group)
                .ok_or_else(|| TownError::Geometry("walled area has no closed outline".into()))?;

            if real {
                let factor = (40.0 / patches.len() as f64).min(1.0);
                let free: Vec<usize> = shape
                    .vertices
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| !reserved.contains(v))
                    .map(|(i, _)| i)
                    .collect();
                model.arena.smooth(&shape.vertices, factor, &free);
            }
            shape
        };

        let mut wall = Self {
            segments: vec![true; shape.len()],
            shape,
            gates: Vec::new(),
            towers: Vec::new(),
            real,
            patches,
        };
        wall.build_gates(model, reserved, rng)?;
        Ok(wall)
    }

    fn build_gates(&mut self, model: &mut Model, reserved: &[PointId], rng: &mut dyn RandomSource) -> Result<()> {
        // A gate needs a street on both sides, so on a multi-patch wall only
        // vertices shared by two enclosed patches qualify
        let mut entrances: Vec<PointId> = self
            .shape
            .vertices
            .iter()
            .copied()
            .filter(|v| !reserved.contains(v))
            .filter(|&v| {
                self.patches.len() == 1
                    || self
                        .patches
                        .iter()
                        .filter(|&&id| model.patch(id).is_some_and(|p| p.contains(v)))
                        .count()
                        > 1
            })
            .collect();

        if entrances.is_empty() {
            return Err(TownError::Geometry("Bad walled area shape".into()));
        }

        loop {
            let index = rng.index(entrances.len());
            let gate = entrances[index];
            self.gates.push(gate);

            if self.real {
                self.open_approach(model, gate, reserved)?;
            }

            // Neighbouring vertices can't be gates
            let len = entrances.len();
            if index == 0 {
                entrances.drain(0..len.min(2));
                entrances.pop();
            } else if index == len - 1 {
                entrances.drain(index - 1..=index);
                if !entrances.is_empty() {
                    entrances.remove(0);
                }
            } else {
                entrances.drain(index - 1..=index + 1);
            }

            if entrances.len() < 3 {
                break;
            }
        }

        if self.real {
            for &gate in &self.gates {
                if let Some(i) = self.shape.index_of(gate) {
                    model.arena.smooth(&self.shape.vertices, 1.0, &[i]);
                }
            }
        }

        Ok(())
    }

    /// Split the single countryside patch in front of `gate` so that a road
    /// can run straight out of it
    fn open_approach(&self, model: &mut Model, gate: PointId, reserved: &[PointId]) -> Result<()> {
        let outer: Vec<PatchId> = model
            .patch_by_vertex(gate)
            .into_iter()
            .filter(|id| !self.patches.contains(id))
            .collect();
        let [outer_id] = outer.as_slice() else {
            return Ok(());
        };
        let Some(outer_ring) = model.patch(*outer_id).map(|p| p.ring.clone()) else {
            return Ok(());
        };
        if outer_ring.len() <= 3 {
            return Ok(());
        }

        let (Some(next), Some(prev)) = (self.shape.next(gate), self.shape.prev(gate)) else {
            return Err(TownError::Geometry(format!("gate {:?} is not on the wall", gate)));
        };
        let wall = model.arena.get(next) - model.arena.get(prev);
        let out = Point::new(wall.y, -wall.x);
        let origin = model.arena.get(gate);

        let mut farthest = None;
        let mut best = f64::NEG_INFINITY;
        for &v in &outer_ring.vertices {
            if self.shape.contains(v) || reserved.contains(&v) {
                continue;
            }
            let dir = model.arena.get(v) - origin;
            let score = dir.dot(&out) / dir.length();
            if score > best {
                best = score;
                farthest = Some(v);
            }
        }

        let farthest = farthest.ok_or_else(|| TownError::Geometry("Bad walled area shape".into()))?;
        model.split_patch(*outer_id, gate, farthest)
    }

    /// Towers stand on every built vertex that is not a gate
    pub fn build_towers(&mut self) {
        self.towers.clear();
        if !self.real {
            return;
        }
        let len = self.shape.len();
        for (i, &t) in self.shape.vertices.iter().enumerate() {
            if !self.gates.contains(&t) && (self.segments[(i + len - 1) % len] || self.segments[i]) {
                self.towers.push(t);
            }
        }
    }

    /// Distance from the origin to the farthest wall vertex
    pub fn radius(&self, arena: &PointArena) -> f64 {
        self.shape
            .vertices
            .iter()
            .map(|&v| arena.get(v).length())
            .fold(0.0, f64::max)
    }

    /// True when the patch edge `v0 -> v1` lies on a built wall segment
    pub fn borders_by(&self, patch: &Patch, v0: PointId, v1: PointId) -> bool {
        let index = if self.patches.contains(&patch.id) {
            self.shape.find_edge(v0, v1)
        } else {
            self.shape.find_edge(v1, v0)
        };
        index.is_some_and(|i| self.segments[i])
    }

    /// True when any built wall segment is an edge of `patch`
    pub fn borders(&self, patch: &Patch) -> bool {
        let within = self.patches.contains(&patch.id);
        self.shape
            .edges()
            .filter(|&(i, _, _)| self.segments[i])
            .any(|(_, v0, v1)| {
                if within {
                    patch.ring.find_edge(v0, v1).is_some()
                } else {
                    patch.ring.find_edge(v1, v0).is_some()
                }
            })
    }
}
