//! Town model and the generation pipeline
//!
//! One construction attempt runs these stages in order:
//! 1. patches from a relaxed Voronoi partition of a spiral of sites
//! 2. junction optimization, collapsing very short patch edges
//! 3. the border wall with its gates, and the citadel's own wall
//! 4. streets from every gate to the plaza and roads into the countryside
//! 5. ward assignment
//! 6. building footprints
//!
//! Any stage may reject the layout. A rejected attempt is thrown away whole
//! and the next one continues the same random stream.

use std::collections::VecDeque;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::city::building::SubdivisionLimits;
use crate::city::patch::Patch;
use crate::city::topology::Topology;
use crate::city::wall::CurtainWall;
use crate::city::ward::{self, Ward, WardKind, WARD_DECK};
use crate::core::config::{GeneratorConfig, MIN_CITADEL_PATCHES};
use crate::core::error::{Result, TownError};
use crate::core::random::{seeded, RandomSource};
use crate::core::types::{PatchId, Point, PointId};
use crate::spatial::arena::{PointArena, Ring};
use crate::spatial::validation::GeometricValidator;
use crate::spatial::voronoi::Voronoi;

/// Which optional structures the town gets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub plaza: bool,
    pub citadel: bool,
    pub walls: bool,
}

impl Features {
    /// Draw the switches from the stream, then apply the config overrides
    ///
    /// Three draws are always taken. An unconfigured town is always walled,
    /// and one too small for a citadel never gets one.
    pub fn draw(config: &GeneratorConfig, rng: &mut dyn RandomSource) -> Self {
        let plaza = rng.chance(0.5);
        let citadel = rng.chance(0.5);
        let _walls = rng.chance(0.5);
        Self {
            plaza: config.plaza.unwrap_or(plaza),
            citadel: config
                .citadel
                .unwrap_or(citadel && config.patch_count >= MIN_CITADEL_PATCHES),
            walls: config.walls.unwrap_or(true),
        }
    }
}

pub type Street = Vec<PointId>;

#[derive(Debug, Clone)]
pub struct Model {
    pub config: GeneratorConfig,
    pub features: Features,
    pub arena: PointArena,
    pub patches: Vec<Patch>,
    /// Patches inside the town, excluding the citadel
    pub inner: Vec<PatchId>,
    pub citadel: Option<PatchId>,
    pub plaza: Option<PatchId>,
    pub center: PointId,
    /// Outline of the town, built in stone when the town is walled
    pub border: Option<CurtainWall>,
    /// The citadel's own wall
    pub castle: Option<CurtainWall>,
    /// Border gates followed by citadel gates
    pub gates: Vec<PointId>,
    /// Gate to plaza paths, listed from the plaza end
    pub streets: Vec<Street>,
    /// Countryside approaches to the border gates, listed from the gate end
    pub roads: Vec<Street>,
    /// Streets and roads merged into maximal polylines
    pub arteries: Vec<Street>,
    pub city_radius: f64,
    /// Construction attempt that produced this layout, 1-based
    pub attempts: u32,
    next_patch_id: u32,
}

/// Generate a town from a seed
pub fn generate(config: &GeneratorConfig, seed: u64) -> Result<Model> {
    let mut rng = seeded(seed);
    generate_with(config, &mut rng)
}

/// Generate a town drawing from `rng`, retrying rejected layouts
pub fn generate_with(config: &GeneratorConfig, rng: &mut dyn RandomSource) -> Result<Model> {
    config.validate()?;
    let features = Features::draw(config, rng);
    tracing::debug!(
        plaza = features.plaza,
        citadel = features.citadel,
        walls = features.walls,
        "Drew town features"
    );

    let mut last = None;
    for attempt in 1..=config.max_attempts {
        match Model::build(config, features, rng) {
            Ok(mut model) => {
                model.attempts = attempt;
                tracing::info!(
                    attempt,
                    patches = model.patches.len(),
                    gates = model.gates.len(),
                    "Generated town"
                );
                return Ok(model);
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "Discarding town layout");
                last = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(TownError::RetriesExhausted {
        attempts: config.max_attempts,
        last: Box::new(last.unwrap_or_else(|| TownError::Geometry("no attempt was made".into()))),
    })
}

impl Model {
    /// An empty model with no patches
    pub fn new(config: &GeneratorConfig, features: Features) -> Self {
        Self {
            config: config.clone(),
            features,
            arena: PointArena::new(),
            patches: Vec::new(),
            inner: Vec::new(),
            citadel: None,
            plaza: None,
            center: PointId(0),
            border: None,
            castle: None,
            gates: Vec::new(),
            streets: Vec::new(),
            roads: Vec::new(),
            arteries: Vec::new(),
            city_radius: 0.0,
            attempts: 0,
            next_patch_id: 0,
        }
    }

    /// Run one construction attempt
    pub fn build(config: &GeneratorConfig, features: Features, rng: &mut dyn RandomSource) -> Result<Self> {
        let mut model = Self::new(config, features);
        model.build_patches(rng)?;
        model.optimize_junctions();
        model.build_walls(rng)?;
        model.build_streets()?;
        model.create_wards(rng)?;
        model.build_geometry(rng)?;
        model.validate()?;
        Ok(model)
    }

    /// Add a patch outlined by `ring`, returning its id
    pub fn add_patch(&mut self, ring: Ring) -> PatchId {
        let id = PatchId(self.next_patch_id);
        self.next_patch_id += 1;
        self.patches.push(Patch::new(id, ring));
        id
    }

    // === QUERIES ===

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.iter().find(|p| p.id == id)
    }

    pub fn patch_mut(&mut self, id: PatchId) -> Option<&mut Patch> {
        self.patches.iter_mut().find(|p| p.id == id)
    }

    pub fn plaza_patch(&self) -> Option<&Patch> {
        self.plaza.and_then(|id| self.patch(id))
    }

    pub fn citadel_patch(&self) -> Option<&Patch> {
        self.citadel.and_then(|id| self.patch(id))
    }

    /// The border, when it is built in stone
    pub fn wall(&self) -> Option<&CurtainWall> {
        self.border.as_ref().filter(|b| b.real)
    }

    pub fn center_point(&self) -> Point {
        self.arena.get(self.center)
    }

    /// Patches having `v` as a vertex
    pub fn patch_by_vertex(&self, v: PointId) -> Vec<PatchId> {
        self.patches.iter().filter(|p| p.contains(v)).map(|p| p.id).collect()
    }

    /// The patch across the edge of `patch` that starts at `v`
    pub fn neighbour(&self, patch: &Patch, v: PointId) -> Option<&Patch> {
        let next = patch.ring.next(v)?;
        self.patches.iter().find(|p| p.ring.find_edge(next, v).is_some())
    }

    pub fn neighbours(&self, patch: &Patch) -> Vec<&Patch> {
        self.patches
            .iter()
            .filter(|p| p.id != patch.id && p.borders(patch))
            .collect()
    }

    /// Within the town and surrounded by it, either by walls or by other city patches
    pub fn is_enclosed(&self, patch: &Patch) -> bool {
        patch.within_city && (patch.within_walls || self.neighbours(patch).iter().all(|p| p.within_city))
    }

    /// True when some artery passes through both vertices
    pub fn on_artery(&self, v0: PointId, v1: PointId) -> bool {
        self.arteries.iter().any(|a| a.contains(&v0) && a.contains(&v1))
    }

    /// Replace a patch by the two halves on either side of the diagonal `a`-`b`
    ///
    /// The halves inherit the patch's flags and take its place in every list
    /// that referred to it.
    pub fn split_patch(&mut self, id: PatchId, a: PointId, b: PointId) -> Result<()> {
        let index = self
            .patches
            .iter()
            .position(|p| p.id == id)
            .ok_or(TownError::Split { a, b })?;
        let (first, second) = self.patches[index].ring.split(a, b).ok_or(TownError::Split { a, b })?;

        let old = self.patches.remove(index);
        let id1 = PatchId(self.next_patch_id);
        let id2 = PatchId(self.next_patch_id + 1);
        self.next_patch_id += 2;

        let halves = [(id1, first), (id2, second)].map(|(new_id, ring)| Patch {
            id: new_id,
            ring,
            within_city: old.within_city,
            within_walls: old.within_walls,
            ward: old.ward.clone(),
        });
        self.patches.splice(index..index, halves);

        replace_id(&mut self.inner, id, &[id1, id2]);
        if let Some(border) = self.border.as_mut() {
            replace_id(&mut border.patches, id, &[id1, id2]);
        }
        if self.plaza == Some(id) {
            self.plaza = Some(id1);
        }
        Ok(())
    }

    // === STAGES ===

    fn build_patches(&mut self, rng: &mut dyn RandomSource) -> Result<()> {
        let n = self.config.patch_count;

        let sa = rng.float() * 2.0 * PI;
        let mut sites = Vec::with_capacity(n * 8);
        for i in 0..n * 8 {
            let a = sa + (i as f64).sqrt() * 5.0;
            let r = if i == 0 { 0.0 } else { 10.0 + i as f64 * (2.0 + rng.float()) };
            sites.push(Point::new(a.cos() * r, a.sin() * r));
        }

        // Indices 0..3 are frame corners, which have no region, so only
        // the site at `n` moves
        let mut voronoi = Voronoi::build(&sites)?;
        for _ in 0..self.config.relax_iterations {
            voronoi = voronoi.relax(&[0, 1, 2, n])?;
        }

        let mut regions = voronoi.partitioning();
        regions.sort_by(|a, b| {
            voronoi.points[a.seed]
                .length()
                .total_cmp(&voronoi.points[b.seed].length())
        });
        if regions.is_empty() {
            return Err(TownError::Geometry("Voronoi partition has no regions".into()));
        }

        // Neighbouring regions share circumcenters, and so share vertex handles
        let mut handles: Vec<Option<PointId>> = vec![None; voronoi.triangles.len()];
        for (count, region) in regions.iter().enumerate() {
            let ring: Vec<PointId> = region
                .triangles
                .iter()
                .map(|&t| *handles[t].get_or_insert_with(|| self.arena.alloc(voronoi.triangles[t].c)))
                .collect();
            let ring = Ring::new(ring);

            if count == 0 {
                let shape = self.arena.polygon(&ring.vertices);
                self.center = ring.vertices[shape.min_by(|p| p.length())];
            }

            let id = self.add_patch(ring);
            if count == 0 && self.features.plaza {
                self.plaza = Some(id);
            } else if count == n && self.features.citadel {
                self.citadel = Some(id);
            }
            if count < n {
                self.inner.push(id);
            }

            let walls = self.features.walls;
            let citadel = self.citadel == Some(id);
            if let Some(patch) = self.patch_mut(id) {
                if count < n {
                    patch.within_city = true;
                    patch.within_walls = walls;
                } else if citadel {
                    patch.within_city = true;
                }
            }
        }

        tracing::debug!(patches = self.patches.len(), inner = self.inner.len(), "Built patches");
        Ok(())
    }

    /// Collapse patch edges shorter than the junction threshold into one vertex
    fn optimize_junctions(&mut self) {
        let threshold = self.config.junction_threshold;
        let mut targets = self.inner.clone();
        targets.extend(self.citadel);

        let mut touched: Vec<PatchId> = Vec::new();
        let mut merged = 0;
        for id in targets {
            let mut index = 0;
            loop {
                let Some(patch) = self.patch(id) else {
                    break;
                };
                let len = patch.ring.len();
                if index >= len {
                    break;
                }
                let v0 = patch.ring.vertices[index];
                let v1 = patch.ring.vertices[(index + 1) % len];

                let p0 = self.arena.get(v0);
                let p1 = self.arena.get(v1);
                if v0 != v1 && p0.distance(&p1) < threshold {
                    self.arena.set(v0, p0.midpoint(&p1));
                    for other in self.patch_by_vertex(v1) {
                        if let Some(p) = self.patch_mut(other) {
                            if let Some(i) = p.ring.index_of(v1) {
                                p.ring.vertices[i] = v0;
                            }
                        }
                        touched.push(other);
                    }
                    if self.center == v1 {
                        self.center = v0;
                    }
                    merged += 1;
                }
                index += 1;
            }
        }

        for id in touched {
            if let Some(p) = self.patch_mut(id) {
                p.ring.dedup();
            }
        }
        tracing::debug!(merged, "Optimized junctions");
    }

    fn build_walls(&mut self, rng: &mut dyn RandomSource) -> Result<()> {
        let walls = self.features.walls;
        let reserved: Vec<PointId> = self
            .citadel_patch()
            .map(|p| p.ring.vertices.clone())
            .unwrap_or_default();

        let inner = self.inner.clone();
        let mut border = CurtainWall::build(walls, self, inner, &reserved, rng)?;
        if walls {
            border.build_towers();
        }

        // Drop the countryside far from the town
        let radius = border.radius(&self.arena);
        let center = self.center_point();
        let arena = &self.arena;
        self.patches
            .retain(|p| p.shape(arena).distance(&center) < radius * 3.0);

        self.gates = border.gates.clone();
        self.border = Some(border);

        if let Some(citadel) = self.citadel {
            let ring = self
                .patch(citadel)
                .map(|p| p.ring.clone())
                .ok_or_else(|| TownError::Geometry("citadel patch was discarded".into()))?;

            // Only the side facing open country stays sharp
            let reserved: Vec<PointId> = ring
                .vertices
                .iter()
                .copied()
                .filter(|&v| {
                    self.patch_by_vertex(v)
                        .iter()
                        .any(|&id| self.patch(id).is_some_and(|p| !p.within_city))
                })
                .collect();

            let mut castle = CurtainWall::build(true, self, vec![citadel], &reserved, rng)?;
            castle.build_towers();

            let ward = Ward::new(WardKind::Castle, rng);
            let compactness = self
                .patch(citadel)
                .map_or(0.0, |p| p.shape(&self.arena).compactness());
            if let Some(patch) = self.patch_mut(citadel) {
                patch.ward = Some(ward);
            }
            if compactness < 0.75 {
                return Err(TownError::Geometry(format!("Bad citadel shape ({:.2})", compactness)));
            }

            self.gates.extend_from_slice(&castle.gates);
            self.castle = Some(castle);
        }

        tracing::debug!(
            gates = self.gates.len(),
            towers = self.border.as_ref().map_or(0, |b| b.towers.len()),
            radius,
            "Built walls"
        );
        Ok(())
    }

    fn build_streets(&mut self) -> Result<()> {
        let topology = Topology::new(self);
        let border_gates: Vec<PointId> = self.border.as_ref().map(|b| b.gates.clone()).unwrap_or_default();

        for gate in self.gates.clone() {
            let gate_point = self.arena.get(gate);
            let end = match self.plaza_patch() {
                Some(plaza) => {
                    let shape = plaza.shape(&self.arena);
                    plaza.ring.vertices[shape.min_by(|v| v.distance(&gate_point))]
                }
                None => self.center,
            };

            let street = topology
                .build_path(gate, end, &topology.outer)
                .ok_or(TownError::Routing { from: gate, to: end })?;
            self.streets.push(street);

            if border_gates.contains(&gate) {
                let approach = gate_point.normalize(1000.0);
                let road = topology
                    .nearest_point(self, approach)
                    .and_then(|start| topology.build_path(start, gate, &topology.inner));
                if let Some(road) = road {
                    self.roads.push(road);
                }
            }
        }

        self.tidy_up_roads();

        for artery in &self.arteries {
            let len = artery.len();
            if len > 2 {
                let interior: Vec<usize> = (1..len - 1).collect();
                self.arena.smooth(artery, 3.0, &interior);
            }
        }

        tracing::debug!(
            nodes = topology.node_count(),
            streets = self.streets.len(),
            roads = self.roads.len(),
            arteries = self.arteries.len(),
            "Built streets"
        );
        Ok(())
    }

    /// Merge streets and roads into arteries without repeated segments
    fn tidy_up_roads(&mut self) {
        let plaza = self.plaza_patch().map(|p| p.ring.clone());

        let mut segments: Vec<(PointId, PointId)> = Vec::new();
        for street in self.streets.iter().chain(&self.roads) {
            for pair in street.windows(2) {
                let (v0, v1) = (pair[0], pair[1]);
                // Crossing the plaza is not a street
                if plaza.as_ref().is_some_and(|r| r.contains(v0) && r.contains(v1)) {
                    continue;
                }
                if !segments.contains(&(v0, v1)) {
                    segments.push((v0, v1));
                }
            }
        }

        let mut arteries: Vec<Street> = Vec::new();
        while let Some((start, end)) = segments.pop() {
            let mut attached = false;
            for artery in arteries.iter_mut() {
                if artery.first() == Some(&end) {
                    artery.insert(0, start);
                    attached = true;
                    break;
                } else if artery.last() == Some(&start) {
                    artery.push(end);
                    attached = true;
                    break;
                }
            }
            if !attached {
                arteries.push(vec![start, end]);
            }
        }
        self.arteries = arteries;
    }

    fn create_wards(&mut self, rng: &mut dyn RandomSource) -> Result<()> {
        let mut unassigned: Vec<PatchId> = self.inner.clone();

        if let Some(plaza) = self.plaza {
            let ward = Ward::new(WardKind::Market, rng);
            if let Some(p) = self.patch_mut(plaza) {
                p.ward = Some(ward);
            }
            unassigned.retain(|&id| id != plaza);
        }

        let border_gates: Vec<PointId> = self.border.as_ref().map(|b| b.gates.clone()).unwrap_or_default();
        let gate_chance = if self.wall().is_some() { 0.5 } else { 0.2 };
        for gate in border_gates {
            for id in self.patch_by_vertex(gate) {
                let free = self.patch(id).is_some_and(|p| p.within_city && p.ward.is_none());
                if free && rng.chance(gate_chance) {
                    let ward = Ward::new(WardKind::Gate, rng);
                    if let Some(p) = self.patch_mut(id) {
                        p.ward = Some(ward);
                    }
                    unassigned.retain(|&u| u != id);
                }
            }
        }

        // Only a few neighbouring pairs trade places
        let mut deck = WARD_DECK.to_vec();
        for _ in 0..deck.len() / 10 {
            let index = rng.int(0, deck.len() as i64 - 1) as usize;
            deck.swap(index, index + 1);
        }
        let mut deck = VecDeque::from(deck);

        while !unassigned.is_empty() {
            let kind = deck.pop_front().unwrap_or(WardKind::Slum);
            self.place_ward(kind, &mut unassigned, rng)?;
        }

        // Suburbs grow in front of most wall gates
        if let Some(wall_gates) = self.wall().map(|w| w.gates.clone()) {
            let quiet = 1.0 / (self.config.patch_count as f64 - 5.0);
            for gate in wall_gates {
                if !rng.chance(quiet) {
                    for id in self.patch_by_vertex(gate) {
                        if self.patch(id).is_some_and(|p| p.ward.is_none()) {
                            let ward = Ward::new(WardKind::Gate, rng);
                            if let Some(p) = self.patch_mut(id) {
                                p.within_city = true;
                                p.ward = Some(ward);
                            }
                        }
                    }
                }
            }
        }

        self.city_radius = 0.0;
        for i in 0..self.patches.len() {
            let patch = &self.patches[i];
            if patch.within_city {
                for &v in &patch.ring.vertices {
                    self.city_radius = self.city_radius.max(self.arena.get(v).length());
                }
            } else if patch.ward.is_none() {
                let farm = rng.chance(0.2) && patch.shape(&self.arena).compactness() >= 0.7;
                let kind = if farm { WardKind::Farm } else { WardKind::Common };
                let ward = Ward::new(kind, rng);
                self.patches[i].ward = Some(ward);
            }
        }

        tracing::debug!(
            wards = self.patches.iter().filter(|p| p.ward.is_some()).count(),
            city_radius = self.city_radius,
            "Assigned wards"
        );
        Ok(())
    }

    /// Found a `kind` ward on the best unassigned patch and take it off the list
    ///
    /// Rated archetypes take the first patch with the lowest rating. When
    /// every patch is forbidden the layout is rejected.
    fn place_ward(&mut self, kind: WardKind, unassigned: &mut Vec<PatchId>, rng: &mut dyn RandomSource) -> Result<()> {
        let choice = if kind.is_rated() {
            let mut best = None;
            let mut best_rate = f64::INFINITY;
            for &id in unassigned.iter() {
                if let Some(p) = self.patch(id).filter(|p| p.ward.is_none()) {
                    let rate = kind.rate(self, p);
                    if rate < best_rate {
                        best_rate = rate;
                        best = Some(id);
                    }
                }
            }
            best
        } else if unassigned.is_empty() {
            None
        } else {
            Some(unassigned[rng.index(unassigned.len())])
        };

        // Slums fill whatever is left once the deck runs out
        let choice = match choice {
            None if kind == WardKind::Slum => unassigned.first().copied(),
            other => other,
        };
        let Some(id) = choice else {
            return Err(TownError::Geometry(format!("no acceptable location for {:?} ward", kind)));
        };

        let ward = Ward::new(kind, rng);
        if let Some(p) = self.patch_mut(id) {
            p.ward = Some(ward);
        }
        unassigned.retain(|&u| u != id);
        Ok(())
    }

    fn build_geometry(&mut self, rng: &mut dyn RandomSource) -> Result<()> {
        let limits = SubdivisionLimits {
            max_steps: self.config.max_subdivision_steps,
            max_retries: self.config.max_ortho_retries,
        };

        let mut total = 0;
        for i in 0..self.patches.len() {
            if self.patches[i].ward.is_none() {
                continue;
            }
            let buildings = ward::build_geometry(self, &self.patches[i], rng, limits)?;
            total += buildings.len();
            if let Some(w) = self.patches[i].ward.as_mut() {
                w.buildings = buildings;
            }
        }

        tracing::debug!(buildings = total, "Built geometry");
        Ok(())
    }

    /// Structural checks on a finished layout
    ///
    /// Every patch must still be a polygon and every gate must lie on the
    /// wall it was placed on.
    pub fn validate(&self) -> Result<()> {
        for patch in &self.patches {
            if let Some(e) = GeometricValidator::validate_vertex_count(patch.ring.len()).first() {
                return Err(TownError::Geometry(format!("patch {:?}: {}", patch.id, e)));
            }
        }

        for wall in self.border.iter().chain(&self.castle) {
            if let Some(e) = GeometricValidator::validate_membership(&wall.shape.vertices, &wall.gates).first() {
                return Err(TownError::Geometry(format!("gate {}", e)));
            }
        }

        Ok(())
    }
}

fn replace_id(list: &mut Vec<PatchId>, old: PatchId, new: &[PatchId]) {
    if let Some(i) = list.iter().position(|&id| id == old) {
        list.splice(i..=i, new.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::polygon::Polygon;

    fn config(patches: usize) -> GeneratorConfig {
        GeneratorConfig::default().with_patches(patches)
    }

    fn walled() -> Features {
        Features {
            plaza: true,
            citadel: false,
            walls: true,
        }
    }

    /// 3x3 grid of unit squares, the middle one inside the town
    fn grid_model() -> (Model, Vec<PointId>) {
        let mut model = Model::new(&config(1), walled());
        let mut pts = Vec::new();
        for y in 0..4 {
            for x in 0..4 {
                pts.push(model.arena.alloc(Point::new(x as f64 * 10.0 - 15.0, y as f64 * 10.0 - 15.0)));
            }
        }
        for y in 0..3 {
            for x in 0..3 {
                let i = y * 4 + x;
                let id = model.add_patch(Ring::new(vec![pts[i], pts[i + 1], pts[i + 5], pts[i + 4]]));
                if x == 1 && y == 1 {
                    model.inner.push(id);
                    if let Some(p) = model.patch_mut(id) {
                        p.within_city = true;
                        p.within_walls = true;
                    }
                }
            }
        }
        (model, pts)
    }

    #[test]
    fn test_features_respect_overrides() {
        let mut cfg = config(15);
        cfg.plaza = Some(false);
        cfg.citadel = Some(true);
        let features = Features::draw(&cfg, &mut seeded(1));
        assert!(!features.plaza);
        assert!(features.citadel);
        assert!(features.walls);

        cfg.walls = Some(false);
        assert!(!Features::draw(&cfg, &mut seeded(1)).walls);
    }

    #[test]
    fn test_feature_draws_are_always_consumed() {
        let mut forced = config(15);
        forced.plaza = Some(true);
        forced.citadel = Some(true);
        forced.walls = Some(true);

        let mut a = seeded(4);
        let mut b = seeded(4);
        Features::draw(&forced, &mut a);
        Features::draw(&config(15), &mut b);
        assert_eq!(a.float().to_bits(), b.float().to_bits());
    }

    #[test]
    fn test_small_towns_never_draw_a_citadel() {
        for seed in 0..20 {
            assert!(!Features::draw(&config(2), &mut seeded(seed)).citadel);
        }
        let drawn = (0..20).filter(|&seed| Features::draw(&config(3), &mut seeded(seed)).citadel).count();
        assert!(drawn > 0);
    }

    #[test]
    fn test_neighbour_queries() {
        let (model, pts) = grid_model();
        let middle = model.patch(model.inner[0]).unwrap();
        assert_eq!(model.neighbours(middle).len(), 4);
        assert_eq!(model.patch_by_vertex(pts[5]).len(), 4);
        assert_eq!(model.patch_by_vertex(pts[0]).len(), 1);

        // Edge 5 -> 6 of the middle patch faces the bottom middle patch
        let below = model.neighbour(middle, pts[5]).unwrap();
        assert!(below.contains(pts[1]) && below.contains(pts[2]));
    }

    #[test]
    fn test_enclosure() {
        let (mut model, _) = grid_model();
        let middle_id = model.inner[0];
        assert!(model.is_enclosed(model.patch(middle_id).unwrap()));

        if let Some(p) = model.patch_mut(middle_id) {
            p.within_walls = false;
        }
        // Countryside all around
        assert!(!model.is_enclosed(model.patch(middle_id).unwrap()));
    }

    #[test]
    fn test_forbidden_everywhere_rejects_layout() {
        let (mut model, _) = grid_model();
        let middle_id = model.inner[0];
        if let Some(p) = model.patch_mut(middle_id) {
            p.ward = Some(Ward::new(WardKind::Market, &mut seeded(1)));
        }
        // Only the four patches touching the market are left
        let mut unassigned: Vec<PatchId> = model
            .neighbours(model.patch(middle_id).unwrap())
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(unassigned.len(), 4);

        let err = model
            .place_ward(WardKind::Market, &mut unassigned, &mut seeded(1))
            .unwrap_err();
        assert!(matches!(err, TownError::Geometry(_)));
        assert!(err.is_retryable());
        assert_eq!(unassigned.len(), 4);
        assert!(unassigned.iter().all(|&id| model.patch(id).unwrap().ward.is_none()));

        model.place_ward(WardKind::Slum, &mut unassigned, &mut seeded(1)).unwrap();
        assert_eq!(unassigned.len(), 3);
    }

    #[test]
    fn test_flat_outskirts_drop_buildings() {
        let mut model = Model::new(&config(2), walled());
        let a = model.arena.alloc(Point::new(0.0, 0.0));
        let b = model.arena.alloc(Point::new(10.0, 0.0));
        let c = model.arena.alloc(Point::new(20.0, 0.0));
        let d = model.arena.alloc(Point::new(10.0, 10.0));
        // All three corners on one line, bordering a town patch along a -> b
        let flat = model.add_patch(Ring::new(vec![a, b, c]));
        let town = model.add_patch(Ring::new(vec![b, a, d]));
        if let Some(p) = model.patch_mut(town) {
            p.within_city = true;
        }

        let on_edge = Polygon::new(vec![Point::new(2.0, 0.0), Point::new(4.0, 0.0), Point::new(3.0, 1.0)]);
        let inside = Polygon::rect(1.0, 1.0);
        let patch = model.patch(flat).unwrap();
        let kept = ward::filter_outskirts(&model, patch, vec![on_edge, inside], &mut seeded(5));
        assert!(kept.is_empty());
    }

    #[test]
    fn test_split_patch_replaces_in_place() {
        let (mut model, pts) = grid_model();
        let first = model.patches[0].id;
        model.split_patch(first, pts[0], pts[5]).unwrap();
        assert_eq!(model.patches.len(), 10);
        assert!(model.patch(first).is_none());
        assert_eq!(model.patches[0].ring.len(), 3);
        assert_eq!(model.patches[1].ring.len(), 3);
    }

    #[test]
    fn test_split_on_adjacent_vertices_fails() {
        let (mut model, pts) = grid_model();
        let first = model.patches[0].id;
        let result = model.split_patch(first, pts[0], pts[1]);
        assert!(matches!(result, Err(TownError::Split { .. })));
    }

    #[test]
    fn test_single_patch_wall_is_patch_ring() {
        let (mut model, _) = grid_model();
        let middle = model.inner[0];
        let ring = model.patch(middle).unwrap().ring.clone();
        let wall = CurtainWall::build(false, &mut model, vec![middle], &[], &mut seeded(2)).unwrap();
        assert_eq!(wall.shape, ring);
        assert!(!wall.gates.is_empty());
        for gate in &wall.gates {
            assert!(ring.contains(*gate));
        }
    }

    #[test]
    fn test_real_wall_towers_skip_gates() {
        let (mut model, _) = grid_model();
        let middle = model.inner[0];
        let before = model.patches.len();
        let mut wall = CurtainWall::build(true, &mut model, vec![middle], &[], &mut seeded(2)).unwrap();
        wall.build_towers();

        // Corner gates touch three countryside patches and split nothing
        assert_eq!(model.patches.len(), before);
        for gate in &wall.gates {
            assert!(!wall.towers.contains(gate));
        }
        assert_eq!(wall.towers.len() + wall.gates.len(), 4);
    }

    #[test]
    fn test_tidy_up_merges_chained_segments() {
        let (mut model, pts) = grid_model();
        model.plaza = None;
        model.streets = vec![vec![pts[0], pts[1], pts[2]]];
        model.roads = vec![vec![pts[2], pts[3]], vec![pts[0], pts[1]]];
        model.tidy_up_roads();
        assert_eq!(model.arteries, vec![vec![pts[0], pts[1], pts[2], pts[3]]]);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate(&config(8), 7).unwrap();
        let b = generate(&config(8), 7).unwrap();
        assert_eq!(a.attempts, b.attempts);
        assert_eq!(a.gates, b.gates);
        let kinds = |m: &Model| m.patches.iter().map(|p| p.kind()).collect::<Vec<_>>();
        assert_eq!(kinds(&a), kinds(&b));
    }

    #[test]
    fn test_invalid_config_is_not_retried() {
        let result = generate(&config(0), 1);
        assert!(matches!(result, Err(TownError::Config(_))));
    }
}
