//! Street graph over patch outlines
//!
//! Every patch vertex becomes a node and every patch edge a link priced by
//! its length. Vertices on the wall or around the citadel are blocked,
//! except gates, so streets can only cross fortifications through a gate.

use ahash::AHashMap;

use crate::city::model::Model;
use crate::core::types::{Point, PointId};
use crate::spatial::graph::{Graph, NodeId};

pub struct Topology {
    graph: Graph,
    pt2node: AHashMap<PointId, NodeId>,
    /// Points in node order
    node2pt: Vec<PointId>,
    blocked: Vec<PointId>,
    /// Unblocked nodes of within-city patches
    pub inner: Vec<NodeId>,
    /// Unblocked nodes of countryside patches
    pub outer: Vec<NodeId>,
}

impl Topology {
    pub fn new(model: &Model) -> Self {
        let mut blocked: Vec<PointId> = Vec::new();
        if let Some(citadel) = model.citadel_patch() {
            blocked.extend_from_slice(&citadel.ring.vertices);
        }
        if let Some(wall) = model.wall() {
            blocked.extend_from_slice(&wall.shape.vertices);
        }
        blocked.retain(|v| !model.gates.contains(v));

        let mut topology = Self {
            graph: Graph::new(),
            pt2node: AHashMap::new(),
            node2pt: Vec::new(),
            blocked,
            inner: Vec::new(),
            outer: Vec::new(),
        };

        let border: &[PointId] = model.border.as_ref().map_or(&[], |b| b.shape.vertices.as_slice());

        for patch in &model.patches {
            let ring = &patch.ring.vertices;
            let Some(&last) = ring.last() else {
                continue;
            };

            let mut v1 = last;
            let mut n1 = topology.process_point(v1);
            for &v in ring {
                let v0 = v1;
                v1 = v;
                let n0 = n1;
                n1 = topology.process_point(v1);

                for (n, p) in [(n0, v0), (n1, v1)] {
                    if let Some(n) = n {
                        if !border.contains(&p) {
                            let list = if patch.within_city {
                                &mut topology.inner
                            } else {
                                &mut topology.outer
                            };
                            if !list.contains(&n) {
                                list.push(n);
                            }
                        }
                    }
                }

                if let (Some(a), Some(b)) = (n0, n1) {
                    let price = model.arena.get(v0).distance(&model.arena.get(v1));
                    topology.graph.link(a, b, price);
                }
            }
        }

        topology
    }

    /// Node of `v`, created on first sight; `None` when `v` is blocked
    fn process_point(&mut self, v: PointId) -> Option<NodeId> {
        let n = match self.pt2node.get(&v) {
            Some(&n) => n,
            None => {
                let n = self.graph.add();
                self.pt2node.insert(v, n);
                self.node2pt.push(v);
                n
            }
        };
        (!self.blocked.contains(&v)).then_some(n)
    }

    /// Route between two points avoiding the `exclude` nodes, listed `to` first
    pub fn build_path(&self, from: PointId, to: PointId, exclude: &[NodeId]) -> Option<Vec<PointId>> {
        let start = *self.pt2node.get(&from)?;
        let goal = *self.pt2node.get(&to)?;
        let path = self.graph.find_path(start, goal, exclude)?;
        Some(path.into_iter().map(|n| self.node2pt[n.0]).collect())
    }

    /// Point of the first node closest to `target`, blocked nodes included
    pub fn nearest_point(&self, model: &Model, target: Point) -> Option<PointId> {
        let mut best = None;
        let mut dist = f64::INFINITY;
        for &p in &self.node2pt {
            let d = model.arena.get(p).distance(&target);
            if d < dist {
                dist = d;
                best = Some(p);
            }
        }
        best
    }

    pub fn node_count(&self) -> usize {
        self.graph.len()
    }
}
