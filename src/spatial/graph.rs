//! Weighted graph and path search for the street network
//!
//! The frontier is a plain FIFO queue: nodes are expanded in the order they
//! were discovered, not by accumulated cost. A cheaper route found later
//! still rewrites a queued node's cost and predecessor, so every returned
//! path is connected and priced consistently, but it is not guaranteed to
//! be the globally shortest one.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Default)]
pub struct Node {
    /// Links in insertion order
    links: Vec<(NodeId, f64)>,
}

impl Node {
    pub fn links(&self) -> &[(NodeId, f64)] {
        &self.links
    }

    pub fn price_to(&self, other: NodeId) -> Option<f64> {
        self.links.iter().find(|(n, _)| *n == other).map(|(_, w)| *w)
    }

    fn set_link(&mut self, other: NodeId, price: f64) {
        match self.links.iter_mut().find(|(n, _)| *n == other) {
            Some(link) => link.1 = price,
            None => self.links.push((other, price)),
        }
    }

    fn unlink(&mut self, other: NodeId) {
        self.links.retain(|(n, _)| *n != other);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self) -> NodeId {
        self.nodes.push(Node::default());
        NodeId(self.nodes.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Link two nodes in both directions; relinking updates the price in place
    pub fn link(&mut self, a: NodeId, b: NodeId, price: f64) {
        self.nodes[a.0].set_link(b, price);
        self.nodes[b.0].set_link(a, price);
    }

    pub fn unlink(&mut self, a: NodeId, b: NodeId) {
        self.nodes[a.0].unlink(b);
        self.nodes[b.0].unlink(a);
    }

    /// Search a path from `start` to `goal` that never enters `exclude`
    ///
    /// Returns the nodes from `goal` back to `start`, or `None` when the goal
    /// cannot be reached.
    pub fn find_path(&self, start: NodeId, goal: NodeId, exclude: &[NodeId]) -> Option<Vec<NodeId>> {
        let n = self.nodes.len();
        let mut closed = vec![false; n];
        for e in exclude {
            closed[e.0] = true;
        }
        let mut in_open = vec![false; n];
        let mut came_from: Vec<Option<NodeId>> = vec![None; n];
        let mut g_scores = vec![f64::INFINITY; n];

        let mut open = VecDeque::from([start]);
        in_open[start.0] = true;
        g_scores[start.0] = 0.0;

        while let Some(current) = open.pop_front() {
            in_open[current.0] = false;
            if current == goal {
                return Some(reconstruct_path(&came_from, current));
            }
            closed[current.0] = true;

            let current_g = g_scores[current.0];
            for &(neighbour, price) in &self.nodes[current.0].links {
                if closed[neighbour.0] {
                    continue;
                }

                let score = current_g + price;
                if !in_open[neighbour.0] {
                    open.push_back(neighbour);
                    in_open[neighbour.0] = true;
                } else if score >= g_scores[neighbour.0] {
                    continue;
                }

                came_from[neighbour.0] = Some(current);
                g_scores[neighbour.0] = score;
            }
        }

        None
    }

    /// Sum of link prices along `path`, `None` if two consecutive nodes are not linked
    pub fn calculate_price(&self, path: &[NodeId]) -> Option<f64> {
        path.windows(2)
            .map(|pair| self.nodes[pair[0].0].price_to(pair[1]))
            .sum()
    }
}

fn reconstruct_path(came_from: &[Option<NodeId>], mut current: NodeId) -> Vec<NodeId> {
    let mut path = vec![current];
    while let Some(prev) = came_from[current.0] {
        path.push(prev);
        current = prev;
    }
    path
}
