//! Planar geometry: polygons, shared vertices, Voronoi partitions and graphs

pub mod arena;
pub mod graph;
pub mod polygon;
pub mod validation;
pub mod voronoi;

pub use arena::{PointArena, Ring};
pub use graph::{Graph, NodeId};
pub use polygon::Polygon;
pub use voronoi::Voronoi;
