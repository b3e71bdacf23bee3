pub mod config;
pub mod error;
pub mod random;
pub mod types;

pub use config::GeneratorConfig;
pub use error::{Result, TownError};
pub use random::{seeded, RandomSource};
pub use types::{PatchId, Point, PointId};
