//! City layer - patches, walls, streets, wards and buildings

pub mod building;
pub mod cutter;
pub mod model;
pub mod output;
pub mod patch;
pub mod topology;
pub mod wall;
pub mod ward;

pub use building::{BlockProfile, SubdivisionLimits};
pub use model::{generate, generate_with, Features, Model};
pub use output::{CityPlan, PlanSummary};
pub use patch::Patch;
pub use wall::CurtainWall;
pub use ward::{Ward, WardKind};
