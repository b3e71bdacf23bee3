//! Towngen - procedural medieval town generator
//!
//! A seed and a patch count go in; a town comes out: a Voronoi partition of
//! patches, a curtain wall with gates and towers, an optional citadel and
//! plaza, streets and roads, ward assignments and building footprints.
//!
//! ```no_run
//! use towngen::{generate, CityPlan, GeneratorConfig};
//!
//! let config = GeneratorConfig::default().with_patches(20);
//! let model = generate(&config, 42)?;
//! let json = CityPlan::from_model(&model, 42).to_json()?;
//! # Ok::<(), towngen::TownError>(())
//! ```

pub mod city;
pub mod core;
pub mod spatial;

pub use city::{generate, generate_with, CityPlan, Model};
pub use crate::core::{GeneratorConfig, Result, TownError};
