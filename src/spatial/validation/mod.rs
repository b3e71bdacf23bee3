//! Geometry validation for generated outlines

mod geometric;

pub use geometric::GeometricValidator;

/// Validation error types
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InsufficientVertices { count: usize, minimum: usize },
    SelfIntersecting { description: String },
    /// Outline runs clockwise; outlines are expected counter-clockwise
    ClockwiseWinding,
    NotOnRing { index: usize },
    NonFinite { index: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientVertices { count, minimum } => {
                write!(f, "{} vertices, at least {} required", count, minimum)
            }
            Self::SelfIntersecting { description } => write!(f, "self-intersecting: {}", description),
            Self::ClockwiseWinding => write!(f, "expected counter-clockwise winding"),
            Self::NotOnRing { index } => write!(f, "point {} is not on its ring", index),
            Self::NonFinite { index } => write!(f, "vertex {} is not finite", index),
        }
    }
}
