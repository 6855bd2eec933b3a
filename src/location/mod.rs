//! Gazetteer candidate model.
//!
//! Locations are produced by an external gazetteer and never mutated here.

pub mod types;

pub use types::{Location, LocationKind};
