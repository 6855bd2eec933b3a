//! Toponym resolution: pick the real-world referent of every place-name
//! mention in a corpus.
//!
//! The in-memory model ([`text`]) is corpus → document → sentence → token,
//! where toponym tokens carry gazetteer candidates ([`location`]) over
//! geographic regions ([`geo`]). Resolvers ([`resolver`]) write a selection
//! into each toponym or leave it unset; [`eval`] scores the result.

pub mod config;
pub mod error;
pub mod eval;
pub mod geo;
pub mod location;
pub mod resolver;
pub mod text;

pub use config::{BackoffKind, ResolverConfig, ResolverKind};
pub use error::{ConfigError, GeoError, ResolveError, Result};
pub use geo::{BoundingBox, Coordinate, Region};
pub use location::{Location, LocationKind};
pub use resolver::{Backoff, Resolution, Resolver};
pub use text::{Corpus, Document, Sentence, Token, Toponym};
