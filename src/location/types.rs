//! Core types for gazetteer candidates.

use crate::geo::{Coordinate, Region};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Administrative or physical class of a gazetteer entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    City,
    State,
    Country,
    Water,
    Site,
    Park,
    Transport,
    Mountain,
    Undersea,
    Forest,
    #[default]
    Unknown,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::City => "city",
            Self::State => "state",
            Self::Country => "country",
            Self::Water => "water",
            Self::Site => "site",
            Self::Park => "park",
            Self::Transport => "transport",
            Self::Mountain => "mountain",
            Self::Undersea => "undersea",
            Self::Forest => "forest",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for LocationKind {
    type Err = std::convert::Infallible;

    /// Case-insensitive; anything unrecognised maps to `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "city" => Self::City,
            "state" => Self::State,
            "country" => Self::Country,
            "water" => Self::Water,
            "site" => Self::Site,
            "park" => Self::Park,
            "transport" => Self::Transport,
            "mountain" => Self::Mountain,
            "undersea" => Self::Undersea,
            "forest" => Self::Forest,
            _ => Self::Unknown,
        })
    }
}

/// One possible referent of a toponym, as loaded from the gazetteer.
///
/// Immutable after construction; toponyms share candidates through `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    id: u64,
    name: String,
    region: Region,
    /// 0 means unknown.
    #[serde(default)]
    population: u64,
    #[serde(default)]
    kind: LocationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin1: Option<String>,
}

impl Location {
    pub fn new(id: u64, name: impl Into<String>, region: Region) -> Self {
        Self {
            id,
            name: name.into(),
            region,
            population: 0,
            kind: LocationKind::Unknown,
            admin1: None,
        }
    }

    /// Shorthand for a single-point location.
    pub fn point(id: u64, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self::new(id, name, Region::point(Coordinate::new(lat, lon)))
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = population;
        self
    }

    pub fn with_kind(mut self, kind: LocationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_admin1(mut self, code: impl Into<String>) -> Self {
        self.admin1 = Some(code.into());
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    pub fn admin1(&self) -> Option<&str> {
        self.admin1.as_deref()
    }

    /// Region-to-region distance in radians.
    pub fn distance(&self, other: &Location) -> f64 {
        self.region.distance(&other.region)
    }

    pub fn distance_km(&self, other: &Location) -> f64 {
        crate::geo::EARTH_RADIUS_KM * self.distance(other)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>8} ({}), {}, ({}), {}",
            self.id,
            self.name,
            self.kind,
            self.region.center(),
            self.population
        )
    }
}
