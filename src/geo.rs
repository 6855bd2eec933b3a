//! Geographic primitives: coordinates, regions, bounding boxes.
//!
//! Distances are great-circle central angles in radians. Every resolver
//! compares these raw angles; `distance_km` exists for reporting only.

use crate::error::GeoError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

const DEG: f64 = PI / 180.0;

/// Mean earth radius used for kilometre conversion.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Construct a coordinate, rejecting values outside the valid ranges.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance in radians (haversine form).
    pub fn distance(&self, other: &Coordinate) -> f64 {
        if self == other {
            return 0.0;
        }
        let (lat1, lat2) = (self.lat * DEG, other.lat * DEG);
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon) * DEG;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * a.sqrt().min(1.0).asin()
    }

    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        EARTH_RADIUS_KM * self.distance(other)
    }

    /// Spherical centroid: mean of the unit vectors, projected back onto the sphere.
    ///
    /// Returns `None` for an empty slice. Antipodal sets with no defined mean
    /// fall back to the first coordinate.
    pub fn centroid(coords: &[Coordinate]) -> Option<Coordinate> {
        let first = *coords.first()?;
        if coords.len() == 1 {
            return Some(first);
        }
        let (mut x, mut y, mut z) = (0.0, 0.0, 0.0);
        for c in coords {
            let (lat, lon) = (c.lat * DEG, c.lon * DEG);
            x += lat.cos() * lon.cos();
            y += lat.cos() * lon.sin();
            z += lat.sin();
        }
        let n = coords.len() as f64;
        let (x, y, z) = (x / n, y / n, z / n);

        let hyp = (x * x + y * y).sqrt();
        if hyp < 1e-12 && z.abs() < 1e-12 {
            return Some(first);
        }
        Some(Coordinate::new(z.atan2(hyp) / DEG, y.atan2(x) / DEG))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2},{:.2}", self.lat, self.lon)
    }
}

/// Axis-aligned latitude/longitude box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, c: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&c.lat) && (self.min_lon..=self.max_lon).contains(&c.lon)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new((self.min_lat + self.max_lat) / 2.0, (self.min_lon + self.max_lon) / 2.0)
    }
}

// ─── Region ─────────────────────────────────────────────────────

/// The extent of a location: one or more representative points and a center.
///
/// A city is a single point; a country may carry many representatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RegionSpec")]
pub struct Region {
    representatives: Vec<Coordinate>,
    center: Coordinate,
}

#[derive(Deserialize)]
struct RegionSpec {
    representatives: Vec<Coordinate>,
    #[serde(default)]
    center: Option<Coordinate>,
}

impl TryFrom<RegionSpec> for Region {
    type Error = GeoError;

    fn try_from(spec: RegionSpec) -> Result<Self, Self::Error> {
        match spec.center {
            Some(center) => Region::with_center(spec.representatives, center),
            None => Region::from_points(spec.representatives),
        }
    }
}

impl Region {
    pub fn point(coord: Coordinate) -> Self {
        Self {
            representatives: vec![coord],
            center: coord,
        }
    }

    /// A region whose center is the centroid of its representatives.
    pub fn from_points(representatives: Vec<Coordinate>) -> Result<Self, GeoError> {
        if let [only] = representatives[..] {
            return Ok(Self::point(only));
        }
        let center = Coordinate::centroid(&representatives).ok_or(GeoError::EmptyRegion)?;
        Ok(Self { representatives, center })
    }

    /// A region with an explicitly supplied center (e.g. a capital for a country).
    pub fn with_center(representatives: Vec<Coordinate>, center: Coordinate) -> Result<Self, GeoError> {
        if representatives.is_empty() {
            return Err(GeoError::EmptyRegion);
        }
        Ok(Self { representatives, center })
    }

    pub fn representatives(&self) -> &[Coordinate] {
        &self.representatives
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn is_point(&self) -> bool {
        self.representatives.len() == 1
    }

    /// Minimum distance over all representative pairs, in radians.
    pub fn distance(&self, other: &Region) -> f64 {
        let mut min = f64::INFINITY;
        for a in &self.representatives {
            for b in &other.representatives {
                min = min.min(a.distance(b));
            }
        }
        min
    }

    /// Minimum distance from any representative to `coord`, in radians.
    pub fn distance_to(&self, coord: &Coordinate) -> f64 {
        self.representatives
            .iter()
            .map(|r| r.distance(coord))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for c in &self.representatives {
            bb.min_lat = bb.min_lat.min(c.lat);
            bb.max_lat = bb.max_lat.max(c.lat);
            bb.min_lon = bb.min_lon.min(c.lon);
            bb.max_lon = bb.max_lon.max(c.lon);
        }
        bb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_zero_for_same_point() {
        let p = Coordinate::new(48.85, 2.35);
        assert_eq!(p.distance(&p), 0.0);
    }

    #[test]
    fn test_distance_km_paris_london() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let london = Coordinate::new(51.5074, -0.1278);
        let d = paris.distance_km(&london);
        assert!((d - 344.0).abs() < 5.0, "got {d}");
    }

    #[test]
    fn test_distance_symmetric() {
        let a = Coordinate::new(33.66, -95.56);
        let b = Coordinate::new(42.98, -81.25);
        assert_relative_eq!(a.distance(&b), b.distance(&a), epsilon = 1e-12);
    }

    #[test]
    fn test_distance_antipodal_is_pi() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 180.0);
        assert_relative_eq!(a.distance(&b), PI, epsilon = 1e-9);
    }

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(Coordinate::checked(91.0, 0.0).is_err());
        assert!(Coordinate::checked(0.0, -181.0).is_err());
        assert!(Coordinate::checked(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_centroid_of_symmetric_points() {
        let c = Coordinate::centroid(&[Coordinate::new(10.0, -20.0), Coordinate::new(10.0, 20.0)]).unwrap();
        assert_relative_eq!(c.lon, 0.0, epsilon = 1e-9);
        assert!(c.lat > 10.0);
        assert!(Coordinate::centroid(&[]).is_none());
    }

    #[test]
    fn test_region_min_pair_distance() {
        let country = Region::from_points(vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 10.0)]).unwrap();
        let city = Region::point(Coordinate::new(0.0, 11.0));
        let expected = Coordinate::new(0.0, 10.0).distance(&Coordinate::new(0.0, 11.0));
        assert_relative_eq!(country.distance(&city), expected, epsilon = 1e-12);
        assert_relative_eq!(city.distance(&country), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_region_empty_rejected() {
        assert_eq!(Region::from_points(vec![]), Err(GeoError::EmptyRegion));
        assert_eq!(
            Region::with_center(vec![], Coordinate::new(0.0, 0.0)),
            Err(GeoError::EmptyRegion)
        );
    }

    #[test]
    fn test_region_deserialize_validates() {
        let ok: Region = serde_json::from_str(r#"{"representatives":[{"lat":1.0,"lon":2.0}]}"#).unwrap();
        assert!(ok.is_point());
        assert_eq!(ok.center(), Coordinate::new(1.0, 2.0));
        assert!(serde_json::from_str::<Region>(r#"{"representatives":[]}"#).is_err());
    }

    #[test]
    fn test_single_point_center_is_exact() {
        let p = Coordinate::new(33.66, -95.56);
        assert_eq!(Region::from_points(vec![p]).unwrap().center(), p);
        assert_eq!(Coordinate::centroid(&[p]), Some(p));
    }

    #[test]
    fn test_bounding_box() {
        let r = Region::from_points(vec![Coordinate::new(-5.0, 10.0), Coordinate::new(5.0, 30.0)]).unwrap();
        let bb = r.bounding_box();
        assert!(bb.contains(&Coordinate::new(0.0, 20.0)));
        assert!(!bb.contains(&Coordinate::new(6.0, 20.0)));
        assert_eq!(bb.center(), Coordinate::new(0.0, 20.0));
    }
}
