//! Document-level passes over already-resolved toponyms.

use super::{Resolution, Resolver};
use crate::error::Result;
use crate::geo::{BoundingBox, Coordinate};
use crate::text::{Corpus, Document, ToponymPos};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{debug, info};

fn selected_centers(doc: &Document) -> Vec<Coordinate> {
    doc.toponyms()
        .filter_map(|(_, t)| t.selected_location())
        .map(|l| l.region().center())
        .collect()
}

/// Fills unresolved toponyms with the candidate nearest a document reference
/// point.
///
/// The reference is the document's system coordinate, else the centroid of its
/// resolved toponyms. Documents with neither are left as they are; gold
/// annotations are never consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocCentroidResolver;

impl DocCentroidResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn reference(doc: &Document) -> Option<Coordinate> {
        doc.system_coord()
            .or_else(|| Coordinate::centroid(&selected_centers(doc)))
    }

    fn decide(doc: &Document) -> Vec<(ToponymPos, usize)> {
        let Some(centroid) = Self::reference(doc) else {
            return Vec::new();
        };
        doc.resolvable()
            .into_iter()
            .filter(|(_, t)| !t.has_selection())
            .filter_map(|(pos, t)| {
                let mut best: Option<(usize, f64)> = None;
                for (i, c) in t.candidates().iter().enumerate() {
                    let d = c.region().distance_to(&centroid);
                    if best.map_or(true, |(_, b)| d < b) {
                        best = Some((i, d));
                    }
                }
                best.map(|(i, _)| (pos, i))
            })
            .collect()
    }
}

impl Resolver for DocCentroidResolver {
    fn name(&self) -> &'static str {
        "doc-centroid"
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        for doc in corpus.documents_mut() {
            let decisions = Self::decide(doc);
            doc.apply(&decisions)?;
        }
        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), %result, "disambiguation complete");
        Ok(result)
    }
}

/// How a document's system coordinate is derived from its selections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GeolocateStrategy {
    /// Center of the most frequently selected location.
    #[default]
    MostCommon,
    /// Spherical centroid of every selected location.
    Centroid,
}

impl FromStr for GeolocateStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "most-common" | "mode" => Ok(Self::MostCommon),
            "centroid" => Ok(Self::Centroid),
            _ => Err(format!("Invalid geolocation strategy: '{}'. Use: most-common, centroid", s)),
        }
    }
}

/// Assigns each document a system coordinate from its resolved toponyms.
///
/// Selections are not changed. With a bounding box, only locations inside it
/// are counted, and a document with nothing to count falls back to the box
/// center.
#[derive(Debug, Clone, Default)]
pub struct DocumentGeolocator {
    strategy: GeolocateStrategy,
    bounds: Option<BoundingBox>,
}

impl DocumentGeolocator {
    pub fn new(strategy: GeolocateStrategy) -> Self {
        Self { strategy, bounds: None }
    }

    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn locate(&self, doc: &Document) -> Option<Coordinate> {
        self.from_selections(doc).or_else(|| self.bounds.map(|b| b.center()))
    }

    fn from_selections(&self, doc: &Document) -> Option<Coordinate> {
        let inside = |c: &Coordinate| self.bounds.map_or(true, |b| b.contains(c));
        match self.strategy {
            GeolocateStrategy::Centroid => {
                let centers: Vec<Coordinate> = selected_centers(doc).into_iter().filter(|c| inside(c)).collect();
                Coordinate::centroid(&centers)
            }
            GeolocateStrategy::MostCommon => {
                // (count, first appearance, center) per point location id
                let mut counts: HashMap<u64, (usize, usize, Coordinate)> = HashMap::new();
                for (order, (_, t)) in doc.toponyms().enumerate() {
                    let Some(loc) = t.selected_location().filter(|l| l.region().is_point()) else {
                        continue;
                    };
                    let center = loc.region().center();
                    if !inside(&center) {
                        continue;
                    }
                    counts.entry(loc.id()).or_insert((0, order, center)).0 += 1;
                }
                counts
                    .into_values()
                    .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
                    .map(|(_, _, center)| center)
            }
        }
    }
}

impl Resolver for DocumentGeolocator {
    fn name(&self) -> &'static str {
        "document-geolocator"
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        let mut located = 0;
        for doc in corpus.documents_mut() {
            if let Some(coord) = self.locate(doc) {
                debug!(doc = doc.id(), %coord, "document located");
                doc.set_system_coord(coord);
                located += 1;
            }
        }
        info!(located, documents = corpus.len(), "document geolocation complete");
        Ok(Resolution::tally(corpus))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::text::Toponym;

    #[test]
    fn test_centroid_fills_unset() {
        let mut c = corpus(vec![single_doc("d", vec![paris(), london()])]);
        c.documents_mut()[0].toponyms_mut().next().unwrap().select(0).unwrap();
        DocCentroidResolver.disambiguate(&mut c).unwrap();
        assert_eq!(c.selections(), vec![Some(0), Some(0)]);
    }

    #[test]
    fn test_centroid_keeps_existing_selection() {
        let mut c = corpus(vec![single_doc("d", vec![paris(), london()])]);
        for t in c.toponyms_mut() {
            t.select(1).unwrap();
        }
        DocCentroidResolver.disambiguate(&mut c).unwrap();
        assert_eq!(c.selections(), vec![Some(1), Some(1)]);
    }

    #[test]
    fn test_centroid_needs_evidence() {
        let mut c = corpus(vec![single_doc("d", vec![paris(), london()])]);
        DocCentroidResolver.disambiguate(&mut c).unwrap();
        assert_eq!(c.selections(), vec![None, None]);
    }

    #[test]
    fn test_geolocate_most_common() {
        let mut c = corpus(vec![single_doc("d", vec![paris(), paris(), london()])]);
        let picks = [Some(1), Some(1), Some(0)];
        for (t, p) in c.toponyms_mut().zip(picks) {
            t.select(p.unwrap()).unwrap();
        }
        let before = c.selections();
        DocumentGeolocator::default().disambiguate(&mut c).unwrap();
        let coord = c.documents()[0].system_coord().unwrap();
        assert_eq!(coord, Coordinate::new(33.66, -95.56));
        assert_eq!(c.selections(), before);
    }

    #[test]
    fn test_geolocate_bounds_and_empty() {
        let mut c = corpus(vec![
            single_doc("a", vec![paris(), london()]),
            single_doc("b", vec![Toponym::new("Atlantis", vec![])]),
        ]);
        let mut tops = c.toponyms_mut();
        tops.next().unwrap().select(1).unwrap();
        tops.next().unwrap().select(0).unwrap();
        drop(tops);

        let europe = BoundingBox {
            min_lat: 35.0,
            max_lat: 70.0,
            min_lon: -10.0,
            max_lon: 40.0,
        };
        let mut g = DocumentGeolocator::new(GeolocateStrategy::MostCommon).with_bounds(europe);
        g.disambiguate(&mut c).unwrap();
        assert_eq!(c.documents()[0].system_coord(), Some(Coordinate::new(51.5, -0.12)));
        assert_eq!(c.documents()[1].system_coord(), Some(europe.center()));

        let mut bare = corpus(vec![single_doc("c", vec![paris()])]);
        DocumentGeolocator::default().disambiguate(&mut bare).unwrap();
        assert_eq!(bare.documents()[0].system_coord(), None);
    }

    #[test]
    fn test_centroid_ignores_gold_coord() {
        let doc = single_doc("d", vec![paris()]).with_gold_coord(Coordinate::new(33.0, -96.0));
        assert_eq!(DocCentroidResolver::reference(&doc), None);
        let mut c = corpus(vec![doc]);
        let res = DocCentroidResolver.disambiguate(&mut c).unwrap();
        assert_eq!(c.selections(), vec![None]);
        assert_eq!(res.abstained, 1);
    }

    #[test]
    fn test_centroid_reference_prefers_system_coord() {
        let mut doc = single_doc("d", vec![paris()]).with_gold_coord(Coordinate::new(33.0, -96.0));
        doc.set_system_coord(Coordinate::new(50.0, 3.0));
        assert_eq!(DocCentroidResolver::reference(&doc), Some(Coordinate::new(50.0, 3.0)));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("centroid".parse::<GeolocateStrategy>().unwrap(), GeolocateStrategy::Centroid);
        assert!("median".parse::<GeolocateStrategy>().is_err());
    }
}
