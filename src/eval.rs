//! Scoring resolved corpora against gold annotations.

use crate::geo::EARTH_RADIUS_KM;
use crate::text::Corpus;
use serde::Serialize;
use std::fmt;

/// Toponym- and document-level scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    /// Toponyms with a gold annotation.
    pub gold: usize,
    /// Gold-annotated toponyms the system resolved.
    pub selected: usize,
    pub correct: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Correct over all gold toponyms, abstentions counted wrong.
    pub accuracy: f64,
    pub mean_error_km: Option<f64>,
    pub median_error_km: Option<f64>,
    /// Documents with both a gold and a system coordinate.
    pub documents_scored: usize,
    pub doc_mean_error_km: Option<f64>,
    pub doc_median_error_km: Option<f64>,
}

fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

fn median(xs: &mut [f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);
    let mid = xs.len() / 2;
    Some(if xs.len() % 2 == 0 {
        (xs[mid - 1] + xs[mid]) / 2.0
    } else {
        xs[mid]
    })
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 / d as f64
    }
}

/// Score every gold-annotated toponym and every geolocated document.
pub fn evaluate(corpus: &Corpus) -> Report {
    let mut r = Report::default();
    let mut errors = Vec::new();

    for t in corpus.toponyms() {
        let Some(gold) = t.gold_location() else { continue };
        r.gold += 1;
        let Some(selected) = t.selected_location() else { continue };
        r.selected += 1;
        if t.selected() == t.gold() {
            r.correct += 1;
        }
        errors.push(selected.region().distance(gold.region()) * EARTH_RADIUS_KM);
    }

    r.precision = ratio(r.correct, r.selected);
    r.recall = ratio(r.correct, r.gold);
    r.f1 = if r.precision + r.recall > 0.0 {
        2.0 * r.precision * r.recall / (r.precision + r.recall)
    } else {
        0.0
    };
    r.accuracy = r.recall;
    r.mean_error_km = mean(&errors);
    r.median_error_km = median(&mut errors);

    let mut doc_errors: Vec<f64> = corpus
        .iter()
        .filter_map(|d| Some(d.system_coord()?.distance_km(&d.gold_coord()?)))
        .collect();
    r.documents_scored = doc_errors.len();
    r.doc_mean_error_km = mean(&doc_errors);
    r.doc_median_error_km = median(&mut doc_errors);
    r
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Toponyms:   {} gold, {} resolved, {} correct", self.gold, self.selected, self.correct)?;
        writeln!(
            f,
            "  P/R/F1:     {:.3} / {:.3} / {:.3}   accuracy {:.3}",
            self.precision, self.recall, self.f1, self.accuracy
        )?;
        if let (Some(mean), Some(median)) = (self.mean_error_km, self.median_error_km) {
            writeln!(f, "  Error (km): mean {:.1}, median {:.1}", mean, median)?;
        }
        if let (Some(mean), Some(median)) = (self.doc_mean_error_km, self.doc_median_error_km) {
            writeln!(
                f,
                "  Documents:  {} scored, mean {:.1} km, median {:.1} km",
                self.documents_scored, mean, median
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::location::Location;
    use crate::text::{Document, Sentence, Token, Toponym};
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn toponym(gold: usize, selected: Option<usize>) -> Toponym {
        let mut t = Toponym::new(
            "Paris",
            vec![
                Arc::new(Location::point(1, "Paris, France", 48.85, 2.35)),
                Arc::new(Location::point(2, "Paris, Texas", 33.66, -95.56)),
            ],
        )
        .with_gold(gold)
        .unwrap();
        if let Some(s) = selected {
            t.select(s).unwrap();
        }
        t
    }

    fn corpus(toponyms: Vec<Toponym>) -> Corpus {
        let tokens = toponyms.into_iter().map(Token::from).collect();
        vec![Document::new("d").with_sentence(Sentence::new(tokens))].into_iter().collect()
    }

    #[test]
    fn test_precision_recall() {
        let c = corpus(vec![toponym(0, Some(0)), toponym(0, Some(1)), toponym(1, None), toponym(1, Some(1))]);
        let r = evaluate(&c);
        assert_eq!((r.gold, r.selected, r.correct), (4, 3, 2));
        assert_relative_eq!(r.precision, 2.0 / 3.0);
        assert_relative_eq!(r.recall, 0.5);
        assert_relative_eq!(r.f1, 2.0 * (2.0 / 3.0) * 0.5 / (2.0 / 3.0 + 0.5));
        assert_eq!(r.median_error_km, Some(0.0));
        assert!(r.mean_error_km.unwrap() > 2000.0);
    }

    #[test]
    fn test_empty_corpus() {
        let r = evaluate(&Corpus::new());
        assert_eq!(r, Report::default());
        assert_eq!(r.f1, 0.0);
        assert!(r.to_string().contains("0 gold"));
    }

    #[test]
    fn test_document_errors() {
        let mut doc = Document::new("d").with_gold_coord(Coordinate::new(0.0, 0.0));
        doc.set_system_coord(Coordinate::new(0.0, 1.0));
        let c: Corpus = vec![doc, Document::new("e")].into_iter().collect();
        let r = evaluate(&c);
        assert_eq!(r.documents_scored, 1);
        assert_relative_eq!(r.doc_mean_error_km.unwrap(), EARTH_RADIUS_KM * 1f64.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn test_median_even() {
        let mut xs = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut xs), Some(2.5));
    }
}
