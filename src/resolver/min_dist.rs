//! Minimum-distance resolution.
//!
//! Each toponym takes the candidate whose summed distance to the nearest
//! candidate of every other toponym in the document is smallest. Mentions of
//! the same surface form are not evidence for each other. The search is
//! pruned: a candidate's running total is abandoned as soon as it reaches the
//! best total found so far, which cannot change the winner.

use super::{Resolution, Resolver};
use crate::error::{ResolveError, Result};
use crate::text::{Corpus, Document, Lexicon, ToponymPos};
use tracing::{debug, info};

/// Pruned arg-min over the candidates of toponym `target`.
///
/// `ambiguities[j]` is the candidate count of toponym `j` in the document and
/// `forms[j]` the index of its surface form. `cost(c, j, k)` is the cost of
/// pairing candidate `c` of the target with candidate `k` of toponym `j`.
/// Toponyms sharing the target's form are skipped. Ties keep the earliest
/// candidate. Returns `None` when no other form is left to compare against.
pub(crate) fn argmin<F>(ambiguities: &[usize], forms: &[usize], target: usize, mut cost: F) -> Option<usize>
where
    F: FnMut(usize, usize, usize) -> f64,
{
    let others: Vec<usize> = (0..ambiguities.len())
        .filter(|&j| forms[j] != forms[target] && ambiguities[j] > 0)
        .collect();
    if others.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for c in 0..ambiguities[target] {
        let bound = best.map_or(f64::INFINITY, |(_, b)| b);
        if let Some(total) = candidate_total(ambiguities, &others, c, bound, &mut cost) {
            best = Some((c, total));
        }
    }
    best.map(|(c, _)| c)
}

/// Summed nearest-candidate cost for candidate `c`, or `None` once the running
/// total reaches `bound`.
fn candidate_total<F>(ambiguities: &[usize], others: &[usize], c: usize, bound: f64, cost: &mut F) -> Option<f64>
where
    F: FnMut(usize, usize, usize) -> f64,
{
    let mut total = 0.0;
    for &j in others {
        let mut nearest = f64::INFINITY;
        for k in 0..ambiguities[j] {
            let d = cost(c, j, k);
            if d < nearest {
                nearest = d;
            }
        }
        total += nearest;
        if total >= bound {
            return None;
        }
    }
    Some(total)
}

/// Decisions for one document under plain great-circle distance.
fn decide(doc: &Document, lexicon: &Lexicon) -> Result<Vec<(ToponymPos, usize)>> {
    let toponyms = doc.resolvable();
    let ambiguities: Vec<usize> = toponyms.iter().map(|(_, t)| t.ambiguity()).collect();
    let forms = toponyms
        .iter()
        .map(|(_, t)| {
            lexicon
                .get(t.form())
                .ok_or_else(|| ResolveError::invalid_corpus(format!("form '{}' missing from lexicon", t.form())))
        })
        .collect::<Result<Vec<usize>>>()?;

    Ok((0..toponyms.len())
        .filter_map(|i| {
            let target = toponyms[i].1;
            let idx = argmin(&ambiguities, &forms, i, |c, j, k| {
                target.candidates()[c].distance(&toponyms[j].1.candidates()[k])
            })?;
            Some((toponyms[i].0, idx))
        })
        .collect())
}

/// Minimum-distance resolver with no learned state.
///
/// A toponym with no other resolvable toponym in its document is left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicMinDistResolver;

impl BasicMinDistResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for BasicMinDistResolver {
    fn name(&self) -> &'static str {
        "basic-min-dist"
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        let lexicon = corpus.toponym_lexicon();
        for doc in corpus.documents_mut() {
            let decisions = decide(doc, &lexicon)?;
            debug!(doc = doc.id(), resolved = decisions.len(), "min-dist document");
            doc.apply(&decisions)?;
        }
        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), %result, "disambiguation complete");
        Ok(result)
    }
}
