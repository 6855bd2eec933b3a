//! Weighted minimum-distance resolution.
//!
//! Every (form, candidate) pair carries a prior weight. Distances to another
//! toponym's candidate are divided by that candidate's weight, so frequently
//! chosen referents look closer. Weights are learned by hard-assignment EM:
//! resolve the corpus under the current weights, count how often each candidate
//! won, and renormalize the counts so each form's weights sum to its ambiguity.

use super::cache::DistanceCache;
use super::min_dist::argmin;
use super::{Resolution, Resolver};
use crate::error::{ResolveError, Result};
use crate::text::{Corpus, Document, Lexicon, ToponymPos, Toponym};
use tracing::{debug, info};

/// Per-form candidate weights keyed through a [`Lexicon`].
#[derive(Debug, Clone, Default)]
pub struct WeightTable {
    lexicon: Lexicon,
    weights: Vec<Vec<f64>>,
    candidate_ids: Vec<Vec<u64>>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the toponym's form, adding it with uniform weights of 1.0 if
    /// unseen. A known form must arrive with the same candidate list.
    pub fn register(&mut self, toponym: &Toponym) -> Result<usize> {
        let ids: Vec<u64> = toponym.candidates().iter().map(|c| c.id()).collect();
        if let Some(idx) = self.lexicon.get(toponym.form()) {
            if self.candidate_ids[idx] != ids {
                return Err(ResolveError::InconsistentCandidates {
                    form: toponym.form().to_string(),
                    expected: self.candidate_ids[idx].clone(),
                    found: ids,
                });
            }
            return Ok(idx);
        }
        let idx = self.lexicon.get_or_add(toponym.form());
        self.weights.push(vec![1.0; ids.len()]);
        self.candidate_ids.push(ids);
        Ok(idx)
    }

    /// Register every resolvable toponym of the corpus.
    pub fn register_corpus(&mut self, corpus: &Corpus) -> Result<()> {
        for t in corpus.toponyms().filter(|t| t.has_candidates()) {
            self.register(t)?;
        }
        Ok(())
    }

    pub fn index(&self, form: &str) -> Option<usize> {
        self.lexicon.get(form)
    }

    pub fn weights(&self, form: &str) -> Option<&[f64]> {
        self.index(form).map(|i| self.weights[i].as_slice())
    }

    /// Weight of candidate `cand` of the form at `idx`; 1.0 when unknown.
    pub fn weight(&self, idx: usize, cand: usize) -> f64 {
        self.weights
            .get(idx)
            .and_then(|w| w.get(cand))
            .copied()
            .unwrap_or(1.0)
    }

    /// Overwrite the weights of a registered form.
    pub fn set_weights(&mut self, form: &str, weights: Vec<f64>) -> Result<()> {
        let idx = self
            .index(form)
            .ok_or_else(|| ResolveError::invalid_config(format!("no weights registered for '{}'", form)))?;
        if weights.len() != self.weights[idx].len() {
            return Err(ResolveError::invalid_config(format!(
                "'{}' has {} candidates, got {} weights",
                form,
                self.weights[idx].len(),
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(ResolveError::invalid_config(format!("weights for '{}' must be positive", form)));
        }
        self.weights[idx] = weights;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// M-step: turn per-candidate counts into weights summing to the ambiguity.
    ///
    /// Forms whose counts sum to zero keep their previous weights.
    fn reestimate(&mut self, counts: &[Vec<f64>]) {
        for (weights, counts) in self.weights.iter_mut().zip(counts) {
            let sum: f64 = counts.iter().sum();
            if sum <= 0.0 {
                continue;
            }
            let k = weights.len() as f64;
            for (w, c) in weights.iter_mut().zip(counts) {
                *w = c / sum * k;
            }
        }
    }
}

/// Decisions for one document under the current weights, tagged with the
/// form index of each toponym.
fn decide(doc: &Document, table: &WeightTable, cache: &mut DistanceCache) -> Result<Vec<(ToponymPos, usize, usize)>> {
    let toponyms = doc.resolvable();
    let forms = toponyms
        .iter()
        .map(|(_, t)| {
            table
                .index(t.form())
                .ok_or_else(|| ResolveError::invalid_corpus(format!("form '{}' missing from weight table", t.form())))
        })
        .collect::<Result<Vec<usize>>>()?;
    let ambiguities: Vec<usize> = toponyms.iter().map(|(_, t)| t.ambiguity()).collect();

    let mut decisions = Vec::with_capacity(toponyms.len());
    for i in 0..toponyms.len() {
        let target = toponyms[i].1;
        let chosen = argmin(&ambiguities, &forms, i, |c, j, k| {
            let d = cache.get_or_compute((forms[i], c), (forms[j], k), || {
                target.candidates()[c].distance(&toponyms[j].1.candidates()[k])
            });
            d / table.weight(forms[j], k)
        });
        if let Some(idx) = chosen {
            decisions.push((toponyms[i].0, idx, forms[i]));
        }
    }
    Ok(decisions)
}

/// Weighted minimum-distance resolver trained by hard EM.
///
/// With zero iterations all weights stay at 1.0 and decisions match
/// [`BasicMinDistResolver`](super::BasicMinDistResolver).
#[derive(Debug, Clone)]
pub struct WeightedMinDistResolver {
    iterations: usize,
    phantom_count: f64,
    prior: Option<WeightTable>,
    table: Option<WeightTable>,
}

impl WeightedMinDistResolver {
    pub fn new(iterations: usize) -> Self {
        Self {
            iterations,
            phantom_count: 0.0,
            prior: None,
            table: None,
        }
    }

    /// Count added to every candidate before each M-step.
    pub fn with_phantom_count(mut self, phantom_count: f64) -> Self {
        self.phantom_count = phantom_count.max(0.0);
        self
    }

    /// Start training from these weights instead of uniform ones.
    pub fn with_prior(mut self, prior: WeightTable) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Learned weights, once trained.
    pub fn weights(&self) -> Option<&WeightTable> {
        self.table.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.table.is_some()
    }

    fn em_iteration(&self, table: &mut WeightTable, corpus: &Corpus, cache: &mut DistanceCache) -> Result<usize> {
        let mut counts: Vec<Vec<f64>> = table
            .weights
            .iter()
            .map(|w| vec![self.phantom_count; w.len()])
            .collect();
        let mut assigned = 0;
        for doc in corpus {
            for (_, idx, form) in decide(doc, table, cache)? {
                counts[form][idx] += 1.0;
                assigned += 1;
            }
        }
        table.reestimate(&counts);
        Ok(assigned)
    }

    /// Run EM over `corpus`, memoizing distances in `cache` for every iteration.
    pub(crate) fn train_with_cache(&mut self, corpus: &Corpus, cache: &mut DistanceCache) -> Result<()> {
        corpus.validate()?;
        let mut table = self.prior.clone().unwrap_or_default();
        table.register_corpus(corpus)?;
        info!(forms = table.len(), iterations = self.iterations, "training weighted min-dist");

        for iteration in 1..=self.iterations {
            let assigned = self.em_iteration(&mut table, corpus, cache)?;
            debug!(iteration, assigned, cached = cache.len(), "EM iteration complete");
        }

        self.table = Some(table);
        Ok(())
    }
}

impl Default for WeightedMinDistResolver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Resolver for WeightedMinDistResolver {
    fn name(&self) -> &'static str {
        "weighted-min-dist"
    }

    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        let mut cache = DistanceCache::new();
        self.train_with_cache(corpus, &mut cache)?;
        debug!(entries = cache.len(), hits = cache.hits(), "distance cache");
        Ok(())
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        if self.table.is_none() {
            info!("weighted min-dist untrained, training on target corpus");
            self.train(corpus)?;
        }
        let table = self.table.get_or_insert_with(WeightTable::new);
        table.register_corpus(corpus)?;

        let mut cache = DistanceCache::new();
        for doc in corpus.documents_mut() {
            let decisions: Vec<(ToponymPos, usize)> = decide(doc, table, &mut cache)?
                .into_iter()
                .map(|(pos, idx, _)| (pos, idx))
                .collect();
            doc.apply(&decisions)?;
        }
        debug!(entries = cache.len(), hits = cache.hits(), "distance cache");

        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), %result, "disambiguation complete");
        Ok(result)
    }
}
