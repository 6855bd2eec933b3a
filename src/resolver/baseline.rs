//! Context-free baselines: most populous candidate and a seeded random pick.

use super::{Resolution, Resolver};
use crate::error::Result;
use crate::text::Corpus;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Picks the candidate with the largest population. Ties keep the earliest;
/// toponyms whose candidates all have zero population are left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct PopulationResolver;

impl PopulationResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for PopulationResolver {
    fn name(&self) -> &'static str {
        "population"
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        for t in corpus.toponyms_mut().filter(|t| t.has_candidates()) {
            let mut best = 0;
            for (i, c) in t.candidates().iter().enumerate() {
                if c.population() > t.candidates()[best].population() {
                    best = i;
                }
            }
            if t.candidates()[best].population() > 0 {
                t.select(best)?;
            }
        }
        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), %result, "disambiguation complete");
        Ok(result)
    }
}

/// Uniformly random candidate.
///
/// The generator is reseeded on every pass, so the same corpus always gets the
/// same choices.
#[derive(Debug, Clone, Copy)]
pub struct RandomResolver {
    seed: u64,
}

impl RandomResolver {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Resolver for RandomResolver {
    fn name(&self) -> &'static str {
        "random"
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        corpus.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        for t in corpus.toponyms_mut().filter(|t| t.has_candidates()) {
            let idx = rng.gen_range(0..t.ambiguity());
            t.select(idx)?;
        }
        let result = Resolution::tally(corpus);
        info!(resolver = self.name(), seed = self.seed, %result, "disambiguation complete");
        Ok(result)
    }
}
