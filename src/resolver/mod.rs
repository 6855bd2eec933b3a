//! Toponym resolvers.
//!
//! Every strategy implements [`Resolver`]: an optional `train` step and a
//! `disambiguate` pass that writes toponym selections in place. Strategies are
//! independent structs chosen by configuration; [`Backoff`] chains two of them.

pub mod baseline;
pub mod cache;
pub mod document;
pub mod label_prop;
pub mod min_dist;
pub mod weighted;

pub use baseline::{PopulationResolver, RandomResolver};
pub use cache::DistanceCache;
pub use document::{DocCentroidResolver, DocumentGeolocator, GeolocateStrategy};
pub use label_prop::{LabelPropConfig, LabelPropResolver, LabelPropState, LabelPropVariant};
pub use min_dist::BasicMinDistResolver;
pub use weighted::{WeightTable, WeightedMinDistResolver};

use crate::error::{ResolveError, Result};
use crate::text::Corpus;
use std::fmt;
use tracing::debug;

/// Selection state of the resolvable toponyms after a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Toponyms with candidates that carry a selection.
    pub resolved: usize,
    /// Toponyms with candidates left unset.
    pub abstained: usize,
}

impl Resolution {
    pub fn tally(corpus: &Corpus) -> Self {
        let mut r = Self::default();
        for t in corpus.toponyms().filter(|t| t.has_candidates()) {
            if t.has_selection() {
                r.resolved += 1;
            } else {
                r.abstained += 1;
            }
        }
        r
    }

    pub fn total(&self) -> usize {
        self.resolved + self.abstained
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resolved, {} abstained", self.resolved, self.abstained)
    }
}

/// A toponym resolution strategy.
pub trait Resolver {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Learn resolver state from a training corpus.
    ///
    /// Strategies without a training step fail with
    /// [`ResolveError::TrainingUnsupported`] rather than doing nothing.
    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        let _ = corpus;
        Err(ResolveError::TrainingUnsupported(self.name()))
    }

    /// Select a candidate for every resolvable toponym, or leave it unset.
    ///
    /// Mutates `corpus` in place. Strategies that need training and have not
    /// been trained train on `corpus` first.
    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution>;
}

impl<R: Resolver + ?Sized> Resolver for Box<R> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        (**self).train(corpus)
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        (**self).disambiguate(corpus)
    }
}

/// Runs `fallback` after `primary`.
///
/// Unless `overwrite` is set, the fallback only fills toponyms the primary
/// left unset; confident primary decisions survive.
pub struct Backoff<P, F> {
    primary: P,
    fallback: F,
    overwrite: bool,
}

impl<P: Resolver, F: Resolver> Backoff<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }
}

impl<P: Resolver, F: Resolver> Resolver for Backoff<P, F> {
    fn name(&self) -> &'static str {
        "backoff"
    }

    fn train(&mut self, corpus: &Corpus) -> Result<()> {
        match self.primary.train(corpus) {
            Ok(()) | Err(ResolveError::TrainingUnsupported(_)) => {}
            Err(e) => return Err(e),
        }
        match self.fallback.train(corpus) {
            Ok(()) | Err(ResolveError::TrainingUnsupported(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn disambiguate(&mut self, corpus: &mut Corpus) -> Result<Resolution> {
        let primary = self.primary.disambiguate(corpus)?;
        debug!(primary = self.primary.name(), %primary, "primary pass done");

        if self.overwrite {
            self.fallback.disambiguate(corpus)?;
        } else {
            let before = corpus.selections();
            self.fallback.disambiguate(corpus)?;
            let merged: Vec<Option<usize>> = before
                .iter()
                .zip(corpus.selections())
                .map(|(kept, filled)| kept.or(filled))
                .collect();
            corpus.restore_selections(&merged)?;
        }

        let result = Resolution::tally(corpus);
        debug!(fallback = self.fallback.name(), %result, "backoff pass done");
        Ok(result)
    }
}
