use proptest::prelude::*;
use std::sync::Arc;
use toponym_resolver::resolver::{
    BasicMinDistResolver, DocCentroidResolver, LabelPropConfig, LabelPropResolver, LabelPropVariant,
    PopulationResolver, RandomResolver, Resolver, WeightedMinDistResolver,
};
use toponym_resolver::resolver::label_prop::Seeding;
use toponym_resolver::{Corpus, Document, Location, Sentence, Token, Toponym};

/// A form with fixed candidates, so every mention of it agrees.
fn gazetteer_form(form: usize, coords: &[(f64, f64)]) -> Toponym {
    let candidates = coords
        .iter()
        .enumerate()
        .map(|(i, &(lat, lon))| {
            let id = (form * 100 + i) as u64;
            Arc::new(Location::point(id, format!("F{}-{}", form, i), lat, lon).with_population(id))
        })
        .collect();
    Toponym::new(format!("F{}", form), candidates)
}

fn coord() -> impl Strategy<Value = (f64, f64)> {
    (-89.0f64..89.0, -179.0f64..179.0)
}

/// Up to six forms with up to four candidates, mentioned across a few documents.
fn arb_corpus() -> impl Strategy<Value = Corpus> {
    prop::collection::vec(prop::collection::vec(coord(), 0..4), 1..6).prop_flat_map(|forms| {
        let n = forms.len();
        prop::collection::vec(prop::collection::vec(0..n, 0..5), 1..4).prop_map(move |docs| {
            docs.into_iter()
                .enumerate()
                .map(|(d, mentions)| {
                    let mut tokens = vec![Token::word("in")];
                    for f in mentions {
                        tokens.push(gazetteer_form(f, &forms[f]).into());
                    }
                    Document::new(format!("doc{}", d)).with_sentence(Sentence::new(tokens))
                })
                .collect()
        })
    })
}

fn resolvers() -> Vec<Box<dyn Resolver>> {
    let label_prop = LabelPropConfig {
        variant: LabelPropVariant::Occurrence,
        degrees_per_cell: 30.0,
        ..Default::default()
    };
    vec![
        Box::new(BasicMinDistResolver::new()),
        Box::new(WeightedMinDistResolver::new(3).with_phantom_count(0.5)),
        Box::new(PopulationResolver::new()),
        Box::new(RandomResolver::new(11)),
        Box::new(DocCentroidResolver::new()),
        Box::new(LabelPropResolver::new(label_prop).unwrap()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn selections_stay_in_range(corpus in arb_corpus()) {
        for mut resolver in resolvers() {
            let mut c = corpus.clone();
            let r = resolver.disambiguate(&mut c).unwrap();
            for t in c.toponyms() {
                if let Some(i) = t.selected() {
                    prop_assert!(i < t.ambiguity(), "{} chose {} of {}", resolver.name(), i, t.ambiguity());
                }
                if !t.has_candidates() {
                    prop_assert!(t.selected().is_none());
                }
            }
            prop_assert_eq!(r.total(), c.toponyms().filter(|t| t.has_candidates()).count());
        }
    }

    #[test]
    fn zero_iteration_weighted_matches_basic(corpus in arb_corpus()) {
        let mut a = corpus.clone();
        let mut b = corpus;
        WeightedMinDistResolver::new(0).disambiguate(&mut a).unwrap();
        BasicMinDistResolver::new().disambiguate(&mut b).unwrap();
        prop_assert_eq!(a.selections(), b.selections());
    }

    #[test]
    fn learned_weights_sum_to_ambiguity(corpus in arb_corpus()) {
        let mut resolver = WeightedMinDistResolver::new(4);
        resolver.train(&corpus).unwrap();
        let table = resolver.weights().unwrap();
        for t in corpus.toponyms().filter(|t| t.has_candidates()) {
            let w = table.weights(t.form()).unwrap();
            let sum: f64 = w.iter().sum();
            prop_assert!((sum - w.len() as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn label_prop_without_seeds_abstains(corpus in arb_corpus()) {
        let config = LabelPropConfig {
            variant: LabelPropVariant::DefaultRule,
            degrees_per_cell: 30.0,
            seeding: Seeding::Gold,
            ..Default::default()
        };
        let mut resolver = LabelPropResolver::new(config).unwrap();
        let mut c = corpus;
        let r = resolver.disambiguate(&mut c).unwrap();
        prop_assert_eq!(r.resolved, 0);
        prop_assert!(c.selections().iter().all(Option::is_none));
    }
}
