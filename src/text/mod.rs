//! In-memory document model: corpus → document → sentence → token/toponym.
//!
//! Built by an external loader; resolvers only ever write toponym selections
//! and document system coordinates.

pub mod corpus;
pub mod lexicon;
pub mod sentence;

pub use corpus::{Corpus, Document, ToponymPos};
pub use lexicon::Lexicon;
pub use sentence::{Sentence, Token, Toponym};
