//! A memoized, concurrently-populated search engine for the Wordle
//! family of word games: given a dictionary and a sequence of
//! (guess, feedback) pairs, ranks candidate next guesses by a two-level
//! Shannon-entropy objective.
//!
//! The interactive command loop, the static dictionary source, and
//! console formatting are out of scope — this crate is the core search
//! engine an interactive front end drives.

pub mod cache;
pub mod config;
pub mod engine;
pub mod entropy;
pub mod error;
pub mod feedback;
pub mod keyboard;
pub mod pool;
pub mod state;
pub mod word;

pub use cache::StateCache;
pub use engine::Engine;
pub use entropy::{ScoredEntropy, WordEntropy};
pub use error::{EngineError, Result};
pub use feedback::{Cell, Feedback};
pub use keyboard::{Keyboard, LetterState};
pub use pool::WorkerPool;
pub use state::State;
pub use word::{Word, WordTable, Words};
