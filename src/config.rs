//! Tunables pulled out of the search engine, named after their C++
//! ancestor's `config.h` so that cross-referencing stays easy.

/// Length of a word; every `Word` loaded into a [`crate::word::WordTable`]
/// must have exactly this many bytes.
pub const WORD_LEN: usize = 5;

/// Top band of expected-follow-up-entropy (H₂) candidates kept per state.
pub const ENTROPY2_TOP_N: usize = 1000;

/// A state only materializes its `solutions` list when there are this
/// many or fewer solutions left.
pub const MAX_N_SOLUTIONS_PRINTED: usize = 12;

/// How many recommended guesses a caller-facing report prints at most.
pub const MAX_N_GUESSES_PRINTED: usize = 10;

/// Keep-threshold for the entropy pass prune: entries below
/// `ENTROPY_RATIO * max_h` are dropped.
pub const ENTROPY_RATIO: f64 = 0.9;
