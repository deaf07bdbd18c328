//! The top-level handle bundling the word table, worker pool, and state
//! cache (spec §6.4's "submission interface" is really a method on
//! `State`; this is just what constructs the first one).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::{self, StateCache};
use crate::error::Result;
use crate::pool::WorkerPool;
use crate::state::State;
use crate::word::{WordTable, Words};

/// Owns the process-wide pool and cache, and hands out the one
/// `initial_state()` everything else is derived from.
pub struct Engine {
    pool: Arc<WorkerPool>,
    cache: Arc<StateCache>,
    all_words: Arc<Words>,
    initial_state: Arc<State>,
    cache_path: PathBuf,
}

impl Engine {
    /// Build a fresh engine from an already-loaded dictionary, with a
    /// pool sized to the default `2 * hardware_concurrency`, restoring
    /// any existing cache file at `cache_path`.
    pub fn new(table: WordTable, cache_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_pool(table, WorkerPool::new(), cache_path)
    }

    /// As [`Engine::new`], but with an explicit pool (mainly for tests,
    /// where a small fixed worker count keeps things deterministic).
    pub fn with_pool(table: WordTable, pool: WorkerPool, cache_path: impl AsRef<Path>) -> Result<Self> {
        let pool = Arc::new(pool);
        let cache = Arc::new(StateCache::new());
        let all_words = Arc::new(table.words().clone());

        let initial_state = State::construct_initial(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&all_words));
        cache.insert(Arc::clone(&initial_state));

        let cache_path = cache_path.as_ref().to_path_buf();
        cache.restore(&cache_path, Arc::clone(&pool), Arc::clone(&all_words), &cache)?;

        Ok(Self {
            pool,
            cache,
            all_words,
            initial_state,
            cache_path,
        })
    }

    pub fn initial_state(&self) -> Arc<State> {
        Arc::clone(&self.initial_state)
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    pub fn persist(&self) -> Result<()> {
        self.cache.persist(&self.cache_path)
    }

    pub fn report(&self) -> String {
        self.cache.report()
    }

    pub fn n_fully_computed(&self) -> usize {
        self.cache.n_fully_computed()
    }

    pub fn all_words(&self) -> &Words {
        &self.all_words
    }

    pub fn num_workers(&self) -> usize {
        self.pool.num_workers()
    }
}

pub fn default_cache_path() -> PathBuf {
    cache::default_cache_path()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::WorkerPool;

    fn small_table() -> WordTable {
        WordTable::from_lists(
            vec!["crate".into(), "trace".into(), "stare".into(), "crane".into()],
            vec!["zzzzz".into()],
        )
        .unwrap()
    }

    #[test]
    fn initial_state_holds_the_whole_dictionary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let engine = Engine::with_pool(small_table(), WorkerPool::with_workers(2), &path).unwrap();
        let initial = engine.initial_state();
        assert_eq!(initial.n_words(), 5);
        assert_eq!(initial.n_solutions(), 4);
    }

    #[test]
    fn persist_then_restore_preserves_fully_computed_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");

        let pre_persist_n_fully_computed = {
            let engine = Engine::with_pool(small_table(), WorkerPool::with_workers(2), &path).unwrap();
            let initial = engine.initial_state();
            // None of the dictionary words contain 'z', so this guess's
            // all-absent feedback keeps every solution and is large
            // enough (n_solutions=4 > 2) to trigger the real pipeline.
            let feedback = crate::feedback::Feedback::compute("zzzzz", "crate").encode();
            let child = initial.consider_guess("zzzzz", feedback, true);
            assert!(child.is_fully_computed());
            engine.persist().unwrap();
            engine.n_fully_computed()
        };
        assert!(pre_persist_n_fully_computed > 0);

        let restored = Engine::with_pool(small_table(), WorkerPool::with_workers(2), &path).unwrap();
        assert_eq!(restored.n_fully_computed(), pre_persist_n_fully_computed);
    }
}
