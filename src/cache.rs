//! The shared, concurrently-populated store of [`State`]s, keyed by
//! word-subset identity, with binary persistence. Grounded in
//! `statecache.h`/`statecache.cpp`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{EngineError, Result};
use crate::pool::WorkerPool;
use crate::state::State;
use crate::word::Words;

#[derive(Default)]
struct Counters {
    total_hits: AtomicUsize,
    total_misses: AtomicUsize,
    total_inserts: AtomicUsize,
    hits_since_report: AtomicUsize,
    misses_since_report: AtomicUsize,
    inserts_since_report: AtomicUsize,
}

/// The reader-writer-locked map of word-subset identity to shared
/// [`State`], plus the hit/miss/insert counters spec §6.3 asks `report`
/// to surface.
pub struct StateCache {
    map: RwLock<HashMap<Arc<str>, Arc<State>>>,
    counters: Counters,
    dirty: AtomicBool,
    /// Identity of the first state ever inserted. Per spec §6.3, the
    /// initial state is recorded this way rather than recognized
    /// structurally, and is excluded from persistence.
    initial_identity: RwLock<Option<Arc<str>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            counters: Counters::default(),
            dirty: AtomicBool::new(false),
            initial_identity: RwLock::new(None),
        }
    }

    pub fn contains(&self, key: &Words) -> bool {
        self.map.read().unwrap().contains_key(key.identity())
    }

    /// Shared-read lookup. Increments the hit counters on success.
    pub fn at(&self, key: &Words) -> Option<Arc<State>> {
        let found = self.map.read().unwrap().get(key.identity()).cloned();
        if found.is_some() {
            self.counters.total_hits.fetch_add(1, Ordering::Relaxed);
            self.counters.hits_since_report.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Exclusive-write insert. A concurrent duplicate insert is
    /// tolerated: the caller gets back whichever entry actually ended
    /// up in the map, asserted equivalent by identity (spec §6.3/§7).
    pub fn insert(&self, state: Arc<State>) -> Arc<State> {
        self.counters.total_misses.fetch_add(1, Ordering::Relaxed);
        self.counters.misses_since_report.fetch_add(1, Ordering::Relaxed);

        let identity: Arc<str> = state.words().identity().into();
        let mut map = self.map.write().unwrap();
        match map.entry(identity) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                let existing = existing.get().clone();
                debug_assert!(
                    existing.words_equal_to(state.words()),
                    "duplicate cache insert for identity disagrees on contents"
                );
                existing
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                let identity = slot.key().clone();
                slot.insert(Arc::clone(&state));
                self.counters.total_inserts.fetch_add(1, Ordering::Relaxed);
                self.counters.inserts_since_report.fetch_add(1, Ordering::Relaxed);
                self.dirty.store(true, Ordering::Relaxed);

                let mut initial = self.initial_identity.write().unwrap();
                if initial.is_none() {
                    *initial = Some(identity);
                }
                state
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_fully_computed(&self) -> usize {
        self.map.read().unwrap().values().filter(|s| s.is_fully_computed()).count()
    }

    /// A human-readable snapshot of the running counters, resetting the
    /// since-last-report ones. Format mirrors the original's two-line
    /// `T:.../S:...` layout.
    pub fn report(&self) -> String {
        let map = self.map.read().unwrap();
        let n_cached = map.len();
        let n_fully_computed = map.values().filter(|s| s.is_fully_computed()).count();
        let avg_entropy_entries = if n_cached == 0 {
            0.0
        } else {
            map.values().map(|s| s.n_entropy_entries()).sum::<usize>() as f64 / n_cached as f64
        };
        drop(map);

        let total_hits = self.counters.total_hits.load(Ordering::Relaxed);
        let total_misses = self.counters.total_misses.load(Ordering::Relaxed);
        let total_inserts = self.counters.total_inserts.load(Ordering::Relaxed);
        let total_events = total_hits + total_misses;

        let hits = self.counters.hits_since_report.swap(0, Ordering::Relaxed);
        let misses = self.counters.misses_since_report.swap(0, Ordering::Relaxed);
        let inserts = self.counters.inserts_since_report.swap(0, Ordering::Relaxed);
        let events_since = hits + misses;

        format!(
            "T:H:{total_hits}|M:{total_misses}|I:{total_inserts} / {total_events}\n\
             S:H:{hits}|M:{misses}|I:{inserts} / {events_since}\n\
             cached:{n_cached} fully_computed:{n_fully_computed} avg_entropy_entries:{avg_entropy_entries:.1}"
        )
    }

    /// Dump every state except the initial one to `path`, little-endian
    /// binary per spec §6.3. A no-op if nothing has been inserted since
    /// the last persist (or ever).
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        if !self.dirty.swap(false, Ordering::Relaxed) {
            return Ok(());
        }
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| EngineError::CacheIo {
            path: path.to_path_buf(),
            source,
        })?;
        let mut w = BufWriter::new(file);

        let map = self.map.read().unwrap();
        let initial = self.initial_identity.read().unwrap().clone();
        // The initial state is reconstructed on restore, not persisted.
        let states: Vec<&Arc<State>> = map
            .iter()
            .filter(|(identity, _)| Some((*identity).clone()) != initial)
            .map(|(_, state)| state)
            .collect();

        write_to(&mut w, path, &(states.len() as u32).to_le_bytes())?;
        for state in states {
            state.serialize(&mut w).map_err(|source| EngineError::CacheIo {
                path: path.to_path_buf(),
                source,
            })?;
        }
        w.flush().map_err(|source| EngineError::CacheIo {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Load `path` into this (freshly constructed) cache. Missing or
    /// unreadable files are treated as "stay empty" (spec §7), never
    /// fatal; format errors are.
    pub fn restore(
        &self,
        path: impl AsRef<Path>,
        pool: Arc<WorkerPool>,
        all_words: Arc<Words>,
        self_arc: &Arc<StateCache>,
    ) -> Result<()> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(f) => f,
            Err(_) => {
                log::debug!("cache file {} not found, starting empty", path.display());
                return Ok(());
            }
        };
        let mut r = BufReader::new(file);

        let count = read_u32(&mut r, path)?;
        for _ in 0..count {
            let state = State::deserialize(&mut r, Arc::clone(&pool), Arc::clone(self_arc), Arc::clone(&all_words))
                .map_err(|source| {
                    if source.kind() == std::io::ErrorKind::InvalidData {
                        EngineError::CacheFormat {
                            path: path.to_path_buf(),
                            reason: source.to_string(),
                        }
                    } else {
                        EngineError::CacheIo {
                            path: path.to_path_buf(),
                            source,
                        }
                    }
                })?;
            self.insert(Arc::new(state));
        }
        // Loading is not itself a reason to re-persist.
        self.dirty.store(false, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}

fn write_to(w: &mut impl Write, path: &Path, buf: &[u8]) -> Result<()> {
    w.write_all(buf).map_err(|source| EngineError::CacheIo {
        path: path.to_path_buf(),
        source,
    })
}

fn read_u32(r: &mut impl Read, path: &Path) -> Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(|source| EngineError::CacheIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(u32::from_le_bytes(buf))
}

/// The fixed relative path spec §6.3 persists to.
pub fn default_cache_path() -> PathBuf {
    PathBuf::from("wordle_state_cache.bin")
}
