//! A node in the search tree: a word subset plus its cached
//! two-level entropy ranking. Grounded in `state.h`/`state.cpp`/
//! `state-compute.cpp`.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::cache::StateCache;
use crate::config::{ENTROPY2_TOP_N, ENTROPY_RATIO, MAX_N_SOLUTIONS_PRINTED, WORD_LEN};
use crate::entropy::{ScoredEntropy, WordEntropy};
use crate::feedback::Feedback;
use crate::keyboard::Keyboard;
use crate::pool::{run_batch, WorkerPool};
use crate::word::{Word, Words};

/// The lazily-populated, one-shot-written half of a state: everything
/// the entropy pipeline fills in. Bundled behind a single mutex so the
/// `fully_computed: false -> true` transition publishes `entropy2` and
/// `highest_entropy2_end` together, per spec §5's ordering guarantee.
#[derive(Debug, Default)]
struct Computed {
    max_entropy: u32,
    entropy: Vec<WordEntropy>,
    entropy2: Vec<WordEntropy>,
    highest_entropy2_end: usize,
    fully_computed: bool,
}

pub struct State {
    pool: Arc<WorkerPool>,
    cache: Arc<StateCache>,
    all_words: Arc<Words>,
    words: Words,
    n_solutions: usize,
    solutions: Option<Words>,
    computed: Mutex<Computed>,
}

impl State {
    /// Build the root state: all words, no entropy yet. The caller is
    /// responsible for inserting it into the cache (it is the one
    /// state that is never persisted — spec §4.4).
    pub fn construct_initial(
        pool: Arc<WorkerPool>,
        cache: Arc<StateCache>,
        all_words: Arc<Words>,
    ) -> Arc<Self> {
        let words = (*all_words).clone();
        let n_solutions = words.n_solutions();
        let solutions = solutions_of(&words, n_solutions);
        Arc::new(Self {
            pool,
            cache,
            all_words,
            words,
            n_solutions,
            solutions,
            computed: Mutex::new(Computed::default()),
        })
    }

    fn construct_child(
        pool: Arc<WorkerPool>,
        cache: Arc<StateCache>,
        all_words: Arc<Words>,
        words: Words,
        do_full_compute: bool,
    ) -> Self {
        let n_solutions = words.n_solutions();
        let solutions = solutions_of(&words, n_solutions);

        let mut computed = Computed::default();
        if n_solutions > 2 {
            if do_full_compute {
                run_full_pipeline(&pool, &cache, &all_words, &words, n_solutions, &mut computed);
            } else {
                // Submode: a cheap, single-threaded H pass over just
                // this state's own candidates, used only so the parent's
                // H₂ pass can read `max_entropy()` back out. Mirrors the
                // original's "run entropy only on words, not all words"
                // shortcut for non-printing lookups.
                computed.entropy = words
                    .iter()
                    .map(|w| WordEntropy::new(w.clone(), compute_entropy_of(&words, n_solutions, w.as_str())))
                    .collect();
                computed.max_entropy = computed.entropy.iter().map(WordEntropy::h).max().unwrap_or(0);
            }
        }

        Self {
            pool,
            cache,
            all_words,
            words,
            n_solutions,
            solutions,
            computed: Mutex::new(computed),
        }
    }

    pub fn words(&self) -> &Words {
        &self.words
    }

    pub fn n_words(&self) -> usize {
        self.words.len()
    }

    pub fn n_solutions(&self) -> usize {
        self.n_solutions
    }

    pub fn solutions(&self) -> Option<&Words> {
        self.solutions.as_ref()
    }

    pub fn max_entropy(&self) -> u32 {
        self.computed.lock().unwrap().max_entropy
    }

    pub fn is_fully_computed(&self) -> bool {
        self.computed.lock().unwrap().fully_computed
    }

    pub fn entropy_of(&self, word: &str) -> u32 {
        let computed = self.computed.lock().unwrap();
        computed
            .entropy
            .iter()
            .find(|e| e.word().as_str() == word)
            .map(WordEntropy::h)
            .unwrap_or(0)
    }

    pub fn entropy2_of(&self, word: &str) -> u32 {
        let computed = self.computed.lock().unwrap();
        computed
            .entropy2
            .iter()
            .find(|e| e.word().as_str() == word)
            .map(WordEntropy::h)
            .unwrap_or(0)
    }

    /// Number of entries in the pruned, ≥`ENTROPY_RATIO`·max entropy
    /// band (spec §4.4's "average entropy-entry count per state").
    pub fn n_entropy_entries(&self) -> usize {
        self.computed.lock().unwrap().entropy.len()
    }

    /// Filter on `(guess, feedback_value)`, returning the shared cached
    /// child state — constructing and inserting it on a miss (spec §4.3).
    pub fn consider_guess(
        self: &Arc<Self>,
        guess: &str,
        feedback_value: u32,
        do_full_compute: bool,
    ) -> Arc<State> {
        let filtered: Vec<Word> = self
            .words
            .iter()
            .filter(|w| Feedback::compute(guess, w.as_str()).encode() == feedback_value)
            .cloned()
            .collect();
        let filtered = Words::new(filtered);

        if let Some(existing) = self.cache.at(&filtered) {
            return existing;
        }

        let child = State::construct_child(
            Arc::clone(&self.pool),
            Arc::clone(&self.cache),
            Arc::clone(&self.all_words),
            filtered,
            do_full_compute,
        );

        // Policy decision (spec §9 open question): empty children are
        // not inserted into the cache — there is nothing to share.
        if child.words.is_empty() {
            return Arc::new(child);
        }

        self.cache.insert(Arc::new(child))
    }

    /// Ensure H₂ has been computed, running the lazy pipeline under a
    /// lock if necessary, then return the leading tied block of
    /// `entropy2`, scored against `keyboard` and re-sorted.
    pub fn best_guess(self: &Arc<Self>, keyboard: &Keyboard) -> Vec<ScoredEntropy> {
        if self.n_solutions == 0 {
            return Vec::new();
        }
        if self.n_solutions == 1 {
            let word = self
                .words
                .iter()
                .find(|w| w.is_solution())
                .expect("n_solutions == 1 implies exactly one solution word");
            return vec![ScoredEntropy::new(WordEntropy::new(word.clone(), 0), 0)];
        }

        self.ensure_fully_computed();

        let computed = self.computed.lock().unwrap();
        let band = &computed.entropy2[..computed.highest_entropy2_end];
        let mut scored: Vec<ScoredEntropy> = band
            .iter()
            .cloned()
            .map(|e| ScoredEntropy::scored(e, keyboard))
            .collect();
        drop(computed);
        scored.sort();

        let top_score = match scored.first() {
            Some(s) => s.score(),
            None => return Vec::new(),
        };
        let cut = scored.iter().position(|s| s.score() != top_score).unwrap_or(scored.len());
        scored.truncate(cut);
        scored
    }

    fn ensure_fully_computed(self: &Arc<Self>) {
        let already_done = self.computed.lock().unwrap().fully_computed;
        if already_done {
            return;
        }
        // Recursive parallelism note (spec §9): the H₂ pass below calls
        // `consider_guess(.., do_full_compute = false)`, which never
        // resubmits to the pool, so this cannot deadlock against
        // `self.pool`.
        let mut computed = self.computed.lock().unwrap();
        if computed.fully_computed {
            return;
        }
        run_full_pipeline(
            &self.pool,
            &self.cache,
            &self.all_words,
            &self.words,
            self.n_solutions,
            &mut computed,
        );
        // `run_full_pipeline` runs sub-`consider_guess` calls which may
        // try to lock a *different* state's mutex, never this one's, so
        // holding `computed` across the call is safe.
        drop(computed);
    }

    pub fn words_equal_to(&self, other: &Words) -> bool {
        self.words.identity() == other.identity()
    }

    /// Binary-encode this state per spec §6.3.
    pub fn serialize(&self, w: &mut impl Write) -> std::io::Result<()> {
        let computed = self.computed.lock().unwrap();
        w.write_all(&[computed.fully_computed as u8])?;

        write_words(w, &self.words)?;
        write_word_entropies(w, &computed.entropy)?;
        if computed.fully_computed {
            write_word_entropies(w, &computed.entropy2)?;
        }
        Ok(())
    }

    /// Decode a single persisted state. The returned state shares the
    /// pool/cache/all_words of `cache`'s owner but is not itself
    /// inserted into the cache — the caller (`StateCache::restore`)
    /// does that once every state has been read.
    pub fn deserialize(
        r: &mut impl Read,
        pool: Arc<WorkerPool>,
        cache: Arc<StateCache>,
        all_words: Arc<Words>,
    ) -> io::Result<Self> {
        let fully_computed = read_u8(r)? != 0;
        let words = read_words(r)?;
        let mut entropy = read_word_entropies(r)?;
        entropy.retain(|e| e.h() > 0);

        let mut entropy2 = if fully_computed {
            let mut v = read_word_entropies(r)?;
            v.retain(|e| e.h() > 0);
            v
        } else {
            Vec::new()
        };
        entropy.sort();
        entropy2.sort();

        let max_entropy = entropy.iter().map(WordEntropy::h).max().unwrap_or(0);
        let highest_entropy2_end = highest_tied_prefix(&entropy2, WordEntropy::h);

        let n_solutions = words.n_solutions();
        let solutions = solutions_of(&words, n_solutions);

        Ok(Self {
            pool,
            cache,
            all_words,
            words,
            n_solutions,
            solutions,
            computed: Mutex::new(Computed {
                max_entropy,
                entropy,
                entropy2,
                highest_entropy2_end,
                fully_computed,
            }),
        })
    }
}

fn solutions_of(words: &Words, n_solutions: usize) -> Option<Words> {
    if n_solutions == 0 || n_solutions > MAX_N_SOLUTIONS_PRINTED {
        return None;
    }
    Some(Words::new(
        words.iter().filter(|w| w.is_solution()).cloned().collect(),
    ))
}

/// H(w): Shannon entropy (in nats) of the feedback distribution `w`
/// induces across the solutions in `words`, scaled by 1000 and floored.
fn compute_entropy_of(words: &Words, n_solutions: usize, guess: &str) -> u32 {
    if n_solutions == 0 {
        return 0;
    }
    let mut counts = [0u32; 243];
    for w in words.iter() {
        if !w.is_solution() {
            continue;
        }
        let v = Feedback::compute(guess, w.as_str()).encode() as usize;
        counts[v] += 1;
    }
    let mut h = 0.0f64;
    for &c in &counts {
        if c == 0 {
            continue;
        }
        let p = c as f64 / n_solutions as f64;
        h -= p * p.ln();
    }
    (h * 1000.0) as u32
}

/// H₂(w): expected max follow-up entropy, using the parent's own
/// cache/pool to look up each hypothetical child's `max_entropy`.
fn compute_entropy2_of(
    state: &Arc<State>,
    words: &Words,
    n_solutions: usize,
    guess: &str,
) -> u32 {
    if n_solutions == 0 {
        return 0;
    }
    let mut counts = [0u32; 243];
    for w in words.iter() {
        if !w.is_solution() {
            continue;
        }
        let v = Feedback::compute(guess, w.as_str()).encode() as usize;
        counts[v] += 1;
    }
    let mut h2 = 0.0f64;
    for (v, &c) in counts.iter().enumerate() {
        if c == 0 {
            continue;
        }
        let child = state.consider_guess(guess, v as u32, false);
        let h_v = child.max_entropy();
        let p = c as f64 / n_solutions as f64;
        h2 += p * h_v as f64;
    }
    h2 as u32
}

/// The full two-pass entropy pipeline (spec §4.3 "Per-state entropy
/// pipeline"). Runs both during eager child construction (before the
/// state has been wrapped in its own `Arc` or inserted into `cache`)
/// and during a lazy `best_guess` call on an already-cached state; see
/// the `placeholder` lookup below for how the H₂ pass gets an `Arc`
/// to recurse on in both cases.
fn run_full_pipeline(
    pool: &Arc<WorkerPool>,
    cache: &Arc<StateCache>,
    all_words: &Arc<Words>,
    words: &Words,
    n_solutions: usize,
    computed: &mut Computed,
) {
    let num_blocks = pool.num_workers();

    // 1. H pass, parallel, over the *entire* dictionary: any word in
    // `all_words` is a legal next guess.
    let all: Vec<Word> = all_words.iter().cloned().collect();
    let block_sz = all.len().div_ceil(num_blocks).max(1);
    let merged: Arc<Mutex<Vec<WordEntropy>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let merged = Arc::clone(&merged);
        let all = Arc::new(all);
        let words = words.clone();
        run_batch(pool, num_blocks, move |i| {
            let start = i * block_sz;
            let end = ((i + 1) * block_sz).min(all.len());
            if start >= end {
                return;
            }
            let mut local = Vec::new();
            let mut local_max = 0u32;
            for word in &all[start..end] {
                let h = compute_entropy_of(&words, n_solutions, word.as_str());
                if h > local_max {
                    local_max = h;
                }
                local.push(WordEntropy::new(word.clone(), h));
            }
            let threshold = (local_max as f64 * ENTROPY_RATIO) as u32;
            local.retain(|e| e.h() >= threshold && e.h() > 0);
            merged.lock().unwrap().extend(local);
        });
    }

    // 2. Sort decreasingly. `run_batch` already establishes happens-before
    // from every block's write to this point, so draining through the
    // lock (rather than `Arc::try_unwrap`) sidesteps any race over
    // exactly when the last per-job `Arc` clone of the closure drops.
    let mut entropy: Vec<WordEntropy> = std::mem::take(&mut *merged.lock().unwrap());
    entropy.sort();

    // 3. Global prune.
    let max_entropy = entropy.first().map(WordEntropy::h).unwrap_or(0);
    let threshold = (max_entropy as f64 * ENTROPY_RATIO) as u32;
    let cut = entropy.iter().position(|e| e.h() < threshold).unwrap_or(entropy.len());
    entropy.truncate(cut);

    computed.entropy = entropy;
    computed.max_entropy = max_entropy;

    if computed.entropy.is_empty() {
        computed.entropy2 = Vec::new();
        computed.highest_entropy2_end = 0;
        computed.fully_computed = true;
        return;
    }

    // A freestanding `Arc<State>` is needed so the H₂ pass can call
    // `consider_guess` on itself recursively; this only happens for
    // states reached through the normal child-construction path, which
    // always has a cache to look itself up from (it was just inserted,
    // or is about to be).
    let placeholder = cache.at(words).unwrap_or_else(|| {
        Arc::new(State::construct_child(
            Arc::clone(pool),
            Arc::clone(cache),
            Arc::clone(all_words),
            words.clone(),
            false,
        ))
    });

    // 4. H₂ pass, parallel, over the top ENTROPY2_TOP_N entries of `entropy`.
    let top_n = computed.entropy.len().min(ENTROPY2_TOP_N);
    let candidates: Vec<WordEntropy> = computed.entropy[..top_n].to_vec();
    let num_blocks2 = pool.num_workers();
    let block_sz2 = candidates.len().div_ceil(num_blocks2).max(1);
    let merged2: Arc<Mutex<Vec<WordEntropy>>> = Arc::new(Mutex::new(Vec::new()));
    {
        let merged2 = Arc::clone(&merged2);
        let candidates = Arc::new(candidates);
        let words = words.clone();
        let placeholder = Arc::clone(&placeholder);
        run_batch(pool, num_blocks2, move |i| {
            let start = i * block_sz2;
            let end = ((i + 1) * block_sz2).min(candidates.len());
            if start >= end {
                return;
            }
            let mut local = Vec::new();
            for we in &candidates[start..end] {
                let h2 = compute_entropy2_of(&placeholder, &words, n_solutions, we.word().as_str());
                local.push(WordEntropy::new(we.word().clone(), we.h() + h2));
            }
            merged2.lock().unwrap().extend(local);
        });
    }

    let mut entropy2: Vec<WordEntropy> = std::mem::take(&mut *merged2.lock().unwrap());
    entropy2.sort();

    computed.highest_entropy2_end = highest_tied_prefix(&entropy2, WordEntropy::h);
    computed.entropy2 = entropy2;
    computed.fully_computed = true;
}

/// First index whose key differs from the first element's key — the
/// end-check happens *before* any dereference, unlike the buggy variant
/// called out in spec §9's open questions.
fn highest_tied_prefix<T>(items: &[T], key: impl Fn(&T) -> u32) -> usize {
    if items.is_empty() {
        return 0;
    }
    let top = key(&items[0]);
    items.iter().position(|i| key(i) != top).unwrap_or(items.len())
}

fn write_words(w: &mut impl Write, words: &Words) -> std::io::Result<()> {
    w.write_all(&(words.len() as u32).to_le_bytes())?;
    for word in words.iter() {
        write_word(w, word)?;
    }
    Ok(())
}

fn write_word(w: &mut impl Write, word: &Word) -> std::io::Result<()> {
    w.write_all(&[word.is_solution() as u8])?;
    w.write_all(&[word.as_str().len() as u8])?;
    w.write_all(word.as_str().as_bytes())?;
    Ok(())
}

fn write_word_entropies(w: &mut impl Write, entries: &[WordEntropy]) -> std::io::Result<()> {
    w.write_all(&(entries.len() as u32).to_le_bytes())?;
    for e in entries {
        write_word(w, e.word())?;
        w.write_all(&e.h().to_le_bytes())?;
    }
    Ok(())
}

fn read_u8(r: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32(r: &mut impl Read) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn invalid_data(reason: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, reason.into())
}

fn read_word(r: &mut impl Read) -> io::Result<Word> {
    let is_solution = read_u8(r)? != 0;
    let len = read_u8(r)? as usize;
    if len != WORD_LEN {
        return Err(invalid_data(format!(
            "word length {len} does not match expected {WORD_LEN}"
        )));
    }
    let mut bytes = vec![0u8; len];
    r.read_exact(&mut bytes)?;
    let text = String::from_utf8(bytes).map_err(|_| invalid_data("word bytes are not valid UTF-8"))?;
    Ok(Word::new(text, is_solution))
}

fn read_words(r: &mut impl Read) -> io::Result<Words> {
    let n = read_u32(r)? as usize;
    let mut words = Vec::with_capacity(n);
    for _ in 0..n {
        words.push(read_word(r)?);
    }
    Ok(Words::new(words))
}

fn read_word_entropies(r: &mut impl Read) -> io::Result<Vec<WordEntropy>> {
    let n = read_u32(r)? as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let word = read_word(r)?;
        let h = read_u32(r)?;
        out.push(WordEntropy::new(word, h));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StateCache;
    use crate::word::WordTable;

    fn tiny_engine() -> (Arc<WorkerPool>, Arc<StateCache>, Arc<Words>) {
        let solutions = vec![
            "crate".to_string(),
            "trace".to_string(),
            "stare".to_string(),
            "crane".to_string(),
            "drape".to_string(),
        ];
        let allowed = vec!["zzzzz".to_string()];
        let table = WordTable::from_lists(solutions, allowed).unwrap();
        let pool = Arc::new(WorkerPool::with_workers(2));
        let cache = Arc::new(StateCache::new());
        let all_words = Arc::new(table.words().clone());
        (pool, cache, all_words)
    }

    #[test]
    fn consider_guess_filters_to_matching_feedback() {
        let (pool, cache, all_words) = tiny_engine();
        let initial = State::construct_initial(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&all_words));
        cache.insert(Arc::clone(&initial));

        let feedback = Feedback::compute("crate", "crate").encode();
        let child = initial.consider_guess("crate", feedback, true);
        for w in child.words().iter() {
            assert_eq!(Feedback::compute("crate", w.as_str()).encode(), feedback);
        }
        pool.shutdown();
    }

    #[test]
    fn single_solution_short_circuits_best_guess() {
        let (pool, cache, all_words) = tiny_engine();
        let initial = State::construct_initial(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&all_words));
        cache.insert(Arc::clone(&initial));

        let feedback = Feedback::compute("crate", "crate").encode();
        let child = initial.consider_guess("crate", feedback, true);
        assert_eq!(child.n_solutions(), 1);

        let keyboard = Keyboard::new();
        let best = child.best_guess(&keyboard);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].entropy().word().as_str(), "crate");
        pool.shutdown();
    }

    #[test]
    fn zero_solutions_best_guess_is_empty() {
        let (pool, cache, all_words) = tiny_engine();
        let initial = State::construct_initial(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&all_words));
        cache.insert(Arc::clone(&initial));

        // "zzzzz" matched all-correct leaves no solutions (no solution is "zzzzz").
        let feedback = Feedback::compute("zzzzz", "zzzzz").encode();
        let child = initial.consider_guess("zzzzz", feedback, true);
        assert_eq!(child.n_solutions(), 0);
        let keyboard = Keyboard::new();
        assert!(child.best_guess(&keyboard).is_empty());
        pool.shutdown();
    }

    #[test]
    fn serialize_roundtrip_preserves_words_and_flags() {
        let (pool, cache, all_words) = tiny_engine();
        let initial = State::construct_initial(Arc::clone(&pool), Arc::clone(&cache), Arc::clone(&all_words));
        cache.insert(Arc::clone(&initial));

        let feedback = Feedback::compute("crate", "stare").encode();
        let child = initial.consider_guess("crate", feedback, true);

        let mut buf = Vec::new();
        child.serialize(&mut buf).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let restored = State::deserialize(&mut cursor, pool.clone(), cache.clone(), all_words.clone()).unwrap();

        assert_eq!(restored.words().identity(), child.words().identity());
        assert_eq!(restored.is_fully_computed(), child.is_fully_computed());
        assert_eq!(restored.n_solutions(), child.n_solutions());
        pool.shutdown();
    }
}
