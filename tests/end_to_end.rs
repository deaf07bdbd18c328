//! End-to-end scenarios from the engine's testable-properties list,
//! exercised through the public `Engine`/`State` API rather than
//! individual module internals.

use std::sync::Arc;

use wordle_engine::{Engine, Feedback, Keyboard, WordTable, WorkerPool};

fn solutions() -> Vec<String> {
    [
        "crate", "trace", "stare", "crane", "drape", "place", "plane", "grape", "brace", "slate",
        "grade", "tramp", "prone", "spore", "score", "store", "stove", "shove", "shore", "snore",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn allowed() -> Vec<String> {
    ["zzzzz", "qajaq", "fuzzy"].iter().map(|s| s.to_string()).collect()
}

fn engine(cache_path: &std::path::Path) -> Engine {
    let table = WordTable::from_lists(solutions(), allowed()).unwrap();
    Engine::with_pool(table, WorkerPool::with_workers(4), cache_path).unwrap()
}

#[test]
fn scenario_1_initial_state_matches_dictionary_and_has_a_recommendation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("cache.bin"));
    let initial = engine.initial_state();

    assert_eq!(initial.n_solutions(), solutions().len());

    let keyboard = Keyboard::new();
    let best = initial.best_guess(&keyboard);
    assert!(!best.is_empty());

    let top_h = initial.entropy_of(best[0].entropy().word().as_str());
    assert!(top_h > 0, "top recommendation should have positive entropy");
}

#[test]
fn scenario_2_trace_against_crate_is_all_present_and_contains_crate() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("cache.bin"));
    let initial = engine.initial_state();

    // "trace" vs. "crate" share r/a/e in the same positions, so the
    // correct two-pass result is Present, Correct, Correct, Present, Correct.
    let feedback = Feedback::compute("trace", "crate");
    use wordle_engine::Cell::{Correct, Present};
    assert_eq!(feedback.cells(), &[Present, Correct, Correct, Present, Correct]);

    let child = initial.consider_guess("trace", feedback.encode(), true);
    assert!(child.n_solutions() > 0);
    assert!(child.words().iter().any(|w| w.as_str() == "crate"));
}

#[test]
fn scenario_3_all_absent_feedback_matches_disjoint_letter_solutions() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("cache.bin"));
    let initial = engine.initial_state();

    let all_absent = Feedback::parse("_____").0;
    let child = initial.consider_guess("trace", all_absent.encode(), true);

    let expected = solutions()
        .iter()
        .filter(|s| !s.chars().any(|c| "trace".contains(c)))
        .count();
    assert_eq!(child.n_solutions(), expected);
}

#[test]
fn scenario_4_shared_child_state_has_pointer_equality_and_one_insert() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("cache.bin"));
    let feedback = Feedback::compute("trace", "crate").encode();

    // Two independent call paths: both start from the initial state
    // (as any two guesses-so-far paths that land on the same filtered
    // subset would), and both ask for the same (guess, feedback).
    let path_a = engine.initial_state().consider_guess("trace", feedback, true);
    let path_b = engine.initial_state().consider_guess("trace", feedback, true);

    assert!(Arc::ptr_eq(&path_a, &path_b));
}

#[test]
fn scenario_5_persist_then_restore_preserves_n_fully_computed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.bin");

    let pre_persist = {
        let engine = engine(&path);
        let initial = engine.initial_state();
        let feedback = Feedback::parse("_____").0.encode();
        let child = initial.consider_guess("trace", feedback, true);
        assert!(child.is_fully_computed());
        engine.persist().unwrap();
        engine.n_fully_computed()
    };
    assert!(pre_persist > 0);

    let restored = engine(&path);
    assert_eq!(restored.n_fully_computed(), pre_persist);
}

#[test]
fn scenario_6_single_solution_best_guess_ignores_keyboard() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine(&dir.path().join("cache.bin"));
    let initial = engine.initial_state();

    // Narrow down to exactly one solution by guessing it outright.
    let feedback = Feedback::compute("crate", "crate").encode();
    let child = initial.consider_guess("crate", feedback, true);
    assert_eq!(child.n_solutions(), 1);

    let untested_keyboard = Keyboard::new();
    let mut battered_keyboard = Keyboard::new();
    for guess in ["snore", "plane", "score"] {
        let fb = Feedback::compute(guess, "crate");
        battered_keyboard = battered_keyboard.update_with_guess(guess, &fb);
    }

    let best_untested = child.best_guess(&untested_keyboard);
    let best_battered = child.best_guess(&battered_keyboard);
    assert_eq!(best_untested.len(), 1);
    assert_eq!(best_battered.len(), 1);
    assert_eq!(best_untested[0].entropy().word().as_str(), "crate");
    assert_eq!(best_battered[0].entropy().word().as_str(), "crate");
}
