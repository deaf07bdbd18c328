use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wordle_engine::{Engine, Keyboard, WordTable};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to the solutions word list, one word per line.
    #[arg(long, default_value = "solutions.txt")]
    solutions: PathBuf,

    /// Path to the allowed-but-not-solution word list.
    #[arg(long, default_value = "allowed.txt")]
    allowed: PathBuf,

    /// Path to the binary state cache.
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Apply one guess/feedback pair to the initial state and print
    /// the resulting candidate count and top recommendation.
    Guess {
        guess: String,
        /// `c`/`p`/`_` per letter, e.g. `cp__c`.
        feedback: String,
    },
    /// Print the best opening guess(es) against the full dictionary.
    Open,
    /// Print cache statistics.
    Report,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let table = match WordTable::load(&cli.solutions, &cli.allowed) {
        Ok(t) => t,
        Err(e) => {
            log::error!("failed to load dictionary: {e}");
            std::process::exit(1);
        }
    };

    let cache_path = cli.cache.unwrap_or_else(wordle_engine::engine::default_cache_path);
    let engine = match Engine::new(table, &cache_path) {
        Ok(e) => e,
        Err(e) => {
            log::error!("failed to start engine: {e}");
            std::process::exit(1);
        }
    };

    match cli.cmd {
        Cmd::Guess { guess, feedback } => run_guess(&engine, &guess, &feedback),
        Cmd::Open => run_open(&engine),
        Cmd::Report => println!("{}", engine.report()),
    }

    if let Err(e) = engine.persist() {
        log::error!("failed to persist state cache: {e}");
    }
}

fn run_guess(engine: &Engine, guess: &str, feedback_text: &str) {
    let (feedback, ok) = wordle_engine::Feedback::parse(feedback_text);
    if !ok {
        println!("couldn't parse feedback {feedback_text:?}; expected 5 chars of c/p/_");
        return;
    }

    let state = engine.initial_state();
    let child = state.consider_guess(guess, feedback.encode(), true);
    println!("{} candidates remain ({} solutions)", child.n_words(), child.n_solutions());

    print_best_guess(&child);
}

fn run_open(engine: &Engine) {
    print_best_guess(&engine.initial_state());
}

fn print_best_guess(state: &std::sync::Arc<wordle_engine::State>) {
    let keyboard = Keyboard::new();
    let best = state.best_guess(&keyboard);
    match best.first() {
        Some(top) => println!("recommend: {} (h={})", top.entropy().word(), top.entropy().h()),
        None => println!("no recommendation (no solutions remain)"),
    }
}
