//! The keyboard tie-break tracker. Spec §1 places the keyboard
//! "decoration" tracker out of scope as a component in its own right,
//! but `best_guess` takes one by value (§4.3, §6.4), so a minimal,
//! pure implementation lives here. Grounded in `keyboard.h`/`keyboard.cpp`.

const QWERTY: &str = "qwertyuiopasdfghjklzxcvbnm";

/// Per-letter state, used only to score candidate guesses that probe
/// untested letters more favorably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterState {
    Absent = 0,
    Present = 1,
    Untested = 3,
}

#[derive(Debug, Clone, Copy)]
struct Letter {
    value: char,
    state: LetterState,
}

/// A snapshot of per-letter knowledge accumulated across guesses.
/// Construction and updates are pure functions over `(guess, Feedback)`;
/// building the running history across a game is left to the caller.
#[derive(Debug, Clone)]
pub struct Keyboard {
    letters: Vec<Letter>,
}

impl Keyboard {
    /// A fresh keyboard with every letter untested, in QWERTY order.
    pub fn new() -> Self {
        Self {
            letters: QWERTY
                .chars()
                .map(|value| Letter {
                    value,
                    state: LetterState::Untested,
                })
                .collect(),
        }
    }

    /// Fold in one guess's feedback, returning an updated keyboard.
    /// A letter already marked `Present` stays `Present` even if a
    /// later guess places it as `Correct` elsewhere on the keyboard —
    /// the keyboard only distinguishes "ever seen as correct/present"
    /// from "never placed", collapsing both into `Present`, matching
    /// the original's `update_with_guess`.
    pub fn update_with_guess(&self, guess: &str, feedback: &crate::feedback::Feedback) -> Self {
        let letters = self
            .letters
            .iter()
            .map(|letter| match guess.find(letter.value) {
                None => *letter,
                Some(pos) => {
                    let cell = feedback.cell_at(pos);
                    let state = match cell {
                        crate::feedback::Cell::Absent => LetterState::Absent,
                        _ => LetterState::Present,
                    };
                    Letter {
                        value: letter.value,
                        state,
                    }
                }
            })
            .collect();
        Self { letters }
    }

    pub fn letter(&self, c: char) -> LetterStateRef {
        let letter = self
            .letters
            .iter()
            .find(|l| l.value == c)
            .unwrap_or_else(|| panic!("'{c}' is not a keyboard letter"));
        LetterStateRef { state: letter.state }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

/// A thin handle so `keyboard.letter('a').state()` reads naturally
/// without exposing the private `Letter` struct.
pub struct LetterStateRef {
    state: LetterState,
}

impl LetterStateRef {
    pub fn state(&self) -> LetterState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::Feedback;

    #[test]
    fn fresh_keyboard_is_all_untested() {
        let kb = Keyboard::new();
        assert_eq!(kb.letter('q').state(), LetterState::Untested);
    }

    #[test]
    fn update_marks_absent_and_present_letters() {
        let kb = Keyboard::new();
        let fb = Feedback::compute("crate", "sooty");
        let kb = kb.update_with_guess("crate", &fb);
        // none of c,r,a,t,e appear in "sooty" => all absent
        for c in "crate".chars() {
            assert_eq!(kb.letter(c).state(), LetterState::Absent);
        }
    }

    #[test]
    fn update_marks_correct_letters_present() {
        let kb = Keyboard::new();
        let fb = Feedback::compute("crate", "crate");
        let kb = kb.update_with_guess("crate", &fb);
        for c in "crate".chars() {
            assert_eq!(kb.letter(c).state(), LetterState::Present);
        }
    }
}
