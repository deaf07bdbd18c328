//! The feedback primitive: computing a guess/solution color pattern,
//! and converting it to and from its base-3 integer encoding and its
//! textual representation. Grounded in `match.cpp`/`match.h` from the
//! original implementation.

use crate::config::WORD_LEN;

/// The color of a single letter cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Absent = 0,
    Present = 1,
    Correct = 2,
}

/// The five-cell colored response to a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feedback {
    cells: [Cell; WORD_LEN],
}

impl Feedback {
    pub fn cells(&self) -> &[Cell; WORD_LEN] {
        &self.cells
    }

    pub fn cell_at(&self, i: usize) -> Cell {
        self.cells[i]
    }

    /// Two-pass computation of the feedback `guess` would receive
    /// against `solution`.
    ///
    /// Pass 1 marks exact matches and "consumes" the matched solution
    /// slot. Pass 2 scans, left to right, for the first unconsumed
    /// solution slot holding the same letter. This is what gives
    /// duplicate letters their correct, non-symmetric behavior (spec
    /// §8 invariant 8).
    pub fn compute(guess: &str, solution: &str) -> Self {
        assert_eq!(
            guess.len(),
            solution.len(),
            "compute requires guess and solution of equal length"
        );
        let guess = guess.as_bytes();
        let solution = solution.as_bytes();
        let mut cells = [Cell::Absent; WORD_LEN];
        let mut consumed = [false; WORD_LEN];

        for i in 0..guess.len() {
            if guess[i] == solution[i] {
                cells[i] = Cell::Correct;
                consumed[i] = true;
            }
        }

        for i in 0..guess.len() {
            if cells[i] == Cell::Correct {
                continue;
            }
            for j in 0..solution.len() {
                if consumed[j] {
                    continue;
                }
                if guess[i] == solution[j] {
                    cells[i] = Cell::Present;
                    consumed[j] = true;
                    break;
                }
            }
        }

        Feedback { cells }
    }

    /// Encode as a base-3 integer, position 0 as the least-significant trit.
    pub fn encode(&self) -> u32 {
        let mut value = 0u32;
        let mut exponent = 1u32;
        for &c in &self.cells {
            value += (c as u32) * exponent;
            exponent *= 3;
        }
        value
    }

    /// Decode a base-3 integer back into a feedback pattern.
    pub fn decode(mut value: u32) -> Self {
        let mut cells = [Cell::Absent; WORD_LEN];
        for cell in cells.iter_mut() {
            *cell = match value % 3 {
                0 => Cell::Absent,
                1 => Cell::Present,
                _ => Cell::Correct,
            };
            value /= 3;
        }
        Feedback { cells }
    }

    /// Parse a textual feedback string: `c`/`C` Correct, `p`/`P`
    /// Present, `_`/`-`/`a` Absent. Returns `ok = false` (and a
    /// default, all-Absent feedback) on any other character, per §4.1
    /// — malformed feedback is never an `Err`.
    pub fn parse(text: &str) -> (Self, bool) {
        let mut cells = [Cell::Absent; WORD_LEN];
        let mut ok = text.len() == WORD_LEN;
        if ok {
            for (i, c) in text.chars().enumerate() {
                cells[i] = match c {
                    'c' | 'C' => Cell::Correct,
                    'p' | 'P' => Cell::Present,
                    '_' | '-' | 'a' => Cell::Absent,
                    _ => {
                        ok = false;
                        break;
                    }
                };
            }
        }
        if !ok {
            cells = [Cell::Absent; WORD_LEN];
        }
        (Feedback { cells }, ok)
    }

    /// Human-readable ASCII rendering (`_`, `p`, `c`).
    pub fn to_ascii(&self) -> String {
        self.cells
            .iter()
            .map(|c| match c {
                Cell::Absent => '_',
                Cell::Present => 'p',
                Cell::Correct => 'c',
            })
            .collect()
    }

    /// Human-readable emoji rendering, matching the original's ⬜/🟨/🟩.
    pub fn to_display(&self) -> String {
        self.cells
            .iter()
            .map(|c| match c {
                Cell::Absent => '⬜',
                Cell::Present => '🟨',
                Cell::Correct => '🟩',
            })
            .collect()
    }
}
