use serde::{Deserialize, Serialize};

use crate::{CandidateList, Coord2, Difficulty, Digit, GRID_SIZE, GameError, GameId, Grid, Result};

/// Session lifecycle. `Complete` is terminal for the timer, but the session
/// stays inspectable and a different one can still be loaded over it.
///
/// Valid transitions:
/// - NoSession -> AwaitingPuzzle
/// - AwaitingPuzzle -> InProgress
/// - InProgress <-> Saving
/// - InProgress | Saving -> Complete
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    NoSession,
    AwaitingPuzzle,
    InProgress,
    Saving,
    Complete,
}

impl SessionPhase {
    /// Whether local moves are currently accepted.
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::InProgress | Self::Saving)
    }

    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::NoSession
    }
}

/// Outcome of a cell selection attempt.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SelectOutcome {
    Selected,
    /// Given cell or no active session; selection unchanged.
    Rejected,
}

impl SelectOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Selected)
    }
}

/// Outcome of a digit entry attempt.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EntryOutcome {
    /// Board changed; callers should schedule a save.
    Changed,
    /// The selected cell already held this value.
    NoChange,
    /// No cell is selected.
    NoSelection,
    /// Given cell or no active session; treated as a user-input no-op.
    Rejected,
}

impl EntryOutcome {
    pub const fn has_update(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// A full session as returned by the backend, applied atomically by
/// [`GameState::load`].
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub game_id: GameId,
    pub difficulty: Difficulty,
    pub board: Grid,
    pub givens: Grid,
    pub elapsed_secs: u32,
    pub complete: bool,
}

/// Client-side state of one puzzle attempt.
///
/// Owns the working board, the immutable given mask, the selection, the
/// elapsed-time counter, and the completion flag. It has no DOM or network
/// awareness; the view drives it through these operations and re-renders, and
/// API responses re-enter only through [`GameState::load`],
/// [`GameState::start`], and [`GameState::apply_validation`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    game_id: Option<GameId>,
    difficulty: Difficulty,
    board: Grid,
    givens: Grid,
    selected: Option<Coord2>,
    elapsed_secs: u32,
    complete: bool,
    phase: SessionPhase,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            game_id: None,
            difficulty: Difficulty::default(),
            board: Grid::empty(),
            givens: Grid::empty(),
            selected: None,
            elapsed_secs: 0,
            complete: false,
            phase: SessionPhase::NoSession,
        }
    }

    /// Drops any local session and waits for a fresh puzzle from the backend.
    /// Puzzle generation is the backend's job; until [`GameState::start`] is
    /// called the grids stay empty.
    pub fn reset(&mut self, difficulty: Difficulty) {
        *self = Self::new();
        self.difficulty = difficulty;
        self.phase = SessionPhase::AwaitingPuzzle;
    }

    /// Installs a freshly created puzzle. The puzzle becomes both the given
    /// mask and the initial working board, which makes the two trivially
    /// consistent.
    pub fn start(&mut self, game_id: GameId, difficulty: Difficulty, puzzle: Grid) {
        log::debug!("starting {} game {}", difficulty, game_id);
        *self = Self {
            game_id: Some(game_id),
            difficulty,
            board: puzzle.clone(),
            givens: puzzle,
            selected: None,
            elapsed_secs: 0,
            complete: false,
            phase: SessionPhase::InProgress,
        };
    }

    /// Replaces the whole session atomically. If the snapshot's board
    /// contradicts its given mask, nothing is applied and the previous state
    /// stays in effect. Grid shape and digit ranges were already enforced
    /// when the [`Grid`]s were deserialized.
    pub fn load(&mut self, snapshot: SessionSnapshot) -> Result<()> {
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                let given = snapshot.givens.digit_at((row, col));
                if given != 0 && snapshot.board.digit_at((row, col)) != given {
                    return Err(GameError::InconsistentSession);
                }
            }
        }

        log::debug!("loaded game {}", snapshot.game_id);
        *self = Self {
            game_id: Some(snapshot.game_id),
            difficulty: snapshot.difficulty,
            board: snapshot.board,
            givens: snapshot.givens,
            selected: None,
            elapsed_secs: snapshot.elapsed_secs,
            complete: snapshot.complete,
            phase: if snapshot.complete {
                SessionPhase::Complete
            } else {
                SessionPhase::InProgress
            },
        };
        Ok(())
    }

    /// Selects a player-fillable cell. Given cells are not selectable, so the
    /// selection invariant (`givens[selected] == 0`) holds by construction.
    pub fn select_cell(&mut self, coords: Coord2) -> Result<SelectOutcome> {
        let coords = Grid::validate_coords(coords)?;

        if !self.phase.is_playing() || !self.givens.is_empty_at(coords) {
            return Ok(SelectOutcome::Rejected);
        }

        self.selected = Some(coords);
        Ok(SelectOutcome::Selected)
    }

    /// Explicit deselection (Escape). Returns whether a selection was dropped.
    pub fn clear_selection(&mut self) -> bool {
        self.selected.take().is_some()
    }

    /// Writes `digit` (`0` clears) into the selected cell. This is the only
    /// mutator of the working board.
    pub fn enter_digit(&mut self, digit: Digit) -> Result<EntryOutcome> {
        if digit > GRID_SIZE {
            return Err(GameError::InvalidDigit);
        }

        let Some(coords) = self.selected else {
            return Ok(EntryOutcome::NoSelection);
        };

        // The selection invariant already keeps givens unselectable; this
        // guards loads that could race a stale selection.
        if !self.phase.is_playing() || !self.givens.is_empty_at(coords) {
            return Ok(EntryOutcome::Rejected);
        }

        if self.board.digit_at(coords) == digit {
            return Ok(EntryOutcome::NoChange);
        }

        log::trace!("enter {} at {:?}", digit, coords);
        self.board.set_digit(coords, digit);
        Ok(EntryOutcome::Changed)
    }

    /// Candidate digits for a player-fillable cell, ascending. Calling this
    /// on a given cell is a caller error, not an empty-result case.
    pub fn candidate_digits(&self, coords: Coord2) -> Result<CandidateList> {
        let coords = Grid::validate_coords(coords)?;

        if !self.givens.is_empty_at(coords) {
            return Err(GameError::GivenCell);
        }

        Ok(self.board.candidates_at(coords))
    }

    /// Advances the elapsed-time counter by one second. Suppressed once the
    /// session is complete.
    pub fn tick(&mut self) {
        if self.phase.is_playing() {
            self.elapsed_secs = self.elapsed_secs.saturating_add(1);
        }
    }

    /// Marks a save request in flight. Purely informational; local moves are
    /// still accepted while saving.
    pub fn begin_saving(&mut self) {
        if matches!(self.phase, SessionPhase::InProgress) {
            self.phase = SessionPhase::Saving;
        }
    }

    /// Returns from the transient saving phase. Save responses never roll
    /// back local state, so this touches only the phase.
    pub fn finish_saving(&mut self) {
        if matches!(self.phase, SessionPhase::Saving) {
            self.phase = SessionPhase::InProgress;
        }
    }

    /// Applies the backend's validation verdict. This is the only way a
    /// session becomes complete: completion is never inferred locally from
    /// board fullness, since a filled board may still violate the rules.
    pub fn apply_validation(&mut self, is_complete: bool) {
        if is_complete && self.phase.is_playing() {
            log::info!("game {:?} confirmed complete", self.game_id);
            self.complete = true;
            self.selected = None;
            self.phase = SessionPhase::Complete;
        }
    }

    pub fn game_id(&self) -> Option<GameId> {
        self.game_id
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    pub fn selected(&self) -> Option<Coord2> {
        self.selected
    }

    pub fn board(&self) -> &Grid {
        &self.board
    }

    pub fn digit_at(&self, coords: Coord2) -> Digit {
        self.board.digit_at(coords)
    }

    pub fn is_given(&self, coords: Coord2) -> bool {
        !self.givens.is_empty_at(coords)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn grid(rows: [[Digit; 9]; 9]) -> Grid {
        Grid::try_from(rows.iter().map(|row| row.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    fn started(puzzle: [[Digit; 9]; 9]) -> GameState {
        let mut state = GameState::new();
        state.start(7, Difficulty::Medium, grid(puzzle));
        state
    }

    fn one_given() -> [[Digit; 9]; 9] {
        let mut rows = [[0; 9]; 9];
        rows[0][0] = 5;
        rows
    }

    #[test]
    fn given_cells_are_not_selectable() {
        let mut state = started(one_given());

        assert_eq!(state.select_cell((0, 0)).unwrap(), SelectOutcome::Rejected);
        assert_eq!(state.selected(), None);
        assert_eq!(state.select_cell((0, 1)).unwrap(), SelectOutcome::Selected);
        assert_eq!(state.selected(), Some((0, 1)));
    }

    #[test]
    fn out_of_range_coords_are_an_input_error_not_a_rejection() {
        let mut state = started(one_given());

        assert_eq!(state.select_cell((9, 0)), Err(GameError::InvalidCoords));
        assert_eq!(state.candidate_digits((0, 9)), Err(GameError::InvalidCoords));
    }

    #[test]
    fn enter_digit_without_selection_is_a_noop() {
        let mut state = started(one_given());
        let before = state.clone();

        assert_eq!(state.enter_digit(5).unwrap(), EntryOutcome::NoSelection);
        assert_eq!(state, before);
    }

    #[test]
    fn enter_digit_mutates_only_the_selected_cell() {
        let mut state = started(one_given());
        state.select_cell((3, 3)).unwrap();

        assert_eq!(state.enter_digit(8).unwrap(), EntryOutcome::Changed);
        assert_eq!(state.digit_at((3, 3)), 8);
        assert_eq!(state.enter_digit(8).unwrap(), EntryOutcome::NoChange);
        assert_eq!(state.enter_digit(0).unwrap(), EntryOutcome::Changed);
        assert_eq!(state.digit_at((3, 3)), 0);
    }

    #[test]
    fn given_cells_never_change_value() {
        let mut state = started(one_given());

        for digit in 0..=9 {
            let _ = state.enter_digit(digit);
        }

        assert_eq!(state.digit_at((0, 0)), 5);
        assert!(state.is_given((0, 0)));
    }

    #[test]
    fn invalid_digit_is_rejected_with_input_error() {
        let mut state = started(one_given());
        state.select_cell((1, 1)).unwrap();

        assert_eq!(state.enter_digit(10), Err(GameError::InvalidDigit));
        assert_eq!(state.digit_at((1, 1)), 0);
    }

    #[test]
    fn candidate_digits_on_given_cell_is_a_precondition_violation() {
        let state = started(one_given());

        assert_eq!(state.candidate_digits((0, 0)), Err(GameError::GivenCell));
    }

    #[test]
    fn unique_candidate_when_eight_digits_surround_a_cell() {
        let mut rows = [[0; 9]; 9];
        // Row 0 already holds 1-8, leaving only 9 for (0, 0).
        for (c, digit) in (1..=8).enumerate() {
            rows[0][c + 1] = digit;
        }
        let state = started(rows);

        let candidates = state.candidate_digits((0, 0)).unwrap();

        assert_eq!(candidates.as_slice(), &[9]);
    }

    #[test]
    fn ticks_accumulate_one_second_each() {
        let mut state = started(one_given());

        for _ in 0..42 {
            state.tick();
        }

        assert_eq!(state.elapsed_secs(), 42);
    }

    #[test]
    fn ticks_are_suppressed_after_completion() {
        let mut state = started(one_given());
        state.tick();
        state.apply_validation(true);

        assert!(state.is_complete());
        assert_eq!(state.phase(), SessionPhase::Complete);

        state.tick();
        state.tick();
        assert_eq!(state.elapsed_secs(), 1);
    }

    #[test]
    fn completion_comes_only_from_the_validation_verdict() {
        let mut state = started(one_given());

        // A "not complete" verdict changes nothing, even repeatedly.
        state.apply_validation(false);
        assert!(!state.is_complete());
        assert_eq!(state.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn completion_clears_the_selection() {
        let mut state = started(one_given());
        state.select_cell((2, 2)).unwrap();

        state.apply_validation(true);

        assert_eq!(state.selected(), None);
        assert_eq!(state.select_cell((2, 2)).unwrap(), SelectOutcome::Rejected);
        assert_eq!(state.enter_digit(3).unwrap(), EntryOutcome::NoSelection);
    }

    #[test]
    fn saving_phase_is_transient_and_keeps_moves_enabled() {
        let mut state = started(one_given());
        state.select_cell((4, 4)).unwrap();

        state.begin_saving();
        assert_eq!(state.phase(), SessionPhase::Saving);
        assert_eq!(state.enter_digit(2).unwrap(), EntryOutcome::Changed);

        state.finish_saving();
        assert_eq!(state.phase(), SessionPhase::InProgress);
        assert_eq!(state.digit_at((4, 4)), 2);
    }

    #[test]
    fn load_replaces_the_session_atomically() {
        let mut state = started(one_given());

        let mut board = one_given();
        board[1][1] = 3;
        let snapshot = SessionSnapshot {
            game_id: 11,
            difficulty: Difficulty::Hard,
            board: grid(board),
            givens: grid(one_given()),
            elapsed_secs: 120,
            complete: false,
        };

        state.load(snapshot).unwrap();

        assert_eq!(state.game_id(), Some(11));
        assert_eq!(state.difficulty(), Difficulty::Hard);
        assert_eq!(state.digit_at((1, 1)), 3);
        assert_eq!(state.elapsed_secs(), 120);
        assert_eq!(state.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn inconsistent_snapshot_leaves_state_untouched() {
        let mut state = started(one_given());
        state.select_cell((1, 1)).unwrap();
        let before = state.clone();

        let mut board = one_given();
        board[0][0] = 6; // contradicts the given 5
        let snapshot = SessionSnapshot {
            game_id: 11,
            difficulty: Difficulty::Hard,
            board: grid(board),
            givens: grid(one_given()),
            elapsed_secs: 120,
            complete: false,
        };

        assert_eq!(state.load(snapshot), Err(GameError::InconsistentSession));
        assert_eq!(state, before);
    }

    #[test]
    fn loading_a_complete_session_keeps_the_timer_stopped() {
        let mut state = GameState::new();
        let snapshot = SessionSnapshot {
            game_id: 3,
            difficulty: Difficulty::Easy,
            board: grid(one_given()),
            givens: grid(one_given()),
            elapsed_secs: 300,
            complete: true,
        };

        state.load(snapshot).unwrap();
        state.tick();

        assert_eq!(state.phase(), SessionPhase::Complete);
        assert_eq!(state.elapsed_secs(), 300);
    }

    #[test]
    fn reset_awaits_a_fresh_puzzle_from_the_backend() {
        let mut state = started(one_given());

        state.reset(Difficulty::Hard);

        assert_eq!(state.phase(), SessionPhase::AwaitingPuzzle);
        assert_eq!(state.game_id(), None);
        assert_eq!(state.difficulty(), Difficulty::Hard);
        assert_eq!(state.elapsed_secs(), 0);
        // No puzzle yet, so no moves are accepted.
        assert_eq!(state.select_cell((0, 0)).unwrap(), SelectOutcome::Rejected);
    }
}
