use serde::Serialize;

use crate::grid::{Grid, HEIGHT, WIDTH};
use crate::log;
use crate::piece::{Shape, Tetromino};
use crate::score::{Scoreboard, SCORE_CLEAR_LINE, SCORE_NEW_PIECE};
use crate::sequence::PieceSequence;
use crate::settings::{Command, GameSettings, FRAME_MS};

// Slack for float drift when summing nominal frame times.
const GRAVITY_EPSILON_MS: f64 = 1e-6;

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub struct ActivePiece {
    pub piece: Tetromino,
    pub shape: Shape,
    pub row: i32,
    pub col: i32,
}

impl ActivePiece {
    pub fn spawn(piece: Tetromino) -> Self {
        let shape = piece.shape();
        let col = (WIDTH / 2) as i32 - shape.size().div_ceil(2) as i32;
        Self {
            piece,
            shape,
            row: piece.spawn_row(),
            col,
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .cells()
            .map(move |(dr, dc)| (self.row + dr, self.col + dc))
    }
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum Phase {
    Falling,
    GameOver,
}

#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum Step {
    Moved,
    Rejected,
    Locked { lines_cleared: usize },
    GameOver,
}

pub struct Session {
    grid: Grid,
    sequence: PieceSequence,
    active: ActivePiece,
    scoreboard: Scoreboard,
    phase: Phase,
    gravity_acc: f64,
    settings: GameSettings,
    pieces_placed: u32,
    lines_cleared: u32,
}

impl Session {
    pub fn new(settings: GameSettings) -> Self {
        let sequence = PieceSequence::from_kind(&settings.randomizer, settings.seed);
        Self::with_sequence(settings, sequence, Grid::new())
    }

    pub fn with_sequence(settings: GameSettings, sequence: PieceSequence, grid: Grid) -> Self {
        let mut session = Self {
            grid,
            sequence,
            active: ActivePiece::spawn(Tetromino::O),
            scoreboard: Scoreboard::new(),
            phase: Phase::Falling,
            gravity_acc: 0.0,
            settings,
            pieces_placed: 0,
            lines_cleared: 0,
        };
        session.spawn();
        session
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn active(&self) -> &ActivePiece {
        &self.active
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn score(&self) -> u32 {
        self.scoreboard.score()
    }

    pub fn high_score(&self) -> u32 {
        self.scoreboard.high_score()
    }

    pub fn pieces_placed(&self) -> u32 {
        self.pieces_placed
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn lookahead(&self) -> impl Iterator<Item = Tetromino> + '_ {
        self.sequence.lookahead().iter().copied()
    }

    pub fn load_high_score(&mut self, stored: u32) {
        self.scoreboard.load_high_score(stored);
    }

    pub fn take_high_score_writeback(&mut self) -> Option<u32> {
        if self.is_game_over() {
            self.scoreboard.take_writeback()
        } else {
            None
        }
    }

    pub fn is_valid_placement(&self, shape: &Shape, row: i32, col: i32) -> bool {
        self.grid.fits(shape, row, col)
    }

    #[doc(hidden)]
    pub fn set_active_for_test(&mut self, piece: Tetromino, row: i32, col: i32) {
        self.active = ActivePiece {
            piece,
            shape: piece.shape(),
            row,
            col,
        };
    }

    fn spawn(&mut self) -> Step {
        let next = self.sequence.next_piece();
        self.active = ActivePiece::spawn(next);
        if !self.is_valid_placement(&self.active.shape, self.active.row, self.active.col) {
            self.phase = Phase::GameOver;
            log(&format!("top out on spawn: {:?}", next));
            return Step::GameOver;
        }
        Step::Moved
    }

    pub fn apply(&mut self, command: Command) -> Step {
        match command {
            Command::MoveLeft => self.translate(-1),
            Command::MoveRight => self.translate(1),
            Command::Rotate => self.rotate(),
            Command::SoftDrop => self.soft_drop(),
            Command::HardDrop => self.hard_drop(),
        }
    }

    pub fn translate(&mut self, d_col: i32) -> Step {
        if self.is_game_over() {
            return Step::Rejected;
        }
        let col = self.active.col + d_col;
        if self.is_valid_placement(&self.active.shape, self.active.row, col) {
            self.active.col = col;
            Step::Moved
        } else {
            Step::Rejected
        }
    }

    pub fn rotate(&mut self) -> Step {
        if self.is_game_over() {
            return Step::Rejected;
        }
        let shape = self.active.shape.rotated();
        if self.is_valid_placement(&shape, self.active.row, self.active.col) {
            self.active.shape = shape;
            Step::Moved
        } else {
            Step::Rejected
        }
    }

    pub fn soft_drop(&mut self) -> Step {
        if self.is_game_over() {
            return Step::Rejected;
        }
        let row = self.active.row + 1;
        if self.is_valid_placement(&self.active.shape, row, self.active.col) {
            self.active.row = row;
            Step::Moved
        } else {
            self.lock()
        }
    }

    pub fn hard_drop(&mut self) -> Step {
        if self.is_game_over() {
            return Step::Rejected;
        }
        self.active.row = self.ghost_row();
        self.lock()
    }

    pub fn ghost_row(&self) -> i32 {
        self.grid
            .landing_row(&self.active.shape, self.active.row, self.active.col)
    }

    pub fn advance(&mut self, dt_ms: f64) -> u32 {
        if self.is_game_over() {
            return 0;
        }
        let interval = self.settings.gravity_ms.max(1.0);
        self.gravity_acc += dt_ms.max(0.0);
        let cap = self.settings.max_catch_up_steps.max(1);
        let mut steps = 0;
        while self.gravity_acc + GRAVITY_EPSILON_MS >= interval {
            if steps >= cap {
                self.gravity_acc = 0.0;
                break;
            }
            self.gravity_acc -= interval;
            steps += 1;
            self.soft_drop();
            if self.is_game_over() {
                break;
            }
        }
        steps
    }

    pub fn step_frame(&mut self) -> u32 {
        self.advance(FRAME_MS)
    }

    fn lock(&mut self) -> Step {
        let ActivePiece {
            piece,
            shape,
            row,
            col,
        } = self.active;
        if !self.grid.lock_piece(&shape, row, col, piece) {
            self.phase = Phase::GameOver;
            log(&format!(
                "game over: {:?} locked above the field at row {}",
                piece, row
            ));
            return Step::GameOver;
        }
        self.pieces_placed += 1;

        let cleared = self.grid.clear_lines();
        for _ in 0..cleared {
            self.scoreboard.add(SCORE_CLEAR_LINE);
        }
        self.lines_cleared += cleared as u32;
        self.scoreboard.add(SCORE_NEW_PIECE);

        match self.spawn() {
            Step::GameOver => Step::GameOver,
            _ => Step::Locked {
                lines_cleared: cleared,
            },
        }
    }

    pub fn view(&self) -> SessionView {
        let field = (0..HEIGHT)
            .map(|r| {
                self.grid
                    .row(r)
                    .iter()
                    .map(|c| c.map(Tetromino::letter))
                    .collect()
            })
            .collect();
        let ghost = if self.settings.ghost_enabled {
            let row = self.ghost_row();
            self.active
                .shape
                .cells()
                .map(|(dr, dc)| (row + dr, self.active.col + dc))
                .collect()
        } else {
            Vec::new()
        };
        SessionView {
            field,
            active: self.active.cells().collect(),
            active_piece: self.active.piece,
            ghost,
            next: self.lookahead().collect(),
            score: self.score(),
            high_score: self.high_score(),
            new_high_score: self.scoreboard.is_new_high_score(),
            lines: self.lines_cleared,
            game_over: self.is_game_over(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SessionView {
    pub field: Vec<Vec<Option<char>>>,
    pub active: Vec<(i32, i32)>,
    pub active_piece: Tetromino,
    pub ghost: Vec<(i32, i32)>,
    pub next: Vec<Tetromino>,
    pub score: u32,
    pub high_score: u32,
    pub new_high_score: bool,
    pub lines: u32,
    pub game_over: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::RandomizerKind;

    fn only(piece: Tetromino) -> GameSettings {
        GameSettings {
            randomizer: RandomizerKind::SinglePiece { piece },
            ..GameSettings::default()
        }
    }

    #[test]
    fn spawn_positions_follow_shape_width() {
        let i = ActivePiece::spawn(Tetromino::I);
        assert_eq!((i.row, i.col), (-1, 3));
        let o = ActivePiece::spawn(Tetromino::O);
        assert_eq!((o.row, o.col), (-2, 4));
        let t = ActivePiece::spawn(Tetromino::T);
        assert_eq!((t.row, t.col), (-2, 3));
    }

    #[test]
    fn o_hard_drop_lands_on_floor() {
        let mut s = Session::new(only(Tetromino::O));
        assert_eq!(s.active().col, 4);
        let step = s.hard_drop();
        assert_eq!(step, Step::Locked { lines_cleared: 0 });
        assert_eq!(s.grid().cell(21, 4), Some(Tetromino::O));
        assert_eq!(s.grid().cell(21, 5), Some(Tetromino::O));
        assert_eq!(s.grid().cell(20, 4), Some(Tetromino::O));
        assert_eq!(s.score(), 10);
        assert_eq!(s.pieces_placed(), 1);
    }

    #[test]
    fn walls_reject_translation() {
        let mut s = Session::new(only(Tetromino::O));
        for _ in 0..4 {
            assert_eq!(s.translate(-1), Step::Moved);
        }
        assert_eq!(s.translate(-1), Step::Rejected);
        assert_eq!(s.active().col, 0);
    }

    #[test]
    fn rotation_blocked_by_floor_is_a_noop() {
        let mut s = Session::new(only(Tetromino::I));
        // flat on the floor; standing up would poke through it
        s.set_active_for_test(Tetromino::I, 20, 0);
        let before = *s.active();
        assert_eq!(s.rotate(), Step::Rejected);
        assert_eq!(*s.active(), before);
    }

    #[test]
    fn soft_drop_locks_when_resting() {
        let mut s = Session::new(only(Tetromino::O));
        s.set_active_for_test(Tetromino::O, 20, 0);
        assert_eq!(s.soft_drop(), Step::Locked { lines_cleared: 0 });
        assert_eq!(s.grid().cell(21, 0), Some(Tetromino::O));
    }

    #[test]
    fn ghost_does_not_move_the_piece() {
        let s = Session::new(only(Tetromino::T));
        let before = *s.active();
        assert_eq!(s.ghost_row(), 20);
        assert_eq!(*s.active(), before);
    }

    #[test]
    fn gravity_fires_on_thirty_sixth_frame() {
        let mut s = Session::new(only(Tetromino::O));
        let start = s.active().row;
        for _ in 0..35 {
            assert_eq!(s.step_frame(), 0);
        }
        assert_eq!(s.active().row, start);
        assert_eq!(s.step_frame(), 1);
        assert_eq!(s.active().row, start + 1);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut s = Session::new(only(Tetromino::O));
        let start = s.active().row;
        let ran = s.advance(60_000.0);
        assert_eq!(ran, 4);
        assert_eq!(s.active().row, start + 4);
        assert_eq!(s.advance(0.0), 0);
    }

    #[test]
    fn zero_catch_up_cap_still_runs_one_step() {
        let mut s = Session::new(GameSettings {
            max_catch_up_steps: 0,
            ..only(Tetromino::O)
        });
        let start = s.active().row;
        let ran: u32 = (0..600).map(|_| s.step_frame()).sum();
        assert!(ran > 0);
        assert_eq!(s.active().row, start + 16);
    }

    #[test]
    fn lock_above_field_ends_game_and_stops_gravity() {
        let mut grid = Grid::new();
        // column stack reaching the top under the spawn point
        for row in 0..HEIGHT {
            grid.set(row, 4, Some(Tetromino::J));
        }
        let mut s = Session::with_sequence(
            only(Tetromino::O),
            PieceSequence::from_kind(&RandomizerKind::SinglePiece { piece: Tetromino::O }, None),
            grid,
        );
        assert_eq!(s.phase(), Phase::Falling);
        assert_eq!(s.hard_drop(), Step::GameOver);
        assert!(s.is_game_over());
        assert_eq!(s.advance(10_000.0), 0);
        assert_eq!(s.translate(1), Step::Rejected);
        assert_eq!(s.grid().cell(0, 5), None);
    }

    #[test]
    fn spawn_into_stack_is_game_over() {
        let mut grid = Grid::new();
        for col in 0..WIDTH {
            grid.set(0, col, Some(Tetromino::Z));
        }
        grid.set(0, 0, None);
        let s = Session::with_sequence(
            only(Tetromino::I),
            PieceSequence::from_kind(&RandomizerKind::SinglePiece { piece: Tetromino::I }, None),
            grid,
        );
        assert!(s.is_game_over());
    }

    #[test]
    fn writeback_only_after_game_over() {
        let mut grid = Grid::new();
        for row in 2..HEIGHT {
            grid.set(row, 4, Some(Tetromino::J));
        }
        let mut s = Session::with_sequence(
            only(Tetromino::O),
            PieceSequence::from_kind(&RandomizerKind::SinglePiece { piece: Tetromino::O }, None),
            grid,
        );
        s.load_high_score(0);
        assert_eq!(s.hard_drop(), Step::Locked { lines_cleared: 0 });
        assert_eq!(s.high_score(), 10);
        assert_eq!(s.take_high_score_writeback(), None);
        assert_eq!(s.hard_drop(), Step::GameOver);
        assert_eq!(s.take_high_score_writeback(), Some(10));
        assert_eq!(s.take_high_score_writeback(), None);
    }

    #[test]
    fn view_reflects_session() {
        let mut s = Session::new(GameSettings {
            seed: Some(5),
            ..GameSettings::default()
        });
        s.hard_drop();
        let view = s.view();
        assert_eq!(view.field.len(), HEIGHT);
        assert_eq!(view.field[0].len(), WIDTH);
        assert_eq!(view.active.len(), 4);
        assert_eq!(view.ghost.len(), 4);
        assert_eq!(view.next.len(), 3);
        assert_eq!(view.score, 10);
        assert!(view.new_high_score);
        assert!(!view.game_over);
        assert_eq!(view.field.iter().flatten().filter(|c| c.is_some()).count(), 4);
    }
}
