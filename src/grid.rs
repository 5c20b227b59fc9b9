use crate::piece::{Shape, Tetromino};

pub const WIDTH: usize = 10;
pub const HEIGHT: usize = 22;

pub type Cell = Option<Tetromino>;

// Locked cells of the playfield. Row 0 is the top; negative rows are the
// spawn area above the field and are never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: [[Cell; WIDTH]; HEIGHT],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[None; WIDTH]; HEIGHT],
        }
    }

    pub fn cell(&self, row: i32, col: i32) -> Cell {
        if row < 0 || col < 0 || row >= HEIGHT as i32 || col >= WIDTH as i32 {
            return None;
        }
        self.cells[row as usize][col as usize]
    }

    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }

    pub fn row(&self, row: usize) -> &[Cell; WIDTH] {
        &self.cells[row]
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize, Tetromino)> + '_ {
        self.cells.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.map(|piece| (r, c, piece)))
        })
    }

    pub fn fits(&self, shape: &Shape, row: i32, col: i32) -> bool {
        shape.cells().all(|(dr, dc)| {
            let r = row + dr;
            let c = col + dc;
            if c < 0 || c >= WIDTH as i32 || r >= HEIGHT as i32 {
                return false;
            }
            r < 0 || self.cells[r as usize][c as usize].is_none()
        })
    }

    pub fn landing_row(&self, shape: &Shape, row: i32, col: i32) -> i32 {
        let mut landing = row;
        while self.fits(shape, landing + 1, col) {
            landing += 1;
        }
        landing
    }

    // Writes the piece into the field. Returns `false`, leaving the field
    // untouched, when part of the piece is still above row 0.
    pub fn lock_piece(&mut self, shape: &Shape, row: i32, col: i32, piece: Tetromino) -> bool {
        if shape.cells().any(|(dr, _)| row + dr < 0) {
            return false;
        }
        for (dr, dc) in shape.cells() {
            let r = row + dr;
            let c = col + dc;
            if c >= 0 && c < WIDTH as i32 && r < HEIGHT as i32 {
                self.cells[r as usize][c as usize] = Some(piece);
            }
        }
        true
    }

    pub fn is_row_full(&self, row: usize) -> bool {
        self.cells[row].iter().all(|c| c.is_some())
    }

    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut row = HEIGHT;
        while row > 0 {
            let y = row - 1;
            if self.is_row_full(y) {
                cleared += 1;
                for pull in (1..=y).rev() {
                    self.cells[pull] = self.cells[pull - 1];
                }
                self.cells[0] = [None; WIDTH];
                // same index again: the row above just slid into it
            } else {
                row -= 1;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_row(grid: &mut Grid, row: usize, piece: Tetromino) {
        for col in 0..WIDTH {
            grid.set(row, col, Some(piece));
        }
    }

    #[test]
    fn fits_rejects_walls_floor_and_blocks() {
        let mut grid = Grid::new();
        let o = Tetromino::O.shape();
        assert!(grid.fits(&o, 0, 0));
        assert!(grid.fits(&o, 20, 8));
        assert!(!grid.fits(&o, 0, -1));
        assert!(!grid.fits(&o, 0, 9));
        assert!(!grid.fits(&o, 21, 0));
        grid.set(5, 3, Some(Tetromino::T));
        assert!(!grid.fits(&o, 4, 2));
        assert!(grid.fits(&o, 4, 4));
    }

    #[test]
    fn cells_above_the_field_never_collide() {
        let mut grid = Grid::new();
        fill_row(&mut grid, 0, Tetromino::J);
        let o = Tetromino::O.shape();
        assert!(grid.fits(&o, -2, 4));
        assert!(!grid.fits(&o, -1, 4));
        assert!(!grid.fits(&o, -2, -1));
    }

    #[test]
    fn empty_matrix_rows_do_not_count() {
        let grid = Grid::new();
        // I lies on its second matrix row, so anchoring at 20 puts it on row 21.
        assert!(grid.fits(&Tetromino::I.shape(), 20, 0));
        assert!(!grid.fits(&Tetromino::I.shape(), 21, 0));
    }

    #[test]
    fn landing_row_stops_on_stack() {
        let mut grid = Grid::new();
        let o = Tetromino::O.shape();
        assert_eq!(grid.landing_row(&o, -2, 4), 20);
        grid.set(15, 4, Some(Tetromino::S));
        assert_eq!(grid.landing_row(&o, -2, 4), 13);
    }

    #[test]
    fn lock_above_top_is_refused() {
        let mut grid = Grid::new();
        let o = Tetromino::O.shape();
        assert!(!grid.lock_piece(&o, -1, 4, Tetromino::O));
        assert_eq!(grid.occupied().count(), 0);
        assert!(grid.lock_piece(&o, 0, 4, Tetromino::O));
        assert_eq!(grid.occupied().count(), 4);
        assert_eq!(grid.cell(1, 5), Some(Tetromino::O));
    }

    #[test]
    fn clear_single_row_shifts_everything_above() {
        let mut grid = Grid::new();
        grid.set(3, 2, Some(Tetromino::T));
        grid.set(9, 7, Some(Tetromino::L));
        fill_row(&mut grid, 10, Tetromino::I);
        grid.set(11, 0, Some(Tetromino::Z));

        assert_eq!(grid.clear_lines(), 1);
        assert_eq!(grid.cell(4, 2), Some(Tetromino::T));
        assert_eq!(grid.cell(10, 7), Some(Tetromino::L));
        assert_eq!(grid.cell(11, 0), Some(Tetromino::Z));
        assert_eq!(grid.cell(3, 2), None);
        assert!(!grid.is_row_full(10));
        assert_eq!(grid.occupied().count(), 3);
    }

    #[test]
    fn clears_stacked_and_split_rows() {
        let mut grid = Grid::new();
        fill_row(&mut grid, 21, Tetromino::I);
        fill_row(&mut grid, 20, Tetromino::J);
        grid.set(19, 0, Some(Tetromino::T));
        fill_row(&mut grid, 18, Tetromino::L);
        grid.set(17, 9, Some(Tetromino::S));

        assert_eq!(grid.clear_lines(), 3);
        assert_eq!(grid.cell(21, 0), Some(Tetromino::T));
        assert_eq!(grid.cell(20, 9), Some(Tetromino::S));
        assert_eq!(grid.occupied().count(), 2);
    }

    #[test]
    fn top_row_is_empty_after_a_shift() {
        let mut grid = Grid::new();
        grid.set(0, 3, Some(Tetromino::O));
        fill_row(&mut grid, 21, Tetromino::I);
        grid.clear_lines();
        assert!(grid.row(0).iter().all(|c| c.is_none()));
        assert_eq!(grid.cell(1, 3), Some(Tetromino::O));
    }
}
