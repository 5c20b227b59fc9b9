use serde::{Deserialize, Serialize};

pub const MAX_SHAPE: usize = 4;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub enum Tetromino {
    I,
    J,
    L,
    O,
    S,
    Z,
    T,
}

impl Tetromino {
    pub fn all() -> [Tetromino; 7] {
        [
            Tetromino::I,
            Tetromino::J,
            Tetromino::L,
            Tetromino::O,
            Tetromino::S,
            Tetromino::Z,
            Tetromino::T,
        ]
    }

    pub fn shape(self) -> Shape {
        match self {
            Tetromino::I => I_SHAPE,
            Tetromino::J => J_SHAPE,
            Tetromino::L => L_SHAPE,
            Tetromino::O => O_SHAPE,
            Tetromino::S => S_SHAPE,
            Tetromino::Z => Z_SHAPE,
            Tetromino::T => T_SHAPE,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            Tetromino::I => "#7B42BC",
            Tetromino::O => "#FFFC25",
            Tetromino::T => "#EC585D",
            Tetromino::S => "#14C6CB",
            Tetromino::Z => "#DC477D",
            Tetromino::J => "#2E71E5",
            Tetromino::L => "#02A8EF",
        }
    }

    pub fn letter(self) -> char {
        match self {
            Tetromino::I => 'I',
            Tetromino::J => 'J',
            Tetromino::L => 'L',
            Tetromino::O => 'O',
            Tetromino::S => 'S',
            Tetromino::Z => 'Z',
            Tetromino::T => 'T',
        }
    }

    // Row the piece enters at. The flat `I` sits on the second row of its
    // matrix, so it starts one row lower than the others.
    pub fn spawn_row(self) -> i32 {
        match self {
            Tetromino::I => -1,
            _ => -2,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    size: usize,
    cells: [[bool; MAX_SHAPE]; MAX_SHAPE],
}

const fn shape(size: usize, bits: [[u8; MAX_SHAPE]; MAX_SHAPE]) -> Shape {
    let mut cells = [[false; MAX_SHAPE]; MAX_SHAPE];
    let mut r = 0;
    while r < MAX_SHAPE {
        let mut c = 0;
        while c < MAX_SHAPE {
            cells[r][c] = bits[r][c] != 0;
            c += 1;
        }
        r += 1;
    }
    Shape { size, cells }
}

const I_SHAPE: Shape = shape(4, [[0, 0, 0, 0], [1, 1, 1, 1], [0, 0, 0, 0], [0, 0, 0, 0]]);
const J_SHAPE: Shape = shape(3, [[1, 0, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
const L_SHAPE: Shape = shape(3, [[0, 0, 1, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
const O_SHAPE: Shape = shape(2, [[1, 1, 0, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
const S_SHAPE: Shape = shape(3, [[0, 1, 1, 0], [1, 1, 0, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
const Z_SHAPE: Shape = shape(3, [[1, 1, 0, 0], [0, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);
const T_SHAPE: Shape = shape(3, [[0, 1, 0, 0], [1, 1, 1, 0], [0, 0, 0, 0], [0, 0, 0, 0]]);

impl Shape {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.size).flat_map(move |r| {
            (0..self.size)
                .filter(move |&c| self.cells[r][c])
                .map(move |c| (r as i32, c as i32))
        })
    }

    pub fn rotated(&self) -> Shape {
        let n = self.size;
        let mut cells = [[false; MAX_SHAPE]; MAX_SHAPE];
        for (i, row) in cells.iter_mut().enumerate().take(n) {
            for (j, cell) in row.iter_mut().enumerate().take(n) {
                *cell = self.cells[n - 1 - j][i];
            }
        }
        Shape { size: n, cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_piece_has_four_cells() {
        for piece in Tetromino::all() {
            assert_eq!(piece.shape().cells().count(), 4, "{:?}", piece);
        }
    }

    #[test]
    fn rotating_t_points_it_right() {
        let rotated = Tetromino::T.shape().rotated();
        let cells: Vec<_> = rotated.cells().collect();
        assert_eq!(cells, vec![(0, 1), (1, 1), (1, 2), (2, 1)]);
    }

    #[test]
    fn rotating_i_stands_it_up_in_column_two() {
        let rotated = Tetromino::I.shape().rotated();
        assert!(rotated.cells().all(|(_, c)| c == 2));
        assert_eq!(rotated.cells().count(), 4);
    }

    #[test]
    fn o_is_rotation_invariant() {
        let o = Tetromino::O.shape();
        assert_eq!(o.rotated(), o);
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        for piece in Tetromino::all() {
            let s = piece.shape();
            assert_eq!(s.rotated().rotated().rotated().rotated(), s, "{:?}", piece);
        }
    }
}
