use crate::game::Session;
use crate::piece::Tetromino;

pub const CELL_PX: f64 = 32.0;
pub const PREVIEW_BLOCK_PX: f64 = 12.0;
pub const GHOST_ALPHA: f64 = 0.3;

pub trait Surface {
    fn width(&self) -> f64;
    fn height(&self) -> f64;
    fn clear(&mut self);
    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64, color: &str, alpha: f64);
    fn fill_text(&mut self, text: &str, x: f64, y: f64, color: &str, font: &str);
}

fn fill_cell<S: Surface>(surface: &mut S, row: i32, col: i32, color: &str, alpha: f64) {
    surface.fill_rect(
        col as f64 * CELL_PX,
        row as f64 * CELL_PX,
        CELL_PX - 1.0,
        CELL_PX - 1.0,
        color,
        alpha,
    );
}

pub fn draw_board<S: Surface>(surface: &mut S, session: &Session) {
    surface.clear();
    for (row, col, piece) in session.grid().occupied() {
        fill_cell(surface, row as i32, col as i32, piece.color(), 1.0);
    }

    let active = session.active();
    let color = active.piece.color();
    if session.settings().ghost_enabled {
        let ghost_row = session.ghost_row();
        for (dr, dc) in active.shape.cells() {
            fill_cell(surface, ghost_row + dr, active.col + dc, color, GHOST_ALPHA);
        }
    }
    for (row, col) in active.cells() {
        fill_cell(surface, row, col, color, 1.0);
    }
}

pub fn preview_origin(piece: Tetromino, width: f64, height: f64) -> (f64, f64) {
    let size = piece.shape().size() as f64;
    let x = (width - size * PREVIEW_BLOCK_PX) / 2.0;
    let mut y = (height - size * PREVIEW_BLOCK_PX) / 2.0;
    match piece {
        Tetromino::I => y += PREVIEW_BLOCK_PX / 2.0,
        Tetromino::O => {}
        Tetromino::J | Tetromino::L | Tetromino::T | Tetromino::S | Tetromino::Z => {
            y += PREVIEW_BLOCK_PX / 4.0
        }
    }
    (x, y)
}

pub fn draw_preview<S: Surface>(surface: &mut S, piece: Tetromino) {
    surface.clear();
    let (ox, oy) = preview_origin(piece, surface.width(), surface.height());
    for (row, col) in piece.shape().cells() {
        surface.fill_rect(
            ox + col as f64 * PREVIEW_BLOCK_PX,
            oy + row as f64 * PREVIEW_BLOCK_PX,
            PREVIEW_BLOCK_PX - 1.0,
            PREVIEW_BLOCK_PX - 1.0,
            piece.color(),
            1.0,
        );
    }
}

pub fn draw_game_over<S: Surface>(surface: &mut S) {
    let (w, h) = (surface.width(), surface.height());
    surface.fill_rect(0.0, h / 2.0 - 30.0, w, 60.0, "black", 0.75);
    surface.fill_text("GAME OVER!", w / 2.0, h / 2.0, "white", "36px monospace");
}

pub fn draw_frame<B: Surface, P: Surface>(board: &mut B, previews: &mut [P], session: &Session) {
    draw_board(board, session);
    let count = session.settings().preview_count.min(previews.len());
    for (surface, piece) in previews.iter_mut().take(count).zip(session.lookahead()) {
        draw_preview(surface, piece);
    }
    if session.is_game_over() {
        draw_game_over(board);
    }
}
