pub mod bridge;
pub mod game;
pub mod grid;
#[cfg(not(target_arch = "wasm32"))]
pub mod highscore;
pub mod piece;
pub mod render;
pub mod score;
pub mod sequence;
pub mod settings;
#[cfg(target_arch = "wasm32")]
mod web;

pub use bridge::{BridgeError, NetworkPolicy};
pub use game::{ActivePiece, Phase, Session, SessionView, Step};
pub use grid::{Cell, Grid, HEIGHT, WIDTH};
pub use piece::{Shape, Tetromino};
pub use score::{Scoreboard, SCORE_CLEAR_LINE, SCORE_NEW_PIECE};
pub use sequence::{PieceSequence, RandomizerKind, LOOKAHEAD_LEN};
pub use settings::{Command, ControlBindings, GameSettings};

#[cfg(target_arch = "wasm32")]
pub(crate) fn log(msg: &str) {
    web_sys::console::log_1(&wasm_bindgen::JsValue::from_str(msg));
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn log(msg: &str) {
    eprintln!("{}", msg);
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn log_error(msg: &str) {
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(msg));
}
