use serde::Serialize;

pub const SCORE_NEW_PIECE: u32 = 10;
pub const SCORE_CLEAR_LINE: u32 = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Scoreboard {
    score: u32,
    high_score: u32,
    new_high_score: bool,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn is_new_high_score(&self) -> bool {
        self.new_high_score
    }

    pub fn add(&mut self, points: u32) {
        self.score = self.score.saturating_add(points);
        self.check_high_score();
    }

    // Installs the high score fetched from the store. A session that has
    // already passed it keeps its own score as the high score.
    pub fn load_high_score(&mut self, stored: u32) {
        self.high_score = stored;
        self.new_high_score = false;
        self.check_high_score();
    }

    fn check_high_score(&mut self) {
        if self.score > self.high_score {
            self.high_score = self.score;
            self.new_high_score = true;
        }
    }

    pub fn take_writeback(&mut self) -> Option<u32> {
        if self.new_high_score {
            self.new_high_score = false;
            Some(self.high_score)
        } else {
            None
        }
    }
}
