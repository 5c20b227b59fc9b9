use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::piece::Tetromino;

pub const LOOKAHEAD_LEN: usize = 3;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum RandomizerKind {
    #[default]
    SevenBag,
    SinglePiece {
        piece: Tetromino,
    },
}

pub trait Randomizer {
    fn next(&mut self) -> Tetromino;
}

pub struct SinglePiece {
    piece: Tetromino,
}

impl Randomizer for SinglePiece {
    fn next(&mut self) -> Tetromino {
        self.piece
    }
}

pub struct SevenBag {
    bag: Vec<Tetromino>,
    rng: StdRng,
}

impl SevenBag {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bag: Vec::new(),
            rng,
        }
    }

    fn refill(&mut self) {
        self.bag = Tetromino::all().to_vec();
        self.bag.shuffle(&mut self.rng);
    }
}

impl Randomizer for SevenBag {
    fn next(&mut self) -> Tetromino {
        if self.bag.is_empty() {
            self.refill();
        }
        match self.bag.pop() {
            Some(piece) => piece,
            None => unreachable!("bag refilled above"),
        }
    }
}

pub fn randomizer_from_kind(kind: &RandomizerKind, seed: Option<u64>) -> Box<dyn Randomizer> {
    match kind {
        RandomizerKind::SevenBag => Box::new(SevenBag::new(seed)),
        RandomizerKind::SinglePiece { piece } => Box::new(SinglePiece { piece: *piece }),
    }
}

pub struct PieceSequence {
    randomizer: Box<dyn Randomizer>,
    lookahead: VecDeque<Tetromino>,
}

impl PieceSequence {
    pub fn new(randomizer: Box<dyn Randomizer>) -> Self {
        let mut seq = Self {
            randomizer,
            lookahead: VecDeque::with_capacity(LOOKAHEAD_LEN + 1),
        };
        seq.top_up();
        seq
    }

    pub fn from_kind(kind: &RandomizerKind, seed: Option<u64>) -> Self {
        Self::new(randomizer_from_kind(kind, seed))
    }

    fn top_up(&mut self) {
        while self.lookahead.len() < LOOKAHEAD_LEN {
            let piece = self.randomizer.next();
            self.lookahead.push_back(piece);
        }
    }

    pub fn next_piece(&mut self) -> Tetromino {
        self.top_up();
        let piece = match self.lookahead.pop_front() {
            Some(piece) => piece,
            None => self.randomizer.next(),
        };
        self.top_up();
        piece
    }

    pub fn lookahead(&self) -> &VecDeque<Tetromino> {
        &self.lookahead
    }
}
