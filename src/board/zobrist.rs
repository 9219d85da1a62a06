/* =======================================================================
Rustic is a chess playing engine.
Copyright (C) 2019-2024, Marcel Vanthoor
https://rustic-chess.org/

Rustic is written in the Rust programming language. It is an original
work, not derived from any engine that came before it. However, it does
use a lot of concepts which are well-known and are in use by most if not
all classical alpha/beta-based chess engines.

Rustic is free software: you can redistribute it and/or modify it under
the terms of the GNU General Public License version 3 as published by
the Free Software Foundation.

Rustic is distributed in the hope that it will be useful, but WITHOUT
ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License
for more details.

You should have received a copy of the GNU General Public License along
with this program.  If not, see <http://www.gnu.org/licenses/>.
======================================================================= */

//! Zobrist key material: one random 64-bit number per (side, piece, square)
//! triple, one per side-to-move, one per castling-rights value, and one per
//! en-passant file. The board XORs these in and out incrementally as pieces
//! move; `Board::init_zobrist_key` XORs the full set once at FEN load time.
//!
//! The numbers are generated from a fixed seed so that two processes
//! starting from the same position always agree on its hash — required for
//! the transposition-table determinism the search layer relies on.

use super::defs::ZobristKey;
use crate::defs::{NrOf, Piece, Side, Sides, Square};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore, SeedableRng};

const ZOBRIST_SEED: u64 = 0xC0DE_F00D_CAFE_BABE;

pub struct ZobristRandoms {
    piece: [[[ZobristKey; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH],
    side: [ZobristKey; Sides::BOTH],
    castling: [ZobristKey; NrOf::CASTLING_PERMISSIONS],
    en_passant: [ZobristKey; NrOf::FILES],
}

impl ZobristRandoms {
    pub fn new() -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(ZOBRIST_SEED);

        let mut piece = [[[0; NrOf::SQUARES]; NrOf::PIECE_TYPES]; Sides::BOTH];
        for side in piece.iter_mut() {
            for piece_type in side.iter_mut() {
                for square in piece_type.iter_mut() {
                    *square = rng.next_u64();
                }
            }
        }

        let mut side = [0; Sides::BOTH];
        for s in side.iter_mut() {
            *s = rng.next_u64();
        }

        let mut castling = [0; NrOf::CASTLING_PERMISSIONS];
        for c in castling.iter_mut() {
            *c = rng.next_u64();
        }

        let mut en_passant = [0; NrOf::FILES];
        for f in en_passant.iter_mut() {
            *f = rng.next_u64();
        }

        Self {
            piece,
            side,
            castling,
            en_passant,
        }
    }

    pub fn piece(&self, side: Side, piece: Piece, square: Square) -> ZobristKey {
        self.piece[side][piece][square]
    }

    pub fn side(&self, side: Side) -> ZobristKey {
        self.side[side]
    }

    pub fn castling(&self, permissions: u8) -> ZobristKey {
        self.castling[permissions as usize]
    }

    // En-passant keys are indexed by file, so a key is only toggled in and
    // back out when the ep-square actually changes file, not merely when it
    // is (re)set. `None` contributes nothing.
    pub fn en_passant(&self, square: Option<u8>) -> ZobristKey {
        match square {
            Some(s) => self.en_passant[s as usize & 7],
            None => 0,
        }
    }
}

impl Default for ZobristRandoms {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_instances() {
        let a = ZobristRandoms::new();
        let b = ZobristRandoms::new();
        assert_eq!(a.piece(Sides::WHITE, 0, 0), b.piece(Sides::WHITE, 0, 0));
        assert_eq!(a.side(Sides::BLACK), b.side(Sides::BLACK));
        assert_eq!(a.castling(15), b.castling(15));
    }

    #[test]
    fn en_passant_none_is_zero() {
        let z = ZobristRandoms::new();
        assert_eq!(z.en_passant(None), 0);
    }
}
