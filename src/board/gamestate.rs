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

//! The part of a position that doesn't fit neatly into a bitboard: whose
//! turn it is, castling/en-passant rights, the incrementally-maintained
//! Zobrist key, and the small evaluation caches hung off the board so they
//! survive make/unmake without recomputation. One of these is pushed onto
//! `History` before every move and restored by `unmake`.

use super::defs::ZobristKey;
use crate::defs::{Piece, Side, Square};
use crate::movegen::defs::Move;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct GameState {
    pub active_color: u8,
    pub castling: u8,
    pub en_passant: Option<u8>,
    pub halfmove_clock: u8,
    pub fullmove_number: u16,
    pub zobrist_key: ZobristKey,

    // Incrementally maintained PSQT midgame score per side; combined with
    // endgame tables and game phase at evaluation time.
    pub psqt: [i16; 2],

    // The move that produced this position, and what it captured (if
    // anything); both are needed by `unmake` to restore the prior state.
    pub next_move: Move,
    pub captured_piece: Piece,

    // Evaluation caches. `pawn_hash` gates recomputation of
    // `pawn_structure_score`; `game_phase` and `mobility_score` are
    // recomputed on capture/promotion respectively, not on every ply.
    pub pawn_hash: u64,
    pub pawn_structure_score: i16,
    pub game_phase: i16,
    pub mobility_score: i16,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            active_color: 0,
            castling: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            zobrist_key: 0,
            psqt: [0, 0],
            next_move: Move::default(),
            captured_piece: crate::defs::Pieces::NONE,
            pawn_hash: 0,
            pawn_structure_score: 0,
            game_phase: 24,
            mobility_score: 0,
        }
    }

    pub fn ep_square(&self) -> Option<Square> {
        self.en_passant.map(|s| s as Square)
    }

    pub fn side_to_move(&self) -> Side {
        self.active_color as Side
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
