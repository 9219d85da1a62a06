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

//! FEN string parsing. Splits the record into its six space-separated
//! fields and fills a freshly-reset board from them; any malformed field
//! surfaces as `EngineError::InvalidFen` rather than panicking, since a bad
//! FEN can come from outside input (a `perft` invocation, a test fixture).

use super::Board;
use crate::defs::{EngineRunResult, Pieces, Sides, FEN_START_POSITION};
use crate::error::EngineError;

const FEN_NR_OF_PARTS: usize = 6;

struct FenParts<'a> {
    pieces: &'a str,
    color: &'a str,
    castling: &'a str,
    en_passant: &'a str,
    halfmove_clock: &'a str,
    fullmove_number: &'a str,
}

pub fn read(board: &mut Board, fen_string: Option<&str>) -> EngineRunResult {
    let fen = fen_string.unwrap_or(FEN_START_POSITION).trim();
    let parts: Vec<&str> = fen.split_whitespace().collect();

    if parts.len() != FEN_NR_OF_PARTS {
        return Err(EngineError::InvalidFen(fen.to_string()));
    }

    let p = FenParts {
        pieces: parts[0],
        color: parts[1],
        castling: parts[2],
        en_passant: parts[3],
        halfmove_clock: parts[4],
        fullmove_number: parts[5],
    };

    board.reset();
    parse_pieces(board, p.pieces, fen)?;
    parse_color(board, p.color, fen)?;
    parse_castling(board, p.castling, fen)?;
    parse_en_passant(board, p.en_passant, fen)?;
    parse_halfmove_clock(board, p.halfmove_clock, fen)?;
    parse_fullmove_number(board, p.fullmove_number, fen)?;
    board.init();

    Ok(())
}

fn parse_pieces(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(EngineError::InvalidFen(fen.to_string()));
    }

    // FEN ranks run 8 down to 1; our square indexing runs rank 0 (rank 1) up.
    for (rank_from_top, rank_str) in ranks.iter().enumerate() {
        let rank = 7 - rank_from_top;
        let mut file = 0usize;

        for c in rank_str.chars() {
            if file > 7 {
                return Err(EngineError::InvalidFen(fen.to_string()));
            }

            if let Some(skip) = c.to_digit(10) {
                file += skip as usize;
                continue;
            }

            let (side, piece) = piece_from_char(c).ok_or_else(|| EngineError::InvalidFen(fen.to_string()))?;
            let square = rank * 8 + file;
            board.put_piece_raw(side, piece, square);
            file += 1;
        }

        if file != 8 {
            return Err(EngineError::InvalidFen(fen.to_string()));
        }
    }

    Ok(())
}

fn piece_from_char(c: char) -> Option<(usize, usize)> {
    let side = if c.is_ascii_uppercase() { Sides::WHITE } else { Sides::BLACK };
    let piece = match c.to_ascii_lowercase() {
        'k' => Pieces::KING,
        'q' => Pieces::QUEEN,
        'r' => Pieces::ROOK,
        'b' => Pieces::BISHOP,
        'n' => Pieces::KNIGHT,
        'p' => Pieces::PAWN,
        _ => return None,
    };
    Some((side, piece))
}

fn parse_color(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    board.game_state.active_color = match field {
        "w" => Sides::WHITE as u8,
        "b" => Sides::BLACK as u8,
        _ => return Err(EngineError::InvalidFen(fen.to_string())),
    };
    Ok(())
}

fn parse_castling(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    use super::defs::{CASTLE_BK, CASTLE_BQ, CASTLE_WK, CASTLE_WQ};

    if field == "-" {
        board.game_state.castling = 0;
        return Ok(());
    }

    let mut rights = 0u8;
    for c in field.chars() {
        rights |= match c {
            'K' => CASTLE_WK,
            'Q' => CASTLE_WQ,
            'k' => CASTLE_BK,
            'q' => CASTLE_BQ,
            _ => return Err(EngineError::InvalidFen(fen.to_string())),
        };
    }
    board.game_state.castling = rights;
    Ok(())
}

fn parse_en_passant(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    if field == "-" {
        board.game_state.en_passant = None;
        return Ok(());
    }

    let mut chars = field.chars();
    let file = chars.next().and_then(|c| match c {
        'a'..='h' => Some(c as u8 - b'a'),
        _ => None,
    });
    let rank = chars.next().and_then(|c| c.to_digit(10));

    match (file, rank) {
        (Some(f), Some(r)) if (1..=8).contains(&r) => {
            let square = (r as u8 - 1) * 8 + f;
            board.game_state.en_passant = Some(square);
            Ok(())
        }
        _ => Err(EngineError::InvalidFen(fen.to_string())),
    }
}

fn parse_halfmove_clock(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    board.game_state.halfmove_clock = field
        .parse::<u8>()
        .map_err(|_| EngineError::InvalidFen(fen.to_string()))?;
    Ok(())
}

fn parse_fullmove_number(board: &mut Board, field: &str, fen: &str) -> EngineRunResult {
    board.game_state.fullmove_number = field
        .parse::<u16>()
        .map_err(|_| EngineError::InvalidFen(fen.to_string()))?;
    Ok(())
}
