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

//! Per-node helpers shared by `alpha_beta` and `quiescence`: termination
//! checks, draw detection, move ordering and its supporting heuristic
//! tables, and GUI progress reports.

use super::{
    defs::{
        SearchControl, SearchMode, SearchStats, SearchTerminate, CHECK_TERMINATION, MAX_KILLER_MOVES,
        MIN_TIME_STATS,
    },
    Search, SearchRefs,
};
use crate::{
    board::Board,
    defs::{Pieces, MAX_PLY},
    engine::defs::Information,
    search::defs::SearchReport,
    evaluation,
    movegen::defs::{Move, MoveList, MoveType, ShortMove},
};

const LOCK_POISONED: &str = "transposition table lock poisoned";

// Move ordering score bands; chosen wide enough apart that a quiet move's
// history score (floored/halved at most at HISTORY_HALVE_THRESHOLD) can
// never climb into a band above it.
const HASH_MOVE_SCORE: i32 = 1_000_000;
const GOOD_CAPTURE_BASE: i32 = 500_000;
const KILLER_SCORE: [i32; MAX_KILLER_MOVES] = [300_000, 290_000];

const HISTORY_HALVE_THRESHOLD: u32 = 20_000;

impl Search {
    pub fn check_termination(refs: &mut SearchRefs) {
        if let Ok(cmd) = refs.control_rx.try_recv() {
            match cmd {
                SearchControl::Stop => refs.search_info.terminate = SearchTerminate::Stop,
                SearchControl::Quit => refs.search_info.terminate = SearchTerminate::Quit,
                SearchControl::Start(_) | SearchControl::Nothing => (),
            }
        }

        let time_bound = matches!(
            refs.search_params.search_mode,
            SearchMode::GameTime | SearchMode::MoveTime
        );
        if time_bound && Search::out_of_time(refs) {
            refs.search_info.terminate = SearchTerminate::Stop;
        }

        if refs.search_params.search_mode == SearchMode::Nodes
            && refs.search_info.nodes >= refs.search_params.nodes
        {
            refs.search_info.terminate = SearchTerminate::Stop;
        }
    }

    pub fn is_repetition(board: &Board) -> u8 {
        board.repetition_count()
    }

    // Null move pruning is unsound in positions where the side to move has
    // only pawns left: zugzwang is common and "passing" can look falsely
    // good.
    pub fn is_insufficient_material(refs: &SearchRefs) -> bool {
        let us = refs.board.us();
        let non_pawn_material = refs.board.get_pieces(Pieces::QUEEN, us)
            | refs.board.get_pieces(Pieces::ROOK, us)
            | refs.board.get_pieces(Pieces::BISHOP, us)
            | refs.board.get_pieces(Pieces::KNIGHT, us);
        non_pawn_material == 0
    }

    // Quiescence search: only captures are generated (and only those with
    // a non-negative static exchange value), so the search bottoms out once
    // the position is "quiet" instead of evaluating mid-exchange.
    pub fn quiescence(alpha: i16, beta: i16, pv: &mut Vec<Move>, refs: &mut SearchRefs) -> i16 {
        refs.thread_local_data.increment_nodes();

        if refs.search_info.nodes & CHECK_TERMINATION == 0 {
            Search::check_termination(refs);
        }
        if refs.search_info.terminate != SearchTerminate::Nothing {
            return 0;
        }

        refs.search_info.nodes += 1;

        let stand_pat = evaluation::evaluate_position(refs.board, refs.mg);
        if stand_pat >= beta {
            return beta;
        }

        let mut alpha = alpha;
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        if refs.search_info.ply >= MAX_PLY {
            return stand_pat;
        }

        let mut move_list = MoveList::new();
        refs.mg
            .generate_moves(refs.board, &mut move_list, MoveType::Captures);
        Search::score_moves(&mut move_list, ShortMove::new(0), refs);

        for i in 0..move_list.len() {
            if Search::time_up(refs) {
                break;
            }

            Search::pick_move(&mut move_list, i);
            let current_move = move_list.get_move(i);

            if refs.board.see(current_move, refs.mg) < 0 {
                continue;
            }

            if !refs.board.make(current_move, refs.mg) {
                continue;
            }
            refs.search_info.ply += 1;

            let mut tmp_pv = Vec::new();
            let score = -Search::quiescence(-beta, -alpha, &mut tmp_pv, refs);

            refs.board.unmake();
            refs.search_info.ply -= 1;

            if refs.search_info.terminate != SearchTerminate::Nothing {
                break;
            }

            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
                pv.clear();
                pv.push(current_move);
                pv.extend(tmp_pv);
            }
        }

        alpha
    }

    // Assigns an ordering score to every move in `move_list`: the hash move
    // first, then good captures (SEE >= 0) by MVV/LVA, then killers, then
    // quiet moves by history score, then bad captures last.
    pub fn score_moves(move_list: &mut MoveList, tt_move: ShortMove, refs: &mut SearchRefs) {
        let ply = refs.search_info.ply as usize;
        let us = refs.board.us();

        for i in 0..move_list.len() {
            let mv = move_list.get_move(i);
            let short = mv.to_short_move();

            let score = if tt_move.get_move() != 0 && short.get_move() == tt_move.get_move() {
                HASH_MOVE_SCORE
            } else if mv.is_capture() {
                let see = refs.board.see(mv, refs.mg);
                if see >= 0 {
                    GOOD_CAPTURE_BASE + see
                } else {
                    see
                }
            } else if let Some(slot) = Search::killer_slot(refs, ply, short) {
                KILLER_SCORE[slot]
            } else {
                refs.search_info.history_heuristic[us][mv.piece()][mv.to()] as i32
            };

            move_list.set_score(i, score);
        }
    }

    fn killer_slot(refs: &SearchRefs, ply: usize, mv: ShortMove) -> Option<usize> {
        if ply >= refs.search_info.killer_moves.len() {
            return None;
        }
        refs.search_info.killer_moves[ply]
            .iter()
            .position(|&killer| killer.get_move() != 0 && killer.get_move() == mv.get_move())
    }

    // Records a quiet move that caused a beta cutoff: it becomes this ply's
    // newest killer, gets a depth-squared history bonus, and every other
    // quiet move already tried at this node takes a flat depth penalty. The
    // whole table is halved once any entry grows past HISTORY_HALVE_THRESHOLD
    // so scores stay comparable across a long search.
    pub fn record_cutoff(refs: &mut SearchRefs, cutoff_move: Move, tried_quiets: &[Move], depth: i16) {
        if !Search::is_quiet(cutoff_move) {
            return;
        }

        let ply = refs.search_info.ply as usize;
        if ply < refs.search_info.killer_moves.len() {
            let short = cutoff_move.to_short_move();
            let slots = &mut refs.search_info.killer_moves[ply];
            if slots[0].get_move() != short.get_move() {
                slots[1] = slots[0];
                slots[0] = short;
            }
        }

        let us = refs.board.us();
        let bonus = (depth as u32) * (depth as u32);
        let entry = &mut refs.search_info.history_heuristic[us][cutoff_move.piece()][cutoff_move.to()];
        *entry = entry.saturating_add(bonus);

        for &mv in tried_quiets {
            if mv == cutoff_move {
                continue;
            }
            let entry = &mut refs.search_info.history_heuristic[us][mv.piece()][mv.to()];
            *entry = entry.saturating_sub(depth as u32);
        }

        let overflowed = refs.search_info.history_heuristic[us][cutoff_move.piece()][cutoff_move.to()]
            > HISTORY_HALVE_THRESHOLD;
        if overflowed {
            for side_table in refs.search_info.history_heuristic.iter_mut() {
                for piece_table in side_table.iter_mut() {
                    for score in piece_table.iter_mut() {
                        *score /= 2;
                    }
                }
            }
        }
    }

    fn is_quiet(mv: Move) -> bool {
        mv.captured() == Pieces::KING
            && mv.promoted() == Pieces::KING
            && !mv.castling()
            && !mv.en_passant()
    }

    // Selection-sort step: swap the highest-scoring move from `from..` into
    // position `from`.
    pub fn pick_move(move_list: &mut MoveList, from: u8) {
        let mut best_index = from;
        let mut best_score = move_list.get_score(from);

        for i in (from + 1)..move_list.len() {
            let score = move_list.get_score(i);
            if score > best_score {
                best_score = score;
                best_index = i;
            }
        }

        if best_index != from {
            move_list.swap(from, best_index);
        }
    }

    pub fn send_stats_to_gui(refs: &mut SearchRefs) {
        let elapsed = refs.search_info.timer_elapsed();
        if elapsed.saturating_sub(refs.search_info.last_stats_sent) < MIN_TIME_STATS {
            return;
        }
        refs.search_info.last_stats_sent = elapsed;

        let nps = if elapsed > 0 {
            (refs.search_info.nodes as u128 * 1000 / elapsed) as usize
        } else {
            0
        };
        let hash_full = refs.tt.read().expect(LOCK_POISONED).hash_full();

        let stats = SearchStats::new(elapsed, refs.search_info.nodes, nps, hash_full);
        let _ = refs
            .report_tx
            .send(Information::Search(SearchReport::SearchStats(stats)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::Board,
        engine::defs::{SearchData, TT},
        movegen::MoveGenerator,
        search::defs::{SearchControl, SearchInfo, SearchParams, ThreadLocalData},
    };
    use crossbeam_channel::unbounded;
    use std::sync::{Arc, RwLock};

    fn harness() -> (
        Board,
        Arc<MoveGenerator>,
        Arc<RwLock<TT<SearchData>>>,
        SearchParams,
        SearchInfo,
        ThreadLocalData,
    ) {
        (
            Board::new(),
            Arc::new(MoveGenerator::new()),
            Arc::new(RwLock::new(TT::new(1))),
            SearchParams::new(),
            SearchInfo::new(),
            ThreadLocalData::new(0),
        )
    }

    #[test]
    fn insufficient_material_gate_trips_on_pawn_only_side() {
        let (mut board, mg, tt, mut sp, mut si, mut tld) = harness();
        board
            .fen_read(Some("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1"))
            .unwrap();
        let (_ctx, crx) = unbounded::<SearchControl>();
        let (rtx, _rrx) = unbounded::<Information>();
        let refs = SearchRefs {
            board: &mut board,
            mg: &mg,
            tt: &tt,
            tt_enabled: false,
            search_params: &mut sp,
            search_info: &mut si,
            control_rx: &crx,
            report_tx: &rtx,
            thread_local_data: &mut tld,
        };
        assert!(Search::is_insufficient_material(&refs));
    }

    #[test]
    fn pick_move_swaps_highest_score_into_place() {
        let mut move_list = MoveList::new();
        move_list.push(Move::default());
        move_list.push(Move::default());
        move_list.push(Move::default());
        move_list.set_score(0, 5);
        move_list.set_score(1, 50);
        move_list.set_score(2, 10);

        Search::pick_move(&mut move_list, 0);
        assert_eq!(move_list.get_score(0), 50);
    }

    #[test]
    fn record_cutoff_rewards_the_cutoff_move_and_penalises_the_rest() {
        let (mut board, mg, tt, mut sp, mut si, mut tld) = harness();
        board.fen_read(Some(crate::defs::FEN_START_POSITION)).unwrap();
        let (_ctx, crx) = unbounded::<SearchControl>();
        let (rtx, _rrx) = unbounded::<Information>();
        let mut refs = SearchRefs {
            board: &mut board,
            mg: &mg,
            tt: &tt,
            tt_enabled: false,
            search_params: &mut sp,
            search_info: &mut si,
            control_rx: &crx,
            report_tx: &rtx,
            thread_local_data: &mut tld,
        };

        let mut move_list = MoveList::new();
        refs.mg.generate_moves(refs.board, &mut move_list, MoveType::All);
        let cutoff = move_list.get_move(0);
        let other = move_list.get_move(1);

        Search::record_cutoff(&mut refs, cutoff, &[cutoff, other], 4);

        let us = refs.board.us();
        assert_eq!(
            refs.search_info.history_heuristic[us][cutoff.piece()][cutoff.to()],
            16
        );
        assert_eq!(
            refs.search_info.history_heuristic[us][other.piece()][other.to()],
            0
        );
        assert_eq!(refs.search_info.killer_moves[0][0], cutoff.to_short_move());
    }
}
