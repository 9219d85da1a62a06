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

//! Iterative deepening at the root: deepen one ply at a time, keep
//! researching with a narrow window around the previous score, and fall
//! back to a full window whenever that guess fails.

use super::{
    defs::{
        SearchResult, SearchSummary, SearchTerminate, ASPIRATION_WINDOW, CHECKMATE_THRESHOLD, INF,
    },
    Search, SearchRefs,
};
use crate::{
    defs::MAX_PLY,
    engine::defs::Information,
    movegen::defs::Move,
    search::defs::{SearchMode, SearchReport},
};

impl Search {
    pub fn iterative_deepening(refs: &mut SearchRefs) -> SearchResult {
        refs.search_info.timer_start();
        refs.thread_local_data.start_search();

        match refs.search_params.search_mode {
            SearchMode::GameTime => {
                refs.search_info.allocated_time = Search::calculate_time_slice(refs);
            }
            SearchMode::MoveTime => {
                refs.search_info.allocated_time = refs.search_params.move_time;
            }
            _ => (),
        }

        let max_depth = if refs.search_params.search_mode == SearchMode::Depth {
            refs.search_params.depth
        } else {
            MAX_PLY
        };

        let mut score: i16 = 0;
        let mut depth: i16 = 1;

        while depth <= max_depth {
            refs.search_info.depth = depth;
            refs.search_info.ply = 0;

            let mut pv: Vec<Move> = Vec::new();
            let iteration_score = Search::aspiration_search(depth, score, &mut pv, refs);

            if refs.search_info.terminate != SearchTerminate::Nothing {
                break;
            }

            score = iteration_score;
            Search::flush_tt_batch(refs);

            if !refs.search_params.quiet {
                let summary = SearchSummary {
                    depth,
                    seldepth: refs.search_info.seldepth,
                    time: refs.search_info.timer_elapsed(),
                    cp: score,
                    mate: Search::mate_distance(score),
                    nodes: refs.search_info.nodes,
                    nps: Search::nodes_per_second(refs),
                    hash_full: if refs.tt_enabled {
                        refs.tt.read().expect("transposition table lock poisoned").hash_full()
                    } else {
                        0
                    },
                    pv,
                };
                let _ = refs
                    .report_tx
                    .send(Information::Search(SearchReport::SearchSummary(summary)));
            }

            if score.abs() >= CHECKMATE_THRESHOLD || Search::time_up(refs) {
                break;
            }

            depth += 1;
        }

        Search::flush_tt_batch(refs);

        let best_move = refs
            .thread_local_data
            .best_move_found
            .unwrap_or_default();
        let terminate = refs.search_info.terminate;

        if !refs.search_params.quiet {
            let _ = refs
                .report_tx
                .send(Information::Search(SearchReport::Finished(best_move)));
        }

        (best_move, terminate)
    }

    // Searches inside a window around the previous iteration's score; a
    // fail-low or fail-high falls back to a full-width research rather than
    // progressively widening, keeping the worst case at two searches.
    fn aspiration_search(depth: i16, prev_score: i16, pv: &mut Vec<Move>, refs: &mut SearchRefs) -> i16 {
        if depth <= 1 || prev_score.abs() >= CHECKMATE_THRESHOLD {
            return Search::alpha_beta(depth, -INF, INF, pv, refs);
        }

        let alpha = prev_score.saturating_sub(ASPIRATION_WINDOW).max(-INF);
        let beta = prev_score.saturating_add(ASPIRATION_WINDOW).min(INF);

        let score = Search::alpha_beta(depth, alpha, beta, pv, refs);
        if refs.search_info.terminate != SearchTerminate::Nothing {
            return score;
        }

        if score <= alpha || score >= beta {
            log::debug!(
                "aspiration window [{alpha}, {beta}] failed at depth {depth} with score {score}; re-searching full width"
            );
            pv.clear();
            return Search::alpha_beta(depth, -INF, INF, pv, refs);
        }

        score
    }

    fn mate_distance(score: i16) -> u8 {
        if score.abs() < CHECKMATE_THRESHOLD {
            return 0;
        }
        let plies = super::defs::CHECKMATE - score.abs();
        (plies / 2 + plies % 2) as u8
    }

    fn nodes_per_second(refs: &SearchRefs) -> usize {
        let elapsed = refs.search_info.timer_elapsed();
        if elapsed == 0 {
            0
        } else {
            (refs.search_info.nodes as u128 * 1000 / elapsed) as usize
        }
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

    #[test]
    fn iterative_deepening_finds_a_legal_move_at_low_depth() {
        let mut board = Board::new();
        board
            .fen_read(Some(crate::defs::FEN_START_POSITION))
            .unwrap();
        let mg = Arc::new(MoveGenerator::new());
        let tt = Arc::new(RwLock::new(TT::<SearchData>::new(1)));
        let mut search_params = SearchParams::new();
        search_params.search_mode = SearchMode::Depth;
        search_params.depth = 3;
        search_params.quiet = true;
        let mut search_info = SearchInfo::new();
        let mut thread_local_data = ThreadLocalData::new(0);
        let (_control_tx, control_rx) = unbounded::<SearchControl>();
        let (report_tx, _report_rx) = unbounded::<Information>();

        let mut refs = SearchRefs {
            board: &mut board,
            mg: &mg,
            tt: &tt,
            tt_enabled: true,
            search_params: &mut search_params,
            search_info: &mut search_info,
            control_rx: &control_rx,
            report_tx: &report_tx,
            thread_local_data: &mut thread_local_data,
        };

        let (best_move, terminate) = Search::iterative_deepening(&mut refs);
        assert!(terminate == SearchTerminate::Nothing || terminate == SearchTerminate::Stop);
        assert_ne!(best_move, Move::default());
    }

    #[test]
    fn mate_distance_is_zero_for_ordinary_scores() {
        assert_eq!(Search::mate_distance(120), 0);
    }
}
