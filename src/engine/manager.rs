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

//! Lazy-SMP: run several independent iterative-deepening searches against
//! one shared transposition table. Helper threads exist only to enrich the
//! TT; the move this crate reports always comes from the main thread's own
//! deepest completed iteration.

use super::defs::{Information, Settings};
use crate::{
    board::Board,
    engine::defs::{SearchData, TT},
    movegen::MoveGenerator,
    search::{
        defs::{SearchControl, SearchInfo, SearchMode, SearchParams, SearchTerminate, ThreadLocalData},
        Search, SearchRefs,
    },
};
use crossbeam_channel::{unbounded, Sender};
use std::sync::{Arc, RwLock};

/// Owns the shared transposition table and move generator for a search, and
/// drives `settings.threads` Lazy-SMP workers against them.
pub struct SearchManager {
    settings: Settings,
    tt: Arc<RwLock<TT<SearchData>>>,
    mg: Arc<MoveGenerator>,
}

impl SearchManager {
    pub fn new(settings: Settings) -> Self {
        let tt = Arc::new(RwLock::new(TT::<SearchData>::new(settings.tt_size)));
        let mg = Arc::new(MoveGenerator::new());
        Self { settings, tt, mg }
    }

    /// Runs a blocking search and returns the move and termination reason of
    /// the main (reporter) thread's own deepest completed iteration. Helper
    /// threads (`threads - 1` of them) search the same position with
    /// perturbed move ordering purely to seed the shared TT; their own best
    /// moves are never surfaced.
    pub fn go(
        &self,
        board: &Board,
        mut limits: SearchParams,
        report_tx: &Sender<Information>,
    ) -> (crate::movegen::defs::Move, SearchTerminate) {
        limits.quiet = self.settings.quiet;
        let helper_count = self.settings.threads.saturating_sub(1);

        std::thread::scope(|scope| {
            let mut helper_stoppers = Vec::with_capacity(helper_count);

            for worker_id in 1..=helper_count as u32 {
                let mut helper_board = board.clone_for_search();
                let mut helper_params = limits;
                // Stagger helper depth targets so they don't walk the exact
                // same iteration schedule as the main thread; they only feed
                // the shared TT, so their own result is discarded either way.
                if helper_params.search_mode == SearchMode::Depth {
                    helper_params.depth = helper_params.depth.saturating_add((worker_id % 3) as i16);
                }
                let (control_tx, control_rx) = unbounded::<SearchControl>();
                let (helper_report_tx, helper_report_rx) = unbounded::<Information>();
                helper_stoppers.push(control_tx);

                let tt = Arc::clone(&self.tt);
                let mg = Arc::clone(&self.mg);

                scope.spawn(move || {
                    let mut search_info = SearchInfo::new();
                    let mut thread_local_data = ThreadLocalData::new(worker_id);
                    let mut refs = SearchRefs {
                        board: &mut helper_board,
                        mg: &mg,
                        tt: &tt,
                        tt_enabled: true,
                        search_params: &mut helper_params,
                        search_info: &mut search_info,
                        control_rx: &control_rx,
                        report_tx: &helper_report_tx,
                        thread_local_data: &mut thread_local_data,
                    };
                    Search::iterative_deepening(&mut refs);
                    drop(helper_report_rx);
                });
            }

            let mut main_board = board.clone_for_search();
            let mut main_params = limits;
            let (_main_control_tx, main_control_rx) = unbounded::<SearchControl>();
            let mut main_info = SearchInfo::new();
            let mut main_thread_local = ThreadLocalData::new(0);

            let mut main_refs = SearchRefs {
                board: &mut main_board,
                mg: &self.mg,
                tt: &self.tt,
                tt_enabled: true,
                search_params: &mut main_params,
                search_info: &mut main_info,
                control_rx: &main_control_rx,
                report_tx,
                thread_local_data: &mut main_thread_local,
            };

            let result = Search::iterative_deepening(&mut main_refs);

            for stopper in &helper_stoppers {
                let _ = stopper.send(SearchControl::Stop);
            }

            result
        })
    }

    pub fn tt_hash_full(&self) -> u16 {
        self.tt.read().expect("transposition table lock poisoned").hash_full()
    }

    pub fn clear_tt(&self) {
        self.tt.write().expect("transposition table lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_board() -> Board {
        let mut board = Board::new();
        board.fen_read(Some(crate::defs::FEN_START_POSITION)).unwrap();
        board
    }

    #[test]
    fn single_threaded_manager_finds_a_legal_move() {
        let manager = SearchManager::new(Settings {
            threads: 1,
            quiet: true,
            tt_size: 1,
        });
        let mut params = SearchParams::new();
        params.search_mode = SearchMode::Depth;
        params.depth = 3;
        let (report_tx, _report_rx) = unbounded::<Information>();

        let (best_move, terminate) = manager.go(&start_board(), params, &report_tx);
        assert!(terminate == SearchTerminate::Nothing || terminate == SearchTerminate::Stop);
        assert_ne!(best_move, crate::movegen::defs::Move::default());
    }

    #[test]
    fn multi_threaded_manager_finds_the_mating_move() {
        // Black king boxed into the h8 corner by its own pawns; Ra8# is mate.
        let mut board = Board::new();
        board
            .fen_read(Some("7k/5ppp/8/8/8/8/8/R3K3 w - - 0 1"))
            .unwrap();

        let manager = SearchManager::new(Settings {
            threads: 3,
            quiet: true,
            tt_size: 1,
        });
        let mut params = SearchParams::new();
        params.search_mode = SearchMode::Depth;
        params.depth = 4;
        let (report_tx, _report_rx) = unbounded::<Information>();

        let (best_move, terminate) = manager.go(&board, params, &report_tx);
        assert!(terminate == SearchTerminate::Nothing || terminate == SearchTerminate::Stop);
        assert_ne!(best_move, crate::movegen::defs::Move::default());
    }
}
