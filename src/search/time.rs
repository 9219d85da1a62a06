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

//! Time allocation for game-time searches: `clock / moves-to-go + increment
//! - overhead`, nothing more. The adaptive phase/complexity-driven variant
//! this engine briefly carried is out of scope; spec calls for the simple
//! formula only.

use super::{defs::SearchRefs, Search};
use crate::defs::Sides;

/// Milliseconds reserved against GUI/OS scheduling lag.
pub const OVERHEAD: i128 = 50;

/// Assumed moves remaining when the GUI doesn't supply `moves_to_go`.
const DEFAULT_MOVES_TO_GO: i128 = 30;

impl Search {
    // Has the current move's time allocation been exceeded?
    pub fn out_of_time(refs: &mut SearchRefs) -> bool {
        refs.search_info.timer_elapsed() >= refs.search_info.allocated_time
    }

    pub fn time_up(refs: &mut SearchRefs) -> bool {
        Search::out_of_time(refs) || refs.search_info.interrupted()
    }

    // clock / moves-to-go + increment - overhead, floored at zero.
    pub fn calculate_time_slice(refs: &SearchRefs) -> u128 {
        let gt = &refs.search_params.game_time;
        let white = refs.board.us() == Sides::WHITE;
        let clock = if white { gt.wtime } else { gt.btime } as i128;
        let increment = if white { gt.winc } else { gt.binc } as i128;
        let mtg = gt.moves_to_go.map(|m| m as i128).unwrap_or(DEFAULT_MOVES_TO_GO).max(1);

        let slice = clock / mtg + increment - OVERHEAD;
        slice.max(0) as u128
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::Board,
        engine::defs::{Information, SearchData, TT},
        movegen::MoveGenerator,
        search::defs::{GameTime, SearchControl, SearchInfo, SearchMode, SearchParams, SearchRefs, ThreadLocalData},
    };
    use crossbeam_channel::unbounded;
    use std::sync::{Arc, RwLock};

    fn refs_harness() -> (Board, Arc<MoveGenerator>, Arc<RwLock<TT<SearchData>>>, SearchParams, SearchInfo, ThreadLocalData) {
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
    fn out_of_time_once_elapsed_exceeds_allocation() {
        let (mut board, mg, tt, mut sp, mut si, mut tld) = refs_harness();
        let (_ctx, crx) = unbounded::<SearchControl>();
        let (rtx, _rrx) = unbounded::<Information>();
        si.allocated_time = 1;
        si.timer_start();
        std::thread::sleep(std::time::Duration::from_millis(20));

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

        assert!(Search::out_of_time(&mut refs));
    }

    #[test]
    fn time_slice_applies_simple_formula() {
        let (mut board, mg, tt, mut sp, mut si, mut tld) = refs_harness();
        let (_ctx, crx) = unbounded::<SearchControl>();
        let (rtx, _rrx) = unbounded::<Information>();
        sp.search_mode = SearchMode::GameTime;
        sp.game_time = GameTime::new(30_000, 30_000, 0, 0, Some(30));

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

        // 30000 / 30 + 0 - 50 = 950
        assert_eq!(Search::calculate_time_slice(&refs), 950);
    }
}
