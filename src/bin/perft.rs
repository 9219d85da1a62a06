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

//! Standalone perft/search driver. Not a UCI/xboard engine front end; just
//! enough of a CLI to exercise move generation and the Lazy-SMP search from
//! the command line.

use crossbeam_channel::unbounded;
use rustic_sharp::{
    board::Board,
    defs::FEN_KIWIPETE_POSITION,
    engine::defs::{Information, Settings},
    engine::SearchManager,
    misc::cmdline::CmdLine,
    movegen::{
        defs::{MoveList, MoveType},
        MoveGenerator,
    },
    search::defs::{SearchMode, SearchParams},
};
use std::time::Instant;

fn perft(board: &mut Board, mg: &MoveGenerator, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut move_list = MoveList::new();
    mg.generate_moves(board, &mut move_list, MoveType::All);
    let mut nodes = 0;
    for i in 0..move_list.len() {
        let m = move_list.get_move(i);
        if board.make(m, mg) {
            nodes += perft(board, mg, depth - 1);
            board.unmake();
        }
    }
    nodes
}

fn run_perft(board: &mut Board, mg: &MoveGenerator, depth: i16) {
    for d in 1..=depth {
        let start = Instant::now();
        let nodes = perft(board, mg, d as u8);
        let elapsed = start.elapsed().as_millis().max(1);
        println!(
            "perft {d}: {nodes} nodes in {elapsed} ms ({} nps)",
            nodes * 1000 / elapsed as u64
        );
    }
}

fn run_search(board: &Board, depth: i16, threads: usize, hash: usize, quiet: bool) {
    let manager = SearchManager::new(Settings {
        threads,
        quiet,
        tt_size: hash,
    });
    let mut params = SearchParams::new();
    params.search_mode = SearchMode::Depth;
    params.depth = depth;
    params.quiet = quiet;

    let (report_tx, report_rx) = unbounded::<Information>();
    let board = board.clone_for_search();
    let handle = std::thread::spawn(move || manager.go(&board, params, &report_tx));

    while let Ok(info) = report_rx.recv() {
        match info {
            Information::Search(rustic_sharp::search::defs::SearchReport::SearchSummary(s)) => {
                println!(
                    "depth {} score {} nodes {} nps {} time {} pv {}",
                    s.depth,
                    s.cp,
                    s.nodes,
                    s.nps,
                    s.time,
                    s.pv.iter()
                        .map(|m| m.as_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                );
            }
            Information::Search(rustic_sharp::search::defs::SearchReport::Finished(_)) => break,
            _ => (),
        }
    }

    let (best_move, _terminate) = handle.join().expect("search thread panicked");
    println!("bestmove {}", best_move.as_string());
}

fn main() {
    let cmdline = CmdLine::new();

    let mut board = Board::new();
    let fen = if cmdline.has_kiwipete() {
        FEN_KIWIPETE_POSITION.to_string()
    } else {
        cmdline.fen()
    };
    board
        .fen_read(Some(&fen))
        .unwrap_or_else(|e| panic!("invalid FEN: {e}"));

    let mg = MoveGenerator::new();
    board.init_evaluation_caches(&mg);

    let perft_depth = cmdline.perft();
    if perft_depth > 0 {
        run_perft(&mut board, &mg, perft_depth);
        return;
    }

    run_search(
        &board,
        cmdline.depth(),
        cmdline.threads(),
        cmdline.hash(),
        cmdline.has_quiet(),
    );
}
