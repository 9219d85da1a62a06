//! Integration tests against the documented move-generation and search
//! properties: perft node counts, a mate-in-1, en-passant legality, the
//! threefold-repetition draw signal, SEE, and transposition-table
//! determinism across a repeated search.

use rustic_sharp::{
    board::Board,
    defs::{FEN_KIWIPETE_POSITION, FEN_START_POSITION, Pieces, Sides},
    engine::defs::Settings,
    engine::SearchManager,
    movegen::{
        defs::{MoveList, MoveType},
        MoveGenerator,
    },
    search::defs::{SearchMode, SearchParams},
};

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

fn board_from_fen(fen: &str) -> (Board, MoveGenerator) {
    let mut board = Board::new();
    board.fen_read(Some(fen)).expect("valid FEN");
    let mg = MoveGenerator::new();
    board.init_evaluation_caches(&mg);
    (board, mg)
}

#[test]
fn perft_start_position_matches_known_node_counts() {
    let (mut board, mg) = board_from_fen(FEN_START_POSITION);
    const EXPECTED: [u64; 5] = [20, 400, 8_902, 197_281, 4_865_609];
    for (i, &expected) in EXPECTED.iter().enumerate() {
        let depth = (i + 1) as u8;
        assert_eq!(perft(&mut board, &mg, depth), expected, "perft({depth})");
    }
}

#[test]
fn perft_kiwipete_depth_3_matches_known_node_count() {
    let (mut board, mg) = board_from_fen(FEN_KIWIPETE_POSITION);
    assert_eq!(perft(&mut board, &mg, 3), 97_862);
}

#[test]
fn search_finds_the_mating_move_in_a_back_rank_mate_in_one() {
    let (board, _mg) = board_from_fen("7k/5ppp/8/8/8/8/8/R3K3 w - - 0 1");
    let manager = SearchManager::new(Settings {
        threads: 1,
        quiet: true,
        tt_size: 1,
    });
    let mut params = SearchParams::new();
    params.search_mode = SearchMode::Depth;
    params.depth = 4;
    let (report_tx, _report_rx) = crossbeam_channel::unbounded();

    let (best_move, _) = manager.go(&board, params, &report_tx);
    assert_eq!(best_move.as_string(), "a1a8");
}

#[test]
fn en_passant_capture_is_legal_and_resolves_correctly() {
    let (mut board, mg) =
        board_from_fen("rnbqkbnr/ppp1pppp/8/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3");
    let ep_capture = board
        .parse_move("e5d6", &mg)
        .expect("e5xd6 en passant should parse against the pseudo-legal list");
    assert!(ep_capture.en_passant());
    assert!(board.make(ep_capture, &mg));
    // The captured pawn sat on d5, not on the d6 destination square.
    assert!(board.get_pieces(Pieces::PAWN, Sides::BLACK) & (1u64 << 35) == 0);
}

#[test]
fn repeated_position_is_flagged_as_a_repetition() {
    let (mut board, mg) = board_from_fen(FEN_START_POSITION);
    for _ in 0..2 {
        for notation in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            let m = board.parse_move(notation, &mg).expect("legal shuffling move");
            assert!(board.make(m, &mg));
        }
    }
    assert!(board.repetition_count() >= 1);
}

#[test]
fn see_scores_an_undefended_capture_as_a_clean_gain() {
    // White pawn takes an undefended black knight: a clean material win,
    // SEE should be positive.
    let (board, mg) = board_from_fen("4k3/8/8/3n4/4P3/8/8/4K3 w - - 0 1");
    let capture = board.parse_move("e4d5", &mg).expect("pawn takes knight");
    assert!(board.see(capture, &mg) > 0);
}

#[test]
fn transposition_table_lookups_are_deterministic_across_repeated_searches() {
    let (board, _mg) = board_from_fen(FEN_START_POSITION);

    let run = || {
        let manager = SearchManager::new(Settings {
            threads: 1,
            quiet: true,
            tt_size: 1,
        });
        let mut params = SearchParams::new();
        params.search_mode = SearchMode::Depth;
        params.depth = 4;
        let (report_tx, _report_rx) = crossbeam_channel::unbounded();
        manager.go(&board, params, &report_tx).0
    };

    let first = run();
    let second = run();
    assert_eq!(first.as_string(), second.as_string());
}
