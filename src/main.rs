use gomokuzero::config::Settings;
use gomokuzero::game::Board;
use gomokuzero::game::Stone;
use gomokuzero::mcts::Search;
use gomokuzero::mcts::SearchParams;
use gomokuzero::mcts::TranspositionTable;
use gomokuzero::nn::NetModel;
use gomokuzero::nn::Oracle;
use std::sync::Arc;

/// play one quick demo game between two copies of a fresh random model
/// and print the final position
fn main() {
    gomokuzero::log();
    let mut settings = Settings::default();
    settings.think_time_ms = 300;
    let model = NetModel::random(settings.board_size, 0xA11CE);
    let oracle = Oracle::new(Arc::new(model), settings.cache_capacity);
    let tt = TranspositionTable::new(settings.tt_capacity);

    let mut board = Board::empty(settings.board_size);
    let mut to_move = Stone::Black;
    let mut seed = 1u64;
    let winner = loop {
        if !board.has_empty() {
            break None;
        }
        let params = SearchParams::new(&settings, settings.think_time_ms);
        let mut search = Search::new(&oracle, &tt, params, seed);
        seed += 1;
        let Some(point) = search.best_move(&board, to_move).point else {
            break None;
        };
        board.put(point, to_move);
        if board.wins(point, to_move) {
            break Some(to_move);
        }
        to_move = to_move.opponent();
    };

    println!("{}", board);
    match winner {
        Some(stone) => log::info!("{} wins after {} stones", stone, board.stones()),
        None => log::info!("drawn after {} stones", board.stones()),
    }
}
